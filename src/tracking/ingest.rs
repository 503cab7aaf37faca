//! 事件采集编排
//!
//! 校验 -> 实体查找 -> 会话推导 -> 去重 -> 事件写入（事务内累加计数器）
//! -> 天级汇总 -> 比率重算 -> 报表缓存失效。
//!
//! 事件写入是主写入，失败直接返回错误；之后的步骤只记录日志，不影响响应。

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use super::conversion::conversion_value;
use super::dedup::{DedupDecision, DedupGate};
use super::random::RandomSource;
use super::request::{RequestContext, TrackCommand, TrackRequest};
use super::session::resolve_session_id;
use super::{CampaignType, EventKind, TrackEvent, TrackOutcome};
use crate::analytics::cache::ReportCache;
use crate::analytics::revenue::RevenueAggregator;
use crate::config::TrackingConfig;
use crate::errors::{Result, TrackerError};
use crate::storage::{Campaign, EventStore, NewEvent};

pub struct EventIngestor {
    store: Arc<dyn EventStore>,
    revenue: RevenueAggregator,
    dedup: DedupGate,
    random: Arc<dyn RandomSource>,
    cache: ReportCache,
    config: TrackingConfig,
}

impl EventIngestor {
    pub fn new(
        store: Arc<dyn EventStore>,
        random: Arc<dyn RandomSource>,
        cache: ReportCache,
        config: TrackingConfig,
    ) -> Self {
        Self {
            revenue: RevenueAggregator::new(store.clone()),
            dedup: DedupGate::new(config.clone()),
            store,
            random,
            cache,
            config,
        }
    }

    /// 校验并处理一条上报
    pub async fn track(
        &self,
        campaign_type: CampaignType,
        request: TrackRequest,
        ctx: &RequestContext,
    ) -> Result<TrackOutcome> {
        let now = Utc::now();
        let skew = Duration::seconds(self.config.max_clock_skew_secs as i64);
        let command = request.validate(campaign_type, now, skew)?;
        self.ingest(command, ctx, now).await
    }

    /// 处理已校验的命令
    pub async fn ingest(
        &self,
        command: TrackCommand,
        ctx: &RequestContext,
        now: DateTime<Utc>,
    ) -> Result<TrackOutcome> {
        let campaign = self
            .store
            .find_campaign(command.campaign_type, &command.entity_id)
            .await?
            .filter(|c| c.is_live_at(now))
            .ok_or_else(|| {
                TrackerError::not_found(format!(
                    "{} '{}' not found",
                    command.campaign_type, command.entity_id
                ))
            })?;

        let session_id = resolve_session_id(
            command.session_id.as_deref(),
            &ctx.ip_address,
            &ctx.user_agent,
            command.timestamp,
            self.config.session_bucket_secs,
        );

        match command.event {
            TrackEvent::View => self.track_view(&campaign, &command, ctx, session_id).await,
            TrackEvent::Click => self.track_click(&campaign, &command, ctx, session_id).await,
            TrackEvent::Conversion => {
                self.track_conversion(&campaign, &command, ctx, session_id)
                    .await
            }
            TrackEvent::Engagement => self.track_engagement(&campaign, &command, session_id).await,
        }
    }

    async fn track_view(
        &self,
        campaign: &Campaign,
        command: &TrackCommand,
        ctx: &RequestContext,
        session_id: String,
    ) -> Result<TrackOutcome> {
        let decision = self
            .dedup
            .check(
                self.store.as_ref(),
                campaign.campaign_type,
                &campaign.id,
                &session_id,
                command.timestamp,
            )
            .await?;

        match decision {
            DedupDecision::Duplicate(view) => {
                if command.engagement.is_empty() {
                    debug!(
                        "Duplicate impression for {} / {} ignored",
                        campaign.id, session_id
                    );
                    return Ok(TrackOutcome::DuplicateIgnored);
                }
                self.store
                    .merge_view_engagement(&view.id, &command.engagement)
                    .await?;
                self.cache.invalidate_all();
                Ok(TrackOutcome::EngagementUpdated)
            }
            DedupDecision::Fresh => {
                let event = build_event(campaign, command, ctx, session_id, EventKind::View, 0.0);
                self.store.record_event(&event).await?;
                self.after_write(&campaign.id).await;
                Ok(TrackOutcome::Recorded { event_id: event.id })
            }
        }
    }

    async fn track_click(
        &self,
        campaign: &Campaign,
        command: &TrackCommand,
        ctx: &RequestContext,
        session_id: String,
    ) -> Result<TrackOutcome> {
        let bid = campaign.bid_amount;
        let event = build_event(campaign, command, ctx, session_id, EventKind::Click, bid);
        self.store.record_event(&event).await?;

        if let Err(e) = self
            .revenue
            .record_revenue(&campaign.id, command.timestamp.date_naive(), bid, 1)
            .await
        {
            warn!("Failed to update daily stats for {}: {}", campaign.id, e);
        }
        self.after_write(&campaign.id).await;

        Ok(TrackOutcome::Recorded { event_id: event.id })
    }

    async fn track_conversion(
        &self,
        campaign: &Campaign,
        command: &TrackCommand,
        ctx: &RequestContext,
        session_id: String,
    ) -> Result<TrackOutcome> {
        let value = conversion_value(
            campaign.bid_amount,
            campaign.content_type,
            self.random.as_ref(),
        );
        let mut event = build_event(
            campaign,
            command,
            ctx,
            session_id,
            EventKind::Conversion,
            value,
        );
        event.conversion_value = Some(value);
        self.store.record_event(&event).await?;

        if let Err(e) = self
            .revenue
            .record_conversion(&campaign.id, command.timestamp.date_naive(), value)
            .await
        {
            warn!("Failed to update daily stats for {}: {}", campaign.id, e);
        }
        self.after_write(&campaign.id).await;

        Ok(TrackOutcome::Recorded { event_id: event.id })
    }

    /// 将互动数据合并到窗口内最近的曝光上
    async fn track_engagement(
        &self,
        campaign: &Campaign,
        command: &TrackCommand,
        session_id: String,
    ) -> Result<TrackOutcome> {
        let decision = self
            .dedup
            .check(
                self.store.as_ref(),
                campaign.campaign_type,
                &campaign.id,
                &session_id,
                command.timestamp,
            )
            .await?;

        match decision {
            DedupDecision::Duplicate(view) => {
                self.store
                    .merge_view_engagement(&view.id, &command.engagement)
                    .await?;
                self.cache.invalidate_all();
                Ok(TrackOutcome::EngagementUpdated)
            }
            DedupDecision::Fresh => Ok(TrackOutcome::NoActiveView),
        }
    }

    /// 写入后的下游步骤，失败只记录日志
    async fn after_write(&self, campaign_id: &str) {
        if let Err(e) = self.store.recompute_rates(campaign_id).await {
            warn!("Failed to recompute rates for {}: {}", campaign_id, e);
        }
        self.cache.invalidate_all();
    }

    pub fn revenue(&self) -> &RevenueAggregator {
        &self.revenue
    }
}

fn build_event(
    campaign: &Campaign,
    command: &TrackCommand,
    ctx: &RequestContext,
    session_id: String,
    kind: EventKind,
    revenue: f64,
) -> NewEvent {
    let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());

    NewEvent {
        id: uuid::Uuid::new_v4().to_string(),
        campaign_id: campaign.id.clone(),
        campaign_type: campaign.campaign_type,
        kind,
        session_id,
        ip_address: non_empty(&ctx.ip_address),
        user_agent: non_empty(&ctx.user_agent),
        placement: command.placement,
        recipe_id: command.recipe_id.clone(),
        category: command.category.clone(),
        source: non_empty(&ctx.source),
        engagement: command.engagement,
        conversion_value: None,
        revenue,
        created_at: command.timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{DailyStat, DailyStatDelta, StoredView};
    use crate::tracking::{EngagementFields, FixedRandom, Placement};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Mutex;
    use std::time::Duration as StdDuration;

    #[derive(Default)]
    struct MemoryStore {
        campaigns: Vec<Campaign>,
        events: Mutex<Vec<NewEvent>>,
        deltas: Mutex<Vec<DailyStatDelta>>,
        merged: Mutex<Vec<(String, EngagementFields)>>,
        fail_daily: bool,
    }

    #[async_trait]
    impl EventStore for MemoryStore {
        async fn find_campaign(
            &self,
            campaign_type: CampaignType,
            id: &str,
        ) -> Result<Option<Campaign>> {
            Ok(self
                .campaigns
                .iter()
                .find(|c| c.campaign_type == campaign_type && c.id == id)
                .cloned())
        }

        async fn list_active_campaigns(&self, campaign_type: CampaignType) -> Result<Vec<Campaign>> {
            Ok(self
                .campaigns
                .iter()
                .filter(|c| c.campaign_type == campaign_type && c.is_active)
                .cloned()
                .collect())
        }

        async fn find_recent_view(
            &self,
            campaign_id: &str,
            session_id: &str,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
        ) -> Result<Option<StoredView>> {
            let events = self.events.lock().unwrap();
            Ok(events
                .iter()
                .filter(|e| {
                    e.kind == EventKind::View
                        && e.campaign_id == campaign_id
                        && e.session_id == session_id
                        && e.created_at >= from
                        && e.created_at <= to
                })
                .max_by_key(|e| e.created_at)
                .map(|e| StoredView {
                    id: e.id.clone(),
                    created_at: e.created_at,
                    engagement: e.engagement,
                }))
        }

        async fn merge_view_engagement(&self, view_id: &str, fields: &EngagementFields) -> Result<()> {
            self.merged
                .lock()
                .unwrap()
                .push((view_id.to_string(), *fields));
            Ok(())
        }

        async fn record_event(&self, event: &NewEvent) -> Result<()> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }

        async fn recompute_rates(&self, _campaign_id: &str) -> Result<()> {
            Ok(())
        }

        async fn upsert_daily_stats(&self, delta: &DailyStatDelta) -> Result<()> {
            if self.fail_daily {
                return Err(TrackerError::database_operation("daily table locked"));
            }
            self.deltas.lock().unwrap().push(delta.clone());
            Ok(())
        }

        async fn rebuild_daily_stats(&self, _day: NaiveDate) -> Result<usize> {
            Ok(0)
        }

        async fn get_daily_stats(
            &self,
            _campaign_id: &str,
            _day: NaiveDate,
        ) -> Result<Option<DailyStat>> {
            Ok(None)
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }
    }

    fn store(fail_daily: bool) -> Arc<MemoryStore> {
        let mut sponsored = Campaign::new(
            "sc-1",
            CampaignType::SponsoredContent,
            "Pan review",
            vec![Placement::Content],
            1.0,
        );
        sponsored.sponsor_name = Some("Acme".to_string());
        let mut paused = Campaign::new("ad-2", CampaignType::Ad, "Paused", vec![Placement::Banner], 1.0);
        paused.is_active = false;
        Arc::new(MemoryStore {
            campaigns: vec![
                Campaign::new("ad-1", CampaignType::Ad, "Sidebar ad", vec![Placement::Sidebar], 0.5),
                paused,
                sponsored,
            ],
            fail_daily,
            ..Default::default()
        })
    }

    fn ingestor(store: Arc<MemoryStore>) -> EventIngestor {
        EventIngestor::new(
            store,
            Arc::new(FixedRandom {
                index: 0,
                fraction: 0.5,
            }),
            ReportCache::new(StdDuration::from_secs(30), 100),
            TrackingConfig::default(),
        )
    }

    fn ctx() -> RequestContext {
        RequestContext {
            ip_address: "203.0.113.7".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            source: "direct".to_string(),
        }
    }

    fn request(entity: &str, event: &str, ts: DateTime<Utc>) -> TrackRequest {
        TrackRequest {
            entity_id: Some(entity.to_string()),
            event: Some(event.to_string()),
            placement: Some("SIDEBAR".to_string()),
            session_id: Some("sess-1".to_string()),
            timestamp: Some(ts.to_rfc3339()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_duplicate_view_ignored_within_window() {
        let store = store(false);
        let ingestor = ingestor(store.clone());
        let t = Utc::now() - Duration::seconds(30);

        let first = ingestor
            .track(CampaignType::Ad, request("ad-1", "VIEW", t), &ctx())
            .await
            .unwrap();
        assert!(first.event_id().is_some());

        let second = ingestor
            .track(
                CampaignType::Ad,
                request("ad-1", "IMPRESSION", t + Duration::seconds(10)),
                &ctx(),
            )
            .await
            .unwrap();
        assert_eq!(second, TrackOutcome::DuplicateIgnored);
        assert_eq!(store.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_view_after_window_is_recorded() {
        let store = store(false);
        let ingestor = ingestor(store.clone());
        let t = Utc::now() - Duration::minutes(5);

        ingestor
            .track(CampaignType::Ad, request("ad-1", "VIEW", t), &ctx())
            .await
            .unwrap();
        let later = t + Duration::seconds(60) + Duration::milliseconds(1);
        let outcome = ingestor
            .track(CampaignType::Ad, request("ad-1", "VIEW", later), &ctx())
            .await
            .unwrap();
        assert!(matches!(outcome, TrackOutcome::Recorded { .. }));
        assert_eq!(store.events.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_clicks_are_never_deduplicated() {
        let store = store(false);
        let ingestor = ingestor(store.clone());
        let t = Utc::now() - Duration::seconds(5);

        for _ in 0..3 {
            let outcome = ingestor
                .track(CampaignType::Ad, request("ad-1", "CLICK", t), &ctx())
                .await
                .unwrap();
            assert!(outcome.event_id().is_some());
        }
        let events = store.events.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.revenue == 0.5));
        let deltas = store.deltas.lock().unwrap();
        assert_eq!(deltas.len(), 3);
        assert!(deltas.iter().all(|d| d.clicks == 1 && d.conversions == 0));
    }

    #[tokio::test]
    async fn test_daily_failure_does_not_fail_click() {
        let store = store(true);
        let ingestor = ingestor(store.clone());
        let outcome = ingestor
            .track(
                CampaignType::Ad,
                request("ad-1", "CLICK", Utc::now()),
                &ctx(),
            )
            .await
            .unwrap();
        assert!(outcome.event_id().is_some());
        assert_eq!(store.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_conversion_value_uses_random_source() {
        let store = store(false);
        let ingestor = ingestor(store.clone());
        ingestor
            .track(
                CampaignType::Ad,
                request("ad-1", "CONVERSION", Utc::now()),
                &ctx(),
            )
            .await
            .unwrap();
        let events = store.events.lock().unwrap();
        let value = events[0].conversion_value.unwrap();
        // bid 0.5 × 10 × 1.0（中点）
        assert!((value - 5.0).abs() < 1e-9);
        assert_eq!(events[0].revenue, value);
        assert_eq!(store.deltas.lock().unwrap()[0].conversions, 1);
    }

    #[tokio::test]
    async fn test_unknown_and_inactive_entities_are_not_found() {
        let ingestor = ingestor(store(false));
        let err = ingestor
            .track(CampaignType::Ad, request("ad-9", "VIEW", Utc::now()), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::NotFound(_)));

        let err = ingestor
            .track(CampaignType::Ad, request("ad-2", "VIEW", Utc::now()), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::NotFound(_)));

        // 类型不匹配同样视为不存在
        let err = ingestor
            .track(
                CampaignType::AffiliateLink,
                request("ad-1", "VIEW", Utc::now()),
                &ctx(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_validation_happens_before_lookup() {
        let store = store(false);
        let ingestor = ingestor(store.clone());
        let mut req = request("ad-9", "HOVER", Utc::now());
        req.placement = Some("POPUP".to_string());
        let err = ingestor
            .track(CampaignType::Ad, req, &ctx())
            .await
            .unwrap_err();
        assert_eq!(err.field_errors().len(), 2);
        assert!(store.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_engagement_merges_into_recent_view() {
        let store = store(false);
        let ingestor = ingestor(store.clone());
        let t = Utc::now() - Duration::seconds(20);

        let mut view = request("sc-1", "VIEW", t);
        view.placement = Some("CONTENT".to_string());
        ingestor
            .track(CampaignType::SponsoredContent, view, &ctx())
            .await
            .unwrap();

        let mut engagement = request("sc-1", "ENGAGEMENT", t + Duration::seconds(10));
        engagement.placement = Some("CONTENT".to_string());
        engagement.scroll_depth = Some(80.0);
        let outcome = ingestor
            .track(CampaignType::SponsoredContent, engagement, &ctx())
            .await
            .unwrap();
        assert_eq!(outcome, TrackOutcome::EngagementUpdated);

        let merged = store.merged.lock().unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].1.scroll_depth, Some(80.0));
        assert_eq!(store.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_engagement_without_view() {
        let ingestor = ingestor(store(false));
        let mut engagement = request("sc-1", "ENGAGEMENT", Utc::now());
        engagement.placement = Some("CONTENT".to_string());
        engagement.engagement_time = Some(12.0);
        let outcome = ingestor
            .track(CampaignType::SponsoredContent, engagement, &ctx())
            .await
            .unwrap();
        assert_eq!(outcome, TrackOutcome::NoActiveView);
    }
}
