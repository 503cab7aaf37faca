//! 报表与收入看板集成测试（临时 SQLite）

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use sea_orm::{ActiveValue::Set, EntityTrait};
use tempfile::TempDir;

use adtrack::analytics::{AnalyticsService, DateRange, ReportCache, ReportScope, Timeframe};
use adtrack::config::{AnalyticsConfig, RevenueConfig, TrackingConfig};
use adtrack::storage::{Campaign, SeaOrmStorage};
use adtrack::tracking::{
    CampaignType, EventIngestor, FixedRandom, Placement, RequestContext, TrackRequest,
};
use migration::entities::subscription;

struct TestEnv {
    _dir: TempDir,
    storage: Arc<SeaOrmStorage>,
    ingestor: EventIngestor,
    analytics: AnalyticsService,
}

async fn setup() -> TestEnv {
    let dir = TempDir::new().expect("创建临时目录失败");
    let db_url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("analytics.db").display()
    );
    let storage = Arc::new(
        SeaOrmStorage::new(&db_url, "sqlite")
            .await
            .expect("创建存储失败"),
    );

    let mut campaigns = vec![
        Campaign::new("ad-1", CampaignType::Ad, "Knife ad", vec![Placement::Sidebar, Placement::Banner], 0.5),
        Campaign::new("aff-1", CampaignType::AffiliateLink, "Pan link", vec![Placement::Inline], 1.0),
    ];
    for (id, sponsor) in [("sc-1", "Acme"), ("sc-2", "Acme"), ("sc-3", "Other")] {
        let mut c = Campaign::new(id, CampaignType::SponsoredContent, id, vec![Placement::Content], 1.0);
        c.sponsor_name = Some(sponsor.to_string());
        campaigns.push(c);
    }
    for c in &campaigns {
        storage.upsert_campaign(c).await.expect("写入实体失败");
    }

    // 报表缓存在每个测试里独立
    let cache = ReportCache::new(StdDuration::from_secs(30), 100);
    let ingestor = EventIngestor::new(
        storage.clone(),
        Arc::new(FixedRandom {
            index: 0,
            fraction: 0.5,
        }),
        cache.clone(),
        TrackingConfig::default(),
    );
    let analytics = AnalyticsService::new(
        storage.clone(),
        cache,
        AnalyticsConfig::default(),
        RevenueConfig::default(),
    );

    TestEnv {
        _dir: dir,
        storage,
        ingestor,
        analytics,
    }
}

fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

impl TestEnv {
    async fn track(
        &self,
        campaign_type: CampaignType,
        entity: &str,
        event: &str,
        placement: &str,
        session: &str,
        at: DateTime<Utc>,
        source: &str,
    ) {
        let request = TrackRequest {
            entity_id: Some(entity.to_string()),
            event: Some(event.to_string()),
            placement: Some(placement.to_string()),
            session_id: Some(session.to_string()),
            recipe_id: Some("recipe-42".to_string()),
            timestamp: Some(at.to_rfc3339()),
            ..Default::default()
        };
        let ctx = RequestContext {
            ip_address: "198.51.100.4".to_string(),
            user_agent: "test-agent".to_string(),
            source: source.to_string(),
        };
        self.ingestor
            .track(campaign_type, request, &ctx)
            .await
            .expect("上报失败");
    }
}

fn may_range() -> DateRange {
    DateRange::parse(Some("2024-05-01"), Some("2024-05-03"), Utc::now(), 30, 366).unwrap()
}

#[tokio::test]
async fn test_entity_report_summary_series_and_breakdowns() {
    let env = setup().await;
    let t = ts("2024-05-01T12:00:00Z");

    env.track(CampaignType::Ad, "ad-1", "VIEW", "SIDEBAR", "s1", t, "direct").await;
    env.track(CampaignType::Ad, "ad-1", "VIEW", "BANNER", "s2", t + Duration::minutes(1), "newsletter").await;
    env.track(CampaignType::Ad, "ad-1", "VIEW", "SIDEBAR", "s1", t + Duration::hours(2), "direct").await;
    env.track(CampaignType::Ad, "ad-1", "CLICK", "SIDEBAR", "s1", t + Duration::seconds(5), "direct").await;
    env.track(CampaignType::Ad, "ad-1", "CLICK", "SIDEBAR", "s1", t + Duration::seconds(10), "direct").await;
    env.track(CampaignType::Ad, "ad-1", "CONVERSION", "SIDEBAR", "s1", t + Duration::seconds(20), "direct").await;

    let report = env
        .analytics
        .entity_report(CampaignType::Ad, ReportScope::Entity("ad-1".to_string()), may_range())
        .await;

    let s = &report.summary;
    assert_eq!(s.total_impressions, 3);
    assert_eq!(s.unique_impressions, 2);
    assert_eq!(s.total_clicks, 2);
    assert_eq!(s.unique_clicks, 1);
    assert_eq!(s.conversions, 1);
    assert!((s.ctr - 2.0 / 3.0 * 100.0).abs() < 1e-9);
    assert!((s.conversion_rate - 50.0).abs() < 1e-9);
    // 2 × 0.5 + 0.5 × 10 × 1.0
    assert!((s.total_revenue - 6.0).abs() < 1e-6);

    let dates: Vec<&str> = report.time_series.iter().map(|p| p.date.as_str()).collect();
    assert_eq!(dates, vec!["2024-05-01", "2024-05-02", "2024-05-03"]);
    assert_eq!(report.time_series[0].impressions, 3);
    assert_eq!(report.time_series[0].clicks, 2);
    assert_eq!(report.time_series[1].impressions, 0);

    let placements = &report.breakdowns.top_placements;
    assert_eq!(placements[0].key, "SIDEBAR");
    assert_eq!(placements[0].count, 5);
    assert_eq!(placements[1].key, "BANNER");

    let sources = &report.breakdowns.top_sources;
    assert_eq!(sources[0].key, "direct");
    assert_eq!(sources[1].key, "newsletter");

    let hours = &report.breakdowns.top_hours;
    assert_eq!(hours[0].key, "12");
    assert_eq!(hours[0].count, 5);
    assert_eq!(hours[1].key, "14");

    assert_eq!(report.breakdowns.top_recipes[0].key, "recipe-42");
}

#[tokio::test]
async fn test_rates_are_zero_without_traffic() {
    let env = setup().await;
    let report = env
        .analytics
        .entity_report(
            CampaignType::SponsoredContent,
            ReportScope::Entity("sc-1".to_string()),
            may_range(),
        )
        .await;
    assert_eq!(report.summary.ctr, 0.0);
    assert_eq!(report.summary.conversion_rate, 0.0);
    assert_eq!(report.time_series.len(), 3);
    assert!(report.breakdowns.top_placements.is_empty());

    // 有曝光无点击：转化率仍为 0
    env.track(
        CampaignType::Ad,
        "ad-1",
        "VIEW",
        "SIDEBAR",
        "s1",
        ts("2024-05-02T08:00:00Z"),
        "direct",
    )
    .await;
    let report = env
        .analytics
        .entity_report(CampaignType::Ad, ReportScope::Entity("ad-1".to_string()), may_range())
        .await;
    assert_eq!(report.summary.ctr, 0.0);
    assert_eq!(report.summary.conversion_rate, 0.0);
}

#[tokio::test]
async fn test_sponsor_scope_aggregates_all_entities() {
    let env = setup().await;
    let t = ts("2024-05-02T09:30:00Z");
    for (id, session) in [("sc-1", "a"), ("sc-2", "b"), ("sc-3", "c")] {
        env.track(CampaignType::SponsoredContent, id, "VIEW", "CONTENT", session, t, "direct").await;
    }

    let report = env
        .analytics
        .entity_report(
            CampaignType::SponsoredContent,
            ReportScope::Sponsor("Acme".to_string()),
            may_range(),
        )
        .await;
    assert_eq!(report.sponsor_name.as_deref(), Some("Acme"));
    assert_eq!(report.summary.total_impressions, 2);

    let unknown = env
        .analytics
        .entity_report(
            CampaignType::SponsoredContent,
            ReportScope::Sponsor("Nobody".to_string()),
            may_range(),
        )
        .await;
    assert_eq!(unknown.summary.total_impressions, 0);
}

#[tokio::test]
async fn test_ingestion_invalidates_cached_report() {
    let env = setup().await;
    let scope = ReportScope::Entity("ad-1".to_string());
    let before = env
        .analytics
        .entity_report(CampaignType::Ad, scope.clone(), may_range())
        .await;
    assert_eq!(before.summary.total_clicks, 0);

    env.track(CampaignType::Ad, "ad-1", "CLICK", "SIDEBAR", "s1", ts("2024-05-01T10:00:00Z"), "direct").await;

    let after = env
        .analytics
        .entity_report(CampaignType::Ad, scope, may_range())
        .await;
    assert_eq!(after.summary.total_clicks, 1);
}

async fn insert_subscription(
    storage: &SeaOrmStorage,
    id: &str,
    tier: &str,
    status: &str,
    started_at: &str,
    cancelled_at: Option<&str>,
) {
    subscription::Entity::insert(subscription::ActiveModel {
        id: Set(id.to_string()),
        tier: Set(tier.to_string()),
        status: Set(status.to_string()),
        started_at: Set(ts(started_at)),
        cancelled_at: Set(cancelled_at.map(ts)),
    })
    .exec_without_returning(storage.get_db())
    .await
    .expect("写入订阅失败");
}

#[tokio::test]
async fn test_revenue_dashboard_components_and_growth() {
    let env = setup().await;
    let now = ts("2024-05-31T00:00:00Z");

    insert_subscription(&env.storage, "sub-1", "PREMIUM", "ACTIVE", "2024-03-15T00:00:00Z", None).await;
    insert_subscription(&env.storage, "sub-2", "PRO", "CANCELLED", "2024-03-01T00:00:00Z", Some("2024-05-20T00:00:00Z")).await;
    insert_subscription(&env.storage, "sub-3", "FREE", "ACTIVE", "2024-01-01T00:00:00Z", None).await;
    insert_subscription(&env.storage, "sub-4", "PREMIUM", "ACTIVE", "2024-06-10T00:00:00Z", None).await;

    let t = ts("2024-05-10T15:00:00Z");
    env.track(CampaignType::Ad, "ad-1", "CLICK", "SIDEBAR", "s1", t, "direct").await;
    env.track(CampaignType::Ad, "ad-1", "CLICK", "SIDEBAR", "s2", t, "direct").await;
    // 广告转化不计入广告收入
    env.track(CampaignType::Ad, "ad-1", "CONVERSION", "SIDEBAR", "s1", t, "direct").await;
    env.track(CampaignType::AffiliateLink, "aff-1", "CONVERSION", "INLINE", "s1", t, "direct").await;
    // 联盟点击不计入联盟收入
    env.track(CampaignType::AffiliateLink, "aff-1", "CLICK", "INLINE", "s1", t, "direct").await;

    let dashboard = env.analytics.revenue_dashboard_at(Timeframe::Days30, now).await;

    assert!((dashboard.current.ad - 1.0).abs() < 1e-9);
    // 1.0 × 10 × 1.0
    assert!((dashboard.current.affiliate - 10.0).abs() < 1e-9);
    assert!((dashboard.current.subscription - 9.99).abs() < 1e-6);
    assert!((dashboard.current.total - 20.99).abs() < 1e-6);

    // 上一周期截止 05-01：PREMIUM + PRO
    assert!((dashboard.previous.subscription - 29.98).abs() < 1e-6);
    assert_eq!(dashboard.previous.ad, 0.0);

    // 上一周期为 0 时增长率为 0
    assert_eq!(dashboard.growth.ad, 0.0);
    assert_eq!(dashboard.growth.affiliate, 0.0);
    let expected = (20.99 - 29.98) / 29.98 * 100.0;
    assert!((dashboard.growth.total - expected).abs() < 1e-6);
    assert_eq!(dashboard.timeframe, "30d");
}

#[tokio::test]
async fn test_revenue_dashboard_empty_store() {
    let env = setup().await;
    let dashboard = env
        .analytics
        .revenue_dashboard_at(Timeframe::Days7, ts("2024-05-31T00:00:00Z"))
        .await;
    assert_eq!(dashboard.current.total, 0.0);
    assert_eq!(dashboard.growth.total, 0.0);
    assert!(dashboard.growth.total.is_finite());
}

#[tokio::test]
async fn test_event_on_period_boundary_counted_once() {
    let env = setup().await;
    let now = ts("2024-05-31T00:00:00Z");
    // 恰好落在 now − 30d：属于当前周期，不属于上一周期
    env.track(CampaignType::Ad, "ad-1", "CLICK", "SIDEBAR", "s1", ts("2024-05-01T00:00:00Z"), "direct").await;

    let dashboard = env.analytics.revenue_dashboard_at(Timeframe::Days30, now).await;
    assert!((dashboard.current.ad - 0.5).abs() < 1e-9);
    assert_eq!(dashboard.previous.ad, 0.0);
}
