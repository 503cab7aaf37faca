//! Analytics service layer
//!
//! 在仓储层的聚合结果之上补零、排序、截断并计算比率，
//! 结果写入报表缓存。仓储查询失败时记录日志并返回零值结构。

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};

use super::cache::{ReportCache, ReportKey};
use super::models::{
    BreakdownDimension, BreakdownEntry, Breakdowns, DailyCount, DateRange, EntityReport,
    ReportScope, RevenueBreakdown, RevenueDashboard, RevenueGrowth, Summary, TimeSeriesPoint,
    Timeframe,
};
use crate::config::{AnalyticsConfig, RevenueConfig};
use crate::errors::Result;
use crate::storage::AnalyticsRepository;
use crate::tracking::{CampaignType, EventKind};

pub struct AnalyticsService {
    repo: Arc<dyn AnalyticsRepository>,
    cache: ReportCache,
    analytics: AnalyticsConfig,
    revenue: RevenueConfig,
}

impl AnalyticsService {
    pub fn new(
        repo: Arc<dyn AnalyticsRepository>,
        cache: ReportCache,
        analytics: AnalyticsConfig,
        revenue: RevenueConfig,
    ) -> Self {
        Self {
            repo,
            cache,
            analytics,
            revenue,
        }
    }

    /// 解析查询参数中的日期范围
    pub fn parse_range(&self, start_date: Option<&str>, end_date: Option<&str>) -> Result<DateRange> {
        DateRange::parse(
            start_date,
            end_date,
            Utc::now(),
            self.analytics.default_range_days,
            self.analytics.max_range_days,
        )
    }

    /// 实体 / 赞助商报表
    pub async fn entity_report(
        &self,
        campaign_type: CampaignType,
        scope: ReportScope,
        range: DateRange,
    ) -> EntityReport {
        let key = ReportKey {
            campaign_type,
            scope: scope.clone(),
            range,
        };
        if let Some(report) = self.cache.get_report(&key).await {
            debug!("Report cache hit: {:?}", key.scope);
            return report;
        }

        let limit = self.analytics.breakdown_limit;
        let repo = self.repo.as_ref();
        let (summary, series, placements, recipes, sources, hours) = tokio::join!(
            repo.get_summary(campaign_type, &scope, &range),
            repo.get_daily_series(campaign_type, &scope, &range),
            repo.get_top_breakdown(
                campaign_type,
                &scope,
                &range,
                BreakdownDimension::Placement,
                limit
            ),
            repo.get_top_breakdown(
                campaign_type,
                &scope,
                &range,
                BreakdownDimension::Recipe,
                limit
            ),
            repo.get_top_breakdown(
                campaign_type,
                &scope,
                &range,
                BreakdownDimension::Source,
                limit
            ),
            repo.get_top_breakdown(
                campaign_type,
                &scope,
                &range,
                BreakdownDimension::HourOfDay,
                limit
            ),
        );

        let mut degraded = false;
        let summary: Summary = or_zeroed(summary, "summary", &mut degraded).into();
        let time_series = zero_fill(&range, &or_zeroed(series, "daily series", &mut degraded));
        let breakdowns = Breakdowns {
            top_placements: rank_breakdown(
                or_zeroed(placements, "placement breakdown", &mut degraded),
                limit,
            ),
            top_recipes: rank_breakdown(
                or_zeroed(recipes, "recipe breakdown", &mut degraded),
                limit,
            ),
            top_sources: rank_breakdown(
                or_zeroed(sources, "source breakdown", &mut degraded),
                limit,
            ),
            top_hours: rank_breakdown(or_zeroed(hours, "hour breakdown", &mut degraded), limit),
        };

        let (entity_id, sponsor_name) = match scope {
            ReportScope::Entity(id) => (Some(id), None),
            ReportScope::Sponsor(name) => (None, Some(name)),
        };
        let report = EntityReport {
            entity_id,
            sponsor_name,
            start_date: range.start.to_rfc3339(),
            end_date: range.end.to_rfc3339(),
            summary,
            time_series,
            breakdowns,
        };

        // 零值兜底的结果不缓存
        if degraded {
            warn!("Report for {:?} served with zeroed parts, not cached", key.scope);
        } else {
            self.cache.put_report(key, report.clone()).await;
        }
        report
    }

    /// 调用方角色是否允许查看收入看板
    pub fn is_privileged(&self, role: &str) -> bool {
        self.revenue
            .privileged_roles
            .iter()
            .any(|r| r.eq_ignore_ascii_case(role.trim()))
    }

    /// 收入看板（当前周期与前一等长周期对比）
    pub async fn revenue_dashboard(&self, timeframe: Timeframe) -> RevenueDashboard {
        if let Some(dashboard) = self.cache.get_revenue(timeframe).await {
            return dashboard;
        }
        let (dashboard, degraded) = self.build_dashboard(timeframe, Utc::now()).await;
        if degraded {
            warn!("Revenue dashboard {} served with zeroed parts, not cached", timeframe.as_str());
        } else {
            self.cache.put_revenue(timeframe, dashboard.clone()).await;
        }
        dashboard
    }

    pub async fn revenue_dashboard_at(
        &self,
        timeframe: Timeframe,
        now: DateTime<Utc>,
    ) -> RevenueDashboard {
        self.build_dashboard(timeframe, now).await.0
    }

    /// 返回看板以及是否有查询失败被零值替代
    async fn build_dashboard(
        &self,
        timeframe: Timeframe,
        now: DateTime<Utc>,
    ) -> (RevenueDashboard, bool) {
        let current_range = DateRange::last_days(now, timeframe.days());
        let previous_range = current_range.previous();

        let ((current, current_degraded), (previous, previous_degraded)) = tokio::join!(
            self.revenue_breakdown(&current_range),
            self.revenue_breakdown(&previous_range)
        );

        let dashboard = RevenueDashboard {
            timeframe: timeframe.as_str().to_string(),
            period_start: current_range.start.to_rfc3339(),
            period_end: current_range.end.to_rfc3339(),
            growth: RevenueGrowth::between(&current, &previous),
            current,
            previous,
        };
        (dashboard, current_degraded || previous_degraded)
    }

    async fn revenue_breakdown(&self, range: &DateRange) -> (RevenueBreakdown, bool) {
        let repo = self.repo.as_ref();
        let (tiers, affiliate, ad) = tokio::join!(
            repo.subscription_tier_counts(range.end),
            repo.sum_event_revenue(CampaignType::AffiliateLink, EventKind::Conversion, range),
            repo.sum_event_revenue(CampaignType::Ad, EventKind::Click, range),
        );

        let mut degraded = false;
        let subscription = subscription_revenue(
            &or_zeroed(tiers, "subscription tiers", &mut degraded),
            &self.revenue.tier_prices,
            range,
        );
        let breakdown = RevenueBreakdown::new(
            subscription,
            or_zeroed(affiliate, "affiliate revenue", &mut degraded),
            or_zeroed(ad, "ad revenue", &mut degraded),
        );
        (breakdown, degraded)
    }
}

/// 仓储查询失败时记录日志并返回零值，同时置位 `degraded`
fn or_zeroed<T: Default>(result: Result<T>, what: &str, degraded: &mut bool) -> T {
    result.unwrap_or_else(|e| {
        error!("Analytics query failed ({}): {}", what, e);
        *degraded = true;
        T::default()
    })
}

/// 订阅收入：各档位有效订阅数 × 月费 × 天数 / 30
pub fn subscription_revenue(
    tier_counts: &[(String, u64)],
    prices: &BTreeMap<String, f64>,
    range: &DateRange,
) -> f64 {
    let months = range.len_days() / 30.0;
    tier_counts
        .iter()
        .map(|(tier, count)| match prices.get(tier) {
            Some(price) => *count as f64 * price * months,
            None => {
                warn!("No price configured for subscription tier '{}'", tier);
                0.0
            }
        })
        .sum()
}

/// 按天补零，范围内每天一个点
pub fn zero_fill(range: &DateRange, counts: &[DailyCount]) -> Vec<TimeSeriesPoint> {
    let by_day: HashMap<_, _> = counts.iter().map(|c| (c.day, c)).collect();
    range
        .days()
        .into_iter()
        .map(|day| {
            let (impressions, clicks) = by_day
                .get(&day)
                .map(|c| (c.impressions, c.clicks))
                .unwrap_or((0, 0));
            TimeSeriesPoint {
                date: day.format("%Y-%m-%d").to_string(),
                impressions,
                clicks,
            }
        })
        .collect()
}

/// 计数降序、键升序，截断到 `limit`
pub fn rank_breakdown(mut entries: Vec<BreakdownEntry>, limit: usize) -> Vec<BreakdownEntry> {
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    entries.truncate(limit);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TrackerError;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct MockRepo {
        fail: AtomicBool,
        summary_calls: AtomicUsize,
        tiers: Vec<(String, u64)>,
        affiliate: f64,
        ad: f64,
    }

    #[async_trait]
    impl AnalyticsRepository for MockRepo {
        async fn get_summary(
            &self,
            _campaign_type: CampaignType,
            _scope: &ReportScope,
            _range: &DateRange,
        ) -> Result<crate::analytics::models::SummaryCounts> {
            self.summary_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(TrackerError::database_operation("down"));
            }
            Ok(crate::analytics::models::SummaryCounts {
                impressions: 200,
                unique_impressions: 150,
                clicks: 10,
                unique_clicks: 8,
                conversions: 2,
                revenue: 12.5,
            })
        }

        async fn get_daily_series(
            &self,
            _campaign_type: CampaignType,
            _scope: &ReportScope,
            _range: &DateRange,
        ) -> Result<Vec<DailyCount>> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(TrackerError::database_operation("down"));
            }
            Ok(vec![DailyCount {
                day: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
                impressions: 7,
                clicks: 1,
            }])
        }

        async fn get_top_breakdown(
            &self,
            _campaign_type: CampaignType,
            _scope: &ReportScope,
            _range: &DateRange,
            _dimension: BreakdownDimension,
            _limit: usize,
        ) -> Result<Vec<BreakdownEntry>> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(TrackerError::database_operation("down"));
            }
            Ok(vec![
                entry("sidebar", 3),
                entry("banner", 5),
                entry("footer", 3),
            ])
        }

        async fn sum_event_revenue(
            &self,
            campaign_type: CampaignType,
            _kind: EventKind,
            _range: &DateRange,
        ) -> Result<f64> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(TrackerError::database_operation("down"));
            }
            Ok(match campaign_type {
                CampaignType::AffiliateLink => self.affiliate,
                _ => self.ad,
            })
        }

        async fn subscription_tier_counts(&self, _at: DateTime<Utc>) -> Result<Vec<(String, u64)>> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(TrackerError::database_operation("down"));
            }
            Ok(self.tiers.clone())
        }
    }

    fn entry(key: &str, count: u64) -> BreakdownEntry {
        BreakdownEntry {
            key: key.to_string(),
            count,
        }
    }

    fn service(repo: Arc<MockRepo>) -> AnalyticsService {
        AnalyticsService::new(
            repo,
            ReportCache::new(Duration::from_secs(30), 100),
            AnalyticsConfig {
                breakdown_limit: 2,
                ..Default::default()
            },
            RevenueConfig::default(),
        )
    }

    fn range() -> DateRange {
        DateRange::parse(
            Some("2024-05-01"),
            Some("2024-05-03"),
            Utc::now(),
            30,
            366,
        )
        .unwrap()
    }

    #[test]
    fn test_zero_fill_covers_every_day() {
        let counts = vec![DailyCount {
            day: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            impressions: 4,
            clicks: 2,
        }];
        let points = zero_fill(&range(), &counts);
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].date, "2024-05-01");
        assert_eq!(points[0].impressions, 0);
        assert_eq!(points[1].impressions, 4);
        assert_eq!(points[2].clicks, 0);
    }

    #[test]
    fn test_rank_breakdown_orders_and_truncates() {
        let ranked = rank_breakdown(
            vec![entry("b", 3), entry("c", 9), entry("a", 3), entry("d", 1)],
            3,
        );
        let keys: Vec<&str> = ranked.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_subscription_revenue_prorates_by_days() {
        let mut prices = BTreeMap::new();
        prices.insert("PREMIUM".to_string(), 10.0);
        prices.insert("FREE".to_string(), 0.0);
        let now = Utc::now();
        let thirty = DateRange::last_days(now, 30);
        let tiers = vec![
            ("PREMIUM".to_string(), 3),
            ("FREE".to_string(), 50),
            ("LEGACY".to_string(), 4),
        ];
        let revenue = subscription_revenue(&tiers, &prices, &thirty);
        assert!((revenue - 30.0).abs() < 1e-9);

        let seven = DateRange::last_days(now, 7);
        let revenue = subscription_revenue(&tiers, &prices, &seven);
        assert!((revenue - 7.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_entity_report_is_cached() {
        let repo = Arc::new(MockRepo::default());
        let svc = service(repo.clone());
        let scope = ReportScope::Entity("ad-1".to_string());

        let report = svc
            .entity_report(CampaignType::Ad, scope.clone(), range())
            .await;
        assert_eq!(report.entity_id.as_deref(), Some("ad-1"));
        assert_eq!(report.summary.total_impressions, 200);
        assert!((report.summary.ctr - 5.0).abs() < 1e-9);
        assert!((report.summary.conversion_rate - 20.0).abs() < 1e-9);
        assert_eq!(report.time_series.len(), 3);
        assert_eq!(report.breakdowns.top_placements.len(), 2);
        assert_eq!(report.breakdowns.top_placements[0].key, "banner");
        assert_eq!(report.breakdowns.top_placements[1].key, "footer");

        svc.entity_report(CampaignType::Ad, scope, range()).await;
        assert_eq!(repo.summary_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_entity_report_zeroed_on_repository_failure() {
        let repo = Arc::new(MockRepo {
            fail: AtomicBool::new(true),
            ..Default::default()
        });
        let svc = service(repo);
        let report = svc
            .entity_report(
                CampaignType::SponsoredContent,
                ReportScope::Sponsor("Acme".to_string()),
                range(),
            )
            .await;
        assert_eq!(report.sponsor_name.as_deref(), Some("Acme"));
        assert_eq!(report.summary, Summary::default());
        assert_eq!(report.time_series.len(), 3);
        assert!(report.time_series.iter().all(|p| p.impressions == 0));
        assert!(report.breakdowns.top_sources.is_empty());
    }

    #[tokio::test]
    async fn test_zeroed_report_not_cached_after_recovery() {
        let repo = Arc::new(MockRepo {
            fail: AtomicBool::new(true),
            ..Default::default()
        });
        let svc = service(repo.clone());
        let scope = ReportScope::Entity("ad-1".to_string());

        let first = svc
            .entity_report(CampaignType::Ad, scope.clone(), range())
            .await;
        assert_eq!(first.summary.total_impressions, 0);

        repo.fail.store(false, Ordering::SeqCst);
        let second = svc
            .entity_report(CampaignType::Ad, scope.clone(), range())
            .await;
        assert_eq!(second.summary.total_impressions, 200);
        assert_eq!(repo.summary_calls.load(Ordering::SeqCst), 2);

        // 恢复后的完整结果照常缓存
        svc.entity_report(CampaignType::Ad, scope, range()).await;
        assert_eq!(repo.summary_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zeroed_dashboard_not_cached_after_recovery() {
        let repo = Arc::new(MockRepo {
            fail: AtomicBool::new(true),
            ad: 10.0,
            ..Default::default()
        });
        let svc = service(repo.clone());

        let first = svc.revenue_dashboard(Timeframe::Days7).await;
        assert_eq!(first.current.total, 0.0);

        repo.fail.store(false, Ordering::SeqCst);
        let second = svc.revenue_dashboard(Timeframe::Days7).await;
        assert!((second.current.ad - 10.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_revenue_dashboard_totals_and_growth() {
        let repo = Arc::new(MockRepo {
            tiers: vec![("PREMIUM".to_string(), 10)],
            affiliate: 40.0,
            ad: 10.0,
            ..Default::default()
        });
        let svc = service(repo);
        let dashboard = svc
            .revenue_dashboard_at(Timeframe::Days30, Utc::now())
            .await;
        let expected_sub = 10.0 * 9.99;
        assert!((dashboard.current.subscription - expected_sub).abs() < 1e-6);
        assert!((dashboard.current.affiliate - 40.0).abs() < 1e-9);
        assert!((dashboard.current.ad - 10.0).abs() < 1e-9);
        assert!((dashboard.current.total - (expected_sub + 50.0)).abs() < 1e-6);
        // mock 对两个周期返回相同数据
        assert_eq!(dashboard.growth.total, 0.0);
        assert_eq!(dashboard.timeframe, "30d");
    }

    #[test]
    fn test_privileged_roles_case_insensitive() {
        let svc = service(Arc::new(MockRepo::default()));
        assert!(svc.is_privileged("ADMIN"));
        assert!(svc.is_privileged("admin"));
        assert!(!svc.is_privileged("USER"));
    }
}
