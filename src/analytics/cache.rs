//! 报表缓存
//!
//! 进程内缓存，多实例之间不保证一致。任何事件写入都会清空全部报表。

use std::time::Duration;

use moka::future::Cache;

use super::models::{DateRange, EntityReport, ReportScope, RevenueDashboard, Timeframe};
use crate::tracking::CampaignType;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReportKey {
    pub campaign_type: CampaignType,
    pub scope: ReportScope,
    pub range: DateRange,
}

#[derive(Clone)]
pub struct ReportCache {
    reports: Cache<ReportKey, EntityReport>,
    revenue: Cache<Timeframe, RevenueDashboard>,
}

impl ReportCache {
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        Self {
            reports: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(capacity)
                .build(),
            revenue: Cache::builder().time_to_live(ttl).max_capacity(8).build(),
        }
    }

    pub async fn get_report(&self, key: &ReportKey) -> Option<EntityReport> {
        self.reports.get(key).await
    }

    pub async fn put_report(&self, key: ReportKey, report: EntityReport) {
        self.reports.insert(key, report).await;
    }

    pub async fn get_revenue(&self, timeframe: Timeframe) -> Option<RevenueDashboard> {
        self.revenue.get(&timeframe).await
    }

    pub async fn put_revenue(&self, timeframe: Timeframe, dashboard: RevenueDashboard) {
        self.revenue.insert(timeframe, dashboard).await;
    }

    /// 清空全部报表
    pub fn invalidate_all(&self) {
        self.reports.invalidate_all();
        self.revenue.invalidate_all();
    }
}
