//! 存储层
//!
//! 业务代码只依赖 [`EventStore`] 与 [`AnalyticsRepository`] 两个接口，
//! [`SeaOrmStorage`] 是基于 SeaORM 的实现（SQLite / MySQL / PostgreSQL）。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::analytics::models::{
    BreakdownDimension, BreakdownEntry, DailyCount, DateRange, ReportScope, SummaryCounts,
};
use crate::errors::Result;
use crate::tracking::{CampaignType, EngagementFields, EventKind};

pub mod backend;
pub mod models;

pub use backend::SeaOrmStorage;
pub use models::{Campaign, DailyStat, DailyStatDelta, NewEvent, StoredView};

/// 事件写入与实体读取
#[async_trait]
pub trait EventStore: Send + Sync {
    /// 按类型和 id 查找实体
    async fn find_campaign(&self, campaign_type: CampaignType, id: &str)
    -> Result<Option<Campaign>>;

    /// 某类型下所有 `is_active` 的实体（排期窗口由调用方判断）
    async fn list_active_campaigns(&self, campaign_type: CampaignType) -> Result<Vec<Campaign>>;

    /// `[from, to]` 内该会话最近的一条 VIEW
    async fn find_recent_view(
        &self,
        campaign_id: &str,
        session_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Option<StoredView>>;

    /// 将互动字段合并到 VIEW 上（逐字段取较大值，单条 UPDATE）
    async fn merge_view_engagement(&self, view_id: &str, fields: &EngagementFields) -> Result<()>;

    /// 写入事件并原子累加实体计数器（同一事务）
    async fn record_event(&self, event: &NewEvent) -> Result<()>;

    /// 按当前计数器重算 ctr / conversion_rate
    async fn recompute_rates(&self, campaign_id: &str) -> Result<()>;

    /// 天级汇总 insert-or-increment
    async fn upsert_daily_stats(&self, delta: &DailyStatDelta) -> Result<()>;

    /// 从原始事件重建某一天的全部汇总行，返回写入行数
    async fn rebuild_daily_stats(&self, day: NaiveDate) -> Result<usize>;

    async fn get_daily_stats(&self, campaign_id: &str, day: NaiveDate)
    -> Result<Option<DailyStat>>;

    /// 存储连通性检查
    async fn ping(&self) -> Result<()>;
}

/// 分析查询（聚合读）
#[async_trait]
pub trait AnalyticsRepository: Send + Sync {
    async fn get_summary(
        &self,
        campaign_type: CampaignType,
        scope: &ReportScope,
        range: &DateRange,
    ) -> Result<SummaryCounts>;

    /// 只返回有事件的日期，补零由调用方完成
    async fn get_daily_series(
        &self,
        campaign_type: CampaignType,
        scope: &ReportScope,
        range: &DateRange,
    ) -> Result<Vec<DailyCount>>;

    async fn get_top_breakdown(
        &self,
        campaign_type: CampaignType,
        scope: &ReportScope,
        range: &DateRange,
        dimension: BreakdownDimension,
        limit: usize,
    ) -> Result<Vec<BreakdownEntry>>;

    /// 某类型某事件种类在 `[start, end)` 内的收入合计
    ///
    /// 右开区间，相邻周期首尾相接时同一事件只计一次。
    async fn sum_event_revenue(
        &self,
        campaign_type: CampaignType,
        kind: EventKind,
        range: &DateRange,
    ) -> Result<f64>;

    /// `at` 时刻仍有效的订阅数，按档位分组
    async fn subscription_tier_counts(&self, at: DateTime<Utc>) -> Result<Vec<(String, u64)>>;
}

pub struct StorageFactory;

impl StorageFactory {
    pub async fn create() -> Result<Arc<SeaOrmStorage>> {
        let config = crate::config::get_config();
        let database_url = &config.database.database_url;

        // 从 URL 自动推断数据库类型
        let backend_type = backend::infer_backend_from_url(database_url)?;

        let storage = backend::SeaOrmStorage::new(database_url, &backend_type).await?;
        Ok(Arc::new(storage))
    }
}
