//! 报表与收入分析
//!
//! - [`service::AnalyticsService`]: 实体 / 赞助商报表、收入看板
//! - [`revenue::RevenueAggregator`]: 天级收入汇总维护
//! - [`cache::ReportCache`]: 报表结果缓存

pub mod cache;
pub mod models;
pub mod revenue;
pub mod service;

pub use cache::{ReportCache, ReportKey};
pub use models::{
    DateRange, EntityReport, ReportScope, RevenueBreakdown, RevenueDashboard, RevenueGrowth,
    Summary, Timeframe,
};
pub use revenue::RevenueAggregator;
pub use service::AnalyticsService;
