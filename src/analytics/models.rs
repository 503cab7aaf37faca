//! 分析查询的输入输出类型

use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::errors::{Result, TrackerError};

/// 报表范围：单个实体或某赞助商的全部实体
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReportScope {
    Entity(String),
    Sponsor(String),
}

impl ReportScope {
    /// 由查询参数构造，entityId 优先
    pub fn from_params(entity_id: Option<&str>, sponsor_name: Option<&str>) -> Result<Self> {
        let entity_id = entity_id.map(str::trim).filter(|s| !s.is_empty());
        let sponsor_name = sponsor_name.map(str::trim).filter(|s| !s.is_empty());
        match (entity_id, sponsor_name) {
            (Some(id), _) => Ok(ReportScope::Entity(id.to_string())),
            (None, Some(name)) => Ok(ReportScope::Sponsor(name.to_string())),
            (None, None) => Err(TrackerError::invalid_field(
                "entityId",
                "entityId or sponsorName is required",
            )),
        }
    }
}

/// 闭区间时间范围 `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(TrackerError::invalid_date_range(
                "Start date must not be later than end date",
            ));
        }
        Ok(Self { start, end })
    }

    /// 最近 `days` 天（截止 `now`）
    pub fn last_days(now: DateTime<Utc>, days: i64) -> Self {
        Self {
            start: now - Duration::days(days),
            end: now,
        }
    }

    /// 解析查询参数，支持 RFC3339 和 YYYY-MM-DD
    ///
    /// 纯日期格式的结束日期包含当天全天。两者都缺省时取最近 `default_days` 天。
    pub fn parse(
        start_date: Option<&str>,
        end_date: Option<&str>,
        now: DateTime<Utc>,
        default_days: i64,
        max_days: i64,
    ) -> Result<Self> {
        let start_date = start_date.map(str::trim).filter(|s| !s.is_empty());
        let end_date = end_date.map(str::trim).filter(|s| !s.is_empty());

        let range = match (start_date, end_date) {
            (Some(s), Some(e)) => {
                let start = parse_bound(s, false).ok_or_else(|| {
                    TrackerError::invalid_date_range(format!(
                        "Invalid start date format: '{}'. Supported formats: RFC3339 or YYYY-MM-DD",
                        s
                    ))
                })?;
                let end = parse_bound(e, true).ok_or_else(|| {
                    TrackerError::invalid_date_range(format!(
                        "Invalid end date format: '{}'. Supported formats: RFC3339 or YYYY-MM-DD",
                        e
                    ))
                })?;
                Self::new(start, end)?
            }
            (Some(_), None) => {
                return Err(TrackerError::invalid_date_range(
                    "Start date is provided but end date is missing",
                ));
            }
            (None, Some(_)) => {
                return Err(TrackerError::invalid_date_range(
                    "End date is provided but start date is missing",
                ));
            }
            (None, None) => Self::last_days(now, default_days),
        };

        if range.end - range.start > Duration::days(max_days) {
            return Err(TrackerError::invalid_date_range(format!(
                "Date range must not exceed {} days",
                max_days
            )));
        }
        Ok(range)
    }

    /// 范围内的每个自然日（升序，含首尾）
    pub fn days(&self) -> Vec<NaiveDate> {
        let first = self.start.date_naive();
        let last = self.end.date_naive();
        first.iter_days().take_while(|d| *d <= last).collect()
    }

    /// 紧邻的前一个等长区间
    pub fn previous(&self) -> Self {
        let len = self.end - self.start;
        Self {
            start: self.start - len,
            end: self.start,
        }
    }

    pub fn len_days(&self) -> f64 {
        (self.end - self.start).num_seconds() as f64 / 86_400.0
    }
}

fn parse_bound(s: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
            let time = if end_of_day {
                NaiveTime::from_hms_milli_opt(23, 59, 59, 999)?
            } else {
                NaiveTime::MIN
            };
            Some(date.and_time(time).and_utc())
        })
}

/// 分组维度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BreakdownDimension {
    Placement,
    Recipe,
    Source,
    HourOfDay,
}

/// 仓储层返回的汇总计数
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryCounts {
    pub impressions: u64,
    pub unique_impressions: u64,
    pub clicks: u64,
    pub unique_clicks: u64,
    pub conversions: u64,
    pub revenue: f64,
}

/// 仓储层返回的单日计数（只包含有数据的日期）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyCount {
    pub day: NaiveDate,
    pub impressions: u64,
    pub clicks: u64,
}

/// 汇总指标
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_impressions: u64,
    pub unique_impressions: u64,
    pub total_clicks: u64,
    pub unique_clicks: u64,
    pub conversions: u64,
    pub total_revenue: f64,
    /// 百分比
    pub ctr: f64,
    /// 百分比
    pub conversion_rate: f64,
}

impl From<SummaryCounts> for Summary {
    fn from(c: SummaryCounts) -> Self {
        Self {
            ctr: percentage(c.clicks, c.impressions),
            conversion_rate: percentage(c.conversions, c.clicks),
            total_impressions: c.impressions,
            unique_impressions: c.unique_impressions,
            total_clicks: c.clicks,
            unique_clicks: c.unique_clicks,
            conversions: c.conversions,
            total_revenue: c.revenue,
        }
    }
}

/// `numerator / denominator × 100`，分母为 0 时为 0
pub fn percentage(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64 * 100.0
    }
}

/// 时间序列数据点
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSeriesPoint {
    pub date: String,
    pub impressions: u64,
    pub clicks: u64,
}

/// 分组统计项
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakdownEntry {
    pub key: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakdowns {
    pub top_placements: Vec<BreakdownEntry>,
    pub top_recipes: Vec<BreakdownEntry>,
    pub top_sources: Vec<BreakdownEntry>,
    pub top_hours: Vec<BreakdownEntry>,
}

/// 单实体 / 赞助商报表
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sponsor_name: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub summary: Summary,
    pub time_series: Vec<TimeSeriesPoint>,
    pub breakdowns: Breakdowns,
}

/// 收入看板时间窗口
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Timeframe {
    Days7,
    #[default]
    Days30,
    Days90,
}

impl Timeframe {
    pub fn days(&self) -> i64 {
        match self {
            Timeframe::Days7 => 7,
            Timeframe::Days30 => 30,
            Timeframe::Days90 => 90,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Days7 => "7d",
            Timeframe::Days30 => "30d",
            Timeframe::Days90 => "90d",
        }
    }
}

impl FromStr for Timeframe {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "7d" => Ok(Timeframe::Days7),
            "30d" => Ok(Timeframe::Days30),
            "90d" => Ok(Timeframe::Days90),
            other => Err(TrackerError::invalid_field(
                "timeframe",
                format!("unsupported timeframe '{}', expected 7d, 30d or 90d", other),
            )),
        }
    }
}

/// 收入构成
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueBreakdown {
    pub subscription: f64,
    pub affiliate: f64,
    pub ad: f64,
    pub total: f64,
}

impl RevenueBreakdown {
    pub fn new(subscription: f64, affiliate: f64, ad: f64) -> Self {
        Self {
            subscription,
            affiliate,
            ad,
            total: subscription + affiliate + ad,
        }
    }
}

/// 环比增长率（百分比）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueGrowth {
    pub subscription: f64,
    pub affiliate: f64,
    pub ad: f64,
    pub total: f64,
}

impl RevenueGrowth {
    pub fn between(current: &RevenueBreakdown, previous: &RevenueBreakdown) -> Self {
        Self {
            subscription: growth_rate(current.subscription, previous.subscription),
            affiliate: growth_rate(current.affiliate, previous.affiliate),
            ad: growth_rate(current.ad, previous.ad),
            total: growth_rate(current.total, previous.total),
        }
    }
}

/// `(current − previous) / previous × 100`，previous 为 0 时为 0
pub fn growth_rate(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        (current - previous) / previous * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueDashboard {
    pub timeframe: String,
    pub period_start: String,
    pub period_end: String,
    pub current: RevenueBreakdown,
    pub previous: RevenueBreakdown,
    pub growth: RevenueGrowth,
}
