//! AnalyticsRepository implementation for SeaOrmStorage
//!
//! 所有聚合都在数据库侧完成，只返回汇总行。

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ColumnTrait, Condition, DatabaseBackend, EntityTrait, FromQueryResult, QueryFilter,
    QueryOrder, QuerySelect, sea_query::Expr,
};

use super::SeaOrmStorage;
use super::retry;
use crate::analytics::models::{
    BreakdownDimension, BreakdownEntry, DailyCount, DateRange, ReportScope, SummaryCounts,
};
use crate::errors::Result;
use crate::storage::AnalyticsRepository;
use crate::tracking::{CampaignType, EventKind};

use migration::entities::{campaign, campaign_event, subscription};

// ============ 查询结果类型 ============

#[derive(Debug, FromQueryResult)]
struct SummaryRow {
    impressions: i64,
    unique_impressions: i64,
    clicks: i64,
    unique_clicks: i64,
    conversions: i64,
    revenue: Option<f64>,
}

#[derive(Debug, FromQueryResult)]
struct DayRow {
    label: String,
    impressions: i64,
    clicks: i64,
}

#[derive(Debug, FromQueryResult)]
struct LabelCountRow {
    label: Option<String>,
    count: i64,
}

#[derive(Debug, FromQueryResult)]
struct RevenueRow {
    revenue: Option<f64>,
}

#[derive(Debug, FromQueryResult)]
struct TierRow {
    tier: String,
    count: i64,
}

/// 根据数据库类型生成 created_at 的格式化表达式
///
/// `fmt` 为 (sqlite/mysql, postgres) 两种写法
fn created_at_format_expr(backend: DatabaseBackend, fmt: (&str, &str)) -> Expr {
    match backend {
        DatabaseBackend::Sqlite => Expr::cust(format!("strftime('{}', created_at)", fmt.0)),
        DatabaseBackend::MySql => Expr::cust(format!("DATE_FORMAT(created_at, '{}')", fmt.0)),
        _ => Expr::cust(format!("TO_CHAR(created_at, '{}')", fmt.1)),
    }
}

const DAY_FORMAT: (&str, &str) = ("%Y-%m-%d", "YYYY-MM-DD");
const HOUR_FORMAT: (&str, &str) = ("%H", "HH24");

fn to_u64(v: i64) -> u64 {
    v.max(0) as u64
}

impl SeaOrmStorage {
    /// 报表范围对应的过滤条件
    ///
    /// 赞助商下没有任何实体时返回 `None`，调用方直接返回零值。
    async fn scope_condition(
        &self,
        campaign_type: CampaignType,
        scope: &ReportScope,
        range: &DateRange,
    ) -> Result<Option<Condition>> {
        let base = Condition::all()
            .add(campaign_event::Column::CampaignType.eq(campaign_type.to_string()))
            .add(campaign_event::Column::CreatedAt.gte(range.start))
            .add(campaign_event::Column::CreatedAt.lte(range.end));

        match scope {
            ReportScope::Entity(id) => {
                Ok(Some(base.add(campaign_event::Column::CampaignId.eq(id.as_str()))))
            }
            ReportScope::Sponsor(name) => {
                let db = &self.db;
                let name = name.as_str();
                let ids: Vec<String> =
                    retry::with_retry("sponsor_campaign_ids", self.retry_config, || async move {
                        campaign::Entity::find()
                            .select_only()
                            .column(campaign::Column::Id)
                            .filter(campaign::Column::SponsorName.eq(name))
                            .filter(campaign::Column::CampaignType.eq(campaign_type.to_string()))
                            .into_tuple::<String>()
                            .all(db)
                            .await
                    })
                    .await?;

                if ids.is_empty() {
                    return Ok(None);
                }
                Ok(Some(base.add(campaign_event::Column::CampaignId.is_in(ids))))
            }
        }
    }
}

#[async_trait]
impl AnalyticsRepository for SeaOrmStorage {
    async fn get_summary(
        &self,
        campaign_type: CampaignType,
        scope: &ReportScope,
        range: &DateRange,
    ) -> Result<SummaryCounts> {
        let Some(cond) = self.scope_condition(campaign_type, scope, range).await? else {
            return Ok(SummaryCounts::default());
        };

        let db = &self.db;
        let cond = &cond;
        let row = retry::with_retry("analytics_summary", self.retry_config, || async move {
            campaign_event::Entity::find()
                .select_only()
                .column_as(
                    Expr::cust("COUNT(CASE WHEN event_kind = 'VIEW' THEN 1 END)"),
                    "impressions",
                )
                .column_as(
                    Expr::cust("COUNT(DISTINCT CASE WHEN event_kind = 'VIEW' THEN session_id END)"),
                    "unique_impressions",
                )
                .column_as(
                    Expr::cust("COUNT(CASE WHEN event_kind = 'CLICK' THEN 1 END)"),
                    "clicks",
                )
                .column_as(
                    Expr::cust(
                        "COUNT(DISTINCT CASE WHEN event_kind = 'CLICK' THEN session_id END)",
                    ),
                    "unique_clicks",
                )
                .column_as(
                    Expr::cust("COUNT(CASE WHEN event_kind = 'CONVERSION' THEN 1 END)"),
                    "conversions",
                )
                .column_as(Expr::cust("SUM(revenue)"), "revenue")
                .filter(cond.clone())
                .into_model::<SummaryRow>()
                .one(db)
                .await
        })
        .await?;

        Ok(row
            .map(|r| SummaryCounts {
                impressions: to_u64(r.impressions),
                unique_impressions: to_u64(r.unique_impressions),
                clicks: to_u64(r.clicks),
                unique_clicks: to_u64(r.unique_clicks),
                conversions: to_u64(r.conversions),
                revenue: r.revenue.unwrap_or(0.0),
            })
            .unwrap_or_default())
    }

    async fn get_daily_series(
        &self,
        campaign_type: CampaignType,
        scope: &ReportScope,
        range: &DateRange,
    ) -> Result<Vec<DailyCount>> {
        let Some(cond) = self.scope_condition(campaign_type, scope, range).await? else {
            return Ok(Vec::new());
        };

        let db = &self.db;
        let cond = &cond;
        let date_expr = created_at_format_expr(self.db_backend(), DAY_FORMAT);
        let date_expr = &date_expr;
        let rows = retry::with_retry("analytics_daily_series", self.retry_config, || async move {
            campaign_event::Entity::find()
                .select_only()
                .column_as(date_expr.clone(), "label")
                .column_as(
                    Expr::cust("COUNT(CASE WHEN event_kind = 'VIEW' THEN 1 END)"),
                    "impressions",
                )
                .column_as(
                    Expr::cust("COUNT(CASE WHEN event_kind = 'CLICK' THEN 1 END)"),
                    "clicks",
                )
                .filter(cond.clone())
                .group_by(date_expr.clone())
                .order_by_asc(Expr::cust("label"))
                .into_model::<DayRow>()
                .all(db)
                .await
        })
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|r| {
                let day = NaiveDate::parse_from_str(&r.label, "%Y-%m-%d").ok()?;
                Some(DailyCount {
                    day,
                    impressions: to_u64(r.impressions),
                    clicks: to_u64(r.clicks),
                })
            })
            .collect())
    }

    async fn get_top_breakdown(
        &self,
        campaign_type: CampaignType,
        scope: &ReportScope,
        range: &DateRange,
        dimension: BreakdownDimension,
        limit: usize,
    ) -> Result<Vec<BreakdownEntry>> {
        let Some(cond) = self.scope_condition(campaign_type, scope, range).await? else {
            return Ok(Vec::new());
        };

        let (label_expr, cond) = match dimension {
            BreakdownDimension::Placement => {
                (Expr::col(campaign_event::Column::Placement), cond)
            }
            BreakdownDimension::Recipe => (
                Expr::col(campaign_event::Column::RecipeId),
                cond.add(campaign_event::Column::RecipeId.is_not_null()),
            ),
            BreakdownDimension::Source => (
                Expr::col(campaign_event::Column::Source),
                cond.add(campaign_event::Column::Source.is_not_null()),
            ),
            BreakdownDimension::HourOfDay => {
                (created_at_format_expr(self.db_backend(), HOUR_FORMAT), cond)
            }
        };

        let db = &self.db;
        let cond = &cond;
        let label_expr = &label_expr;
        let rows = retry::with_retry("analytics_breakdown", self.retry_config, || async move {
            campaign_event::Entity::find()
                .select_only()
                .column_as(label_expr.clone(), "label")
                .column_as(campaign_event::Column::Id.count(), "count")
                .filter(cond.clone())
                .group_by(label_expr.clone())
                .order_by_desc(Expr::cust("count"))
                .order_by_asc(Expr::cust("label"))
                .limit(limit as u64)
                .into_model::<LabelCountRow>()
                .all(db)
                .await
        })
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|r| {
                r.label.map(|key| BreakdownEntry {
                    key,
                    count: to_u64(r.count),
                })
            })
            .collect())
    }

    async fn sum_event_revenue(
        &self,
        campaign_type: CampaignType,
        kind: EventKind,
        range: &DateRange,
    ) -> Result<f64> {
        let db = &self.db;
        let row = retry::with_retry("analytics_event_revenue", self.retry_config, || async move {
            campaign_event::Entity::find()
                .select_only()
                .column_as(Expr::cust("SUM(revenue)"), "revenue")
                .filter(campaign_event::Column::CampaignType.eq(campaign_type.to_string()))
                .filter(campaign_event::Column::EventKind.eq(kind.to_string()))
                .filter(campaign_event::Column::CreatedAt.gte(range.start))
                .filter(campaign_event::Column::CreatedAt.lt(range.end))
                .into_model::<RevenueRow>()
                .one(db)
                .await
        })
        .await?;

        Ok(row.and_then(|r| r.revenue).unwrap_or(0.0))
    }

    async fn subscription_tier_counts(&self, at: DateTime<Utc>) -> Result<Vec<(String, u64)>> {
        let db = &self.db;
        let rows = retry::with_retry("subscription_tier_counts", self.retry_config, || async move {
            subscription::Entity::find()
                .select_only()
                .column(subscription::Column::Tier)
                .column_as(subscription::Column::Id.count(), "count")
                .filter(subscription::Column::StartedAt.lte(at))
                .filter(
                    Condition::any()
                        .add(
                            Condition::all()
                                .add(subscription::Column::CancelledAt.is_null())
                                .add(subscription::Column::Status.eq("ACTIVE")),
                        )
                        .add(subscription::Column::CancelledAt.gt(at)),
                )
                .group_by(subscription::Column::Tier)
                .order_by_asc(subscription::Column::Tier)
                .into_model::<TierRow>()
                .all(db)
                .await
        })
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| (r.tier, to_u64(r.count)))
            .collect())
    }
}
