//! 天级收入汇总写入
//!
//! 增量路径使用单条 `INSERT ... ON CONFLICT DO UPDATE SET x = x + excluded.x`，
//! 重建路径在事务内删除当天数据后按原始事件重新写入。

use chrono::{Duration, NaiveDate};
use sea_orm::{
    ColumnTrait, DatabaseBackend, EntityTrait, ExprTrait, FromQueryResult, QueryFilter,
    QuerySelect, TransactionTrait,
    sea_query::{Expr, OnConflict},
};
use tracing::{debug, info};

use super::SeaOrmStorage;
use super::converters::daily_active_model;
use super::retry;
use crate::errors::{Result, TrackerError};
use crate::storage::DailyStatDelta;
use crate::tracking::EventKind;

use migration::entities::{campaign_event, campaign_stats_daily};

#[derive(Debug, FromQueryResult)]
struct DailyTotalsRow {
    campaign_id: String,
    revenue: Option<f64>,
    clicks: i64,
    conversions: i64,
}

/// 累加型冲突处理
///
/// SQLite/PostgreSQL: `x = x + excluded.x`，MySQL: `x = x + VALUES(x)`
fn increment_on_conflict(backend: DatabaseBackend) -> OnConflict {
    let incoming = |column: &str| match backend {
        DatabaseBackend::MySql => Expr::cust(format!("VALUES({})", column)),
        _ => Expr::cust(format!("excluded.{}", column)),
    };

    OnConflict::columns([
        campaign_stats_daily::Column::CampaignId,
        campaign_stats_daily::Column::DayBucket,
    ])
    .value(
        campaign_stats_daily::Column::Revenue,
        Expr::col(campaign_stats_daily::Column::Revenue).add(incoming("revenue")),
    )
    .value(
        campaign_stats_daily::Column::Clicks,
        Expr::col(campaign_stats_daily::Column::Clicks).add(incoming("clicks")),
    )
    .value(
        campaign_stats_daily::Column::Conversions,
        Expr::col(campaign_stats_daily::Column::Conversions).add(incoming("conversions")),
    )
    .to_owned()
}

impl SeaOrmStorage {
    /// insert-or-increment 一行天级汇总
    ///
    /// 累加不是幂等操作，不做重试。
    pub(super) async fn increment_daily(&self, delta: &DailyStatDelta) -> Result<()> {
        let model = daily_active_model(
            &delta.campaign_id,
            delta.day,
            delta.revenue,
            delta.clicks,
            delta.conversions,
        );

        campaign_stats_daily::Entity::insert(model)
            .on_conflict(increment_on_conflict(self.db_backend()))
            .exec_without_returning(&self.db)
            .await?;

        debug!(
            "Daily stats incremented: {} @ {} (+{:.4}, clicks +{}, conversions +{})",
            delta.campaign_id, delta.day, delta.revenue, delta.clicks, delta.conversions
        );
        Ok(())
    }

    /// 按原始 CLICK / CONVERSION 事件重建某一天的全部汇总行
    pub(super) async fn rebuild_day(&self, day: NaiveDate) -> Result<usize> {
        let start = day
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| TrackerError::date_parse(format!("Invalid day: {}", day)))?
            .and_utc();
        let end = start + Duration::days(1);

        let db = &self.db;
        let rows = retry::with_retry("rebuild_day_totals", self.retry_config, || async move {
            campaign_event::Entity::find()
                .select_only()
                .column(campaign_event::Column::CampaignId)
                .column_as(Expr::cust("SUM(revenue)"), "revenue")
                .column_as(
                    Expr::cust("COUNT(CASE WHEN event_kind = 'CLICK' THEN 1 END)"),
                    "clicks",
                )
                .column_as(
                    Expr::cust("COUNT(CASE WHEN event_kind = 'CONVERSION' THEN 1 END)"),
                    "conversions",
                )
                .filter(campaign_event::Column::EventKind.is_in([
                    EventKind::Click.to_string(),
                    EventKind::Conversion.to_string(),
                ]))
                .filter(campaign_event::Column::CreatedAt.gte(start))
                .filter(campaign_event::Column::CreatedAt.lt(end))
                .group_by(campaign_event::Column::CampaignId)
                .into_model::<DailyTotalsRow>()
                .all(db)
                .await
        })
        .await?;

        let models: Vec<campaign_stats_daily::ActiveModel> = rows
            .iter()
            .map(|row| {
                daily_active_model(
                    &row.campaign_id,
                    day,
                    row.revenue.unwrap_or(0.0),
                    row.clicks,
                    row.conversions,
                )
            })
            .collect();
        let written = models.len();

        let txn = self.db.begin().await?;
        campaign_stats_daily::Entity::delete_many()
            .filter(campaign_stats_daily::Column::DayBucket.eq(day))
            .exec(&txn)
            .await?;
        if !models.is_empty() {
            campaign_stats_daily::Entity::insert_many(models)
                .exec(&txn)
                .await?;
        }
        txn.commit().await?;

        info!("Rebuilt {} daily stat rows for {}", written, day);
        Ok(written)
    }
}
