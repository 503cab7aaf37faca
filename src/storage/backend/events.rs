//! EventStore implementation for SeaOrmStorage
//!
//! 计数器全部用 `x = x + ?` 表达式在数据库侧累加，不做应用层读改写。

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::sea_query::{CaseStatement, Expr, Query, UpdateStatement};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, ExprTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use tracing::debug;

use super::SeaOrmStorage;
use super::converters::{model_to_campaign, model_to_daily_stat, model_to_view};
use super::retry;
use crate::errors::{Result, TrackerError};
use crate::storage::{Campaign, DailyStat, DailyStatDelta, EventStore, NewEvent, StoredView};
use crate::tracking::{CampaignType, EngagementFields, EventKind};

use migration::entities::{campaign, campaign_event, campaign_stats_daily};

/// `col = CASE WHEN col IS NULL OR col < v THEN v ELSE col END`
fn greatest<C, V>(col: C, value: V) -> CaseStatement
where
    C: sea_orm::sea_query::IntoColumnRef + Copy,
    V: Into<sea_orm::Value> + Clone,
{
    CaseStatement::new()
        .case(
            Expr::col(col)
                .is_null()
                .or(Expr::col(col).lt(value.clone())),
            Expr::val(value),
        )
        .finally(Expr::col(col))
}

/// 构建事件对应的计数器累加语句
fn counter_update(event: &NewEvent) -> UpdateStatement {
    let ts = event.created_at;
    let mut stmt = Query::update();
    stmt.table(campaign::Entity)
        .value(campaign::Column::UpdatedAt, Utc::now())
        .and_where(Expr::col(campaign::Column::Id).eq(event.campaign_id.as_str()));

    match event.kind {
        EventKind::View => {
            stmt.value(
                campaign::Column::Impressions,
                Expr::col(campaign::Column::Impressions).add(1i64),
            )
            .value(
                campaign::Column::LastImpressionAt,
                greatest(campaign::Column::LastImpressionAt, ts),
            );
        }
        EventKind::Click => {
            stmt.value(
                campaign::Column::Clicks,
                Expr::col(campaign::Column::Clicks).add(1i64),
            )
            .value(
                campaign::Column::Revenue,
                Expr::col(campaign::Column::Revenue).add(event.revenue),
            )
            .value(
                campaign::Column::LastClickAt,
                greatest(campaign::Column::LastClickAt, ts),
            );
        }
        EventKind::Conversion => {
            stmt.value(
                campaign::Column::Conversions,
                Expr::col(campaign::Column::Conversions).add(1i64),
            )
            .value(
                campaign::Column::ConversionRevenue,
                Expr::col(campaign::Column::ConversionRevenue).add(event.revenue),
            )
            .value(
                campaign::Column::Revenue,
                Expr::col(campaign::Column::Revenue).add(event.revenue),
            )
            .value(
                campaign::Column::LastConversionAt,
                greatest(campaign::Column::LastConversionAt, ts),
            );
        }
    }

    stmt
}

#[async_trait]
impl EventStore for SeaOrmStorage {
    async fn find_campaign(
        &self,
        campaign_type: CampaignType,
        id: &str,
    ) -> Result<Option<Campaign>> {
        let db = &self.db;
        let model = retry::with_retry("find_campaign", self.retry_config, || async move {
            campaign::Entity::find_by_id(id.to_string())
                .filter(campaign::Column::CampaignType.eq(campaign_type.to_string()))
                .one(db)
                .await
        })
        .await?;

        model.map(model_to_campaign).transpose()
    }

    async fn list_active_campaigns(&self, campaign_type: CampaignType) -> Result<Vec<Campaign>> {
        let db = &self.db;
        let models = retry::with_retry("list_active_campaigns", self.retry_config, || async move {
            campaign::Entity::find()
                .filter(campaign::Column::CampaignType.eq(campaign_type.to_string()))
                .filter(campaign::Column::IsActive.eq(true))
                .order_by_asc(campaign::Column::Id)
                .all(db)
                .await
        })
        .await?;

        let mut campaigns = Vec::with_capacity(models.len());
        for model in models {
            match model_to_campaign(model) {
                Ok(c) => campaigns.push(c),
                Err(e) => tracing::warn!("Skipping unreadable campaign: {}", e),
            }
        }
        Ok(campaigns)
    }

    async fn find_recent_view(
        &self,
        campaign_id: &str,
        session_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Option<StoredView>> {
        let db = &self.db;
        let model = retry::with_retry("find_recent_view", self.retry_config, || async move {
            campaign_event::Entity::find()
                .filter(campaign_event::Column::CampaignId.eq(campaign_id))
                .filter(campaign_event::Column::SessionId.eq(session_id))
                .filter(campaign_event::Column::EventKind.eq(EventKind::View.to_string()))
                .filter(campaign_event::Column::CreatedAt.gte(from))
                .filter(campaign_event::Column::CreatedAt.lte(to))
                .order_by_desc(campaign_event::Column::CreatedAt)
                .one(db)
                .await
        })
        .await?;

        Ok(model.map(model_to_view))
    }

    async fn merge_view_engagement(&self, view_id: &str, fields: &EngagementFields) -> Result<()> {
        if fields.is_empty() {
            return Ok(());
        }

        let mut stmt = Query::update();
        stmt.table(campaign_event::Entity)
            .and_where(Expr::col(campaign_event::Column::Id).eq(view_id));

        let columns = [
            (campaign_event::Column::EngagementTime, fields.engagement_time),
            (campaign_event::Column::ScrollDepth, fields.scroll_depth),
            (campaign_event::Column::ClickX, fields.click_x),
            (campaign_event::Column::ClickY, fields.click_y),
        ];
        for (col, value) in columns {
            if let Some(v) = value {
                stmt.value(col, greatest(col, v));
            }
        }

        // 取最大值的合并是幂等的，可以安全重试
        let db = &self.db;
        let stmt_ref = &stmt;
        retry::with_retry("merge_view_engagement", self.retry_config, || async move {
            db.execute(stmt_ref).await
        })
        .await?;

        debug!("Merged engagement into view {}", view_id);
        Ok(())
    }

    async fn record_event(&self, event: &NewEvent) -> Result<()> {
        let txn = self.db.begin().await?;

        campaign_event::Entity::insert(super::converters::event_to_active_model(event))
            .exec_without_returning(&txn)
            .await?;

        let result = txn.execute(&counter_update(event)).await?;
        if result.rows_affected() == 0 {
            txn.rollback().await?;
            return Err(TrackerError::not_found(format!(
                "Campaign '{}' not found",
                event.campaign_id
            )));
        }

        txn.commit().await?;

        debug!(
            "Recorded {} event {} for campaign {}",
            event.kind, event.id, event.campaign_id
        );
        Ok(())
    }

    async fn recompute_rates(&self, campaign_id: &str) -> Result<()> {
        let stmt = Query::update()
            .table(campaign::Entity)
            .value(
                campaign::Column::Ctr,
                Expr::cust("CASE WHEN impressions > 0 THEN clicks * 100.0 / impressions ELSE 0 END"),
            )
            .value(
                campaign::Column::ConversionRate,
                Expr::cust("CASE WHEN clicks > 0 THEN conversions * 100.0 / clicks ELSE 0 END"),
            )
            .and_where(Expr::col(campaign::Column::Id).eq(campaign_id))
            .to_owned();

        let db = &self.db;
        let stmt_ref = &stmt;
        retry::with_retry("recompute_rates", self.retry_config, || async move {
            db.execute(stmt_ref).await
        })
        .await?;
        Ok(())
    }

    async fn upsert_daily_stats(&self, delta: &DailyStatDelta) -> Result<()> {
        self.increment_daily(delta).await
    }

    async fn rebuild_daily_stats(&self, day: NaiveDate) -> Result<usize> {
        self.rebuild_day(day).await
    }

    async fn get_daily_stats(
        &self,
        campaign_id: &str,
        day: NaiveDate,
    ) -> Result<Option<DailyStat>> {
        let db = &self.db;
        let model = retry::with_retry("get_daily_stats", self.retry_config, || async move {
            campaign_stats_daily::Entity::find()
                .filter(campaign_stats_daily::Column::CampaignId.eq(campaign_id))
                .filter(campaign_stats_daily::Column::DayBucket.eq(day))
                .one(db)
                .await
        })
        .await?;

        Ok(model.map(model_to_daily_stat))
    }

    async fn ping(&self) -> Result<()> {
        self.db.ping().await?;
        Ok(())
    }
}
