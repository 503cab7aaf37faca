//! 天级收入汇总
//!
//! 点击与转化在写入事件后同步调用这里做 insert-or-increment；
//! 汇总行丢失或偏差时可以按天从原始事件重建。

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::errors::Result;
use crate::storage::{DailyStat, DailyStatDelta, EventStore};

#[derive(Clone)]
pub struct RevenueAggregator {
    store: Arc<dyn EventStore>,
}

impl RevenueAggregator {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// 累加某实体某天的收入与点击数
    pub async fn record_revenue(
        &self,
        entity_id: &str,
        date: NaiveDate,
        amount: f64,
        click_delta: i64,
    ) -> Result<()> {
        self.store
            .upsert_daily_stats(&DailyStatDelta {
                campaign_id: entity_id.to_string(),
                day: date,
                revenue: amount,
                clicks: click_delta,
                conversions: 0,
            })
            .await?;
        debug!("Revenue recorded: {} @ {} += {:.4}", entity_id, date, amount);
        Ok(())
    }

    /// 累加一次转化（收入 + 转化数，点击数不变）
    pub async fn record_conversion(&self, entity_id: &str, date: NaiveDate, amount: f64) -> Result<()> {
        self.store
            .upsert_daily_stats(&DailyStatDelta {
                campaign_id: entity_id.to_string(),
                day: date,
                revenue: amount,
                clicks: 0,
                conversions: 1,
            })
            .await?;
        debug!("Conversion recorded: {} @ {} += {:.4}", entity_id, date, amount);
        Ok(())
    }

    /// 从原始事件重建某天所有汇总行，返回写入行数
    pub async fn reaggregate_day(&self, date: NaiveDate) -> Result<usize> {
        let rows = self.store.rebuild_daily_stats(date).await?;
        info!("Re-aggregated {} daily stat rows for {}", rows, date);
        Ok(rows)
    }

    pub async fn daily_stats(&self, entity_id: &str, date: NaiveDate) -> Result<Option<DailyStat>> {
        self.store.get_daily_stats(entity_id, date).await
    }
}
