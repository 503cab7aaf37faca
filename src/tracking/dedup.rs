//! 曝光去重
//!
//! 同一 (实体, 会话) 在去重窗口内只记录一次 VIEW。查找区间按事件时间戳计算：
//! `[timestamp - window, timestamp]`。
//!
//! 先读后写存在竞态：两个并发请求可能都看不到已有记录而各自写入一条，
//! 这种少量重复计数是可接受的。

use chrono::{DateTime, Duration, Utc};

use super::CampaignType;
use crate::config::TrackingConfig;
use crate::errors::Result;
use crate::storage::{EventStore, StoredView};

/// 去重判断结果
#[derive(Debug, Clone, PartialEq)]
pub enum DedupDecision {
    /// 窗口内没有曝光，应当写入
    Fresh,
    /// 窗口内已有曝光
    Duplicate(StoredView),
}

/// 去重门
#[derive(Debug, Clone)]
pub struct DedupGate {
    config: TrackingConfig,
}

impl DedupGate {
    pub fn new(config: TrackingConfig) -> Self {
        Self { config }
    }

    pub fn window(&self, campaign_type: CampaignType) -> Duration {
        self.config.dedup_window(campaign_type)
    }

    /// 去重查找区间（闭区间）
    pub fn lookup_range(
        &self,
        campaign_type: CampaignType,
        timestamp: DateTime<Utc>,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        (timestamp - self.window(campaign_type), timestamp)
    }

    pub async fn check(
        &self,
        store: &dyn EventStore,
        campaign_type: CampaignType,
        campaign_id: &str,
        session_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<DedupDecision> {
        let (from, to) = self.lookup_range(campaign_type, timestamp);
        Ok(
            match store
                .find_recent_view(campaign_id, session_id, from, to)
                .await?
            {
                Some(view) => DedupDecision::Duplicate(view),
                None => DedupDecision::Fresh,
            },
        )
    }
}
