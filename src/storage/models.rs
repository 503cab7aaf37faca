use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::tracking::{CampaignType, ContentType, EngagementFields, EventKind, Placement};

/// 投放实体（广告 / 联盟链接 / 赞助内容）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: String,
    pub campaign_type: CampaignType,
    pub name: String,
    pub sponsor_name: Option<String>,
    pub content_type: Option<ContentType>,
    pub placements: Vec<Placement>,
    #[serde(default)]
    pub target_recipe_ids: Vec<String>,
    #[serde(default)]
    pub target_categories: Vec<String>,
    pub bid_amount: f64,
    #[serde(default)]
    pub impressions: u64,
    #[serde(default)]
    pub clicks: u64,
    #[serde(default)]
    pub conversions: u64,
    #[serde(default)]
    pub revenue: f64,
    #[serde(default)]
    pub conversion_revenue: f64,
    #[serde(default)]
    pub ctr: f64,
    #[serde(default)]
    pub conversion_rate: f64,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub last_impression_at: Option<DateTime<Utc>>,
    pub last_click_at: Option<DateTime<Utc>>,
    pub last_conversion_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// 新建一个未产生任何数据的实体
    pub fn new(
        id: impl Into<String>,
        campaign_type: CampaignType,
        name: impl Into<String>,
        placements: Vec<Placement>,
        bid_amount: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            campaign_type,
            name: name.into(),
            sponsor_name: None,
            content_type: None,
            placements,
            target_recipe_ids: Vec::new(),
            target_categories: Vec::new(),
            bid_amount,
            impressions: 0,
            clicks: 0,
            conversions: 0,
            revenue: 0.0,
            conversion_revenue: 0.0,
            ctr: 0.0,
            conversion_rate: 0.0,
            is_active: true,
            starts_at: None,
            ends_at: None,
            last_impression_at: None,
            last_click_at: None,
            last_conversion_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 启用且处于排期窗口内
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.starts_at.is_none_or(|start| start <= now)
            && self.ends_at.is_none_or(|end| now <= end)
    }

    pub fn serves_placement(&self, placement: Placement) -> bool {
        self.placements.contains(&placement)
    }

    /// 未设置定向视为全站投放
    pub fn targets_recipe(&self, recipe_id: Option<&str>) -> bool {
        match recipe_id {
            None => true,
            Some(id) => {
                self.target_recipe_ids.is_empty() || self.target_recipe_ids.iter().any(|r| r == id)
            }
        }
    }

    pub fn targets_category(&self, category: Option<&str>) -> bool {
        match category {
            None => true,
            Some(c) => {
                self.target_categories.is_empty() || self.target_categories.iter().any(|t| t == c)
            }
        }
    }

    /// 选择权重：`revenue × 10 + (100 − ctr)`，未启用为 0
    pub fn selection_weight(&self) -> f64 {
        if !self.is_active {
            return 0.0;
        }
        self.revenue * 10.0 + (100.0 - self.ctr)
    }
}

/// 待写入的事件
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub id: String,
    pub campaign_id: String,
    pub campaign_type: CampaignType,
    pub kind: EventKind,
    pub session_id: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub placement: Placement,
    pub recipe_id: Option<String>,
    pub category: Option<String>,
    pub source: Option<String>,
    pub engagement: EngagementFields,
    pub conversion_value: Option<f64>,
    /// 本事件贡献的收入：CLICK 为出价，CONVERSION 为估值，VIEW 为 0
    pub revenue: f64,
    pub created_at: DateTime<Utc>,
}

/// 已存在的曝光记录
#[derive(Debug, Clone, PartialEq)]
pub struct StoredView {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub engagement: EngagementFields,
}

/// 天级汇总行
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStat {
    pub campaign_id: String,
    pub day: NaiveDate,
    pub revenue: f64,
    pub clicks: u64,
    pub conversions: u64,
}

/// 天级汇总增量
#[derive(Debug, Clone, PartialEq)]
pub struct DailyStatDelta {
    pub campaign_id: String,
    pub day: NaiveDate,
    pub revenue: f64,
    pub clicks: i64,
    pub conversions: i64,
}
