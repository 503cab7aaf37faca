//! 投放实体（广告 / 联盟链接 / 赞助内容）
//!
//! 三种类型结构一致，通过 `campaign_type` 区分。

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "campaigns")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// AD / AFFILIATE_LINK / SPONSORED_CONTENT
    pub campaign_type: String,
    pub name: String,
    pub sponsor_name: Option<String>,
    /// PRODUCT / VIDEO / RECIPE / ARTICLE
    pub content_type: Option<String>,
    /// JSON 数组，可投放的位置
    #[sea_orm(column_type = "Text")]
    pub placements: String,
    /// JSON 数组，空数组表示不限
    #[sea_orm(column_type = "Text")]
    pub target_recipe_ids: String,
    /// JSON 数组，空数组表示不限
    #[sea_orm(column_type = "Text")]
    pub target_categories: String,
    /// 出价 / 佣金
    pub bid_amount: f64,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub revenue: f64,
    pub conversion_revenue: f64,
    /// 点击率（百分比）
    pub ctr: f64,
    /// 转化率（百分比）
    pub conversion_rate: f64,
    pub is_active: bool,
    pub starts_at: Option<DateTimeUtc>,
    pub ends_at: Option<DateTimeUtc>,
    pub last_impression_at: Option<DateTimeUtc>,
    pub last_click_at: Option<DateTimeUtc>,
    pub last_conversion_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
