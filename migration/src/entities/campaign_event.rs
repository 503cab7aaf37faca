//! Raw tracking event entity (VIEW / CLICK / CONVERSION)

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "campaign_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub campaign_id: String,
    pub campaign_type: String,
    pub event_kind: String,
    pub session_id: String,
    pub ip_address: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub user_agent: Option<String>,
    pub placement: String,
    pub recipe_id: Option<String>,
    pub category: Option<String>,
    /// Traffic source (utm_source param, ref:{domain}, or direct)
    pub source: Option<String>,
    /// Seconds spent on the placement
    pub engagement_time: Option<f64>,
    /// 0-100
    pub scroll_depth: Option<f64>,
    pub click_x: Option<f64>,
    pub click_y: Option<f64>,
    pub conversion_value: Option<f64>,
    /// Revenue attributed to this single event
    pub revenue: f64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
