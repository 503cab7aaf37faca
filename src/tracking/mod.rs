//! 事件采集
//!
//! 负责曝光/点击/转化/互动事件的校验、去重、入库与计数器维护。

pub mod conversion;
pub mod dedup;
pub mod ingest;
pub mod random;
pub mod request;
pub mod session;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

pub use conversion::conversion_value;
pub use dedup::{DedupDecision, DedupGate};
pub use ingest::EventIngestor;
pub use random::{FixedRandom, RandomSource, ThreadRandom};
pub use request::{ClickPosition, EngagementFields, RequestContext, TrackCommand, TrackRequest};
pub use session::derive_session_id;

/// 投放实体类型
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignType {
    Ad,
    AffiliateLink,
    SponsoredContent,
}

impl CampaignType {
    /// 从 URL 路径段解析（`ads` / `affiliate-links` / `sponsored-content`）
    pub fn from_path_segment(segment: &str) -> Option<Self> {
        match segment {
            "ads" => Some(Self::Ad),
            "affiliate-links" => Some(Self::AffiliateLink),
            "sponsored-content" => Some(Self::SponsoredContent),
            _ => None,
        }
    }

    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Ad => "ads",
            Self::AffiliateLink => "affiliate-links",
            Self::SponsoredContent => "sponsored-content",
        }
    }

    /// 是否接受独立的 ENGAGEMENT 事件
    pub fn accepts_engagement(&self) -> bool {
        matches!(self, Self::SponsoredContent)
    }
}

/// 入库的事件类型
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    View,
    Click,
    Conversion,
}

/// 客户端上报的事件名（大小写不敏感，IMPRESSION 与 VIEW 同义）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum TrackEvent {
    #[strum(to_string = "VIEW", serialize = "IMPRESSION")]
    View,
    #[strum(to_string = "CLICK")]
    Click,
    #[strum(to_string = "CONVERSION")]
    Conversion,
    #[strum(to_string = "ENGAGEMENT")]
    Engagement,
}

/// 展示位
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Placement {
    Banner,
    Sidebar,
    Content,
    Footer,
    Inline,
    Related,
}

/// 投放内容类型（影响转化估值倍率）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ContentType {
    Product,
    Video,
    Recipe,
    Article,
}

/// 采集结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    /// 新事件已写入
    Recorded { event_id: String },
    /// 窗口内重复曝光，未修改任何数据
    DuplicateIgnored,
    /// 窗口内重复曝光，合并了互动字段
    EngagementUpdated,
    /// ENGAGEMENT 找不到可合并的曝光
    NoActiveView,
}

impl TrackOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            TrackOutcome::Recorded { .. } => "Event tracked successfully",
            TrackOutcome::DuplicateIgnored => "Duplicate impression ignored",
            TrackOutcome::EngagementUpdated => "View engagement updated",
            TrackOutcome::NoActiveView => "No active view to update",
        }
    }

    pub fn event_id(&self) -> Option<&str> {
        match self {
            TrackOutcome::Recorded { event_id } => Some(event_id),
            _ => None,
        }
    }
}
