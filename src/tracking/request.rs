//! 上报请求的解析与校验
//!
//! 所有字段错误一次性收集，校验在任何存储访问之前完成。

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{CampaignType, Placement, TrackEvent};
use crate::errors::{FieldError, Result, TrackerError};

pub const MAX_ENTITY_ID_LEN: usize = 128;
pub const MAX_SESSION_ID_LEN: usize = 128;
pub const MAX_RECIPE_ID_LEN: usize = 128;
pub const MAX_CATEGORY_LEN: usize = 128;

/// 点击坐标
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClickPosition {
    pub x: f64,
    pub y: f64,
}

/// 客户端原始上报体
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRequest {
    pub entity_id: Option<String>,
    pub event: Option<String>,
    pub placement: Option<String>,
    pub recipe_id: Option<String>,
    pub category: Option<String>,
    pub session_id: Option<String>,
    pub timestamp: Option<String>,
    pub engagement_time: Option<f64>,
    pub scroll_depth: Option<f64>,
    pub click_position: Option<ClickPosition>,
}

/// 可合并到曝光记录上的互动字段
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngagementFields {
    pub engagement_time: Option<f64>,
    pub scroll_depth: Option<f64>,
    pub click_x: Option<f64>,
    pub click_y: Option<f64>,
}

impl EngagementFields {
    pub fn is_empty(&self) -> bool {
        self.engagement_time.is_none()
            && self.scroll_depth.is_none()
            && self.click_x.is_none()
            && self.click_y.is_none()
    }
}

/// 请求上下文（来自 HTTP 层，而非请求体）
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub ip_address: String,
    pub user_agent: String,
    /// 流量来源：utm_source / ref:{domain} / direct
    pub source: String,
}

/// 校验通过的上报命令
#[derive(Debug, Clone)]
pub struct TrackCommand {
    pub campaign_type: CampaignType,
    pub entity_id: String,
    pub event: TrackEvent,
    pub placement: Placement,
    pub recipe_id: Option<String>,
    pub category: Option<String>,
    pub session_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub engagement: EngagementFields,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 可选字符串字段：去空白，超长记为字段错误
fn bounded(
    value: Option<String>,
    field: &str,
    max_len: usize,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match non_empty(value) {
        Some(v) if v.chars().count() > max_len => {
            errors.push(FieldError::new(
                field,
                format!("must be at most {} characters", max_len),
            ));
            None
        }
        other => other,
    }
}

impl TrackRequest {
    /// 校验并转换为 [`TrackCommand`]
    ///
    /// `now` 与 `max_clock_skew` 用于拒绝明显来自未来的时间戳。
    pub fn validate(
        self,
        campaign_type: CampaignType,
        now: DateTime<Utc>,
        max_clock_skew: Duration,
    ) -> Result<TrackCommand> {
        let mut errors = Vec::new();

        let entity_id = match non_empty(self.entity_id) {
            Some(id) if id.chars().count() > MAX_ENTITY_ID_LEN => {
                errors.push(FieldError::new(
                    "entityId",
                    format!("must be at most {} characters", MAX_ENTITY_ID_LEN),
                ));
                None
            }
            Some(id) => Some(id),
            None => {
                errors.push(FieldError::new("entityId", "is required"));
                None
            }
        };

        let event = match self.event.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => match TrackEvent::from_str(raw) {
                Ok(TrackEvent::Engagement) if !campaign_type.accepts_engagement() => {
                    errors.push(FieldError::new(
                        "event",
                        "ENGAGEMENT is only supported for sponsored content",
                    ));
                    None
                }
                Ok(event) => Some(event),
                Err(_) => {
                    errors.push(FieldError::new(
                        "event",
                        format!("unknown event type '{}'", raw),
                    ));
                    None
                }
            },
            _ => {
                errors.push(FieldError::new("event", "is required"));
                None
            }
        };

        let placement = match self.placement.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => match Placement::from_str(raw) {
                Ok(p) => Some(p),
                Err(_) => {
                    errors.push(FieldError::new(
                        "placement",
                        format!("unknown placement '{}'", raw),
                    ));
                    None
                }
            },
            _ => {
                errors.push(FieldError::new("placement", "is required"));
                None
            }
        };

        let timestamp = match self.timestamp.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => match DateTime::parse_from_rfc3339(raw) {
                Ok(ts) => {
                    let ts = ts.with_timezone(&Utc);
                    if ts > now + max_clock_skew {
                        errors.push(FieldError::new("timestamp", "is too far in the future"));
                        None
                    } else {
                        Some(ts)
                    }
                }
                Err(_) => {
                    errors.push(FieldError::new(
                        "timestamp",
                        "must be an RFC 3339 date-time",
                    ));
                    None
                }
            },
            _ => {
                errors.push(FieldError::new("timestamp", "is required"));
                None
            }
        };

        let recipe_id = bounded(self.recipe_id, "recipeId", MAX_RECIPE_ID_LEN, &mut errors);
        let category = bounded(self.category, "category", MAX_CATEGORY_LEN, &mut errors);
        let session_id = bounded(self.session_id, "sessionId", MAX_SESSION_ID_LEN, &mut errors);

        if let Some(t) = self.engagement_time
            && (!t.is_finite() || t < 0.0)
        {
            errors.push(FieldError::new(
                "engagementTime",
                "must be a non-negative number",
            ));
        }
        if let Some(d) = self.scroll_depth
            && (!d.is_finite() || !(0.0..=100.0).contains(&d))
        {
            errors.push(FieldError::new("scrollDepth", "must be between 0 and 100"));
        }
        if let Some(pos) = self.click_position {
            if !pos.x.is_finite() || pos.x < 0.0 {
                errors.push(FieldError::new(
                    "clickPosition.x",
                    "must be a non-negative number",
                ));
            }
            if !pos.y.is_finite() || pos.y < 0.0 {
                errors.push(FieldError::new(
                    "clickPosition.y",
                    "must be a non-negative number",
                ));
            }
        }

        match (entity_id, event, placement, timestamp) {
            (Some(entity_id), Some(event), Some(placement), Some(timestamp))
                if errors.is_empty() =>
            {
                Ok(TrackCommand {
                    campaign_type,
                    entity_id,
                    event,
                    placement,
                    recipe_id,
                    category,
                    session_id,
                    timestamp,
                    engagement: EngagementFields {
                        engagement_time: self.engagement_time,
                        scroll_depth: self.scroll_depth,
                        click_x: self.click_position.map(|p| p.x),
                        click_y: self.click_position.map(|p| p.y),
                    },
                })
            }
            _ => Err(TrackerError::validation(errors)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn valid() -> TrackRequest {
        TrackRequest {
            entity_id: Some("ad-1".to_string()),
            event: Some("IMPRESSION".to_string()),
            placement: Some("SIDEBAR".to_string()),
            timestamp: Some("2024-05-01T12:00:00Z".to_string()),
            ..Default::default()
        }
    }

    fn field_names(err: &TrackerError) -> Vec<String> {
        err.field_errors().iter().map(|e| e.field.clone()).collect()
    }

    #[test]
    fn test_valid_request() {
        let cmd = valid()
            .validate(CampaignType::Ad, now(), Duration::seconds(300))
            .unwrap();
        assert_eq!(cmd.entity_id, "ad-1");
        assert_eq!(cmd.event, TrackEvent::View);
        assert_eq!(cmd.placement, Placement::Sidebar);
        assert!(cmd.engagement.is_empty());
        assert!(cmd.session_id.is_none());
    }

    #[test]
    fn test_oversized_optional_fields_rejected() {
        let mut req = valid();
        req.session_id = Some("s".repeat(MAX_SESSION_ID_LEN + 1));
        req.recipe_id = Some("r".repeat(1000));
        req.category = Some("c".repeat(MAX_CATEGORY_LEN + 1));
        let err = req
            .validate(CampaignType::Ad, now(), Duration::seconds(300))
            .unwrap_err();
        assert_eq!(field_names(&err), vec!["recipeId", "category", "sessionId"]);

        let mut req = valid();
        req.session_id = Some("s".repeat(MAX_SESSION_ID_LEN));
        req.recipe_id = Some("r".repeat(MAX_RECIPE_ID_LEN));
        let cmd = req
            .validate(CampaignType::Ad, now(), Duration::seconds(300))
            .unwrap();
        assert_eq!(cmd.session_id.map(|s| s.len()), Some(MAX_SESSION_ID_LEN));
    }

    #[test]
    fn test_collects_all_field_errors() {
        let req = TrackRequest {
            entity_id: Some("  ".to_string()),
            event: Some("HOVER".to_string()),
            placement: Some("POPUP".to_string()),
            timestamp: Some("yesterday".to_string()),
            scroll_depth: Some(140.0),
            engagement_time: Some(-1.0),
            ..Default::default()
        };
        let err = req
            .validate(CampaignType::Ad, now(), Duration::seconds(300))
            .unwrap_err();
        assert_eq!(
            field_names(&err),
            vec![
                "entityId",
                "event",
                "placement",
                "timestamp",
                "engagementTime",
                "scrollDepth"
            ]
        );
    }

    #[test]
    fn test_entity_id_length_limit() {
        let mut req = valid();
        req.entity_id = Some("x".repeat(MAX_ENTITY_ID_LEN + 1));
        let err = req
            .validate(CampaignType::Ad, now(), Duration::seconds(300))
            .unwrap_err();
        assert_eq!(field_names(&err), vec!["entityId"]);

        let mut req = valid();
        req.entity_id = Some("x".repeat(MAX_ENTITY_ID_LEN));
        assert!(
            req.validate(CampaignType::Ad, now(), Duration::seconds(300))
                .is_ok()
        );
    }

    #[test]
    fn test_engagement_only_for_sponsored_content() {
        let mut req = valid();
        req.event = Some("ENGAGEMENT".to_string());
        let err = req
            .clone()
            .validate(CampaignType::Ad, now(), Duration::seconds(300))
            .unwrap_err();
        assert_eq!(field_names(&err), vec!["event"]);

        let cmd = req
            .validate(CampaignType::SponsoredContent, now(), Duration::seconds(300))
            .unwrap();
        assert_eq!(cmd.event, TrackEvent::Engagement);
    }

    #[test]
    fn test_future_timestamp_beyond_skew_rejected() {
        let mut req = valid();
        req.timestamp = Some("2024-05-01T12:04:59Z".to_string());
        assert!(
            req.clone()
                .validate(CampaignType::Ad, now(), Duration::seconds(300))
                .is_ok()
        );

        req.timestamp = Some("2024-05-01T12:05:01Z".to_string());
        let err = req
            .validate(CampaignType::Ad, now(), Duration::seconds(300))
            .unwrap_err();
        assert_eq!(field_names(&err), vec!["timestamp"]);
    }

    #[test]
    fn test_click_position_must_be_non_negative() {
        let mut req = valid();
        req.event = Some("CLICK".to_string());
        req.click_position = Some(ClickPosition { x: -3.0, y: 10.0 });
        let err = req
            .validate(CampaignType::Ad, now(), Duration::seconds(300))
            .unwrap_err();
        assert_eq!(field_names(&err), vec!["clickPosition.x"]);
    }

    #[test]
    fn test_missing_fields_reported() {
        let err = TrackRequest::default()
            .validate(CampaignType::Ad, now(), Duration::seconds(300))
            .unwrap_err();
        assert_eq!(
            field_names(&err),
            vec!["entityId", "event", "placement", "timestamp"]
        );
    }

    #[test]
    fn test_deserialize_camel_case_body() {
        let body = r#"{
            "entityId": "sc-9",
            "event": "view",
            "placement": "CONTENT",
            "recipeId": "r-1",
            "timestamp": "2024-05-01T11:59:00+02:00",
            "scrollDepth": 55.5,
            "clickPosition": {"x": 10, "y": 20}
        }"#;
        let req: TrackRequest = serde_json::from_str(body).unwrap();
        let cmd = req
            .validate(CampaignType::SponsoredContent, now(), Duration::seconds(300))
            .unwrap();
        assert_eq!(cmd.recipe_id.as_deref(), Some("r-1"));
        assert_eq!(cmd.engagement.scroll_depth, Some(55.5));
        assert_eq!(cmd.engagement.click_x, Some(10.0));
        assert_eq!(cmd.timestamp.to_rfc3339(), "2024-05-01T09:59:00+00:00");
    }
}
