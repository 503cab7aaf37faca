use std::str::FromStr;

use sea_orm::ActiveValue::{NotSet, Set};
use tracing::warn;

use crate::errors::{Result, TrackerError};
use crate::storage::{Campaign, DailyStat, NewEvent, StoredView};
use crate::tracking::{CampaignType, ContentType, EngagementFields, Placement};
use migration::entities::{campaign, campaign_event, campaign_stats_daily};

fn parse_string_list(raw: &str, column: &str, id: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!("Campaign '{}' has malformed {} JSON: {}", id, column, e);
        Vec::new()
    })
}

/// 将 Sea-ORM Model 转换为 Campaign
pub fn model_to_campaign(model: campaign::Model) -> Result<Campaign> {
    let campaign_type = CampaignType::from_str(&model.campaign_type).map_err(|_| {
        TrackerError::serialization(format!(
            "Campaign '{}' has unknown type '{}'",
            model.id, model.campaign_type
        ))
    })?;

    let content_type = model
        .content_type
        .as_deref()
        .and_then(|c| ContentType::from_str(c).ok());

    let placements = parse_string_list(&model.placements, "placements", &model.id)
        .iter()
        .filter_map(|p| Placement::from_str(p).ok())
        .collect();

    Ok(Campaign {
        target_recipe_ids: parse_string_list(
            &model.target_recipe_ids,
            "target_recipe_ids",
            &model.id,
        ),
        target_categories: parse_string_list(
            &model.target_categories,
            "target_categories",
            &model.id,
        ),
        id: model.id,
        campaign_type,
        name: model.name,
        sponsor_name: model.sponsor_name,
        content_type,
        placements,
        bid_amount: model.bid_amount,
        impressions: model.impressions.max(0) as u64,
        clicks: model.clicks.max(0) as u64,
        conversions: model.conversions.max(0) as u64,
        revenue: model.revenue,
        conversion_revenue: model.conversion_revenue,
        ctr: model.ctr,
        conversion_rate: model.conversion_rate,
        is_active: model.is_active,
        starts_at: model.starts_at,
        ends_at: model.ends_at,
        last_impression_at: model.last_impression_at,
        last_click_at: model.last_click_at,
        last_conversion_at: model.last_conversion_at,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

/// 将 Campaign 转换为 ActiveModel（整行写入）
pub fn campaign_to_active_model(c: &Campaign) -> Result<campaign::ActiveModel> {
    let placements: Vec<&str> = c.placements.iter().map(|p| p.as_ref()).collect();

    Ok(campaign::ActiveModel {
        id: Set(c.id.clone()),
        campaign_type: Set(c.campaign_type.to_string()),
        name: Set(c.name.clone()),
        sponsor_name: Set(c.sponsor_name.clone()),
        content_type: Set(c.content_type.map(|t| t.to_string())),
        placements: Set(serde_json::to_string(&placements)?),
        target_recipe_ids: Set(serde_json::to_string(&c.target_recipe_ids)?),
        target_categories: Set(serde_json::to_string(&c.target_categories)?),
        bid_amount: Set(c.bid_amount),
        impressions: Set(c.impressions as i64),
        clicks: Set(c.clicks as i64),
        conversions: Set(c.conversions as i64),
        revenue: Set(c.revenue),
        conversion_revenue: Set(c.conversion_revenue),
        ctr: Set(c.ctr),
        conversion_rate: Set(c.conversion_rate),
        is_active: Set(c.is_active),
        starts_at: Set(c.starts_at),
        ends_at: Set(c.ends_at),
        last_impression_at: Set(c.last_impression_at),
        last_click_at: Set(c.last_click_at),
        last_conversion_at: Set(c.last_conversion_at),
        created_at: Set(c.created_at),
        updated_at: Set(c.updated_at),
    })
}

pub fn event_to_active_model(event: &NewEvent) -> campaign_event::ActiveModel {
    campaign_event::ActiveModel {
        id: Set(event.id.clone()),
        campaign_id: Set(event.campaign_id.clone()),
        campaign_type: Set(event.campaign_type.to_string()),
        event_kind: Set(event.kind.to_string()),
        session_id: Set(event.session_id.clone()),
        ip_address: Set(event.ip_address.clone()),
        user_agent: Set(event.user_agent.clone()),
        placement: Set(event.placement.to_string()),
        recipe_id: Set(event.recipe_id.clone()),
        category: Set(event.category.clone()),
        source: Set(event.source.clone()),
        engagement_time: Set(event.engagement.engagement_time),
        scroll_depth: Set(event.engagement.scroll_depth),
        click_x: Set(event.engagement.click_x),
        click_y: Set(event.engagement.click_y),
        conversion_value: Set(event.conversion_value),
        revenue: Set(event.revenue),
        created_at: Set(event.created_at),
    }
}

pub fn model_to_view(model: campaign_event::Model) -> StoredView {
    StoredView {
        id: model.id,
        created_at: model.created_at,
        engagement: EngagementFields {
            engagement_time: model.engagement_time,
            scroll_depth: model.scroll_depth,
            click_x: model.click_x,
            click_y: model.click_y,
        },
    }
}

pub fn model_to_daily_stat(model: campaign_stats_daily::Model) -> DailyStat {
    DailyStat {
        campaign_id: model.campaign_id,
        day: model.day_bucket,
        revenue: model.revenue,
        clicks: model.clicks.max(0) as u64,
        conversions: model.conversions.max(0) as u64,
    }
}

/// 天级汇总的新行（id 由数据库生成）
pub fn daily_active_model(
    campaign_id: &str,
    day: chrono::NaiveDate,
    revenue: f64,
    clicks: i64,
    conversions: i64,
) -> campaign_stats_daily::ActiveModel {
    campaign_stats_daily::ActiveModel {
        id: NotSet,
        campaign_id: Set(campaign_id.to_string()),
        day_bucket: Set(day),
        revenue: Set(revenue),
        clicks: Set(clicks),
        conversions: Set(conversions),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn model() -> campaign::Model {
        let now = Utc::now();
        campaign::Model {
            id: "aff-1".to_string(),
            campaign_type: "AFFILIATE_LINK".to_string(),
            name: "Knife set".to_string(),
            sponsor_name: Some("Acme".to_string()),
            content_type: Some("PRODUCT".to_string()),
            placements: r#"["SIDEBAR","POPUP","inline"]"#.to_string(),
            target_recipe_ids: "[]".to_string(),
            target_categories: r#"["desserts"]"#.to_string(),
            bid_amount: 1.5,
            impressions: 10,
            clicks: 2,
            conversions: 1,
            revenue: 3.0,
            conversion_revenue: 1.5,
            ctr: 20.0,
            conversion_rate: 50.0,
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

    #[test]
    fn test_model_to_campaign() {
        let c = model_to_campaign(model()).unwrap();
        assert_eq!(c.campaign_type, CampaignType::AffiliateLink);
        assert_eq!(c.content_type, Some(ContentType::Product));
        // 未知位置被忽略，大小写不敏感
        assert_eq!(c.placements, vec![Placement::Sidebar, Placement::Inline]);
        assert!(c.target_recipe_ids.is_empty());
        assert_eq!(c.target_categories, vec!["desserts".to_string()]);
        assert_eq!(c.impressions, 10);
    }

    #[test]
    fn test_unknown_campaign_type_is_error() {
        let mut m = model();
        m.campaign_type = "POPUP_AD".to_string();
        assert!(model_to_campaign(m).is_err());
    }

    #[test]
    fn test_malformed_targeting_json_is_untargeted() {
        let mut m = model();
        m.target_recipe_ids = "not json".to_string();
        let c = model_to_campaign(m).unwrap();
        assert!(c.target_recipe_ids.is_empty());
    }

    #[test]
    fn test_campaign_to_active_model_serializes_lists() {
        let c = model_to_campaign(model()).unwrap();
        let active = campaign_to_active_model(&c).unwrap();
        assert_eq!(
            active.placements,
            Set(r#"["SIDEBAR","INLINE"]"#.to_string())
        );
        assert_eq!(active.campaign_type, Set("AFFILIATE_LINK".to_string()));
    }
}
