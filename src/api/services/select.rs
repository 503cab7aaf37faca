//! 投放选择：`GET /api/{campaign}/select`

use std::str::FromStr;
use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};

use super::helpers::{error_response, json_response};
use super::track::campaign_type_from_path;
use crate::errors::TrackerError;
use crate::selection::{SelectionEngine, SelectionRequest};
use crate::storage::Campaign;
use crate::tracking::{CampaignType, ContentType, Placement};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectQuery {
    pub placement: Option<String>,
    pub recipe_id: Option<String>,
    pub category: Option<String>,
}

impl SelectQuery {
    fn into_request(self) -> Result<SelectionRequest, TrackerError> {
        let raw = self
            .placement
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| TrackerError::invalid_field("placement", "is required"))?;
        let placement = Placement::from_str(raw).map_err(|_| {
            TrackerError::invalid_field("placement", format!("unknown placement '{}'", raw))
        })?;

        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Ok(SelectionRequest {
            placement,
            recipe_id: clean(self.recipe_id),
            category: clean(self.category),
        })
    }
}

/// 返回给前端的实体摘要（不含计数器）
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedCampaign {
    pub id: String,
    pub campaign_type: CampaignType,
    pub name: String,
    pub sponsor_name: Option<String>,
    pub content_type: Option<ContentType>,
    pub placements: Vec<Placement>,
}

impl From<Campaign> for SelectedCampaign {
    fn from(c: Campaign) -> Self {
        Self {
            id: c.id,
            campaign_type: c.campaign_type,
            name: c.name,
            sponsor_name: c.sponsor_name,
            content_type: c.content_type,
            placements: c.placements,
        }
    }
}

pub struct SelectService;

impl SelectService {
    pub async fn select(
        path: web::Path<String>,
        query: web::Query<SelectQuery>,
        engine: web::Data<Arc<SelectionEngine>>,
    ) -> HttpResponse {
        let result = async {
            let campaign_type = campaign_type_from_path(&path)?;
            let request = query.into_inner().into_request()?;
            engine.select(campaign_type, &request).await
        }
        .await;

        match result {
            Ok(Some(campaign)) => json_response(StatusCode::OK, &SelectedCampaign::from(campaign)),
            Ok(None) => HttpResponse::NoContent().finish(),
            Err(e) => error_response(&e, "Failed to select campaign"),
        }
    }
}
