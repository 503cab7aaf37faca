//! 事件上报与报表查询
//!
//! `POST /api/{campaign}/track` 上报事件，`GET /api/{campaign}/track` 查询报表。

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::helpers::{error_response, json_response, request_context};
use crate::analytics::{AnalyticsService, ReportScope};
use crate::errors::TrackerError;
use crate::tracking::{CampaignType, EventIngestor, TrackOutcome, TrackRequest};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackResponse {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

impl From<TrackOutcome> for TrackResponse {
    fn from(outcome: TrackOutcome) -> Self {
        let message = outcome.message();
        let event_id = match outcome {
            TrackOutcome::Recorded { event_id } => Some(event_id),
            _ => None,
        };
        Self { message, event_id }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    pub entity_id: Option<String>,
    pub sponsor_name: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// 路径段 → 实体类型，未知类型按 404 处理
pub(super) fn campaign_type_from_path(segment: &str) -> Result<CampaignType, TrackerError> {
    CampaignType::from_path_segment(segment)
        .ok_or_else(|| TrackerError::not_found(format!("Unknown campaign type '{}'", segment)))
}

pub struct TrackService;

impl TrackService {
    pub async fn track(
        req: HttpRequest,
        path: web::Path<String>,
        body: web::Json<TrackRequest>,
        ingestor: web::Data<Arc<EventIngestor>>,
    ) -> HttpResponse {
        let campaign_type = match campaign_type_from_path(&path) {
            Ok(t) => t,
            Err(e) => return error_response(&e, "Failed to track event"),
        };
        let ctx = request_context(&req);
        trace!(
            "Track request for {} from {} ({})",
            campaign_type, ctx.ip_address, ctx.source
        );

        match ingestor.track(campaign_type, body.into_inner(), &ctx).await {
            Ok(outcome) => {
                let status = if outcome.event_id().is_some() {
                    StatusCode::CREATED
                } else {
                    StatusCode::OK
                };
                debug!("Track outcome for {}: {}", campaign_type, outcome.message());
                json_response(status, &TrackResponse::from(outcome))
            }
            Err(e) => error_response(&e, "Failed to track event"),
        }
    }

    pub async fn report(
        path: web::Path<String>,
        query: web::Query<ReportQuery>,
        analytics: web::Data<Arc<AnalyticsService>>,
    ) -> HttpResponse {
        let result = async {
            let campaign_type = campaign_type_from_path(&path)?;
            let scope = ReportScope::from_params(
                query.entity_id.as_deref(),
                query.sponsor_name.as_deref(),
            )?;
            let range =
                analytics.parse_range(query.start_date.as_deref(), query.end_date.as_deref())?;
            Ok::<_, TrackerError>(analytics.entity_report(campaign_type, scope, range).await)
        }
        .await;

        match result {
            Ok(report) => json_response(StatusCode::OK, &report),
            Err(e) => error_response(&e, "Failed to load report"),
        }
    }
}
