//! 收入看板：`GET /api/revenue?timeframe=7d|30d|90d`
//!
//! 鉴权由上游网关完成，网关通过 `X-User-Role` 传入调用方角色。

use std::str::FromStr;
use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;
use tracing::debug;

use super::helpers::{error_response, json_response};
use crate::analytics::{AnalyticsService, Timeframe};
use crate::errors::TrackerError;

pub const ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Default, Deserialize)]
pub struct RevenueQuery {
    pub timeframe: Option<String>,
}

/// 校验调用方角色
fn authorize(req: &HttpRequest, analytics: &AnalyticsService) -> Result<(), TrackerError> {
    let role = req
        .headers()
        .get(ROLE_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| TrackerError::unauthorized("Missing caller role"))?;

    if !analytics.is_privileged(role) {
        debug!("Revenue dashboard denied for role '{}'", role);
        return Err(TrackerError::forbidden(
            "Revenue dashboard requires a privileged role",
        ));
    }
    Ok(())
}

pub struct RevenueService;

impl RevenueService {
    pub async fn dashboard(
        req: HttpRequest,
        query: web::Query<RevenueQuery>,
        analytics: web::Data<Arc<AnalyticsService>>,
    ) -> HttpResponse {
        let timeframe = match authorize(&req, &analytics).and_then(|_| {
            query
                .timeframe
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .map(Timeframe::from_str)
                .transpose()
        }) {
            Ok(t) => t.unwrap_or_default(),
            Err(e) => return error_response(&e, "Failed to load revenue dashboard"),
        };

        let dashboard = analytics.revenue_dashboard(timeframe).await;
        json_response(StatusCode::OK, &dashboard)
    }
}
