//! 响应构建与请求上下文提取

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, error, web};
use serde::Serialize;
use tracing::error;

use super::error_code::ErrorCode;
use crate::errors::{FieldError, TrackerError};
use crate::tracking::RequestContext;
use crate::utils::{derive_source, extract_client_ip};

/// 错误响应体
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

/// 带状态码的统一响应包装（健康检查使用）
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(body)
}

/// TrackerError → HTTP 响应
///
/// 服务端错误只记录日志，对外统一返回 `server_message`。
pub fn error_response(err: &TrackerError, server_message: &str) -> HttpResponse {
    let status = err.http_status();
    let message = if err.is_client_error() {
        err.message()
    } else {
        error!("{}: {}", server_message, err);
        server_message.to_string()
    };

    json_response(
        status,
        &ErrorBody {
            code: ErrorCode::from(err),
            message,
            errors: err.field_errors().to_vec(),
        },
    )
}

/// 请求体无法解析为 JSON 时返回与字段校验一致的 400
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| {
            let body = TrackerError::invalid_field("body", format!("malformed JSON: {}", err));
            error::InternalError::from_response(err, error_response(&body, "Invalid request"))
                .into()
        })
}

/// 从 HTTP 请求提取 IP / UA / 来源
pub fn request_context(req: &HttpRequest) -> RequestContext {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string)
    };

    RequestContext {
        ip_address: extract_client_ip(req).unwrap_or_default(),
        user_agent: header("user-agent").unwrap_or_default(),
        source: derive_source(Some(req.query_string()), header("referer").as_deref()),
    }
}
