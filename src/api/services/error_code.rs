//! API 错误码
//!
//! 按千位分域：
//! - 0: 成功
//! - 1000-1099: 请求错误
//! - 2000-2099: 认证与授权
//! - 3000-3099: 实体
//! - 5000-5099: 服务端

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::errors::TrackerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,

    // 请求错误 1000-1099
    BadRequest = 1000,
    ValidationFailed = 1001,
    InvalidDateRange = 1002,
    InvalidDateFormat = 1003,

    // 认证与授权 2000-2099
    Unauthorized = 2000,
    Forbidden = 2001,

    // 实体 3000-3099
    CampaignNotFound = 3000,

    // 服务端 5000-5099
    InternalServerError = 5000,
    DatabaseError = 5001,
    ServiceUnavailable = 5003,
}

impl From<&TrackerError> for ErrorCode {
    fn from(err: &TrackerError) -> Self {
        match err {
            TrackerError::Validation(_) => ErrorCode::ValidationFailed,
            TrackerError::InvalidDateRange(_) => ErrorCode::InvalidDateRange,
            TrackerError::DateParse(_) => ErrorCode::InvalidDateFormat,
            TrackerError::NotFound(_) => ErrorCode::CampaignNotFound,
            TrackerError::Unauthorized(_) => ErrorCode::Unauthorized,
            TrackerError::Forbidden(_) => ErrorCode::Forbidden,
            TrackerError::DatabaseConfig(_)
            | TrackerError::DatabaseConnection(_)
            | TrackerError::DatabaseOperation(_) => ErrorCode::DatabaseError,
            TrackerError::Serialization(_) | TrackerError::FileOperation(_) => {
                ErrorCode::InternalServerError
            }
        }
    }
}
