use std::fmt;

use actix_web::http::StatusCode;
use serde::Serialize;

/// 单个字段的校验错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum TrackerError {
    Validation(Vec<FieldError>),
    InvalidDateRange(String),
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    Serialization(String),
    FileOperation(String),
    DateParse(String),
}

impl TrackerError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            TrackerError::Validation(_) => "E001",
            TrackerError::InvalidDateRange(_) => "E002",
            TrackerError::NotFound(_) => "E003",
            TrackerError::Unauthorized(_) => "E004",
            TrackerError::Forbidden(_) => "E005",
            TrackerError::DatabaseConfig(_) => "E006",
            TrackerError::DatabaseConnection(_) => "E007",
            TrackerError::DatabaseOperation(_) => "E008",
            TrackerError::Serialization(_) => "E009",
            TrackerError::FileOperation(_) => "E010",
            TrackerError::DateParse(_) => "E011",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            TrackerError::Validation(_) => "Validation Error",
            TrackerError::InvalidDateRange(_) => "Invalid Date Range",
            TrackerError::NotFound(_) => "Resource Not Found",
            TrackerError::Unauthorized(_) => "Unauthorized",
            TrackerError::Forbidden(_) => "Forbidden",
            TrackerError::DatabaseConfig(_) => "Database Configuration Error",
            TrackerError::DatabaseConnection(_) => "Database Connection Error",
            TrackerError::DatabaseOperation(_) => "Database Operation Error",
            TrackerError::Serialization(_) => "Serialization Error",
            TrackerError::FileOperation(_) => "File Operation Error",
            TrackerError::DateParse(_) => "Date Parse Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> String {
        match self {
            TrackerError::Validation(errors) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                format!("Invalid fields: {}", fields.join(", "))
            }
            TrackerError::InvalidDateRange(msg)
            | TrackerError::NotFound(msg)
            | TrackerError::Unauthorized(msg)
            | TrackerError::Forbidden(msg)
            | TrackerError::DatabaseConfig(msg)
            | TrackerError::DatabaseConnection(msg)
            | TrackerError::DatabaseOperation(msg)
            | TrackerError::Serialization(msg)
            | TrackerError::FileOperation(msg)
            | TrackerError::DateParse(msg) => msg.clone(),
        }
    }

    /// 字段级错误列表（仅 Validation 有内容）
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            TrackerError::Validation(errors) => errors,
            _ => &[],
        }
    }

    /// 映射到 HTTP 状态码
    pub fn http_status(&self) -> StatusCode {
        match self {
            TrackerError::Validation(_)
            | TrackerError::InvalidDateRange(_)
            | TrackerError::DateParse(_) => StatusCode::BAD_REQUEST,
            TrackerError::NotFound(_) => StatusCode::NOT_FOUND,
            TrackerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            TrackerError::Forbidden(_) => StatusCode::FORBIDDEN,
            TrackerError::DatabaseConfig(_)
            | TrackerError::DatabaseConnection(_)
            | TrackerError::DatabaseOperation(_)
            | TrackerError::Serialization(_)
            | TrackerError::FileOperation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 是否是调用方的问题（4xx）
    pub fn is_client_error(&self) -> bool {
        self.http_status().is_client_error()
    }

    /// 格式化为简洁输出（用于 CLI 模式）
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for TrackerError {}

// 便捷的构造函数
impl TrackerError {
    pub fn validation(errors: Vec<FieldError>) -> Self {
        TrackerError::Validation(errors)
    }

    pub fn invalid_field<F: Into<String>, M: Into<String>>(field: F, msg: M) -> Self {
        TrackerError::Validation(vec![FieldError::new(field, msg)])
    }

    pub fn invalid_date_range<T: Into<String>>(msg: T) -> Self {
        TrackerError::InvalidDateRange(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        TrackerError::NotFound(msg.into())
    }

    pub fn unauthorized<T: Into<String>>(msg: T) -> Self {
        TrackerError::Unauthorized(msg.into())
    }

    pub fn forbidden<T: Into<String>>(msg: T) -> Self {
        TrackerError::Forbidden(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        TrackerError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        TrackerError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        TrackerError::DatabaseOperation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        TrackerError::Serialization(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        TrackerError::FileOperation(msg.into())
    }

    pub fn date_parse<T: Into<String>>(msg: T) -> Self {
        TrackerError::DateParse(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for TrackerError {
    fn from(err: sea_orm::DbErr) -> Self {
        match err {
            sea_orm::DbErr::Conn(_) | sea_orm::DbErr::ConnectionAcquire(_) => {
                TrackerError::DatabaseConnection(err.to_string())
            }
            _ => TrackerError::DatabaseOperation(err.to_string()),
        }
    }
}

impl From<std::io::Error> for TrackerError {
    fn from(err: std::io::Error) -> Self {
        TrackerError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        TrackerError::Serialization(err.to_string())
    }
}

impl From<chrono::ParseError> for TrackerError {
    fn from(err: chrono::ParseError) -> Self {
        TrackerError::DateParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
