//! HTTP 层：路由、处理器与中间件

pub mod middleware;
pub mod services;
