//! 匿名会话标识推导
//!
//! 客户端未提供 sessionId 时，按 `ip | user-agent | 时间分桶` 计算一个稳定的
//! 标识。仅用于去重和独立访客统计，不是安全凭证：同一 NAT 后使用相同浏览器的
//! 用户会落入同一个会话。跨越分桶边界的两次曝光即使只差几秒也会得到不同的
//! 会话，因而不会被去重。

use chrono::{DateTime, Utc};
use xxhash_rust::xxh64::xxh64;

/// 推导匿名 session id：`anon-{xxh64 hex}`
pub fn derive_session_id(
    ip_address: &str,
    user_agent: &str,
    timestamp: DateTime<Utc>,
    bucket_secs: u64,
) -> String {
    let bucket_secs = bucket_secs.max(1) as i64;
    let bucket = timestamp.timestamp().div_euclid(bucket_secs);
    let material = format!("{}|{}|{}", ip_address, user_agent, bucket);
    format!("anon-{:016x}", xxh64(material.as_bytes(), 0))
}

/// 优先使用客户端提供的 session id
pub fn resolve_session_id(
    supplied: Option<&str>,
    ip_address: &str,
    user_agent: &str,
    timestamp: DateTime<Utc>,
    bucket_secs: u64,
) -> String {
    match supplied {
        Some(id) => id.to_string(),
        None => derive_session_id(ip_address, user_agent, timestamp, bucket_secs),
    }
}
