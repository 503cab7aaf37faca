//! 流量来源推导：`utm_source` > `ref:{domain}` > `direct`

use std::borrow::Cow;

/// 与 `campaign_events.source` 列宽一致
pub const MAX_SOURCE_LEN: usize = 255;

pub fn derive_source(query: Option<&str>, referrer: Option<&str>) -> String {
    if let Some(query) = query
        && let Some(utm_source) = extract_query_param(query, "utm_source")
        && !utm_source.trim().is_empty()
    {
        return truncate_chars(utm_source.trim(), MAX_SOURCE_LEN);
    }

    if let Some(referer_url) = referrer
        && let Some(domain) = extract_domain(referer_url)
    {
        return truncate_chars(&format!("ref:{}", domain), MAX_SOURCE_LEN);
    }

    "direct".to_string()
}

/// 按字符截断，不切断多字节字符
fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// 提取查询参数值（URL 解码）
pub fn extract_query_param<'a>(query: &'a str, key: &str) -> Option<Cow<'a, str>> {
    let query = query.strip_prefix('?').unwrap_or(query);
    for part in query.split('&') {
        if let Some(value) = part.strip_prefix(key).and_then(|s| s.strip_prefix('=')) {
            return urlencoding::decode(value).ok();
        }
    }
    None
}

/// 从 URL 提取域名
pub fn extract_domain(url: &str) -> Option<&str> {
    let without_scheme = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);

    without_scheme
        .split(&['/', ':', '?', '#'][..])
        .next()
        .filter(|s| !s.is_empty())
}
