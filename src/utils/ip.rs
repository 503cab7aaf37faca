//! 客户端 IP 提取
//!
//! - 可信代理配置（`server.trusted_proxies`）
//! - CIDR 匹配
//! - 未配置时对私有地址自动信任 X-Forwarded-For

use std::net::{IpAddr, SocketAddr};

use actix_web::HttpRequest;
use actix_web::http::header::HeaderMap;
use tracing::debug;

/// 私有地址或 localhost
pub fn is_private_or_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback(),
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || (v6.segments()[0] & 0xfe00) == 0xfc00 // fc00::/7
                || (v6.segments()[0] & 0xffc0) == 0xfe80 // fe80::/10
        }
    }
}

/// `ip` 是否命中可信代理列表（单 IP 或 CIDR）
pub fn is_trusted_proxy(ip: &str, trusted_proxies: &[String]) -> bool {
    let ip_addr = if let Ok(socket_addr) = ip.parse::<SocketAddr>() {
        socket_addr.ip()
    } else if let Ok(ip_addr) = ip.parse::<IpAddr>() {
        ip_addr
    } else {
        return false;
    };

    trusted_proxies.iter().any(|proxy| {
        if proxy.contains('/') {
            ip_in_cidr(&ip_addr, proxy)
        } else {
            proxy.parse::<IpAddr>().is_ok_and(|p| p == ip_addr)
        }
    })
}

pub fn ip_in_cidr(ip: &IpAddr, cidr: &str) -> bool {
    let Some((network, prefix_len)) = cidr.split_once('/') else {
        return false;
    };
    let Ok(prefix_len): Result<u8, _> = prefix_len.parse() else {
        return false;
    };
    let Ok(network_addr) = network.parse::<IpAddr>() else {
        return false;
    };

    match (ip, network_addr) {
        (IpAddr::V4(ip), IpAddr::V4(net)) => {
            if prefix_len > 32 {
                return false;
            }
            let mask = u32::MAX.checked_shl(32 - prefix_len as u32).unwrap_or(0);
            (u32::from_be_bytes(ip.octets()) & mask) == (u32::from_be_bytes(net.octets()) & mask)
        }
        (IpAddr::V6(ip), IpAddr::V6(net)) => {
            if prefix_len > 128 {
                return false;
            }
            let mask = u128::MAX.checked_shl(128 - prefix_len as u32).unwrap_or(0);
            (u128::from_be_bytes(ip.octets()) & mask) == (u128::from_be_bytes(net.octets()) & mask)
        }
        _ => false,
    }
}

/// 根据连接地址与转发头决定客户端 IP
///
/// 1. 配置了 trusted_proxies 且命中 → 转发头
/// 2. 配置了但未命中 → 连接地址（防伪造）
/// 3. 未配置且连接来自私有地址 → 转发头（如有）
/// 4. 其他 → 连接地址
pub fn resolve_client_ip(
    peer: Option<&str>,
    forwarded: Option<String>,
    trusted_proxies: &[String],
) -> Option<String> {
    let Some(peer_ip) = peer else {
        return forwarded;
    };

    if !trusted_proxies.is_empty() {
        if is_trusted_proxy(peer_ip, trusted_proxies) {
            return Some(forwarded.unwrap_or_else(|| strip_port(peer_ip)));
        }
        debug!("Connection from {} not in trusted_proxies", peer_ip);
        return Some(strip_port(peer_ip));
    }

    let peer_addr = strip_port(peer_ip);
    if let Ok(ip_addr) = peer_addr.parse::<IpAddr>()
        && is_private_or_local(&ip_addr)
        && let Some(real_ip) = forwarded
    {
        debug!("Private peer {}: using forwarded {}", peer_addr, real_ip);
        return Some(real_ip);
    }

    Some(peer_addr)
}

fn strip_port(addr: &str) -> String {
    addr.parse::<SocketAddr>()
        .map(|s| s.ip().to_string())
        .unwrap_or_else(|_| addr.to_string())
}

/// 从 HttpRequest 提取真实客户端 IP
pub fn extract_client_ip(req: &HttpRequest) -> Option<String> {
    let config = crate::config::get_config();
    let conn = req.connection_info();
    resolve_client_ip(
        conn.peer_addr(),
        extract_forwarded_ip_from_headers(req.headers()),
        &config.server.trusted_proxies,
    )
}

/// X-Forwarded-For 第一个地址，其次 X-Real-IP
///
/// 只接受能解析为 IP 的值，其余当作未提供。
pub fn extract_forwarded_ip_from_headers(headers: &HeaderMap) -> Option<String> {
    let parse = |s: &str| s.trim().parse::<IpAddr>().ok().map(|ip| ip.to_string());
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(parse)
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .and_then(parse)
        })
}
