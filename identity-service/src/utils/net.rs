use axum::http::{header, HeaderMap};
use std::net::SocketAddr;

/// Resolve the client IP: first hop of `X-Forwarded-For`, then `X-Real-IP`,
/// then the socket peer address.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return real_ip.to_string();
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_for_wins_and_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));

        let peer: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        assert_eq!(client_ip(&headers, Some(peer)), "203.0.113.9");
    }

    #[test]
    fn falls_back_to_real_ip_then_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        let peer: SocketAddr = "127.0.0.1:9999".parse().unwrap();

        assert_eq!(client_ip(&headers, Some(peer)), "10.0.0.2");

        let headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, Some(peer)), "127.0.0.1");
        assert_eq!(client_ip(&headers, None), "unknown");
    }

    #[test]
    fn user_agent_is_optional() {
        let mut headers = HeaderMap::new();
        assert_eq!(user_agent(&headers), None);

        headers.insert(header::USER_AGENT, HeaderValue::from_static("curl/8.0"));
        assert_eq!(user_agent(&headers).as_deref(), Some("curl/8.0"));
    }
}
