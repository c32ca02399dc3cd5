//! Request classification.
//!
//! # Responsibilities
//! - Tell WebSocket upgrades apart from plain requests
//! - Read the request ID stamped by the request-id layer
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Upgrade detection only looks at headers; the handshake itself is axum's job

use axum::http::{header, HeaderMap, HeaderName};

/// Header carrying the per-request correlation ID.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Request ID set by the request-id layer, or `"unknown"` outside the server stack.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
}

/// True when the request asks to be upgraded to a WebSocket.
pub fn is_stream_upgrade(headers: &HeaderMap) -> bool {
    let upgrade = headers
        .get(header::UPGRADE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("websocket"));

    let connection = headers
        .get(header::CONNECTION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| {
            value
                .split(',')
                .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
        });

    upgrade && connection
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_upgrade_detection() {
        let mut headers = HeaderMap::new();
        assert!(!is_stream_upgrade(&headers));

        headers.insert(header::UPGRADE, HeaderValue::from_static("WebSocket"));
        assert!(!is_stream_upgrade(&headers));

        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, Upgrade"));
        assert!(is_stream_upgrade(&headers));

        headers.insert(header::UPGRADE, HeaderValue::from_static("h2c"));
        assert!(!is_stream_upgrade(&headers));
    }

    #[test]
    fn test_request_id_fallback() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_id(&headers), "unknown");

        headers.insert(X_REQUEST_ID.clone(), HeaderValue::from_static("abc"));
        assert_eq!(request_id(&headers), "abc");
    }
}
