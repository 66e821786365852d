//! Origin policy: an explicit allow-list plus any loopback origin.
//!
//! Two pieces share one predicate:
//! - a [`CorsLayer`] that emits the browser CORS headers, and
//! - [`enforce_origin`], middleware that rejects a disallowed `Origin`
//!   with 403 before any handler runs.
//!
//! Requests without an `Origin` header (curl, server-to-server) pass.

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// The set of origins allowed to talk to the gateway.
#[derive(Clone, Debug, Default)]
pub struct AllowedOrigins(Arc<Vec<String>>);

impl AllowedOrigins {
    pub fn new(origins: Vec<String>) -> Self {
        Self(Arc::new(origins))
    }

    /// Parse a comma-separated allow-list, e.g. from `ALLOWED_ORIGINS`.
    pub fn from_list(raw: &str) -> Self {
        Self::new(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Exact allow-list match, or any loopback origin at any port.
    pub fn permits(&self, origin: &str) -> bool {
        self.0.iter().any(|allowed| allowed == origin) || is_loopback_origin(origin)
    }
}

/// True for `localhost`, `127.0.0.0/8`, and `[::1]` origins at any port.
fn is_loopback_origin(origin: &str) -> bool {
    let Some((_, rest)) = origin.split_once("://") else {
        return false;
    };
    let host = if let Some(end) = rest.find(']') {
        // bracketed IPv6 literal, keep the brackets
        &rest[..=end]
    } else {
        rest.split(':').next().unwrap_or(rest)
    };

    if host == "localhost" || host == "[::1]" {
        return true;
    }
    host.parse::<Ipv4Addr>()
        .map(|ip| ip.is_loopback())
        .unwrap_or(false)
}

/// CORS layer sharing the allow-list predicate with [`enforce_origin`].
pub fn cors_layer(origins: AllowedOrigins) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin.to_str().map(|o| origins.permits(o)).unwrap_or(false)
        }))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
}

/// Reject requests from disallowed origins before any handler runs.
pub async fn enforce_origin(
    State(origins): State<AllowedOrigins>,
    request: Request,
    next: Next,
) -> Response {
    let allowed = match request.headers().get(header::ORIGIN) {
        None => true,
        Some(value) => value.to_str().map(|o| origins.permits(o)).unwrap_or(false),
    };

    if !allowed {
        let body = Json(json!({ "error": "origin not allowed", "status": 403 }));
        return (StatusCode::FORBIDDEN, body).into_response();
    }
    next.run(request).await
}
