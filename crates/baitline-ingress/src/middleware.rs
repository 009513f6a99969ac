//! Shared ingress middleware

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::Instrument;

use crate::types::RequestId;

/// Transport options for the API routes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpOptions {
    /// Allow cross-origin submissions from any page
    #[serde(default = "default_cors_enabled")]
    pub cors_enabled: bool,

    /// Largest accepted request body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_cors_enabled() -> bool {
    true
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            cors_enabled: default_cors_enabled(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Runs the request inside a span keyed by a fresh request id and echoes
/// the id back as `x-request-id`.
pub async fn tag_request(req: Request, next: Next) -> Response {
    let request_id = RequestId::generate();
    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path()
    );

    let mut response = next.run(req).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// `Content-Length` as sent by the client, if it parses.
fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Answers 413 before the body is read when the declared length is too big.
/// Bodies without a usable `Content-Length` are left to `DefaultBodyLimit`.
pub async fn reject_oversized(
    req: Request,
    next: Next,
    max_body_bytes: usize,
) -> Result<Response, StatusCode> {
    match declared_length(req.headers()) {
        Some(length) if length > max_body_bytes => {
            tracing::warn!(length, max_body_bytes, "Rejecting oversized submission");
            Err(StatusCode::PAYLOAD_TOO_LARGE)
        }
        _ => Ok(next.run(req).await),
    }
}

/// Permissive CORS for pages served from another origin
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-session-id")])
}
