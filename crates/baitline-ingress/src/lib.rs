//! Baitline Ingress
//!
//! This crate provides the HTTP surface of Baitline:
//! - `/api/track-event` - interaction event ingest and aggregation
//! - `/api/collect-data` - free-form data collection and dump
//! - Best-effort client metadata derivation (session id, IP, user agent)
//! - Shared middleware (request ids, body limits, CORS)

pub mod collect_data;
pub mod lookup;
pub mod middleware;
pub mod state;
pub mod track_event;
pub mod types;

use axum::{Router, extract::DefaultBodyLimit, middleware::from_fn};
use tower_http::trace::TraceLayer;

pub use lookup::{ClientContext, Source};
pub use middleware::HttpOptions;
pub use state::IngressState;
pub use types::{IngressError, IngressResult, RequestId};

/// API routes without any middleware
pub fn router(state: IngressState) -> Router {
    track_event::router(state.clone()).merge(collect_data::router(state))
}

/// API routes wrapped in the standard middleware stack
pub fn app(state: IngressState, options: &HttpOptions) -> Router {
    with_middleware(router(state), options)
}

/// Wrap any router in the standard middleware stack
///
/// Request ids, tracing and CORS apply to every route of `router`, so other
/// routers (health, metrics) should be merged in before calling this.
pub fn with_middleware(router: Router, options: &HttpOptions) -> Router {
    let max_body_bytes = options.max_body_bytes;

    let router = router
        .layer(from_fn(move |req, next| {
            middleware::reject_oversized(req, next, max_body_bytes)
        }))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(from_fn(middleware::tag_request))
        .layer(TraceLayer::new_for_http());

    if options.cors_enabled {
        router.layer(middleware::cors_layer())
    } else {
        router
    }
}
