//! Health and scrape routes: `/healthz`, `/readyz` and `/metrics`.
//!
//! Liveness only says the process answers. Readiness asks a
//! [`ReadinessChecker`] about each record store and answers 503 when any of
//! them is unusable.

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;

use crate::metrics::Metrics;

const HEALTHY: &str = "healthy";
const UNHEALTHY: &str = "unhealthy";

/// One store's entry in the `/readyz` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentStatus {
    pub name: String,
    pub status: String,
}

impl ComponentStatus {
    pub fn new(name: impl Into<String>, healthy: bool) -> Self {
        Self {
            name: name.into(),
            status: if healthy { HEALTHY } else { UNHEALTHY }.to_string(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HEALTHY
    }
}

/// Source of per-store health for `/readyz`.
pub trait ReadinessChecker: Send + Sync {
    fn components(&self) -> Vec<ComponentStatus>;
}

#[derive(Serialize)]
struct Liveness {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct Readiness {
    status: &'static str,
    components: Vec<ComponentStatus>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    unavailable: Vec<String>,
}

impl Readiness {
    fn from_components(components: Vec<ComponentStatus>) -> (StatusCode, Self) {
        let unavailable: Vec<String> = components
            .iter()
            .filter(|c| !c.is_healthy())
            .map(|c| c.name.clone())
            .collect();

        let (code, status) = if unavailable.is_empty() {
            (StatusCode::OK, "ready")
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
        };

        (
            code,
            Self {
                status,
                components,
                unavailable,
            },
        )
    }
}

/// Shared state behind the health routes
#[derive(Clone)]
pub struct HealthState {
    metrics: Arc<Metrics>,
    checker: Option<Arc<dyn ReadinessChecker>>,
}

impl HealthState {
    /// Health routes without store checks; `/readyz` always reports ready.
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            metrics,
            checker: None,
        }
    }

    pub fn with_readiness_checker(
        metrics: Arc<Metrics>,
        checker: Arc<dyn ReadinessChecker>,
    ) -> Self {
        Self {
            metrics,
            checker: Some(checker),
        }
    }
}

pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/healthz", get(liveness))
        .route("/readyz", get(readiness))
        .route("/metrics", get(scrape))
        .with_state(state)
}

async fn liveness() -> Json<Liveness> {
    Json(Liveness {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn readiness(State(state): State<HealthState>) -> Response {
    let components = state
        .checker
        .as_ref()
        .map(|checker| checker.components())
        .unwrap_or_default();

    let (code, body) = Readiness::from_components(components);
    if code != StatusCode::OK {
        tracing::warn!(unavailable = ?body.unavailable, "Readiness check failed");
    }
    (code, Json(body)).into_response()
}

async fn scrape(State(state): State<HealthState>) -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&state.metrics.registry().gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}
