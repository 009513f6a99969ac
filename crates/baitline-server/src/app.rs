//! Router assembly

use std::sync::Arc;

use axum::Router;
use baitline_core::{CollectedRecord, RecordStore, StoredEvent};
use baitline_ingress::IngressState;
use baitline_observability::{ComponentStatus, HealthState, Metrics, ReadinessChecker, health_router};

use crate::config::ServerConfig;

/// Reports the service ready while both record stores are usable
pub struct StoreReadiness {
    events: Arc<dyn RecordStore<StoredEvent>>,
    collected: Arc<dyn RecordStore<CollectedRecord>>,
}

impl StoreReadiness {
    pub fn new(state: &IngressState) -> Self {
        Self {
            events: state.events.clone(),
            collected: state.collected.clone(),
        }
    }
}

impl ReadinessChecker for StoreReadiness {
    fn components(&self) -> Vec<ComponentStatus> {
        vec![
            ComponentStatus::new(self.events.name(), self.events.is_healthy()),
            ComponentStatus::new(self.collected.name(), self.collected.is_healthy()),
        ]
    }
}

/// API, health and metrics routes behind the shared middleware stack
pub fn build_app(config: &ServerConfig, state: IngressState, metrics: Arc<Metrics>) -> Router {
    let state = state.with_metrics(metrics.clone());
    let readiness = Arc::new(StoreReadiness::new(&state));
    let health_state = HealthState::with_readiness_checker(metrics, readiness);

    let routes = baitline_ingress::router(state).merge(health_router(health_state));
    baitline_ingress::with_middleware(routes, &config.http)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use baitline_core::InMemoryStore;
    use tower::ServiceExt; // for oneshot

    fn test_app() -> (Router, IngressState) {
        let state = IngressState::in_memory();
        let metrics = Arc::new(Metrics::new().unwrap());
        (
            build_app(&ServerConfig::default(), state.clone(), metrics),
            state,
        )
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, String) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health_routes_get_request_ids() {
        let (app, _) = test_app();

        let (status, headers, body) = get(&app, "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert!(headers.get("x-request-id").is_some());
        assert!(body.contains("\"ok\""));
    }

    #[tokio::test]
    async fn test_readiness_lists_both_stores() {
        let (app, _) = test_app();

        let (status, _, body) = get(&app, "/readyz").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "ready");
        let names: Vec<&str> = json["components"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["events", "collected"]);
    }

    #[tokio::test]
    async fn test_metrics_reflect_ingest() {
        let (app, _) = test_app();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/track-event")
                    .body(Body::from(r#"{"type":"click","data":{}}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let (status, _, body) = get(&app, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("baitline_records_ingested_total{endpoint=\"track_event\"} 1"));
        assert!(body.contains("baitline_store_records{store=\"events\"} 1"));
    }

    struct BrokenStore;

    #[async_trait::async_trait]
    impl RecordStore<StoredEvent> for BrokenStore {
        async fn append(&self, _record: StoredEvent) -> baitline_core::Result<usize> {
            Err(baitline_core::Error::StoreUnavailable("broken".to_string()))
        }

        async fn snapshot(&self) -> baitline_core::Result<Vec<StoredEvent>> {
            Err(baitline_core::Error::StoreUnavailable("broken".to_string()))
        }

        fn is_healthy(&self) -> bool {
            false
        }

        fn name(&self) -> &str {
            "events"
        }
    }

    #[tokio::test]
    async fn test_unhealthy_store_fails_readiness() {
        let state = IngressState::new(
            Arc::new(BrokenStore),
            Arc::new(InMemoryStore::new("collected")),
        );
        let metrics = Arc::new(Metrics::new().unwrap());
        let app = build_app(&ServerConfig::default(), state, metrics);

        let (status, _, body) = get(&app, "/readyz").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.contains("not_ready"));

        let (status, _, body) = get(&app, "/api/track-event").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("\"success\":false"));
    }
}
