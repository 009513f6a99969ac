//! Common test utilities for integration tests

use baitline_ingress::IngressState;
use baitline_observability::Metrics;
use baitline_server::{ServerConfig, build_app};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Baitline server bound to an ephemeral local port
#[allow(dead_code)]
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: IngressState,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
}

#[allow(dead_code)]
impl TestServer {
    pub async fn start() -> Self {
        let state = IngressState::in_memory();
        let metrics = Arc::new(Metrics::new().unwrap());
        let app = build_app(&ServerConfig::default(), state.clone(), metrics);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .unwrap();
        });

        // Give server time to start
        tokio::time::sleep(Duration::from_millis(50)).await;

        Self {
            addr,
            state,
            shutdown_tx,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn analytics(&self) -> serde_json::Value {
        reqwest::get(self.url("/api/track-event"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}
