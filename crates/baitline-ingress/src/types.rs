//! Shared ingress types and utilities

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use baitline_core::Error as CoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Request ID for tracing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a new request ID
    pub fn generate() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let count = COUNTER.fetch_add(1, Ordering::Relaxed);
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_micros())
            .unwrap_or_default();

        Self(format!("req_{:x}_{:x}", timestamp, count))
    }

    /// Get the string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ingress error types
///
/// The display text is the only thing a caller ever sees; the wrapped
/// error is logged server-side.
#[derive(Debug, Error)]
pub enum IngressError {
    /// Event ingest failed (unparseable body or store failure)
    #[error("Tracking failed")]
    Tracking(#[source] CoreError),

    /// Data collection failed (unparseable body or store failure)
    #[error("Failed to collect data")]
    Collection(#[source] CoreError),

    /// A store could not be read
    #[error("Failed to read {store} store")]
    StoreRead {
        store: String,
        #[source]
        source: CoreError,
    },
}

impl IngressError {
    fn cause(&self) -> &CoreError {
        match self {
            IngressError::Tracking(err) | IngressError::Collection(err) => err,
            IngressError::StoreRead { source, .. } => source,
        }
    }
}

impl IntoResponse for IngressError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.cause(), "{}", self);

        let body = Failure {
            success: false,
            message: self.to_string(),
        };

        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Ingress result type
pub type IngressResult<T> = Result<T, IngressError>;

/// `{ "success": true }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
}

/// `{ "success": false, "message": ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Failure {
    pub success: bool,
    pub message: String,
}

/// Response to an accepted collect-data submission
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectAck {
    pub success: bool,
    pub message: String,
    /// Store length after the append; opaque to callers
    pub data_id: usize,
}

/// Full dump of the collected-data store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectedDump<T> {
    pub total_entries: usize,
    pub data: Vec<T>,
}
