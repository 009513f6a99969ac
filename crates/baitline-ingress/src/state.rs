//! Shared handler state

use std::sync::Arc;

use baitline_core::{CollectedRecord, InMemoryStore, RecordStore, StoredEvent};
use baitline_observability::Metrics;

/// Stores and metrics shared by the ingress handlers
#[derive(Clone)]
pub struct IngressState {
    /// Tracking events
    pub events: Arc<dyn RecordStore<StoredEvent>>,
    /// Collected free-form records
    pub collected: Arc<dyn RecordStore<CollectedRecord>>,
    /// Optional metrics collector
    pub metrics: Option<Arc<Metrics>>,
}

impl IngressState {
    pub fn new(
        events: Arc<dyn RecordStore<StoredEvent>>,
        collected: Arc<dyn RecordStore<CollectedRecord>>,
    ) -> Self {
        Self {
            events,
            collected,
            metrics: None,
        }
    }

    /// Two empty process-memory stores
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryStore::new("events")),
            Arc::new(InMemoryStore::new("collected")),
        )
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}
