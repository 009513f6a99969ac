//! Metrics collection with Prometheus
//!
//! This module provides Prometheus metrics for Baitline:
//! - Ingested record counts by endpoint
//! - Ingest failures by endpoint
//! - Current store sizes
//! - Request latency histograms

use prometheus::{CounterVec, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry};
use std::sync::Arc;

/// Metrics collector for Baitline
#[derive(Clone)]
pub struct Metrics {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Records accepted and appended to a store
    pub records_ingested_total: CounterVec,
    /// Submissions rejected (unparseable body, store failure)
    pub ingest_failures_total: CounterVec,
    /// Records currently held per store. The stores are unbounded, watch this.
    pub store_records: GaugeVec,
    /// Handler duration
    pub request_duration_seconds: HistogramVec,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let records_ingested_total = CounterVec::new(
            Opts::new(
                "baitline_records_ingested_total",
                "Total number of records appended to a store",
            ),
            &["endpoint"],
        )?;

        let ingest_failures_total = CounterVec::new(
            Opts::new(
                "baitline_ingest_failures_total",
                "Total number of rejected submissions",
            ),
            &["endpoint"],
        )?;

        let store_records = GaugeVec::new(
            Opts::new(
                "baitline_store_records",
                "Number of records currently held in memory",
            ),
            &["store"],
        )?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "baitline_request_duration_seconds",
                "Request handling duration in seconds",
            )
            .buckets(vec![
                0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
            ]),
            &["endpoint", "method"],
        )?;

        registry.register(Box::new(records_ingested_total.clone()))?;
        registry.register(Box::new(ingest_failures_total.clone()))?;
        registry.register(Box::new(store_records.clone()))?;
        registry.register(Box::new(request_duration_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            records_ingested_total,
            ingest_failures_total,
            store_records,
            request_duration_seconds,
        })
    }

    /// Get the Prometheus registry for exporting metrics
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record an accepted submission. Stores are append-only, so the size
    /// gauge moves by one per append and never goes back.
    pub fn record_ingest(&self, endpoint: &str, store: &str, duration_secs: f64) {
        self.records_ingested_total
            .with_label_values(&[endpoint])
            .inc();
        self.store_records.with_label_values(&[store]).inc();
        self.request_duration_seconds
            .with_label_values(&[endpoint, "POST"])
            .observe(duration_secs);
    }

    /// Record a rejected submission
    pub fn record_ingest_failure(&self, endpoint: &str, duration_secs: f64) {
        self.ingest_failures_total
            .with_label_values(&[endpoint])
            .inc();
        self.request_duration_seconds
            .with_label_values(&[endpoint, "POST"])
            .observe(duration_secs);
    }

    /// Record a read of a store
    pub fn record_read(&self, endpoint: &str, duration_secs: f64) {
        self.request_duration_seconds
            .with_label_values(&[endpoint, "GET"])
            .observe(duration_secs);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}
