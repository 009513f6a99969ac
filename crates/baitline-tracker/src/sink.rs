//! Event delivery

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use baitline_core::TrackingEvent;
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};

/// Destination for tracking events
///
/// The tracker never retries: an error returned here is logged and the event
/// is gone.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn send(&self, event: TrackingEvent) -> Result<()>;
}

/// HTTP sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSinkConfig {
    /// Full URL of the ingest endpoint
    pub endpoint: String,

    /// Sent as `x-session-id` when set
    #[serde(default)]
    pub session_id: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_user_agent() -> String {
    format!("Baitline/{}", env!("CARGO_PKG_VERSION"))
}

impl HttpSinkConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            session_id: None,
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Posts each event as JSON to the ingest endpoint
pub struct HttpSink {
    client: Client,
    config: HttpSinkConfig,
}

impl HttpSink {
    pub fn new(config: HttpSinkConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| TrackerError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

#[async_trait]
impl EventSink for HttpSink {
    async fn send(&self, event: TrackingEvent) -> Result<()> {
        let mut request = self.client.post(&self.config.endpoint).json(&event);
        if let Some(session_id) = &self.config.session_id {
            request = request.header("x-session-id", session_id);
        }

        request.send().await?.error_for_status()?;
        Ok(())
    }
}

/// Keeps every event in memory, in delivery order
#[derive(Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<TrackingEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TrackingEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Type tags of the delivered events
    pub fn event_types(&self) -> Vec<String> {
        self.events()
            .iter()
            .map(|event| event.type_key().to_string())
            .collect()
    }
}

#[async_trait]
impl EventSink for MemorySink {
    async fn send(&self, event: TrackingEvent) -> Result<()> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
        Ok(())
    }
}
