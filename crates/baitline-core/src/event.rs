//! Tracking event and collected-data record types
//!
//! Submitted payloads are loosely typed: the handful of fields the server
//! reads are optional and everything else is carried through verbatim.

use std::borrow::Cow;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Key under which events without a `type` are counted
pub const UNKNOWN_EVENT_TYPE: &str = "unknown";

/// Current time formatted like `Date.prototype.toISOString` (`2024-01-01T00:00:00.000Z`)
pub fn iso_timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// A single interaction observation as submitted by a client
///
/// `type`, `timestamp` and `url` are kept as whatever JSON the client sent.
/// Well-behaved clients send strings, but a number or object there is stored
/// as-is rather than failing the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvent {
    /// Open-ended type tag ("click", "scroll", "page_visit", ...)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<Value>,

    /// Free-form payload, shape depends on the type
    #[serde(default = "empty_object")]
    pub data: Value,

    /// Client-reported ISO-8601 time of the action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,

    /// Page URL active when the event occurred
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Value>,

    /// Any other top-level keys the client sent
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TrackingEvent {
    /// Create an event stamped with the current time
    pub fn new(event_type: impl Into<String>, data: Value, url: impl Into<String>) -> Self {
        Self {
            event_type: Some(Value::String(event_type.into())),
            data,
            timestamp: Some(Value::String(iso_timestamp_now())),
            url: Some(Value::String(url.into())),
            extra: Map::new(),
        }
    }

    /// Type tag used for aggregation. Non-string tags count under their
    /// JSON text (`42`, `true`); absent or null tags under `"unknown"`.
    pub fn type_key(&self) -> Cow<'_, str> {
        match &self.event_type {
            None | Some(Value::Null) => Cow::Borrowed(UNKNOWN_EVENT_TYPE),
            Some(Value::String(tag)) => Cow::Borrowed(tag),
            Some(other) => Cow::Owned(other.to_string()),
        }
    }

    /// Page URL when the client sent it as a string
    pub fn url_str(&self) -> Option<&str> {
        self.url.as_ref().and_then(Value::as_str)
    }
}

/// Request metadata the server attaches to every stored event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedFields {
    pub session_id: String,
    pub ip: String,
    pub user_agent: String,
}

/// A tracking event after server-side enrichment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    #[serde(flatten)]
    pub event: TrackingEvent,

    #[serde(rename = "sessionId")]
    pub session_id: String,

    pub ip: String,

    #[serde(rename = "userAgent")]
    pub user_agent: String,
}

impl StoredEvent {
    /// Attach server-derived metadata. Client-sent values for the same keys are discarded.
    pub fn enrich(mut event: TrackingEvent, fields: EnrichedFields) -> Self {
        for key in ["sessionId", "ip", "userAgent"] {
            event.extra.remove(key);
        }

        Self {
            event,
            session_id: fields.session_id,
            ip: fields.ip,
            user_agent: fields.user_agent,
        }
    }
}

/// The fixed subset of request headers copied onto collected records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardedHeaders {
    #[serde(rename = "user-agent")]
    pub user_agent: Option<String>,

    #[serde(rename = "accept-language")]
    pub accept_language: Option<String>,

    #[serde(rename = "accept-encoding")]
    pub accept_encoding: Option<String>,

    pub referer: Option<String>,
}

/// A free-form payload plus server-added context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedRecord {
    #[serde(flatten)]
    pub payload: Map<String, Value>,

    /// Server receive time
    pub timestamp: String,

    #[serde(rename = "serverIP")]
    pub server_ip: String,

    pub headers: ForwardedHeaders,
}

impl CollectedRecord {
    /// Build a record from a submitted JSON value
    ///
    /// # Errors
    /// - `Error::InvalidPayload` if the value is not a JSON object
    pub fn from_payload(
        payload: Value,
        server_ip: String,
        headers: ForwardedHeaders,
    ) -> Result<Self> {
        let Value::Object(mut payload) = payload else {
            return Err(Error::InvalidPayload(
                "collected data must be a JSON object".to_string(),
            ));
        };

        for key in ["timestamp", "serverIP", "headers"] {
            payload.remove(key);
        }

        Ok(Self {
            payload,
            timestamp: iso_timestamp_now(),
            server_ip,
            headers,
        })
    }
}
