//! Baitline Core Types and Traits
//!
//! This crate provides the fundamental types and traits used throughout Baitline:
//! - Tracking event and collected-data record types
//! - The append-only record store abstraction and its in-memory implementation
//! - Event aggregation
//! - Core error types

pub mod analytics;
pub mod error;
pub mod event;
pub mod store;

pub use analytics::{EventAnalytics, RECENT_EVENTS_LIMIT, TypeCounts};
pub use error::{Error, Result};
pub use event::{CollectedRecord, EnrichedFields, ForwardedHeaders, StoredEvent, TrackingEvent};
pub use store::{InMemoryStore, RecordStore};
