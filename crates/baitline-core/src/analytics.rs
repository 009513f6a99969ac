//! Event aggregation
//!
//! Summary statistics over a snapshot of the event store: total count,
//! per-type counts, distinct sessions and the most recent events.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::event::StoredEvent;

/// Number of trailing events included in the summary
pub const RECENT_EVENTS_LIMIT: usize = 20;

/// Occurrence count per event type, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeCounts {
    entries: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

impl TypeCounts {
    /// Count one occurrence of `event_type`
    pub fn increment(&mut self, event_type: &str) {
        match self.index.get(event_type) {
            Some(&pos) => self.entries[pos].1 += 1,
            None => {
                self.index.insert(event_type.to_string(), self.entries.len());
                self.entries.push((event_type.to_string(), 1));
            }
        }
    }

    /// Count for a single type
    pub fn get(&self, event_type: &str) -> Option<u64> {
        self.index.get(event_type).map(|&pos| self.entries[pos].1)
    }

    /// Iterate `(type, count)` pairs in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Sum of all counts
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, v)| v).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for TypeCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (event_type, count) in &self.entries {
            map.serialize_entry(event_type, count)?;
        }
        map.end()
    }
}

/// Aggregated view of the event store
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAnalytics {
    pub total_events: usize,
    pub event_types: TypeCounts,
    pub unique_sessions: usize,
    pub recent_events: Vec<StoredEvent>,
}

impl EventAnalytics {
    /// Aggregate a snapshot of stored events (single linear scan)
    pub fn compute(events: &[StoredEvent]) -> Self {
        let mut event_types = TypeCounts::default();
        let mut sessions = HashSet::new();

        for event in events {
            event_types.increment(&event.event.type_key());
            sessions.insert(event.session_id.as_str());
        }

        let tail_start = events.len().saturating_sub(RECENT_EVENTS_LIMIT);

        Self {
            total_events: events.len(),
            event_types,
            unique_sessions: sessions.len(),
            recent_events: events[tail_start..].to_vec(),
        }
    }
}
