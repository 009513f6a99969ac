//! Baitline Tracker
//!
//! Native client instrumentation that produces the same traffic pattern as the
//! in-page tracking script:
//! - `page_visit` on start, `time_spent` + `page_leave` on leave
//! - Trailing debounce for mouse movement and scrolling
//! - Key allowlist and password-field exclusion
//! - Periodic heartbeat
//! - Fire-and-forget delivery through an [`EventSink`]

pub mod debounce;
pub mod error;
pub mod policy;
pub mod scenario;
pub mod sink;
pub mod tracker;

pub use debounce::Debouncer;
pub use error::{Result, TrackerError};
pub use policy::{FormEventKind, FormField, KEY_ALLOWLIST, TrackerPolicy, is_tracked_key};
pub use scenario::{SCENARIO_EVENT_TYPES, run_scenario};
pub use sink::{EventSink, HttpSink, HttpSinkConfig, MemorySink};
pub use tracker::{ClickTarget, KeyPress, PageContext, ScrollPosition, Tracker};
