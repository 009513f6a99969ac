//! Per-page tracker
//!
//! A `Tracker` lives for the duration of one page view. It turns raw
//! interaction callbacks into tracking events, applying the debounce and
//! privacy rules from [`TrackerPolicy`], and hands them to a background worker
//! that delivers them to an [`EventSink`] one at a time.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use baitline_core::TrackingEvent;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, warn};

use crate::{
    debounce::Debouncer,
    policy::{FormEventKind, FormField, TrackerPolicy, is_tracked_key},
    sink::EventSink,
};

/// Longest click text that is reported
const MAX_CLICK_TEXT_CHARS: usize = 100;

/// Page the tracker is attached to
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub url: String,
    pub referrer: String,
    pub user_agent: String,
}

impl PageContext {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = referrer.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Element that received a click
#[derive(Debug, Clone, Default)]
pub struct ClickTarget {
    pub tag_name: String,
    pub class_name: String,
    pub id: String,
    pub text: Option<String>,
}

/// Current scroll offsets and viewport geometry
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollPosition {
    pub scroll_y: f64,
    pub scroll_x: f64,
    pub document_height: u32,
    pub window_height: u32,
}

/// A key press with its modifier state
#[derive(Debug, Clone, Default)]
pub struct KeyPress {
    pub key: String,
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

impl KeyPress {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PageVisit<'a> {
    referrer: &'a str,
    user_agent: &'a str,
    timestamp: i64,
}

#[derive(Serialize)]
struct MouseMove {
    x: i32,
    y: i32,
    timestamp: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Click<'a> {
    tag_name: &'a str,
    class_name: &'a str,
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    x: i32,
    y: i32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KeyPressData<'a> {
    key: &'a str,
    ctrl_key: bool,
    alt_key: bool,
    shift_key: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FormInteraction<'a> {
    event_type: &'static str,
    input_type: &'a str,
    input_name: &'a str,
    input_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    form_id: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VisibilityChange {
    hidden: bool,
    visibility_state: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Heartbeat {
    active_time: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TimeSpent<'a> {
    time_spent: u64,
    url: &'a str,
}

/// Queue side of the delivery worker, stamped with the page URL
#[derive(Clone)]
struct Emitter {
    tx: mpsc::Sender<TrackingEvent>,
    url: Arc<str>,
}

impl Emitter {
    /// Queue an event without waiting; returns false if it was dropped
    fn emit(&self, event_type: &str, data: impl Serialize) -> bool {
        let data = match serde_json::to_value(data) {
            Ok(data) => data,
            Err(e) => {
                warn!(event_type, error = %e, "Failed to serialize tracking data");
                return false;
            }
        };

        let event = TrackingEvent::new(event_type, data, &*self.url);
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(event_type, "Tracking buffer full, dropping event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(event_type, "Tracking worker stopped, dropping event");
                false
            }
        }
    }
}

/// Tracks one page view
pub struct Tracker {
    emitter: Emitter,
    page: PageContext,
    started: Instant,
    mouse: Debouncer,
    scroll: Debouncer,
    heartbeat: JoinHandle<()>,
    worker: Option<JoinHandle<()>>,
    finished: bool,
}

impl Tracker {
    /// Start tracking a page and emit `page_visit`
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(sink: Arc<dyn EventSink>, page: PageContext, policy: TrackerPolicy) -> Self {
        let (tx, rx) = mpsc::channel(policy.buffer_size.max(1));
        let worker = tokio::spawn(deliver(rx, sink));

        let emitter = Emitter {
            tx,
            url: Arc::from(page.url.as_str()),
        };
        let started = Instant::now();

        emitter.emit(
            "page_visit",
            PageVisit {
                referrer: &page.referrer,
                user_agent: &page.user_agent,
                timestamp: Utc::now().timestamp_millis(),
            },
        );

        let heartbeat = tokio::spawn(heartbeat_loop(
            emitter.clone(),
            started,
            policy.heartbeat_interval,
        ));

        debug!(url = %page.url, "Tracker started");

        Self {
            emitter,
            page,
            started,
            mouse: Debouncer::new(policy.mouse_debounce),
            scroll: Debouncer::new(policy.scroll_debounce),
            heartbeat,
            worker: Some(worker),
            finished: false,
        }
    }

    pub fn page(&self) -> &PageContext {
        &self.page
    }

    /// Pointer moved; reported once movement has stopped for the debounce period
    pub fn mouse_move(&self, x: i32, y: i32) {
        let emitter = self.emitter.clone();
        self.mouse.schedule(async move {
            emitter.emit(
                "mouse_move",
                MouseMove {
                    x,
                    y,
                    timestamp: Utc::now().timestamp_millis(),
                },
            );
        });
    }

    /// Page scrolled; reported once scrolling has stopped for the debounce period
    pub fn scroll(&self, position: ScrollPosition) {
        let emitter = self.emitter.clone();
        self.scroll.schedule(async move {
            emitter.emit("scroll", position);
        });
    }

    /// Every click is reported
    pub fn click(&self, target: &ClickTarget, x: i32, y: i32) {
        let text = target
            .text
            .as_ref()
            .map(|text| text.chars().take(MAX_CLICK_TEXT_CHARS).collect());

        self.emitter.emit(
            "click",
            Click {
                tag_name: &target.tag_name,
                class_name: &target.class_name,
                id: &target.id,
                text,
                x,
                y,
            },
        );
    }

    /// Only allowlisted keys are reported
    pub fn key_press(&self, key: &KeyPress) -> bool {
        if !is_tracked_key(&key.key) {
            return false;
        }

        self.emitter.emit(
            "key_press",
            KeyPressData {
                key: &key.key,
                ctrl_key: key.ctrl,
                alt_key: key.alt,
                shift_key: key.shift,
            },
        )
    }

    /// Focus, blur or change on a form control; password inputs are skipped
    pub fn form_interaction(&self, kind: FormEventKind, field: &FormField) -> bool {
        if field.is_excluded() {
            return false;
        }

        self.emitter.emit(
            "form_interaction",
            FormInteraction {
                event_type: kind.as_str(),
                input_type: &field.input_type,
                input_name: &field.name,
                input_id: &field.id,
                form_id: field.form_id.as_deref(),
            },
        )
    }

    pub fn visibility_change(&self, hidden: bool) {
        self.emitter.emit(
            "visibility_change",
            VisibilityChange {
                hidden,
                visibility_state: if hidden { "hidden" } else { "visible" },
            },
        );
    }

    /// Stop the timers and report how long the page was open. Runs once.
    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        self.heartbeat.abort();
        self.mouse.cancel();
        self.scroll.cancel();

        self.emitter.emit(
            "time_spent",
            TimeSpent {
                time_spent: self.started.elapsed().as_secs(),
                url: &self.page.url,
            },
        );
    }

    /// End the page view
    ///
    /// Pending debounced events are discarded, `time_spent` and `page_leave`
    /// are queued, and the call returns once every queued event has been
    /// handed to the sink.
    pub async fn leave(mut self) {
        self.finish();
        self.emitter.emit("page_leave", Value::Object(Default::default()));

        let worker = self.worker.take();
        // Closing the queue lets the worker drain and exit
        drop(self);

        if let Some(worker) = worker
            && let Err(e) = worker.await
        {
            warn!(error = %e, "Tracking worker failed");
        }
    }
}

/// A tracker dropped without `leave` still reports `time_spent`; the
/// detached worker delivers it after the queue closes.
impl Drop for Tracker {
    fn drop(&mut self) {
        self.finish();
    }
}

async fn heartbeat_loop(emitter: Emitter, started: Instant, period: Duration) {
    let period = period.max(Duration::from_millis(1));
    let mut interval = time::interval_at(time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        emitter.emit(
            "heartbeat",
            Heartbeat {
                active_time: started.elapsed().as_millis() as u64,
            },
        );
    }
}

async fn deliver(mut rx: mpsc::Receiver<TrackingEvent>, sink: Arc<dyn EventSink>) {
    while let Some(event) = rx.recv().await {
        let event_type = event.type_key().to_string();
        if let Err(e) = sink.send(event).await {
            warn!(event_type = %event_type, error = %e, "Tracking failed");
        }
    }
    debug!("Tracking worker exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    fn fast_policy() -> TrackerPolicy {
        TrackerPolicy {
            mouse_debounce: Duration::from_millis(40),
            scroll_debounce: Duration::from_millis(20),
            heartbeat_interval: Duration::from_secs(3600),
            buffer_size: 64,
        }
    }

    fn start(sink: &MemorySink, policy: TrackerPolicy) -> Tracker {
        Tracker::start(
            Arc::new(sink.clone()),
            PageContext::new("http://lure.example/login")
                .with_referrer("http://mail.example/")
                .with_user_agent("Mozilla/5.0"),
            policy,
        )
    }

    #[tokio::test]
    async fn test_start_and_leave_bracket_the_visit() {
        let sink = MemorySink::new();
        let tracker = start(&sink, fast_policy());
        tracker.leave().await;

        assert_eq!(sink.event_types(), vec!["page_visit", "time_spent", "page_leave"]);

        let events = sink.events();
        let visit = &events[0];
        assert_eq!(visit.url_str(), Some("http://lure.example/login"));
        assert_eq!(visit.data["referrer"], "http://mail.example/");
        assert_eq!(visit.data["userAgent"], "Mozilla/5.0");
        assert!(visit.data["timestamp"].is_i64());
        assert!(visit.timestamp.as_ref().and_then(|t| t.as_str()).unwrap().ends_with('Z'));

        assert_eq!(events[1].data["timeSpent"], 0);
        assert_eq!(events[1].data["url"], "http://lure.example/login");
        assert_eq!(events[2].data, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_mouse_burst_reports_last_position_once() {
        let sink = MemorySink::new();
        let tracker = start(&sink, fast_policy());

        for i in 0..10 {
            tracker.mouse_move(i, i * 2);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        tracker.leave().await;

        let moves: Vec<_> = sink
            .events()
            .into_iter()
            .filter(|e| e.type_key() == "mouse_move")
            .collect();
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].data["x"], 9);
        assert_eq!(moves[0].data["y"], 18);
    }

    #[tokio::test]
    async fn test_scroll_is_debounced() {
        let sink = MemorySink::new();
        let tracker = start(&sink, fast_policy());

        for offset in [100.0, 200.0, 300.0] {
            tracker.scroll(ScrollPosition {
                scroll_y: offset,
                scroll_x: 0.0,
                document_height: 4000,
                window_height: 900,
            });
        }
        tokio::time::sleep(Duration::from_millis(150)).await;
        tracker.leave().await;

        let scrolls: Vec<_> = sink
            .events()
            .into_iter()
            .filter(|e| e.type_key() == "scroll")
            .collect();
        assert_eq!(scrolls.len(), 1);
        assert_eq!(scrolls[0].data["scrollY"], 300.0);
        assert_eq!(scrolls[0].data["documentHeight"], 4000);
        assert_eq!(scrolls[0].data["windowHeight"], 900);
    }

    #[tokio::test]
    async fn test_leave_discards_pending_debounce() {
        let sink = MemorySink::new();
        let policy = TrackerPolicy {
            mouse_debounce: Duration::from_secs(60),
            ..fast_policy()
        };
        let tracker = start(&sink, policy);

        tracker.mouse_move(1, 1);
        tracker.leave().await;

        assert!(!sink.event_types().contains(&"mouse_move".to_string()));
    }

    #[tokio::test]
    async fn test_click_text_is_truncated() {
        let sink = MemorySink::new();
        let tracker = start(&sink, fast_policy());

        tracker.click(
            &ClickTarget {
                tag_name: "BUTTON".to_string(),
                class_name: "btn primary".to_string(),
                id: "submit".to_string(),
                text: Some("é".repeat(150)),
            },
            10,
            20,
        );
        tracker.leave().await;

        let click = &sink.events()[1];
        assert_eq!(click.type_key(), "click");
        assert_eq!(click.data["tagName"], "BUTTON");
        assert_eq!(click.data["className"], "btn primary");
        assert_eq!(click.data["id"], "submit");
        assert_eq!(click.data["text"].as_str().unwrap().chars().count(), 100);
        assert_eq!(click.data["x"], 10);
        assert_eq!(click.data["y"], 20);
    }

    #[tokio::test]
    async fn test_only_allowlisted_keys_are_reported() {
        let sink = MemorySink::new();
        let tracker = start(&sink, fast_policy());

        assert!(!tracker.key_press(&KeyPress::new("a")));
        assert!(!tracker.key_press(&KeyPress::new("Shift")));
        assert!(tracker.key_press(&KeyPress {
            key: "Enter".to_string(),
            ctrl: true,
            alt: false,
            shift: true,
        }));
        tracker.leave().await;

        let keys: Vec<_> = sink
            .events()
            .into_iter()
            .filter(|e| e.type_key() == "key_press")
            .collect();
        assert_eq!(keys.len(), 1);
        assert_eq!(
            keys[0].data,
            serde_json::json!({"key": "Enter", "ctrlKey": true, "altKey": false, "shiftKey": true})
        );
    }

    #[tokio::test]
    async fn test_password_fields_are_never_reported() {
        let sink = MemorySink::new();
        let tracker = start(&sink, fast_policy());

        let email = FormField::new("email", "login").with_id("email").in_form("signin");
        let password = FormField::new("password", "pw").with_id("pw").in_form("signin");

        assert!(tracker.form_interaction(FormEventKind::Focus, &email));
        assert!(!tracker.form_interaction(FormEventKind::Focus, &password));
        assert!(!tracker.form_interaction(FormEventKind::Change, &password));
        assert!(tracker.form_interaction(FormEventKind::Blur, &email));
        tracker.leave().await;

        let forms: Vec<_> = sink
            .events()
            .into_iter()
            .filter(|e| e.type_key() == "form_interaction")
            .collect();
        assert_eq!(forms.len(), 2);
        assert_eq!(forms[0].data["eventType"], "focus");
        assert_eq!(forms[0].data["inputType"], "email");
        assert_eq!(forms[0].data["inputName"], "login");
        assert_eq!(forms[0].data["inputId"], "email");
        assert_eq!(forms[0].data["formId"], "signin");
        assert_eq!(forms[1].data["eventType"], "blur");
    }

    #[tokio::test]
    async fn test_visibility_change() {
        let sink = MemorySink::new();
        let tracker = start(&sink, fast_policy());

        tracker.visibility_change(true);
        tracker.visibility_change(false);
        tracker.leave().await;

        let events = sink.events();
        assert_eq!(events[1].data["hidden"], true);
        assert_eq!(events[1].data["visibilityState"], "hidden");
        assert_eq!(events[2].data["visibilityState"], "visible");
    }

    #[tokio::test]
    async fn test_heartbeat_reports_active_time() {
        let sink = MemorySink::new();
        let policy = TrackerPolicy {
            heartbeat_interval: Duration::from_millis(50),
            ..fast_policy()
        };
        let tracker = start(&sink, policy);

        tokio::time::sleep(Duration::from_millis(180)).await;
        tracker.leave().await;

        let beats: Vec<_> = sink
            .events()
            .into_iter()
            .filter(|e| e.type_key() == "heartbeat")
            .collect();
        assert!(beats.len() >= 2, "expected periodic heartbeats, got {}", beats.len());
        assert!(beats[0].data["activeTime"].as_u64().unwrap() >= 50);
    }

    #[tokio::test]
    async fn test_no_heartbeat_before_first_interval() {
        let sink = MemorySink::new();
        let tracker = start(&sink, fast_policy());

        tokio::time::sleep(Duration::from_millis(50)).await;
        tracker.leave().await;

        assert!(!sink.event_types().contains(&"heartbeat".to_string()));
    }

    #[tokio::test]
    async fn test_drop_without_leave_still_reports_time_spent() {
        let sink = MemorySink::new();
        let tracker = start(&sink, fast_policy());
        tracker.mouse_move(1, 1);
        drop(tracker);

        // The detached worker drains the queue on its own
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(sink.event_types(), vec!["page_visit", "time_spent"]);
        let time_spent = &sink.events()[1];
        assert_eq!(time_spent.data["timeSpent"], 0);
        assert_eq!(time_spent.data["url"], "http://lure.example/login");
    }

    #[tokio::test]
    async fn test_leave_reports_time_spent_once() {
        let sink = MemorySink::new();
        start(&sink, fast_policy()).leave().await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        let count = sink
            .event_types()
            .iter()
            .filter(|t| *t == "time_spent")
            .count();
        assert_eq!(count, 1);
    }
}
