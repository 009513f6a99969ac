//! What gets tracked and how often

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Keys reported by `key_press`; everything else is ignored
pub const KEY_ALLOWLIST: [&str; 4] = ["Enter", "Escape", "Tab", "Backspace"];

/// Whether a key press should be reported
pub fn is_tracked_key(key: &str) -> bool {
    KEY_ALLOWLIST.contains(&key)
}

/// Timing knobs for a tracker instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerPolicy {
    /// Quiet period before the last mouse position is reported
    #[serde(default = "default_mouse_debounce", with = "millis")]
    pub mouse_debounce: Duration,

    /// Quiet period before the last scroll position is reported
    #[serde(default = "default_scroll_debounce", with = "millis")]
    pub scroll_debounce: Duration,

    /// Period of the heartbeat event
    #[serde(default = "default_heartbeat_interval", with = "millis")]
    pub heartbeat_interval: Duration,

    /// Events queued for delivery before new ones are dropped
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_mouse_debounce() -> Duration {
    Duration::from_secs(1)
}

fn default_scroll_debounce() -> Duration {
    Duration::from_millis(500)
}

fn default_heartbeat_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_buffer_size() -> usize {
    256
}

impl Default for TrackerPolicy {
    fn default() -> Self {
        Self {
            mouse_debounce: default_mouse_debounce(),
            scroll_debounce: default_scroll_debounce(),
            heartbeat_interval: default_heartbeat_interval(),
            buffer_size: default_buffer_size(),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

/// Form control lifecycle event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEventKind {
    Focus,
    Blur,
    Change,
}

impl FormEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormEventKind::Focus => "focus",
            FormEventKind::Blur => "blur",
            FormEventKind::Change => "change",
        }
    }
}

/// Description of a form control, never its value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormField {
    /// Input type attribute ("text", "email", "password", ...)
    pub input_type: String,
    pub name: String,
    pub id: String,
    /// Id of the enclosing form, if any
    pub form_id: Option<String>,
}

impl FormField {
    pub fn new(input_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            input_type: input_type.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn in_form(mut self, form_id: impl Into<String>) -> Self {
        self.form_id = Some(form_id.into());
        self
    }

    /// Password inputs are never reported
    pub fn is_excluded(&self) -> bool {
        self.input_type == "password"
    }
}
