//! Scripted page visit
//!
//! Drives a tracker through a typical lure-page session: mouse movement,
//! scrolling, form interaction, a click and the tab being hidden and shown.
//! Used by the server's `simulate` command and by end-to-end tests.

use std::time::Duration;

use tracing::info;

use crate::{
    policy::{FormEventKind, FormField},
    tracker::{ClickTarget, KeyPress, ScrollPosition, Tracker},
};

/// Run one scripted visit, then leave the page
///
/// `settle` is slept after each debounced burst so the trailing event fires;
/// pass something longer than the tracker's debounce periods.
pub async fn run_scenario(tracker: Tracker, settle: Duration) {
    info!(url = %tracker.page().url, "Simulating page visit");

    for step in 0..8 {
        tracker.mouse_move(120 + step * 15, 300 + step * 4);
    }
    tokio::time::sleep(settle).await;

    for offset in [120.0, 480.0, 960.0] {
        tracker.scroll(ScrollPosition {
            scroll_y: offset,
            scroll_x: 0.0,
            document_height: 2400,
            window_height: 900,
        });
    }
    tokio::time::sleep(settle).await;

    let email = FormField::new("email", "email")
        .with_id("email")
        .in_form("login-form");
    let password = FormField::new("password", "password")
        .with_id("password")
        .in_form("login-form");

    tracker.form_interaction(FormEventKind::Focus, &email);
    tracker.form_interaction(FormEventKind::Change, &email);
    tracker.form_interaction(FormEventKind::Blur, &email);
    tracker.form_interaction(FormEventKind::Focus, &password);
    tracker.key_press(&KeyPress::new("p"));
    tracker.key_press(&KeyPress::new("Tab"));
    tracker.form_interaction(FormEventKind::Blur, &password);

    tracker.click(
        &ClickTarget {
            tag_name: "BUTTON".to_string(),
            class_name: "btn btn-primary".to_string(),
            id: "sign-in".to_string(),
            text: Some("Sign in".to_string()),
        },
        640,
        512,
    );
    tracker.key_press(&KeyPress::new("Enter"));

    tracker.visibility_change(true);
    tracker.visibility_change(false);

    tracker.leave().await;
}

/// Event types a full scenario run produces, in order
pub const SCENARIO_EVENT_TYPES: [&str; 11] = [
    "page_visit",
    "mouse_move",
    "scroll",
    "form_interaction",
    "form_interaction",
    "form_interaction",
    "key_press",
    "click",
    "key_press",
    "visibility_change",
    "visibility_change",
];
