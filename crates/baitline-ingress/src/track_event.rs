//! Interaction event ingest and aggregation
//!
//! `POST /api/track-event` enriches a submitted event with best-effort
//! client metadata and appends it to the event store. `GET` returns summary
//! statistics over the whole store. Neither side is authenticated and the
//! store has no cap.

use std::time::Instant;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    routing::post,
};
use baitline_core::{EventAnalytics, StoredEvent, TrackingEvent};
use tracing::{debug, info};

use crate::{
    lookup::ClientContext,
    state::IngressState,
    types::{Ack, IngressError, IngressResult},
};

pub const PATH: &str = "/api/track-event";
const ENDPOINT: &str = "track_event";

pub fn router(state: IngressState) -> Router {
    Router::new()
        .route(PATH, post(ingest_event).get(event_analytics))
        .with_state(state)
}

/// Parse, enrich and append a single event
///
/// The body is read raw so that a malformed payload produces the generic
/// failure response rather than axum's JSON rejection.
async fn ingest_event(
    State(state): State<IngressState>,
    client: ClientContext,
    body: Bytes,
) -> IngressResult<Json<Ack>> {
    let start = Instant::now();

    match record_event(&state, &client, &body).await {
        Ok(_) => {
            if let Some(metrics) = &state.metrics {
                metrics.record_ingest(
                    ENDPOINT,
                    state.events.name(),
                    start.elapsed().as_secs_f64(),
                );
            }
            Ok(Json(Ack { success: true }))
        }
        Err(err) => {
            if let Some(metrics) = &state.metrics {
                metrics.record_ingest_failure(ENDPOINT, start.elapsed().as_secs_f64());
            }
            Err(IngressError::Tracking(err))
        }
    }
}

async fn record_event(
    state: &IngressState,
    client: &ClientContext,
    body: &[u8],
) -> baitline_core::Result<usize> {
    let event: TrackingEvent = serde_json::from_slice(body)?;
    let stored = StoredEvent::enrich(event, client.enriched_fields());

    let event_type = stored.event.type_key().into_owned();
    info!(
        event_type = %event_type,
        session_id = %stored.session_id,
        data = %stored.event.data,
        "[TRACKING] {}",
        event_type
    );

    let len = state.events.append(stored).await?;
    debug!(store_len = len, "Event appended");
    Ok(len)
}

/// Summary statistics over the current event store
async fn event_analytics(State(state): State<IngressState>) -> IngressResult<Json<EventAnalytics>> {
    let start = Instant::now();

    let events = state
        .events
        .snapshot()
        .await
        .map_err(|source| IngressError::StoreRead {
            store: state.events.name().to_string(),
            source,
        })?;

    let analytics = EventAnalytics::compute(&events);

    if let Some(metrics) = &state.metrics {
        metrics.record_read(ENDPOINT, start.elapsed().as_secs_f64());
    }

    Ok(Json(analytics))
}
