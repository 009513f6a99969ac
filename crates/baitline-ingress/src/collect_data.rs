//! Free-form data collection
//!
//! `POST /api/collect-data` stores any JSON object together with the server
//! time, the derived client IP and four request headers. `GET` dumps the
//! entire store to any caller; there is no access control on this path.

use std::time::Instant;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    routing::post,
};
use baitline_core::CollectedRecord;
use tracing::{debug, info};

use crate::{
    lookup::ClientContext,
    state::IngressState,
    types::{CollectAck, CollectedDump, IngressError, IngressResult},
};

pub const PATH: &str = "/api/collect-data";
const ENDPOINT: &str = "collect_data";

pub fn router(state: IngressState) -> Router {
    Router::new()
        .route(PATH, post(collect).get(dump))
        .with_state(state)
}

async fn collect(
    State(state): State<IngressState>,
    client: ClientContext,
    body: Bytes,
) -> IngressResult<Json<CollectAck>> {
    let start = Instant::now();

    match record(&state, &client, &body).await {
        Ok(data_id) => {
            if let Some(metrics) = &state.metrics {
                metrics.record_ingest(
                    ENDPOINT,
                    state.collected.name(),
                    start.elapsed().as_secs_f64(),
                );
            }
            Ok(Json(CollectAck {
                success: true,
                message: "Data collected successfully".to_string(),
                data_id,
            }))
        }
        Err(err) => {
            if let Some(metrics) = &state.metrics {
                metrics.record_ingest_failure(ENDPOINT, start.elapsed().as_secs_f64());
            }
            Err(IngressError::Collection(err))
        }
    }
}

async fn record(
    state: &IngressState,
    client: &ClientContext,
    body: &[u8],
) -> baitline_core::Result<usize> {
    let payload: serde_json::Value = serde_json::from_slice(body)?;
    let record =
        CollectedRecord::from_payload(payload, client.client_ip(), client.forwarded_headers())?;

    debug!(
        record = %serde_json::to_string(&record).unwrap_or_default(),
        "Collected record"
    );

    let data_id = state.collected.append(record).await?;
    info!(data_id, "Collected user data");
    Ok(data_id)
}

async fn dump(
    State(state): State<IngressState>,
) -> IngressResult<Json<CollectedDump<CollectedRecord>>> {
    let start = Instant::now();

    let data = state
        .collected
        .snapshot()
        .await
        .map_err(|source| IngressError::StoreRead {
            store: state.collected.name().to_string(),
            source,
        })?;

    if let Some(metrics) = &state.metrics {
        metrics.record_read(ENDPOINT, start.elapsed().as_secs_f64());
    }

    Ok(Json(CollectedDump {
        total_entries: data.len(),
        data,
    }))
}
