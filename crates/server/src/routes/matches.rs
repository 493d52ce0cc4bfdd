use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use ledger::ItemReport;
use serde_json::json;
use std::sync::Arc;

/// Matches recorded for a lost item.
pub async fn matches_for_lost(
    State(state): State<Arc<ServerState>>,
    Path(item_id): Path<u64>,
) -> ServerResult<impl IntoResponse> {
    if state.store.lost(item_id)?.is_none() {
        return Err(ServerError::NotFound);
    }
    let records = state.store.matches_for_lost(item_id)?;
    Ok(Json(records))
}

/// Matches recorded for a found item.
pub async fn matches_for_found(
    State(state): State<Arc<ServerState>>,
    Path(item_id): Path<u64>,
) -> ServerResult<impl IntoResponse> {
    if state.store.found(item_id)?.is_none() {
        return Err(ServerError::NotFound);
    }
    let records = state.store.matches_for_found(item_id)?;
    Ok(Json(records))
}

/// Re-run the matching pass for a lost item that is still waiting.
pub async fn rematch_lost(
    State(state): State<Arc<ServerState>>,
    Path(item_id): Path<u64>,
) -> ServerResult<impl IntoResponse> {
    let item = state.store.lost(item_id)?.ok_or(ServerError::NotFound)?;

    let ledger = state.ledger.clone();
    let report = ItemReport::Lost(item);
    let created = tokio::task::spawn_blocking(move || ledger.run_matching_pass(&report))
        .await
        .map_err(|e| ServerError::Internal(format!("matching task failed: {e}")))??;

    if created.is_empty() {
        return Ok(Json(json!({
            "status": "waiting",
            "message": "No match found yet. Please wait for new data.",
            "matches": created,
        })));
    }
    Ok(Json(json!({
        "status": "success",
        "matches": created,
    })))
}
