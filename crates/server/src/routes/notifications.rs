use crate::error::ServerResult;
use crate::middleware::Identity;
use crate::state::ServerState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// The requester's notification feed, in delivery order.
pub async fn list_notifications(
    State(state): State<Arc<ServerState>>,
    Identity(requester): Identity,
) -> ServerResult<impl IntoResponse> {
    Ok(Json(state.dispatch.inbox(requester.id)))
}
