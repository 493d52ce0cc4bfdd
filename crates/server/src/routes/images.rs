use crate::error::{ServerError, ServerResult};
use crate::middleware::Identity;
use crate::state::ServerState;
use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use std::sync::Arc;

const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G'];

/// Evidence references carry no extension; sniff the encoded bytes.
fn content_type_for(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(PNG_MAGIC) {
        "image/png"
    } else {
        "image/jpeg"
    }
}

/// The public (blurred) copy of a found item's evidence.
///
/// 404 when masking failed and the copy was withheld for manual review;
/// the original never stands in for it.
pub async fn masked_image(
    State(state): State<Arc<ServerState>>,
    Path(item_id): Path<u64>,
) -> ServerResult<impl IntoResponse> {
    let gate = state.gate.clone();
    let bytes = tokio::task::spawn_blocking(move || gate.masked_copy(item_id))
        .await
        .map_err(|e| ServerError::Internal(format!("image task failed: {e}")))??;

    Ok(([(CONTENT_TYPE, content_type_for(&bytes))], bytes))
}

/// The original evidence image, decrypted only for an authorized requester:
/// an admin, the finder, or the holder of an approved claim.
pub async fn original_image(
    State(state): State<Arc<ServerState>>,
    Identity(requester): Identity,
    Path(item_id): Path<u64>,
) -> ServerResult<impl IntoResponse> {
    let gate = state.gate.clone();
    let bytes =
        tokio::task::spawn_blocking(move || gate.reveal_original(&requester, item_id))
            .await
            .map_err(|e| ServerError::Internal(format!("image task failed: {e}")))??;

    Ok(([(CONTENT_TYPE, content_type_for(&bytes))], bytes))
}
