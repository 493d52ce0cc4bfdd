//! API route handlers
//!
//! Routes are organized by functionality:
//!
//! - `health`: Health checks and readiness
//! - `items`: Lost/found report submission and listing
//! - `matches`: Match listing and manual rematch
//! - `claims`: The claim workflow (initiate, verify, admin action, complete)
//! - `images`: Masked and original evidence retrieval
//! - `notifications`: Per-user notification feed

pub mod claims;
pub mod health;
pub mod images;
pub mod items;
pub mod matches;
pub mod notifications;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info
///
/// The root endpoint (GET /) requires no authentication.
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "Reclaim Server",
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": "v1",
        "endpoints": [
            "/api/v1/items/lost",
            "/api/v1/items/found",
            "/api/v1/items/lost/{id}/matches",
            "/api/v1/items/found/{id}/matches",
            "/api/v1/claims",
            "/api/v1/claims/{id}/verify",
            "/api/v1/claims/{id}/admin",
            "/api/v1/claims/{id}/complete",
            "/api/v1/images/masked/{item_id}",
            "/api/v1/images/original/{item_id}",
            "/api/v1/notifications",
            "/health",
            "/ready",
            "/metrics"
        ]
    })))
}

/// 404 Not Found handler for undefined routes.
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
