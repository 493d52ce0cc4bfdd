use crate::error::{ServerError, ServerResult};
use crate::middleware::Identity;
use crate::state::ServerState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use base64::Engine;
use chrono::{DateTime, Utc};
use ledger::{ItemReport, MatchCreated};
use privacy::EvidenceRefs;
use scoring::Coordinates;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use store::models::{FoundItem, ItemStatus, LostItem, NewFoundItem, NewLostItem};

/// Report a lost item
#[derive(Debug, Deserialize)]
pub struct ReportLostRequest {
    pub item_name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub unique_marks: String,
    pub color: Option<String>,
    pub material: Option<String>,
    pub location_text: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub date_lost: DateTime<Utc>,
    /// Optional evidence photo, base64-encoded
    pub image_base64: Option<String>,
    /// Blur the public copy (opt out only for non-sensitive photos)
    #[serde(default = "default_true")]
    pub mask_image: bool,
}

/// Report a found item
#[derive(Debug, Deserialize)]
pub struct ReportFoundRequest {
    pub item_name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub condition: Option<String>,
    pub storage_place: Option<String>,
    pub finder_preference: Option<String>,
    pub location_text: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Evidence photo, base64-encoded. Mandatory for found reports: the
    /// photo is what a claimant verifies against.
    pub image_base64: String,
    #[serde(default = "default_true")]
    pub mask_image: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct ReportLostResponse {
    pub item: LostItem,
    pub matches: Vec<MatchCreated>,
}

#[derive(Debug, Serialize)]
pub struct ReportFoundResponse {
    pub item: FoundItem,
    pub matches: Vec<MatchCreated>,
}

/// Submit a lost-item report.
///
/// Evidence processing (blur + encrypt) and the matching pass are CPU-bound
/// and run on the blocking pool, but both are awaited before responding so a
/// created match (and its lock) is never silently dropped.
pub async fn report_lost(
    State(state): State<Arc<ServerState>>,
    Identity(requester): Identity,
    Json(request): Json<ReportLostRequest>,
) -> ServerResult<impl IntoResponse> {
    if request.item_name.trim().is_empty() || request.category.trim().is_empty() {
        return Err(ServerError::BadRequest(
            "item_name and category are required".to_string(),
        ));
    }

    let evidence = match request.image_base64 {
        Some(encoded) => Some(ingest_evidence(&state, encoded, request.mask_image).await?),
        None => None,
    };

    let item = state.store.insert_lost(NewLostItem {
        owner_id: requester.id,
        item_name: request.item_name,
        category: request.category,
        description: request.description,
        unique_marks: request.unique_marks,
        color: request.color,
        material: request.material,
        location_text: request.location_text,
        coordinates: coordinates_from(request.lat, request.lng),
        date_lost: request.date_lost,
        masked_image: evidence.as_ref().and_then(|e| e.masked.clone()),
        original_image: evidence.as_ref().map(|e| e.original.clone()),
        evidence_flagged: evidence.as_ref().map(|e| e.needs_review).unwrap_or(false),
    })?;

    let matches = run_matching_pass(&state, ItemReport::Lost(item.clone())).await?;
    Ok(Json(ReportLostResponse { item, matches }))
}

/// Submit a found-item report.
pub async fn report_found(
    State(state): State<Arc<ServerState>>,
    Identity(requester): Identity,
    Json(request): Json<ReportFoundRequest>,
) -> ServerResult<impl IntoResponse> {
    if request.item_name.trim().is_empty() || request.category.trim().is_empty() {
        return Err(ServerError::BadRequest(
            "item_name and category are required".to_string(),
        ));
    }

    let evidence = ingest_evidence(&state, request.image_base64, request.mask_image).await?;

    let item = state.store.insert_found(NewFoundItem {
        finder_id: requester.id,
        item_name: request.item_name,
        category: request.category,
        description: request.description,
        condition: request.condition,
        storage_place: request.storage_place,
        finder_preference: request.finder_preference,
        location_text: request.location_text,
        coordinates: coordinates_from(request.lat, request.lng),
        masked_image: evidence.masked.clone(),
        original_image: Some(evidence.original.clone()),
        evidence_flagged: evidence.needs_review,
    })?;

    let matches = run_matching_pass(&state, ItemReport::Found(item.clone())).await?;
    Ok(Json(ReportFoundResponse { item, matches }))
}

/// List active lost items.
pub async fn list_lost(State(state): State<Arc<ServerState>>) -> ServerResult<impl IntoResponse> {
    let items = state.store.lost_by_status(ItemStatus::Active)?;
    Ok(Json(items))
}

/// List active found items.
pub async fn list_found(State(state): State<Arc<ServerState>>) -> ServerResult<impl IntoResponse> {
    let items = state.store.found_by_status(ItemStatus::Active)?;
    Ok(Json(items))
}

fn coordinates_from(lat: Option<f64>, lng: Option<f64>) -> Option<Coordinates> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
        _ => None,
    }
}

/// Decode the upload and produce both evidence artifacts off the hot path.
async fn ingest_evidence(
    state: &Arc<ServerState>,
    encoded: String,
    mask: bool,
) -> ServerResult<EvidenceRefs> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| ServerError::BadRequest(format!("invalid image_base64: {e}")))?;

    let gate = state.gate.clone();
    let refs = tokio::task::spawn_blocking(move || {
        if mask {
            gate.ingest_evidence(&bytes)
        } else {
            gate.ingest_public_evidence(&bytes)
        }
    })
    .await
    .map_err(|e| ServerError::Internal(format!("evidence task failed: {e}")))??;

    Ok(refs)
}

async fn run_matching_pass(
    state: &Arc<ServerState>,
    report: ItemReport,
) -> ServerResult<Vec<MatchCreated>> {
    let ledger = state.ledger.clone();
    let matches = tokio::task::spawn_blocking(move || ledger.run_matching_pass(&report))
        .await
        .map_err(|e| ServerError::Internal(format!("matching task failed: {e}")))??;
    Ok(matches)
}
