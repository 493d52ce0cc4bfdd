use crate::error::{ServerError, ServerResult};
use crate::middleware::Identity;
use crate::state::ServerState;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use claims::{AdminAction, ClaimError, InitiateClaim};
use serde::Deserialize;
use std::sync::Arc;
use store::models::{AssetRef, ItemId, VerificationAnswers};

#[derive(Debug, Deserialize)]
pub struct InitiateClaimRequest {
    pub found_item_id: ItemId,
    pub lost_item_id: Option<ItemId>,
    #[serde(default)]
    pub answers: VerificationAnswers,
    pub proof_asset: Option<AssetRef>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub answers: VerificationAnswers,
}

#[derive(Debug, Deserialize)]
pub struct AdminActionRequest {
    pub action: AdminAction,
    pub reason: Option<String>,
}

/// Open a claim against a found item.
pub async fn initiate_claim(
    State(state): State<Arc<ServerState>>,
    Identity(requester): Identity,
    Json(request): Json<InitiateClaimRequest>,
) -> ServerResult<impl IntoResponse> {
    let claim = state.claims.initiate(InitiateClaim {
        found_item_id: request.found_item_id,
        lost_item_id: request.lost_item_id,
        claimant_id: requester.id,
        answers: request.answers,
        proof_asset: request.proof_asset,
    })?;
    Ok(Json(claim))
}

/// Fetch one claim. Claimant, finder and admins only.
pub async fn get_claim(
    State(state): State<Arc<ServerState>>,
    Identity(requester): Identity,
    Path(claim_id): Path<u64>,
) -> ServerResult<impl IntoResponse> {
    let claim = state
        .store
        .claim(claim_id)?
        .ok_or(ServerError::Claim(ClaimError::ClaimNotFound(claim_id)))?;

    let is_party = claim.claimant_id == requester.id
        || state
            .store
            .found(claim.found_item_id)?
            .map(|item| item.finder_id == requester.id)
            .unwrap_or(false);
    if !is_party && !requester.is_admin() {
        return Err(ServerError::Claim(ClaimError::Unauthorized(requester.id)));
    }
    Ok(Json(claim))
}

/// Submit verification answers for a pending claim.
pub async fn submit_verification(
    State(state): State<Arc<ServerState>>,
    Identity(requester): Identity,
    Path(claim_id): Path<u64>,
    Json(request): Json<VerifyRequest>,
) -> ServerResult<impl IntoResponse> {
    let claim = state
        .claims
        .submit_verification(claim_id, requester.id, request.answers)?;
    Ok(Json(claim))
}

/// Approve or reject a claim under review. Admin only.
pub async fn admin_action(
    State(state): State<Arc<ServerState>>,
    Identity(requester): Identity,
    Path(claim_id): Path<u64>,
    Json(request): Json<AdminActionRequest>,
) -> ServerResult<impl IntoResponse> {
    let claim =
        state
            .claims
            .admin_action(claim_id, request.action, &requester, request.reason)?;
    Ok(Json(claim))
}

/// Mark the handover finished.
pub async fn complete_claim(
    State(state): State<Arc<ServerState>>,
    Identity(requester): Identity,
    Path(claim_id): Path<u64>,
) -> ServerResult<impl IntoResponse> {
    let claim = state.claims.complete(claim_id, &requester)?;
    Ok(Json(claim))
}
