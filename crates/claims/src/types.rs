use serde::{Deserialize, Serialize};
use store::models::{AssetRef, ClaimId, ClaimStatus, ItemId, UserId, VerificationAnswers};
use store::StoreError;
use thiserror::Error;

/// Input for [`crate::ClaimEngine::initiate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitiateClaim {
    pub found_item_id: ItemId,
    /// The claimant's own lost report, when they have one. Linking it lets
    /// verification check the recorded unique marks.
    pub lost_item_id: Option<ItemId>,
    pub claimant_id: UserId,
    #[serde(default)]
    pub answers: VerificationAnswers,
    pub proof_asset: Option<AssetRef>,
}

/// The admin decision on a claim under review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminAction {
    Approve,
    Reject,
}

/// Errors surfaced by the claim engine.
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("claim {0} not found")]
    ClaimNotFound(ClaimId),

    #[error("item {0} not found")]
    ItemNotFound(ItemId),

    #[error("invalid claim transition from {from} to {to}")]
    InvalidTransition { from: ClaimStatus, to: ClaimStatus },

    #[error("found item {0} is not claimable")]
    NotClaimable(ItemId),

    #[error("user {0} is not allowed to perform this action")]
    Unauthorized(UserId),

    /// Another caller moved the claim first. Benign: the caller should
    /// re-read and treat its own request as a no-op.
    #[error("claim {0} was updated concurrently")]
    RaceLost(ClaimId),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
