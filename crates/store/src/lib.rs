//! Data model and repository seam for the reclaim core.
//!
//! Components never touch a concrete database: they hold an
//! `Arc<dyn ItemStore>` injected at construction time. The trait exposes the
//! two atomic primitives the engines rely on (the create-and-lock step for
//! matches and the paired claim+item transition) so a backend can implement
//! them with a transaction while the bundled [`MemoryStore`] uses a single
//! write lock over its table set.

pub mod backend;
pub mod models;

pub use backend::MemoryStore;
pub use models::*;

use thiserror::Error;

/// Errors surfaced by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        StoreError::Backend(msg.into())
    }

    pub fn not_found(entity: &'static str, id: u64) -> Self {
        StoreError::NotFound { entity, id }
    }
}

/// Outcome of the atomic create-and-lock step for a candidate pair.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// Match created; both items flipped Active -> Matched.
    Created(MatchRecord),
    /// Another caller locked one of the items first. Benign; skip the pair.
    RaceLost,
    /// A match for this (lost, found) pair already exists.
    Duplicate,
}

/// Which item table a status update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemTarget {
    Lost,
    Found,
}

/// One item-status write applied inside a claim transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemStatusUpdate {
    pub target: ItemTarget,
    pub id: ItemId,
    /// When set, the write only applies if the current status matches;
    /// `None` writes unconditionally.
    pub expected: Option<ItemStatus>,
    pub next: ItemStatus,
}

impl ItemStatusUpdate {
    pub fn unconditional(target: ItemTarget, id: ItemId, next: ItemStatus) -> Self {
        Self {
            target,
            id,
            expected: None,
            next,
        }
    }
}

/// A claim-status move plus every write that must land with it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimTransition {
    pub claim_id: ClaimId,
    /// CAS guard: the transition only applies while the claim still holds
    /// this status.
    pub from: ClaimStatus,
    pub to: ClaimStatus,
    pub item_updates: Vec<ItemStatusUpdate>,
    pub match_updates: Vec<(MatchId, MatchStatus)>,
    /// Recorded on the claim when present (verification submissions).
    pub answers: Option<VerificationAnswers>,
    pub rejection_reason: Option<String>,
}

impl ClaimTransition {
    pub fn new(claim_id: ClaimId, from: ClaimStatus, to: ClaimStatus) -> Self {
        Self {
            claim_id,
            from,
            to,
            item_updates: Vec::new(),
            match_updates: Vec::new(),
            answers: None,
            rejection_reason: None,
        }
    }
}

/// Result of [`ItemStore::transition_claim`].
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimTransitionOutcome {
    /// The claim and all paired writes were applied together.
    Applied(Claim),
    /// The CAS guard failed: another caller moved the claim first.
    RaceLost { current: ClaimStatus },
}

/// Repository interface for items, matches and claims.
///
/// `update only if current status equals X` is the primitive everything
/// race-sensitive builds on; implementations must make the compound
/// operations atomic with respect to concurrent callers.
pub trait ItemStore: Send + Sync {
    // Items
    fn insert_lost(&self, item: NewLostItem) -> Result<LostItem, StoreError>;
    fn insert_found(&self, item: NewFoundItem) -> Result<FoundItem, StoreError>;
    fn lost(&self, id: ItemId) -> Result<Option<LostItem>, StoreError>;
    fn found(&self, id: ItemId) -> Result<Option<FoundItem>, StoreError>;
    fn lost_by_status(&self, status: ItemStatus) -> Result<Vec<LostItem>, StoreError>;
    fn found_by_status(&self, status: ItemStatus) -> Result<Vec<FoundItem>, StoreError>;

    /// Compare-and-set on a lost item's status. `Ok(false)` means the caller
    /// lost the race (current status differed from `expected`).
    fn set_lost_status(
        &self,
        id: ItemId,
        expected: ItemStatus,
        next: ItemStatus,
    ) -> Result<bool, StoreError>;

    fn set_found_status(
        &self,
        id: ItemId,
        expected: ItemStatus,
        next: ItemStatus,
    ) -> Result<bool, StoreError>;

    // Matches
    /// Atomically create a match for the pair and lock both items.
    ///
    /// In one indivisible step: verify no match exists for the ordered pair,
    /// verify both items are still `Active`, insert the match record and flip
    /// both items to `Matched`. Partial application is never observable.
    fn create_match_locking(
        &self,
        lost_id: ItemId,
        found_id: ItemId,
        confidence: u8,
        details: scoring::ScoreDetails,
    ) -> Result<MatchOutcome, StoreError>;

    fn match_record(&self, id: MatchId) -> Result<Option<MatchRecord>, StoreError>;
    fn match_for_pair(
        &self,
        lost_id: ItemId,
        found_id: ItemId,
    ) -> Result<Option<MatchRecord>, StoreError>;
    fn matches_for_lost(&self, lost_id: ItemId) -> Result<Vec<MatchRecord>, StoreError>;
    fn matches_for_found(&self, found_id: ItemId) -> Result<Vec<MatchRecord>, StoreError>;

    // Claims
    fn insert_claim(&self, claim: NewClaim) -> Result<Claim, StoreError>;
    fn claim(&self, id: ClaimId) -> Result<Option<Claim>, StoreError>;
    fn claims_for_found(&self, found_id: ItemId) -> Result<Vec<Claim>, StoreError>;

    /// The open (non-rejected) claim on a found item, if any.
    fn open_claim_for_found(&self, found_id: ItemId) -> Result<Option<Claim>, StoreError>;

    /// The given user's `Approved` claim on a found item, if any. The privacy
    /// gate re-reads this on every request.
    fn approved_claim_for(
        &self,
        found_id: ItemId,
        user_id: UserId,
    ) -> Result<Option<Claim>, StoreError>;

    /// Apply a claim-status CAS together with its paired item and match
    /// writes, all-or-nothing.
    fn transition_claim(
        &self,
        transition: ClaimTransition,
    ) -> Result<ClaimTransitionOutcome, StoreError>;
}
