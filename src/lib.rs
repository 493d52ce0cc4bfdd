//! Umbrella crate for the reclaim lost-and-found core.
//!
//! The member crates each own one concern (scoring, storage, the matching
//! ledger, the claim workflow, the image privacy gate, notification
//! dispatch) and this crate stitches them together behind the [`Reclaim`]
//! facade so embedders and tests drive the whole flow through one handle.

pub use claims::{
    allowed_transitions, validate_transition, AdminAction, ClaimEngine, ClaimError, InitiateClaim,
};
pub use ledger::{
    set_ledger_metrics, ItemReport, LedgerConfig, LedgerError, LedgerMetrics, MatchCreated,
    MatchLedger, ReportKind,
};
pub use notify::{
    MemoryDispatch, Notification, NotificationDispatch, NotificationKind, TracingDispatch,
};
pub use privacy::{
    decrypt_evidence, encrypt_evidence, mask_image, AssetStore, EvidenceKey, EvidenceRefs,
    ImagePrivacyGate, MaskConfig, MemoryAssetStore, PrivacyError,
};
pub use scoring::{
    haversine_km, score_match, token_overlap, Coordinates, MatchScore, ScoreDetails, ScoreInput,
    ScoreWeights,
};
pub use store::{
    models, ItemStore, MatchOutcome, MemoryStore, StoreError,
};

mod config;
pub use config::CoreConfig;

use std::sync::Arc;
use store::models::{
    Claim, ClaimId, FoundItem, ItemId, LostItem, NewFoundItem, NewLostItem, Requester, UserId,
    VerificationAnswers,
};
use thiserror::Error;

/// Any error the core can surface through the facade.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Claim(#[from] ClaimError),
    #[error(transparent)]
    Privacy(#[from] PrivacyError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One handle over the whole core: report items, run matching, drive claims,
/// and gate evidence access.
pub struct Reclaim {
    store: Arc<dyn ItemStore>,
    ledger: MatchLedger,
    claims: ClaimEngine,
    gate: ImagePrivacyGate,
    weights: ScoreWeights,
}

impl Reclaim {
    pub fn new(
        cfg: CoreConfig,
        store: Arc<dyn ItemStore>,
        assets: Arc<dyn AssetStore>,
        dispatch: Arc<dyn NotificationDispatch>,
    ) -> Result<Self, CoreError> {
        let key = cfg.evidence_key()?;
        let weights = cfg.ledger.weights;
        let ledger = MatchLedger::new(store.clone(), dispatch.clone(), cfg.ledger);
        let claims = ClaimEngine::new(store.clone(), dispatch);
        let gate = ImagePrivacyGate::new(store.clone(), assets, key, cfg.mask);
        Ok(Self {
            store,
            ledger,
            claims,
            gate,
            weights,
        })
    }

    /// Fully in-memory instance; returns the dispatcher so tests can inspect
    /// delivered notifications.
    pub fn in_memory(
        cfg: CoreConfig,
        admins: Vec<UserId>,
    ) -> Result<(Self, Arc<MemoryDispatch>), CoreError> {
        let store: Arc<dyn ItemStore> = Arc::new(MemoryStore::new());
        let assets: Arc<dyn AssetStore> = Arc::new(MemoryAssetStore::new());
        let dispatch = Arc::new(MemoryDispatch::with_admins(admins));
        let core = Self::new(cfg, store, assets, dispatch.clone())?;
        Ok((core, dispatch))
    }

    pub fn store(&self) -> &Arc<dyn ItemStore> {
        &self.store
    }

    /// Score one lost/found pair with the configured weights.
    pub fn score_match(&self, lost: &ScoreInput, found: &ScoreInput) -> MatchScore {
        score_match(lost, found, &self.weights)
    }

    /// Persist a lost report and immediately run its matching pass.
    pub fn report_lost(
        &self,
        item: NewLostItem,
    ) -> Result<(LostItem, Vec<MatchCreated>), CoreError> {
        let item = self.store.insert_lost(item)?;
        let matches = self
            .ledger
            .run_matching_pass(&ItemReport::Lost(item.clone()))?;
        Ok((item, matches))
    }

    /// Persist a found report and immediately run its matching pass.
    pub fn report_found(
        &self,
        item: NewFoundItem,
    ) -> Result<(FoundItem, Vec<MatchCreated>), CoreError> {
        let item = self.store.insert_found(item)?;
        let matches = self
            .ledger
            .run_matching_pass(&ItemReport::Found(item.clone()))?;
        Ok((item, matches))
    }

    pub fn run_matching_pass(
        &self,
        report: &ItemReport,
    ) -> Result<Vec<MatchCreated>, CoreError> {
        Ok(self.ledger.run_matching_pass(report)?)
    }

    /// Produce the masked + encrypted artifacts for one evidence upload.
    pub fn ingest_evidence(&self, original: &[u8]) -> Result<EvidenceRefs, CoreError> {
        Ok(self.gate.ingest_evidence(original)?)
    }

    pub fn initiate_claim(&self, req: InitiateClaim) -> Result<Claim, CoreError> {
        Ok(self.claims.initiate(req)?)
    }

    pub fn submit_verification(
        &self,
        claim_id: ClaimId,
        caller: UserId,
        answers: VerificationAnswers,
    ) -> Result<Claim, CoreError> {
        Ok(self.claims.submit_verification(claim_id, caller, answers)?)
    }

    pub fn admin_action(
        &self,
        claim_id: ClaimId,
        action: AdminAction,
        admin: &Requester,
        reason: Option<String>,
    ) -> Result<Claim, CoreError> {
        Ok(self.claims.admin_action(claim_id, action, admin, reason)?)
    }

    pub fn complete_claim(&self, claim_id: ClaimId, caller: &Requester) -> Result<Claim, CoreError> {
        Ok(self.claims.complete(claim_id, caller)?)
    }

    /// May this requester see the original evidence right now?
    pub fn can_view_original(
        &self,
        requester: &Requester,
        found_item_id: ItemId,
    ) -> Result<bool, CoreError> {
        Ok(self.gate.authorize(requester, found_item_id)?)
    }

    /// Decrypt the original evidence for an authorized requester.
    pub fn reveal_original(
        &self,
        requester: &Requester,
        found_item_id: ItemId,
    ) -> Result<Vec<u8>, CoreError> {
        Ok(self.gate.reveal_original(requester, found_item_id)?)
    }
}
