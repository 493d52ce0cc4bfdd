use std::sync::Arc;

use notify::{Notification, NotificationDispatch, NotificationKind};
use scoring::shares_significant_token;
use store::models::{
    Claim, ClaimId, ClaimStatus, FoundItem, ItemStatus, MatchStatus, NewClaim, Requester, UserId,
    VerificationAnswers,
};
use store::{
    ClaimTransition, ClaimTransitionOutcome, ItemStatusUpdate, ItemStore, ItemTarget,
};

use crate::machine::validate_transition;
use crate::types::{AdminAction, ClaimError, InitiateClaim};


/// Drives the claim lifecycle against the store and the notification
/// dispatcher.
pub struct ClaimEngine {
    store: Arc<dyn ItemStore>,
    dispatch: Arc<dyn NotificationDispatch>,
}

impl ClaimEngine {
    pub fn new(store: Arc<dyn ItemStore>, dispatch: Arc<dyn NotificationDispatch>) -> Self {
        Self { store, dispatch }
    }

    /// Open a claim against a found item.
    ///
    /// The item must be claimable: not resolved, and without another open
    /// claim. The claim starts in `VerificationPending` and the finder is
    /// told someone stepped forward.
    pub fn initiate(&self, req: InitiateClaim) -> Result<Claim, ClaimError> {
        let found = self.found_item(req.found_item_id)?;
        if found.status == ItemStatus::Resolved {
            return Err(ClaimError::NotClaimable(found.id));
        }
        if self.store.open_claim_for_found(found.id)?.is_some() {
            return Err(ClaimError::NotClaimable(found.id));
        }
        if let Some(lost_id) = req.lost_item_id {
            if self.store.lost(lost_id)?.is_none() {
                return Err(ClaimError::ItemNotFound(lost_id));
            }
        }

        let claim = self.store.insert_claim(NewClaim {
            found_item_id: req.found_item_id,
            lost_item_id: req.lost_item_id,
            claimant_id: req.claimant_id,
            answers: req.answers,
            proof_asset: req.proof_asset,
        })?;

        tracing::info!(
            claim_id = claim.id,
            found_item_id = claim.found_item_id,
            claimant = claim.claimant_id,
            "claim initiated"
        );
        self.dispatch.notify(
            found.finder_id,
            Notification::new(
                NotificationKind::Claim,
                "New ownership claim",
                format!("Someone claimed the {} you found.", found.item_name),
            )
            .with_link(format!("/claims/{}", claim.id)),
        );

        Ok(claim)
    }

    /// Submit verification answers for a pending claim.
    ///
    /// Only the claimant may call this, and only from
    /// `VerificationPending`. When the linked lost report records unique
    /// marks, the secret-marks answer must share at least one significant
    /// token with them; otherwise the claim auto-passes to admin review.
    /// A failed check moves the claim to `VerificationFailed` and, in the
    /// same atomic step, returns both linked items to the matching pool.
    pub fn submit_verification(
        &self,
        claim_id: ClaimId,
        caller: UserId,
        answers: VerificationAnswers,
    ) -> Result<Claim, ClaimError> {
        let claim = self.claim(claim_id)?;
        if claim.claimant_id != caller {
            return Err(ClaimError::Unauthorized(caller));
        }
        if claim.status != ClaimStatus::VerificationPending {
            return Err(ClaimError::InvalidTransition {
                from: claim.status,
                to: ClaimStatus::AdminReview,
            });
        }

        let recorded_marks = match claim.lost_item_id {
            Some(lost_id) => self
                .store
                .lost(lost_id)?
                .ok_or(ClaimError::ItemNotFound(lost_id))?
                .unique_marks,
            None => String::new(),
        };

        // An empty record cannot discriminate; only a recorded mark with
        // significant tokens can fail the claimant.
        let has_marks = !scoring::significant_tokens(&recorded_marks).is_empty();
        let passed = !has_marks || shares_significant_token(&recorded_marks, &answers.secret_marks);

        if passed {
            validate_transition(claim.status, ClaimStatus::AdminReview)?;
            let mut transition =
                ClaimTransition::new(claim.id, claim.status, ClaimStatus::AdminReview);
            transition.answers = Some(answers);
            let updated = self.apply(transition)?;

            tracing::info!(claim_id = claim.id, "verification passed, awaiting admin review");
            self.dispatch.notify_admins(
                Notification::new(
                    NotificationKind::Claim,
                    "Claim awaiting review",
                    format!("Claim {} passed automatic verification.", claim.id),
                )
                .with_link(format!("/admin/claims/{}", claim.id)),
            );
            Ok(updated)
        } else {
            validate_transition(claim.status, ClaimStatus::VerificationFailed)?;
            let mut transition =
                ClaimTransition::new(claim.id, claim.status, ClaimStatus::VerificationFailed);
            transition.answers = Some(answers);
            self.reset_items_into(&mut transition, &claim)?;
            let updated = self.apply(transition)?;

            tracing::info!(claim_id = claim.id, "verification failed, items returned to pool");
            self.dispatch.notify(
                claim.claimant_id,
                Notification::new(
                    NotificationKind::Claim,
                    "Verification failed",
                    "Your answers did not match the recorded unique marks. You can try again.",
                ),
            );
            Ok(updated)
        }
    }

    /// Approve or reject a claim under admin review.
    pub fn admin_action(
        &self,
        claim_id: ClaimId,
        action: AdminAction,
        admin: &Requester,
        reason: Option<String>,
    ) -> Result<Claim, ClaimError> {
        if !admin.is_admin() {
            return Err(ClaimError::Unauthorized(admin.id));
        }
        let claim = self.claim(claim_id)?;
        let target = match action {
            AdminAction::Approve => ClaimStatus::Approved,
            AdminAction::Reject => ClaimStatus::Rejected,
        };
        if claim.status != ClaimStatus::AdminReview {
            return Err(ClaimError::InvalidTransition {
                from: claim.status,
                to: target,
            });
        }
        validate_transition(claim.status, target)?;
        let found = self.found_item(claim.found_item_id)?;

        match action {
            AdminAction::Approve => {
                // Items stay locked; approval is what makes the privacy
                // gate's answer durable for this claimant.
                let transition = ClaimTransition::new(claim.id, claim.status, target);
                let updated = self.apply(transition)?;

                tracing::info!(claim_id = claim.id, admin = admin.id, "claim approved");
                self.dispatch.notify(
                    claim.claimant_id,
                    Notification::new(
                        NotificationKind::Claim,
                        "Claim approved",
                        "Your claim was approved. The original photo is now visible and you can arrange the handover.",
                    )
                    .with_link(format!("/claims/{}", claim.id)),
                );
                self.dispatch.notify(
                    found.finder_id,
                    Notification::new(
                        NotificationKind::Claim,
                        "Claim approved",
                        format!("The claim on the {} you found was approved.", found.item_name),
                    )
                    .with_link(format!("/claims/{}", claim.id)),
                );
                Ok(updated)
            }
            AdminAction::Reject => {
                let reason =
                    reason.unwrap_or_else(|| "The claim could not be verified.".to_string());
                let mut transition = ClaimTransition::new(claim.id, claim.status, target);
                transition.rejection_reason = Some(reason.clone());
                self.reset_items_into(&mut transition, &claim)?;
                let updated = self.apply(transition)?;

                tracing::info!(claim_id = claim.id, admin = admin.id, "claim rejected");
                self.dispatch.notify(
                    claim.claimant_id,
                    Notification::new(
                        NotificationKind::Claim,
                        "Claim rejected",
                        reason,
                    ),
                );
                Ok(updated)
            }
        }
    }

    /// Mark the handover finished. Claimant or admin only; terminal.
    pub fn complete(&self, claim_id: ClaimId, caller: &Requester) -> Result<Claim, ClaimError> {
        let claim = self.claim(claim_id)?;
        if claim.claimant_id != caller.id && !caller.is_admin() {
            return Err(ClaimError::Unauthorized(caller.id));
        }
        if claim.status != ClaimStatus::Approved {
            return Err(ClaimError::InvalidTransition {
                from: claim.status,
                to: ClaimStatus::Completed,
            });
        }
        validate_transition(claim.status, ClaimStatus::Completed)?;
        let found = self.found_item(claim.found_item_id)?;

        let mut transition = ClaimTransition::new(claim.id, claim.status, ClaimStatus::Completed);
        transition.item_updates.push(ItemStatusUpdate::unconditional(
            ItemTarget::Found,
            claim.found_item_id,
            ItemStatus::Resolved,
        ));
        if let Some(lost_id) = claim.lost_item_id {
            transition.item_updates.push(ItemStatusUpdate::unconditional(
                ItemTarget::Lost,
                lost_id,
                ItemStatus::Resolved,
            ));
            if let Some(record) = self.store.match_for_pair(lost_id, claim.found_item_id)? {
                transition.match_updates.push((record.id, MatchStatus::Confirmed));
            }
        }
        let updated = self.apply(transition)?;

        tracing::info!(claim_id = claim.id, "handover completed");
        self.dispatch.notify(
            claim.claimant_id,
            Notification::new(
                NotificationKind::Claim,
                "Handover complete",
                format!("The {} is back with its owner.", found.item_name),
            ),
        );
        self.dispatch.notify(
            found.finder_id,
            Notification::new(
                NotificationKind::Claim,
                "Handover complete",
                format!("The {} you found is back with its owner. Thank you!", found.item_name),
            ),
        );
        Ok(updated)
    }

    fn claim(&self, id: ClaimId) -> Result<Claim, ClaimError> {
        self.store
            .claim(id)?
            .ok_or(ClaimError::ClaimNotFound(id))
    }

    fn found_item(&self, id: store::models::ItemId) -> Result<FoundItem, ClaimError> {
        self.store
            .found(id)?
            .ok_or(ClaimError::ItemNotFound(id))
    }

    /// Queue the item resets that undo a match lock, plus the dissolution of
    /// the pair's match record, into one atomic transition.
    fn reset_items_into(
        &self,
        transition: &mut ClaimTransition,
        claim: &Claim,
    ) -> Result<(), ClaimError> {
        transition.item_updates.push(ItemStatusUpdate::unconditional(
            ItemTarget::Found,
            claim.found_item_id,
            ItemStatus::Active,
        ));
        if let Some(lost_id) = claim.lost_item_id {
            transition.item_updates.push(ItemStatusUpdate::unconditional(
                ItemTarget::Lost,
                lost_id,
                ItemStatus::Active,
            ));
            if let Some(record) = self.store.match_for_pair(lost_id, claim.found_item_id)? {
                transition.match_updates.push((record.id, MatchStatus::Dissolved));
            }
        }
        Ok(())
    }

    fn apply(&self, transition: ClaimTransition) -> Result<Claim, ClaimError> {
        let claim_id = transition.claim_id;
        match self.store.transition_claim(transition)? {
            ClaimTransitionOutcome::Applied(claim) => Ok(claim),
            ClaimTransitionOutcome::RaceLost { current } => {
                tracing::debug!(claim_id, current = %current, "claim transition lost a race");
                Err(ClaimError::RaceLost(claim_id))
            }
        }
    }
}
