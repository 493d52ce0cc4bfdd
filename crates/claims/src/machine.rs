use store::models::ClaimStatus;

use crate::types::ClaimError;

/// The transition table, total over [`ClaimStatus`]. Single source of truth:
/// every status move in the engine validates against this first.
pub fn allowed_transitions(from: ClaimStatus) -> &'static [ClaimStatus] {
    use ClaimStatus::*;
    match from {
        VerificationPending => &[VerificationFailed, AdminReview],
        VerificationFailed => &[VerificationPending],
        AdminReview => &[Approved, Rejected],
        Approved => &[Completed],
        Rejected => &[VerificationPending],
        Completed => &[],
    }
}

/// Validates a requested move. Same-state moves are allowed no-ops; anything
/// not in the table is rejected explicitly, never silently applied.
pub fn validate_transition(from: ClaimStatus, to: ClaimStatus) -> Result<(), ClaimError> {
    if from == to || allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(ClaimError::InvalidTransition { from, to })
    }
}
