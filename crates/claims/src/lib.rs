//! Claim lifecycle: a closed transition table over [`ClaimStatus`] plus the
//! engine that drives initiation, self-service verification, admin review
//! and handover completion.
//!
//! Every transition that touches item state goes through the store's atomic
//! `transition_claim`, so a claim can never be observed approved while its
//! item is still locked to a stale match, and an item can never return to
//! the pool while a completed claim still references it.

pub mod engine;
pub mod machine;
pub mod types;

pub use engine::ClaimEngine;
pub use machine::{allowed_transitions, validate_transition};
pub use types::{AdminAction, ClaimError, InitiateClaim};

pub use store::models::{Claim, ClaimStatus, VerificationAnswers};
