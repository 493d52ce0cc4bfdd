//! The image privacy gate.
//!
//! One evidence upload yields two artifacts: a blurred public copy and a
//! ChaCha20-Poly1305-encrypted original. The original is only ever decrypted
//! after [`ImagePrivacyGate::authorize`] says yes for the exact requester,
//! and authorization is re-evaluated against the store on every request.
//!
//! Masking failures withhold the public copy and flag the item for manual
//! review; the unmasked original is never served as a fallback.

pub mod assets;
pub mod crypto;
pub mod gate;
pub mod mask;

pub use assets::{AssetStore, MemoryAssetStore};
pub use crypto::{decrypt_evidence, encrypt_evidence, EvidenceKey};
pub use gate::{EvidenceRefs, ImagePrivacyGate};
pub use mask::{mask_image, MaskConfig};

use store::models::{ItemId, UserId};
use store::StoreError;
use thiserror::Error;

/// Errors surfaced by the privacy gate.
#[derive(Debug, Error)]
pub enum PrivacyError {
    #[error("found item {0} not found")]
    ItemNotFound(ItemId),

    #[error("no evidence asset stored for item {0}")]
    AssetMissing(ItemId),

    #[error("asset reference {0} does not resolve")]
    AssetUnreadable(String),

    #[error("user {0} may not view the original evidence")]
    Unauthorized(UserId),

    #[error("invalid evidence key: {0}")]
    InvalidKey(String),

    #[error("encryption failed: {0}")]
    Encrypt(String),

    #[error("decryption failed: {0}")]
    Decrypt(String),

    #[error("masking failed: {0}")]
    Mask(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
