use std::sync::Arc;

use store::models::{AssetRef, FoundItem, ItemId, Requester};
use store::ItemStore;

use crate::assets::AssetStore;
use crate::crypto::{decrypt_evidence, encrypt_evidence, EvidenceKey};
use crate::mask::{mask_image, MaskConfig};
use crate::PrivacyError;

/// References produced by one evidence ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceRefs {
    /// Blurred public copy; `None` when masking failed and the copy was
    /// withheld pending manual review.
    pub masked: Option<AssetRef>,
    /// Encrypted original.
    pub original: AssetRef,
    pub needs_review: bool,
}

/// Decides who may see original evidence, and owns the encrypt/mask steps
/// that make the decision enforceable.
pub struct ImagePrivacyGate {
    store: Arc<dyn ItemStore>,
    assets: Arc<dyn AssetStore>,
    key: EvidenceKey,
    mask_cfg: MaskConfig,
}

impl ImagePrivacyGate {
    pub fn new(
        store: Arc<dyn ItemStore>,
        assets: Arc<dyn AssetStore>,
        key: EvidenceKey,
        mask_cfg: MaskConfig,
    ) -> Self {
        Self {
            store,
            assets,
            key,
            mask_cfg,
        }
    }

    /// May this requester see the original evidence for the found item?
    ///
    /// True for an admin, the finder, or the holder of an `Approved` claim on
    /// the item. Evaluated fresh against the store on every call: approval
    /// state changes take effect immediately, nothing is cached.
    pub fn authorize(
        &self,
        requester: &Requester,
        found_item_id: ItemId,
    ) -> Result<bool, PrivacyError> {
        let item = self.found_item(found_item_id)?;

        if requester.is_admin() || item.finder_id == requester.id {
            return Ok(true);
        }
        Ok(self
            .store
            .approved_claim_for(found_item_id, requester.id)?
            .is_some())
    }

    /// Turn one upload into its two stored artifacts.
    ///
    /// The encrypted original is always produced. A masking failure is not:
    /// the public copy is withheld and the item flagged for manual review.
    /// The unmasked original is never substituted.
    pub fn ingest_evidence(&self, original: &[u8]) -> Result<EvidenceRefs, PrivacyError> {
        let encrypted = encrypt_evidence(&self.key, original)?;
        let original_ref = self.assets.put("original", &encrypted)?;

        match mask_image(original, &self.mask_cfg) {
            Ok(masked_bytes) => {
                let masked_ref = self.assets.put("masked", &masked_bytes)?;
                Ok(EvidenceRefs {
                    masked: Some(masked_ref),
                    original: original_ref,
                    needs_review: false,
                })
            }
            Err(err) => {
                tracing::warn!(error = %err, "evidence masking failed, public copy withheld");
                Ok(EvidenceRefs {
                    masked: None,
                    original: original_ref,
                    needs_review: true,
                })
            }
        }
    }

    /// Ingest evidence the uploader marked as non-sensitive: the public copy
    /// is the image itself, unblurred. The original is still encrypted at
    /// rest so the storage tier never holds it in the clear.
    pub fn ingest_public_evidence(&self, original: &[u8]) -> Result<EvidenceRefs, PrivacyError> {
        let encrypted = encrypt_evidence(&self.key, original)?;
        let original_ref = self.assets.put("original", &encrypted)?;
        let public_ref = self.assets.put("public", original)?;
        Ok(EvidenceRefs {
            masked: Some(public_ref),
            original: original_ref,
            needs_review: false,
        })
    }

    /// The blurred public copy for a found item.
    pub fn masked_copy(&self, found_item_id: ItemId) -> Result<Vec<u8>, PrivacyError> {
        let item = self.found_item(found_item_id)?;
        let reference = item
            .masked_image
            .as_ref()
            .ok_or(PrivacyError::AssetMissing(found_item_id))?;
        self.assets.get(reference)
    }

    /// Decrypt and return the original evidence, authorization permitting.
    ///
    /// Decryption only happens after `authorize` succeeds; a decryption
    /// failure is fatal for this request alone.
    pub fn reveal_original(
        &self,
        requester: &Requester,
        found_item_id: ItemId,
    ) -> Result<Vec<u8>, PrivacyError> {
        if !self.authorize(requester, found_item_id)? {
            return Err(PrivacyError::Unauthorized(requester.id));
        }

        let item = self.found_item(found_item_id)?;
        let reference = item
            .original_image
            .as_ref()
            .ok_or(PrivacyError::AssetMissing(found_item_id))?;
        let blob = self.assets.get(reference)?;
        decrypt_evidence(&self.key, &blob)
    }

    fn found_item(&self, id: ItemId) -> Result<FoundItem, PrivacyError> {
        self.store
            .found(id)?
            .ok_or(PrivacyError::ItemNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssetStore;
    use store::models::{ClaimStatus, NewClaim, NewFoundItem, VerificationAnswers};
    use store::{ClaimTransition, MemoryStore};

    struct Fixture {
        store: Arc<MemoryStore>,
        gate: ImagePrivacyGate,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let assets = Arc::new(MemoryAssetStore::new());
        let gate = ImagePrivacyGate::new(
            store.clone() as Arc<dyn ItemStore>,
            assets,
            EvidenceKey::generate(),
            MaskConfig::default(),
        );
        Fixture { store, gate }
    }

    fn found_item(fx: &Fixture, evidence: Option<&EvidenceRefs>) -> ItemId {
        fx.store
            .insert_found(NewFoundItem {
                finder_id: 2,
                item_name: "Wallet".into(),
                category: "Wallet".into(),
                description: "black leather wallet".into(),
                condition: None,
                storage_place: None,
                finder_preference: None,
                location_text: None,
                coordinates: None,
                masked_image: evidence.and_then(|e| e.masked.clone()),
                original_image: evidence.map(|e| e.original.clone()),
                evidence_flagged: evidence.map(|e| e.needs_review).unwrap_or(false),
            })
            .unwrap()
            .id
    }

    fn approve_claim_for(fx: &Fixture, found_id: ItemId, claimant: u64) {
        let claim = fx
            .store
            .insert_claim(NewClaim {
                found_item_id: found_id,
                lost_item_id: None,
                claimant_id: claimant,
                answers: VerificationAnswers::default(),
                proof_asset: None,
            })
            .unwrap();
        fx.store
            .transition_claim(ClaimTransition::new(
                claim.id,
                ClaimStatus::VerificationPending,
                ClaimStatus::AdminReview,
            ))
            .unwrap();
        fx.store
            .transition_claim(ClaimTransition::new(
                claim.id,
                ClaimStatus::AdminReview,
                ClaimStatus::Approved,
            ))
            .unwrap();
    }

    fn test_png() -> Vec<u8> {
        use image::{ImageFormat, Rgb, RgbImage};
        use std::io::Cursor;
        let mut img = RgbImage::new(16, 16);
        for pixel in img.pixels_mut() {
            *pixel = Rgb([120, 40, 200]);
        }
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn admin_and_finder_are_always_authorized() {
        let fx = fixture();
        let id = found_item(&fx, None);

        assert!(fx.gate.authorize(&Requester::admin(99), id).unwrap());
        assert!(fx.gate.authorize(&Requester::user(2), id).unwrap());
        assert!(!fx.gate.authorize(&Requester::user(5), id).unwrap());
    }

    #[test]
    fn claimant_is_authorized_only_once_approved() {
        let fx = fixture();
        let id = found_item(&fx, None);

        assert!(!fx.gate.authorize(&Requester::user(5), id).unwrap());
        approve_claim_for(&fx, id, 5);
        assert!(fx.gate.authorize(&Requester::user(5), id).unwrap());
        // A different user gains nothing from someone else's approval.
        assert!(!fx.gate.authorize(&Requester::user(6), id).unwrap());
    }

    #[test]
    fn authorize_unknown_item_is_not_found() {
        let fx = fixture();
        assert!(matches!(
            fx.gate.authorize(&Requester::admin(1), 42),
            Err(PrivacyError::ItemNotFound(42))
        ));
    }

    #[test]
    fn ingest_produces_masked_and_encrypted_artifacts() {
        let fx = fixture();
        let refs = fx.gate.ingest_evidence(&test_png()).unwrap();

        assert!(refs.masked.is_some());
        assert!(!refs.needs_review);
        let id = found_item(&fx, Some(&refs));

        // Public copy decodes; it is not the original bytes.
        let masked = fx.gate.masked_copy(id).unwrap();
        assert_ne!(masked, test_png());
        image::load_from_memory(&masked).unwrap();
    }

    #[test]
    fn ingest_withholds_public_copy_when_masking_fails() {
        let fx = fixture();
        let refs = fx.gate.ingest_evidence(b"not an image").unwrap();

        assert!(refs.masked.is_none());
        assert!(refs.needs_review);
        let id = found_item(&fx, Some(&refs));

        // No public copy to serve, but the original is still there for an
        // authorized requester.
        assert!(matches!(
            fx.gate.masked_copy(id),
            Err(PrivacyError::AssetMissing(_))
        ));
        let original = fx.gate.reveal_original(&Requester::admin(99), id).unwrap();
        assert_eq!(original, b"not an image");
    }

    #[test]
    fn reveal_requires_authorization() {
        let fx = fixture();
        let refs = fx.gate.ingest_evidence(&test_png()).unwrap();
        let id = found_item(&fx, Some(&refs));

        assert!(matches!(
            fx.gate.reveal_original(&Requester::user(5), id),
            Err(PrivacyError::Unauthorized(5))
        ));

        approve_claim_for(&fx, id, 5);
        let original = fx.gate.reveal_original(&Requester::user(5), id).unwrap();
        assert_eq!(original, test_png());
    }

    #[test]
    fn stored_original_is_ciphertext_at_rest() {
        let store = Arc::new(MemoryStore::new());
        let assets = Arc::new(MemoryAssetStore::new());
        let gate = ImagePrivacyGate::new(
            store.clone() as Arc<dyn ItemStore>,
            assets.clone(),
            EvidenceKey::generate(),
            MaskConfig::default(),
        );

        let refs = gate.ingest_evidence(&test_png()).unwrap();
        let at_rest = assets.get(&refs.original).unwrap();
        assert_ne!(at_rest, test_png(), "original must not be stored in the clear");
    }

    #[test]
    fn public_ingest_skips_the_blur_but_still_encrypts() {
        let store = Arc::new(MemoryStore::new());
        let assets = Arc::new(MemoryAssetStore::new());
        let gate = ImagePrivacyGate::new(
            store.clone() as Arc<dyn ItemStore>,
            assets.clone(),
            EvidenceKey::generate(),
            MaskConfig::default(),
        );

        let refs = gate.ingest_public_evidence(&test_png()).unwrap();
        let public = assets.get(refs.masked.as_ref().unwrap()).unwrap();
        assert_eq!(public, test_png());
        let at_rest = assets.get(&refs.original).unwrap();
        assert_ne!(at_rest, test_png());
    }

    #[test]
    fn reveal_without_stored_evidence_is_asset_missing() {
        let fx = fixture();
        let id = found_item(&fx, None);
        assert!(matches!(
            fx.gate.reveal_original(&Requester::admin(99), id),
            Err(PrivacyError::AssetMissing(_))
        ));
    }
}
