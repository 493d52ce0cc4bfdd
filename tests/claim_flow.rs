//! End-to-end claim flow: report, match, claim, verify, review, complete,
//! with the original evidence unreachable until approval.

use std::io::Cursor;

use chrono::{TimeZone, Utc};
use reclaim::models::{
    ClaimStatus, ItemStatus, MatchStatus, NewFoundItem, NewLostItem, Requester,
    VerificationAnswers,
};
use reclaim::{
    AdminAction, ClaimError, CoreConfig, CoreError, Coordinates, InitiateClaim, PrivacyError,
    Reclaim,
};

fn test_png() -> Vec<u8> {
    use image::{ImageFormat, Rgb, RgbImage};
    let mut img = RgbImage::new(32, 32);
    for pixel in img.pixels_mut() {
        *pixel = Rgb([180, 60, 20]);
    }
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn black_wallet_lost(owner: u64) -> NewLostItem {
    NewLostItem {
        owner_id: owner,
        item_name: "Black Wallet".into(),
        category: "Wallet".into(),
        description: "black leather wallet with family photos".into(),
        unique_marks: "initials JD embossed inside".into(),
        color: Some("black".into()),
        material: Some("leather".into()),
        location_text: Some("MG Road metro".into()),
        coordinates: Some(Coordinates::new(12.90, 77.58)),
        date_lost: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        masked_image: None,
        original_image: None,
        evidence_flagged: false,
    }
}

fn wallet_found(finder: u64, evidence: &reclaim::EvidenceRefs) -> NewFoundItem {
    NewFoundItem {
        finder_id: finder,
        item_name: "Wallet".into(),
        category: "Wallet".into(),
        description: "black leather wallet with family photos".into(),
        condition: Some("good".into()),
        storage_place: Some("security desk".into()),
        finder_preference: None,
        location_text: Some("MG Road".into()),
        coordinates: Some(Coordinates::new(12.901, 77.581)),
        masked_image: evidence.masked.clone(),
        original_image: Some(evidence.original.clone()),
        evidence_flagged: evidence.needs_review,
    }
}

fn answers(secret_marks: &str) -> VerificationAnswers {
    VerificationAnswers {
        secret_marks: secret_marks.into(),
        where_lost: Some("near the metro".into()),
        detail: None,
    }
}

#[test]
fn wallet_reunion_end_to_end() {
    let (core, dispatch) = Reclaim::in_memory(CoreConfig::default(), vec![100]).unwrap();
    let owner = 1u64;
    let finder = 2u64;
    let admin = Requester::admin(100);
    let claimant = Requester::user(1);

    // Owner reports the loss; nothing to match against yet.
    let (lost, matches) = core.report_lost(black_wallet_lost(owner)).unwrap();
    assert!(matches.is_empty());

    // Finder reports the wallet with an evidence photo.
    let original_bytes = test_png();
    let evidence = core.ingest_evidence(&original_bytes).unwrap();
    assert!(evidence.masked.is_some());
    let (found, matches) = core.report_found(wallet_found(finder, &evidence)).unwrap();

    // The pair scores high enough to lock immediately.
    assert_eq!(matches.len(), 1);
    let event = &matches[0];
    assert_eq!(event.lost_item_id, lost.id);
    assert!(event.confidence >= 90, "confidence {}", event.confidence);
    assert_eq!(
        core.store().lost(lost.id).unwrap().unwrap().status,
        ItemStatus::Matched
    );
    assert_eq!(dispatch.inbox(owner).len(), 1);
    assert_eq!(dispatch.inbox(finder).len(), 1);

    // The original stays sealed for the owner until their claim is approved;
    // finder and admin can always see it.
    assert!(!core.can_view_original(&claimant, found.id).unwrap());
    assert!(core.can_view_original(&Requester::user(finder), found.id).unwrap());
    assert!(core.can_view_original(&admin, found.id).unwrap());
    assert!(matches!(
        core.reveal_original(&claimant, found.id),
        Err(CoreError::Privacy(PrivacyError::Unauthorized(1)))
    ));

    // Owner claims the wallet.
    let claim = core
        .initiate_claim(InitiateClaim {
            found_item_id: found.id,
            lost_item_id: Some(lost.id),
            claimant_id: claimant.id,
            answers: VerificationAnswers::default(),
            proof_asset: None,
        })
        .unwrap();
    assert_eq!(claim.status, ClaimStatus::VerificationPending);
    assert!(!core.can_view_original(&claimant, found.id).unwrap());

    // Verification shares the "initials"/"embossed" marks.
    let claim = core
        .submit_verification(claim.id, claimant.id, answers("my initials are embossed inside"))
        .unwrap();
    assert_eq!(claim.status, ClaimStatus::AdminReview);
    assert!(!core.can_view_original(&claimant, found.id).unwrap());
    // Admin 100 was asked to review.
    assert!(dispatch.inbox(100).iter().any(|n| n.title.contains("review")));

    // Admin approves; the gate opens for this claimant and no one else.
    let claim = core
        .admin_action(claim.id, AdminAction::Approve, &admin, None)
        .unwrap();
    assert_eq!(claim.status, ClaimStatus::Approved);
    assert!(core.can_view_original(&claimant, found.id).unwrap());
    assert!(!core.can_view_original(&Requester::user(7), found.id).unwrap());
    let revealed = core.reveal_original(&claimant, found.id).unwrap();
    assert_eq!(revealed, original_bytes);

    // Handover happens; everything resolves.
    let claim = core.complete_claim(claim.id, &claimant).unwrap();
    assert_eq!(claim.status, ClaimStatus::Completed);
    assert_eq!(
        core.store().lost(lost.id).unwrap().unwrap().status,
        ItemStatus::Resolved
    );
    assert_eq!(
        core.store().found(found.id).unwrap().unwrap().status,
        ItemStatus::Resolved
    );
    let record = core
        .store()
        .match_for_pair(lost.id, found.id)
        .unwrap()
        .unwrap();
    assert_eq!(record.status, MatchStatus::Confirmed);

    // Completed is terminal.
    assert!(matches!(
        core.complete_claim(claim.id, &claimant),
        Err(CoreError::Claim(ClaimError::InvalidTransition { .. }))
    ));
}

#[test]
fn failed_verification_reopens_the_pool() {
    let (core, _dispatch) = Reclaim::in_memory(CoreConfig::default(), vec![100]).unwrap();

    let (lost, _) = core.report_lost(black_wallet_lost(1)).unwrap();
    let evidence = core.ingest_evidence(&test_png()).unwrap();
    let (found, matches) = core.report_found(wallet_found(2, &evidence)).unwrap();
    assert_eq!(matches.len(), 1);

    let claim = core
        .initiate_claim(InitiateClaim {
            found_item_id: found.id,
            lost_item_id: Some(lost.id),
            claimant_id: 5,
            answers: VerificationAnswers::default(),
            proof_asset: None,
        })
        .unwrap();

    // No overlap with the recorded marks: verification fails and both items
    // return to the active pool in the same step.
    let claim = core
        .submit_verification(claim.id, 5, answers("it is bright green with stripes"))
        .unwrap();
    assert_eq!(claim.status, ClaimStatus::VerificationFailed);
    assert_eq!(
        core.store().lost(lost.id).unwrap().unwrap().status,
        ItemStatus::Active
    );
    assert_eq!(
        core.store().found(found.id).unwrap().unwrap().status,
        ItemStatus::Active
    );
    assert_eq!(
        core.store()
            .match_for_pair(lost.id, found.id)
            .unwrap()
            .unwrap()
            .status,
        MatchStatus::Dissolved
    );

    // And the failed claimant still cannot see the original.
    assert!(!core.can_view_original(&Requester::user(5), found.id).unwrap());
}
