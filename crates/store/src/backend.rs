use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use crate::models::*;
use crate::{
    ClaimTransition, ClaimTransitionOutcome, ItemStore, ItemTarget, MatchOutcome, StoreError,
};

/// In-memory reference backend: one `RwLock` over the whole table set, so a
/// write guard is a transaction. Suitable for tests and single-process
/// deployments; a durable backend implements the same trait.
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    lost: HashMap<ItemId, LostItem>,
    found: HashMap<ItemId, FoundItem>,
    matches: HashMap<MatchId, MatchRecord>,
    claims: HashMap<ClaimId, Claim>,
    next_lost_id: ItemId,
    next_found_id: ItemId,
    next_match_id: MatchId,
    next_claim_id: ClaimId,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::backend("poisoned lock"))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Tables {
    fn item_status(&self, target: ItemTarget, id: ItemId) -> Result<ItemStatus, StoreError> {
        match target {
            ItemTarget::Lost => self
                .lost
                .get(&id)
                .map(|i| i.status)
                .ok_or_else(|| StoreError::not_found("lost item", id)),
            ItemTarget::Found => self
                .found
                .get(&id)
                .map(|i| i.status)
                .ok_or_else(|| StoreError::not_found("found item", id)),
        }
    }

    fn set_item_status(&mut self, target: ItemTarget, id: ItemId, next: ItemStatus) {
        match target {
            ItemTarget::Lost => {
                if let Some(item) = self.lost.get_mut(&id) {
                    item.status = next;
                }
            }
            ItemTarget::Found => {
                if let Some(item) = self.found.get_mut(&id) {
                    item.status = next;
                }
            }
        }
    }
}

impl ItemStore for MemoryStore {
    fn insert_lost(&self, item: NewLostItem) -> Result<LostItem, StoreError> {
        let mut tables = self.write()?;
        tables.next_lost_id += 1;
        let record = LostItem {
            id: tables.next_lost_id,
            owner_id: item.owner_id,
            item_name: item.item_name,
            category: item.category,
            description: item.description,
            unique_marks: item.unique_marks,
            color: item.color,
            material: item.material,
            location_text: item.location_text,
            coordinates: item.coordinates,
            date_lost: item.date_lost,
            created_at: Utc::now(),
            masked_image: item.masked_image,
            original_image: item.original_image,
            evidence_flagged: item.evidence_flagged,
            status: ItemStatus::Active,
        };
        tables.lost.insert(record.id, record.clone());
        Ok(record)
    }

    fn insert_found(&self, item: NewFoundItem) -> Result<FoundItem, StoreError> {
        let mut tables = self.write()?;
        tables.next_found_id += 1;
        let record = FoundItem {
            id: tables.next_found_id,
            finder_id: item.finder_id,
            item_name: item.item_name,
            category: item.category,
            description: item.description,
            condition: item.condition,
            storage_place: item.storage_place,
            finder_preference: item.finder_preference,
            location_text: item.location_text,
            coordinates: item.coordinates,
            created_at: Utc::now(),
            masked_image: item.masked_image,
            original_image: item.original_image,
            evidence_flagged: item.evidence_flagged,
            status: ItemStatus::Active,
        };
        tables.found.insert(record.id, record.clone());
        Ok(record)
    }

    fn lost(&self, id: ItemId) -> Result<Option<LostItem>, StoreError> {
        Ok(self.read()?.lost.get(&id).cloned())
    }

    fn found(&self, id: ItemId) -> Result<Option<FoundItem>, StoreError> {
        Ok(self.read()?.found.get(&id).cloned())
    }

    fn lost_by_status(&self, status: ItemStatus) -> Result<Vec<LostItem>, StoreError> {
        let tables = self.read()?;
        let mut items: Vec<LostItem> = tables
            .lost
            .values()
            .filter(|i| i.status == status)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.id);
        Ok(items)
    }

    fn found_by_status(&self, status: ItemStatus) -> Result<Vec<FoundItem>, StoreError> {
        let tables = self.read()?;
        let mut items: Vec<FoundItem> = tables
            .found
            .values()
            .filter(|i| i.status == status)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.id);
        Ok(items)
    }

    fn set_lost_status(
        &self,
        id: ItemId,
        expected: ItemStatus,
        next: ItemStatus,
    ) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        let item = tables
            .lost
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("lost item", id))?;
        if item.status != expected {
            return Ok(false);
        }
        item.status = next;
        Ok(true)
    }

    fn set_found_status(
        &self,
        id: ItemId,
        expected: ItemStatus,
        next: ItemStatus,
    ) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        let item = tables
            .found
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("found item", id))?;
        if item.status != expected {
            return Ok(false);
        }
        item.status = next;
        Ok(true)
    }

    fn create_match_locking(
        &self,
        lost_id: ItemId,
        found_id: ItemId,
        confidence: u8,
        details: scoring::ScoreDetails,
    ) -> Result<MatchOutcome, StoreError> {
        let mut tables = self.write()?;

        if tables
            .matches
            .values()
            .any(|m| m.lost_item_id == lost_id && m.found_item_id == found_id)
        {
            return Ok(MatchOutcome::Duplicate);
        }

        let lost_status = tables.item_status(ItemTarget::Lost, lost_id)?;
        let found_status = tables.item_status(ItemTarget::Found, found_id)?;
        if lost_status != ItemStatus::Active || found_status != ItemStatus::Active {
            return Ok(MatchOutcome::RaceLost);
        }

        tables.next_match_id += 1;
        let record = MatchRecord {
            id: tables.next_match_id,
            lost_item_id: lost_id,
            found_item_id: found_id,
            confidence,
            details,
            status: MatchStatus::Active,
            created_at: Utc::now(),
        };
        tables.matches.insert(record.id, record.clone());
        tables.set_item_status(ItemTarget::Lost, lost_id, ItemStatus::Matched);
        tables.set_item_status(ItemTarget::Found, found_id, ItemStatus::Matched);

        Ok(MatchOutcome::Created(record))
    }

    fn match_record(&self, id: MatchId) -> Result<Option<MatchRecord>, StoreError> {
        Ok(self.read()?.matches.get(&id).cloned())
    }

    fn match_for_pair(
        &self,
        lost_id: ItemId,
        found_id: ItemId,
    ) -> Result<Option<MatchRecord>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .matches
            .values()
            .find(|m| m.lost_item_id == lost_id && m.found_item_id == found_id)
            .cloned())
    }

    fn matches_for_lost(&self, lost_id: ItemId) -> Result<Vec<MatchRecord>, StoreError> {
        let tables = self.read()?;
        let mut records: Vec<MatchRecord> = tables
            .matches
            .values()
            .filter(|m| m.lost_item_id == lost_id)
            .cloned()
            .collect();
        records.sort_by_key(|m| m.id);
        Ok(records)
    }

    fn matches_for_found(&self, found_id: ItemId) -> Result<Vec<MatchRecord>, StoreError> {
        let tables = self.read()?;
        let mut records: Vec<MatchRecord> = tables
            .matches
            .values()
            .filter(|m| m.found_item_id == found_id)
            .cloned()
            .collect();
        records.sort_by_key(|m| m.id);
        Ok(records)
    }

    fn insert_claim(&self, claim: NewClaim) -> Result<Claim, StoreError> {
        let mut tables = self.write()?;
        if !tables.found.contains_key(&claim.found_item_id) {
            return Err(StoreError::not_found("found item", claim.found_item_id));
        }
        if let Some(lost_id) = claim.lost_item_id {
            if !tables.lost.contains_key(&lost_id) {
                return Err(StoreError::not_found("lost item", lost_id));
            }
        }

        tables.next_claim_id += 1;
        let now = Utc::now();
        let record = Claim {
            id: tables.next_claim_id,
            found_item_id: claim.found_item_id,
            lost_item_id: claim.lost_item_id,
            claimant_id: claim.claimant_id,
            status: ClaimStatus::VerificationPending,
            answers: claim.answers,
            proof_asset: claim.proof_asset,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        };
        tables.claims.insert(record.id, record.clone());
        Ok(record)
    }

    fn claim(&self, id: ClaimId) -> Result<Option<Claim>, StoreError> {
        Ok(self.read()?.claims.get(&id).cloned())
    }

    fn claims_for_found(&self, found_id: ItemId) -> Result<Vec<Claim>, StoreError> {
        let tables = self.read()?;
        let mut claims: Vec<Claim> = tables
            .claims
            .values()
            .filter(|c| c.found_item_id == found_id)
            .cloned()
            .collect();
        claims.sort_by_key(|c| c.id);
        Ok(claims)
    }

    fn open_claim_for_found(&self, found_id: ItemId) -> Result<Option<Claim>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .claims
            .values()
            .filter(|c| c.found_item_id == found_id && c.is_open())
            .min_by_key(|c| c.id)
            .cloned())
    }

    fn approved_claim_for(
        &self,
        found_id: ItemId,
        user_id: UserId,
    ) -> Result<Option<Claim>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .claims
            .values()
            .find(|c| {
                c.found_item_id == found_id
                    && c.claimant_id == user_id
                    && c.status == ClaimStatus::Approved
            })
            .cloned())
    }

    fn transition_claim(
        &self,
        transition: ClaimTransition,
    ) -> Result<ClaimTransitionOutcome, StoreError> {
        let mut tables = self.write()?;

        let current = tables
            .claims
            .get(&transition.claim_id)
            .map(|c| c.status)
            .ok_or_else(|| StoreError::not_found("claim", transition.claim_id))?;
        if current != transition.from {
            return Ok(ClaimTransitionOutcome::RaceLost { current });
        }

        // Validate every conditional item write before touching anything, so
        // a lost race leaves the table set untouched.
        for update in &transition.item_updates {
            let status = tables.item_status(update.target, update.id)?;
            if let Some(expected) = update.expected {
                if status != expected {
                    return Ok(ClaimTransitionOutcome::RaceLost { current });
                }
            }
        }
        for (match_id, _) in &transition.match_updates {
            if !tables.matches.contains_key(match_id) {
                return Err(StoreError::not_found("match", *match_id));
            }
        }

        for update in &transition.item_updates {
            tables.set_item_status(update.target, update.id, update.next);
        }
        for (match_id, next) in &transition.match_updates {
            if let Some(record) = tables.matches.get_mut(match_id) {
                record.status = *next;
            }
        }

        let claim = tables
            .claims
            .get_mut(&transition.claim_id)
            .ok_or_else(|| StoreError::not_found("claim", transition.claim_id))?;
        claim.status = transition.to;
        claim.updated_at = Utc::now();
        if let Some(answers) = transition.answers {
            claim.answers = answers;
        }
        if let Some(reason) = transition.rejection_reason {
            claim.rejection_reason = Some(reason);
        }

        Ok(ClaimTransitionOutcome::Applied(claim.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ItemStatusUpdate;
    use chrono::TimeZone;
    use scoring::ScoreDetails;
    use std::sync::Arc;
    use std::thread;

    fn details() -> ScoreDetails {
        ScoreDetails {
            category: "match (wallet) +30".into(),
            name: "overlap 1.00 +40".into(),
            description: "overlap 1.00 +20".into(),
            location: "0.00 km apart +20".into(),
            time: "0.0 days apart +10".into(),
        }
    }

    fn new_lost(owner: UserId) -> NewLostItem {
        NewLostItem {
            owner_id: owner,
            item_name: "Black Wallet".into(),
            category: "Wallet".into(),
            description: "black leather wallet".into(),
            unique_marks: "initials JD inside".into(),
            color: Some("black".into()),
            material: Some("leather".into()),
            location_text: None,
            coordinates: None,
            date_lost: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            masked_image: None,
            original_image: None,
            evidence_flagged: false,
        }
    }

    fn new_found(finder: UserId) -> NewFoundItem {
        NewFoundItem {
            finder_id: finder,
            item_name: "Wallet".into(),
            category: "Wallet".into(),
            description: "black leather wallet".into(),
            condition: Some("good".into()),
            storage_place: Some("front desk".into()),
            finder_preference: None,
            location_text: None,
            coordinates: None,
            masked_image: None,
            original_image: None,
            evidence_flagged: false,
        }
    }

    fn new_claim(found_id: ItemId, lost_id: Option<ItemId>, claimant: UserId) -> NewClaim {
        NewClaim {
            found_item_id: found_id,
            lost_item_id: lost_id,
            claimant_id: claimant,
            answers: VerificationAnswers::default(),
            proof_asset: None,
        }
    }

    #[test]
    fn inserted_items_start_active_with_sequential_ids() {
        let store = MemoryStore::new();
        let a = store.insert_lost(new_lost(1)).unwrap();
        let b = store.insert_lost(new_lost(1)).unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(a.status, ItemStatus::Active);
        assert_eq!(store.lost_by_status(ItemStatus::Active).unwrap().len(), 2);
    }

    #[test]
    fn status_cas_rejects_stale_expectation() {
        let store = MemoryStore::new();
        let item = store.insert_lost(new_lost(1)).unwrap();

        assert!(store
            .set_lost_status(item.id, ItemStatus::Active, ItemStatus::Matched)
            .unwrap());
        // Second caller expecting Active loses.
        assert!(!store
            .set_lost_status(item.id, ItemStatus::Active, ItemStatus::Matched)
            .unwrap());
        assert_eq!(store.lost(item.id).unwrap().unwrap().status, ItemStatus::Matched);
    }

    #[test]
    fn status_cas_on_missing_item_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .set_found_status(99, ItemStatus::Active, ItemStatus::Matched)
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { id: 99, .. }));
    }

    #[test]
    fn create_match_locks_both_items_once() {
        let store = MemoryStore::new();
        let lost = store.insert_lost(new_lost(1)).unwrap();
        let found = store.insert_found(new_found(2)).unwrap();

        let outcome = store
            .create_match_locking(lost.id, found.id, 95, details())
            .unwrap();
        let record = match outcome {
            MatchOutcome::Created(r) => r,
            other => panic!("expected Created, got {other:?}"),
        };
        assert_eq!(record.confidence, 95);
        assert_eq!(store.lost(lost.id).unwrap().unwrap().status, ItemStatus::Matched);
        assert_eq!(store.found(found.id).unwrap().unwrap().status, ItemStatus::Matched);

        // Same pair again: duplicate, nothing changes.
        let again = store
            .create_match_locking(lost.id, found.id, 95, details())
            .unwrap();
        assert_eq!(again, MatchOutcome::Duplicate);
    }

    #[test]
    fn create_match_races_lose_cleanly() {
        let store = MemoryStore::new();
        let lost_a = store.insert_lost(new_lost(1)).unwrap();
        let lost_b = store.insert_lost(new_lost(3)).unwrap();
        let found = store.insert_found(new_found(2)).unwrap();

        let first = store
            .create_match_locking(lost_a.id, found.id, 90, details())
            .unwrap();
        assert!(matches!(first, MatchOutcome::Created(_)));

        // The found item is locked now; a different pair loses the race and
        // no second match appears.
        let second = store
            .create_match_locking(lost_b.id, found.id, 85, details())
            .unwrap();
        assert_eq!(second, MatchOutcome::RaceLost);
        assert_eq!(store.matches_for_found(found.id).unwrap().len(), 1);
        assert_eq!(store.lost(lost_b.id).unwrap().unwrap().status, ItemStatus::Active);
    }

    #[test]
    fn concurrent_match_attempts_create_exactly_one() {
        let store = Arc::new(MemoryStore::new());
        let found = store.insert_found(new_found(9)).unwrap();
        let lost_ids: Vec<ItemId> = (0..8)
            .map(|i| store.insert_lost(new_lost(i)).unwrap().id)
            .collect();

        let handles: Vec<_> = lost_ids
            .into_iter()
            .map(|lost_id| {
                let store = Arc::clone(&store);
                let found_id = found.id;
                thread::spawn(move || {
                    store
                        .create_match_locking(lost_id, found_id, 80, details())
                        .unwrap()
                })
            })
            .collect();

        let outcomes: Vec<MatchOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let created = outcomes
            .iter()
            .filter(|o| matches!(o, MatchOutcome::Created(_)))
            .count();
        assert_eq!(created, 1, "exactly one thread may lock the found item");
        assert_eq!(store.matches_for_found(found.id).unwrap().len(), 1);
        assert_eq!(store.found(found.id).unwrap().unwrap().status, ItemStatus::Matched);
    }

    #[test]
    fn claim_transition_applies_paired_writes_atomically() {
        let store = MemoryStore::new();
        let lost = store.insert_lost(new_lost(1)).unwrap();
        let found = store.insert_found(new_found(2)).unwrap();
        store
            .create_match_locking(lost.id, found.id, 95, details())
            .unwrap();
        let claim = store.insert_claim(new_claim(found.id, Some(lost.id), 5)).unwrap();

        let mut transition = ClaimTransition::new(
            claim.id,
            ClaimStatus::VerificationPending,
            ClaimStatus::VerificationFailed,
        );
        transition.item_updates = vec![
            ItemStatusUpdate::unconditional(ItemTarget::Lost, lost.id, ItemStatus::Active),
            ItemStatusUpdate::unconditional(ItemTarget::Found, found.id, ItemStatus::Active),
        ];
        transition.match_updates = vec![(1, MatchStatus::Dissolved)];

        let outcome = store.transition_claim(transition).unwrap();
        let updated = match outcome {
            ClaimTransitionOutcome::Applied(c) => c,
            other => panic!("expected Applied, got {other:?}"),
        };
        assert_eq!(updated.status, ClaimStatus::VerificationFailed);
        assert_eq!(store.lost(lost.id).unwrap().unwrap().status, ItemStatus::Active);
        assert_eq!(store.found(found.id).unwrap().unwrap().status, ItemStatus::Active);
        assert_eq!(
            store.match_record(1).unwrap().unwrap().status,
            MatchStatus::Dissolved
        );
    }

    #[test]
    fn claim_transition_conditional_item_update_can_lose_the_race() {
        let store = MemoryStore::new();
        let found = store.insert_found(new_found(2)).unwrap();
        let claim = store.insert_claim(new_claim(found.id, None, 5)).unwrap();

        // Expecting the item to still be Matched, but it never was.
        let mut transition = ClaimTransition::new(
            claim.id,
            ClaimStatus::VerificationPending,
            ClaimStatus::VerificationFailed,
        );
        transition.item_updates = vec![ItemStatusUpdate {
            target: ItemTarget::Found,
            id: found.id,
            expected: Some(ItemStatus::Matched),
            next: ItemStatus::Active,
        }];

        let outcome = store.transition_claim(transition).unwrap();
        assert!(matches!(outcome, ClaimTransitionOutcome::RaceLost { .. }));
        assert_eq!(
            store.claim(claim.id).unwrap().unwrap().status,
            ClaimStatus::VerificationPending
        );
    }

    #[test]
    fn claim_transition_cas_failure_changes_nothing() {
        let store = MemoryStore::new();
        let found = store.insert_found(new_found(2)).unwrap();
        let claim = store.insert_claim(new_claim(found.id, None, 5)).unwrap();

        let mut transition = ClaimTransition::new(
            claim.id,
            ClaimStatus::AdminReview, // stale guard: claim is VerificationPending
            ClaimStatus::Approved,
        );
        transition.item_updates = vec![ItemStatusUpdate::unconditional(
            ItemTarget::Found,
            found.id,
            ItemStatus::Resolved,
        )];

        let outcome = store.transition_claim(transition).unwrap();
        assert_eq!(
            outcome,
            ClaimTransitionOutcome::RaceLost {
                current: ClaimStatus::VerificationPending
            }
        );
        assert_eq!(store.found(found.id).unwrap().unwrap().status, ItemStatus::Active);
        assert_eq!(
            store.claim(claim.id).unwrap().unwrap().status,
            ClaimStatus::VerificationPending
        );
    }

    #[test]
    fn concurrent_claim_transitions_apply_exactly_once() {
        let store = Arc::new(MemoryStore::new());
        let found = store.insert_found(new_found(2)).unwrap();
        let claim = store.insert_claim(new_claim(found.id, None, 5)).unwrap();

        // Move to admin review first.
        store
            .transition_claim(ClaimTransition::new(
                claim.id,
                ClaimStatus::VerificationPending,
                ClaimStatus::AdminReview,
            ))
            .unwrap();

        let handles: Vec<_> = [ClaimStatus::Approved, ClaimStatus::Rejected]
            .into_iter()
            .map(|to| {
                let store = Arc::clone(&store);
                let claim_id = claim.id;
                thread::spawn(move || {
                    store
                        .transition_claim(ClaimTransition::new(
                            claim_id,
                            ClaimStatus::AdminReview,
                            to,
                        ))
                        .unwrap()
                })
            })
            .collect();

        let outcomes: Vec<ClaimTransitionOutcome> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        let applied = outcomes
            .iter()
            .filter(|o| matches!(o, ClaimTransitionOutcome::Applied(_)))
            .count();
        assert_eq!(applied, 1, "only one admin action may win");
    }

    #[test]
    fn open_and_approved_claim_queries() {
        let store = MemoryStore::new();
        let found = store.insert_found(new_found(2)).unwrap();
        let claim = store.insert_claim(new_claim(found.id, None, 5)).unwrap();

        assert_eq!(
            store.open_claim_for_found(found.id).unwrap().unwrap().id,
            claim.id
        );
        assert!(store.approved_claim_for(found.id, 5).unwrap().is_none());

        store
            .transition_claim(ClaimTransition::new(
                claim.id,
                ClaimStatus::VerificationPending,
                ClaimStatus::AdminReview,
            ))
            .unwrap();
        store
            .transition_claim(ClaimTransition::new(
                claim.id,
                ClaimStatus::AdminReview,
                ClaimStatus::Approved,
            ))
            .unwrap();

        assert!(store.approved_claim_for(found.id, 5).unwrap().is_some());
        assert!(store.approved_claim_for(found.id, 6).unwrap().is_none());
    }

    #[test]
    fn rejected_claims_do_not_block_new_claims() {
        let store = MemoryStore::new();
        let found = store.insert_found(new_found(2)).unwrap();
        let claim = store.insert_claim(new_claim(found.id, None, 5)).unwrap();

        store
            .transition_claim(ClaimTransition::new(
                claim.id,
                ClaimStatus::VerificationPending,
                ClaimStatus::AdminReview,
            ))
            .unwrap();
        store
            .transition_claim(ClaimTransition::new(
                claim.id,
                ClaimStatus::AdminReview,
                ClaimStatus::Rejected,
            ))
            .unwrap();

        assert!(store.open_claim_for_found(found.id).unwrap().is_none());
    }

    #[test]
    fn claim_against_missing_item_is_not_found() {
        let store = MemoryStore::new();
        let err = store.insert_claim(new_claim(42, None, 5)).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { id: 42, .. }));
    }
}
