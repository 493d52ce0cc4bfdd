use std::sync::Arc;
use std::time::Instant;

use notify::{Notification, NotificationDispatch, NotificationKind};
use scoring::{score_match, MatchScore, ScoreInput};
use store::models::{FoundItem, ItemStatus, LostItem};
use store::{ItemStore, MatchOutcome};

use crate::metrics::metrics_recorder;
use crate::types::{ItemReport, LedgerConfig, LedgerError, MatchCreated};


/// Derived names fall back to the leading characters of the description.
const DERIVED_NAME_LEN: usize = 50;

/// The matching ledger: scores new reports against the opposite-type active
/// pool and locks winning pairs through the store.
pub struct MatchLedger {
    store: Arc<dyn ItemStore>,
    dispatch: Arc<dyn NotificationDispatch>,
    cfg: LedgerConfig,
}

impl MatchLedger {
    pub fn new(
        store: Arc<dyn ItemStore>,
        dispatch: Arc<dyn NotificationDispatch>,
        cfg: LedgerConfig,
    ) -> Self {
        Self {
            store,
            dispatch,
            cfg,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.cfg
    }

    /// Run one matching pass for a freshly submitted report.
    ///
    /// Scoring the candidate pool is read-only; only the create-and-lock step
    /// serializes, and it happens inside the store so two concurrent passes
    /// can never lock the same item twice. `RaceLost` and `Duplicate`
    /// outcomes are normal under concurrency: the pair is skipped and the
    /// pass carries on with its remaining candidates.
    pub fn run_matching_pass(
        &self,
        report: &ItemReport,
    ) -> Result<Vec<MatchCreated>, LedgerError> {
        let start = Instant::now();
        let mut created = Vec::new();

        let candidates = match report {
            ItemReport::Lost(item) => {
                self.pass_for_lost(item, &mut created)?
            }
            ItemReport::Found(item) => {
                self.pass_for_found(item, &mut created)?
            }
        };

        let latency = start.elapsed();
        tracing::info!(
            kind = ?report.kind(),
            item_id = report.id(),
            candidates,
            created = created.len(),
            latency_ms = latency.as_millis() as u64,
            "matching pass finished"
        );
        if let Some(recorder) = metrics_recorder() {
            recorder.record_pass(report.kind(), latency, candidates, created.len());
        }

        Ok(created)
    }

    fn pass_for_lost(
        &self,
        item: &LostItem,
        created: &mut Vec<MatchCreated>,
    ) -> Result<usize, LedgerError> {
        let me = lost_profile(item);
        let pool = self.store.found_by_status(ItemStatus::Active)?;
        let total = pool.len();

        let mut qualifying: Vec<(FoundItem, MatchScore)> = pool
            .into_iter()
            .map(|candidate| {
                let score = score_match(&me, &found_profile(&candidate), &self.cfg.weights);
                (candidate, score)
            })
            .filter(|(_, score)| score.confidence >= self.cfg.threshold)
            .collect();
        // Best candidate first: the lock step can only win once per item.
        qualifying.sort_by(|a, b| b.1.confidence.cmp(&a.1.confidence));

        for (candidate, score) in qualifying {
            match self
                .store
                .create_match_locking(item.id, candidate.id, score.confidence, score.details)?
            {
                MatchOutcome::Created(record) => {
                    let event = MatchCreated {
                        match_id: record.id,
                        lost_item_id: record.lost_item_id,
                        found_item_id: record.found_item_id,
                        confidence: record.confidence,
                        details: record.details,
                    };
                    self.announce(&event, item.owner_id, candidate.finder_id, &item.category);
                    created.push(event);
                    // The new report is locked now; nothing further can win.
                    break;
                }
                MatchOutcome::RaceLost => {
                    tracing::debug!(
                        lost_item_id = item.id,
                        found_item_id = candidate.id,
                        "lock race lost, skipping pair"
                    );
                    if !self.lost_still_active(item.id)? {
                        break;
                    }
                }
                MatchOutcome::Duplicate => {
                    tracing::debug!(
                        lost_item_id = item.id,
                        found_item_id = candidate.id,
                        "pair already matched once, skipping"
                    );
                }
            }
        }

        Ok(total)
    }

    fn pass_for_found(
        &self,
        item: &FoundItem,
        created: &mut Vec<MatchCreated>,
    ) -> Result<usize, LedgerError> {
        let me = found_profile(item);
        let pool = self.store.lost_by_status(ItemStatus::Active)?;
        let total = pool.len();

        let mut qualifying: Vec<(LostItem, MatchScore)> = pool
            .into_iter()
            .map(|candidate| {
                let score = score_match(&lost_profile(&candidate), &me, &self.cfg.weights);
                (candidate, score)
            })
            .filter(|(_, score)| score.confidence >= self.cfg.threshold)
            .collect();
        qualifying.sort_by(|a, b| b.1.confidence.cmp(&a.1.confidence));

        for (candidate, score) in qualifying {
            match self
                .store
                .create_match_locking(candidate.id, item.id, score.confidence, score.details)?
            {
                MatchOutcome::Created(record) => {
                    let event = MatchCreated {
                        match_id: record.id,
                        lost_item_id: record.lost_item_id,
                        found_item_id: record.found_item_id,
                        confidence: record.confidence,
                        details: record.details,
                    };
                    self.announce(&event, candidate.owner_id, item.finder_id, &candidate.category);
                    created.push(event);
                    break;
                }
                MatchOutcome::RaceLost => {
                    tracing::debug!(
                        lost_item_id = candidate.id,
                        found_item_id = item.id,
                        "lock race lost, skipping pair"
                    );
                    if !self.found_still_active(item.id)? {
                        break;
                    }
                }
                MatchOutcome::Duplicate => {
                    tracing::debug!(
                        lost_item_id = candidate.id,
                        found_item_id = item.id,
                        "pair already matched once, skipping"
                    );
                }
            }
        }

        Ok(total)
    }

    fn lost_still_active(&self, id: store::models::ItemId) -> Result<bool, LedgerError> {
        Ok(self
            .store
            .lost(id)?
            .map(|item| item.status == ItemStatus::Active)
            .unwrap_or(false))
    }

    fn found_still_active(&self, id: store::models::ItemId) -> Result<bool, LedgerError> {
        Ok(self
            .store
            .found(id)?
            .map(|item| item.status == ItemStatus::Active)
            .unwrap_or(false))
    }

    /// Tell both parties about the new match. Dispatch is fire-and-forget:
    /// nothing here can undo the lock that was just taken.
    fn announce(
        &self,
        event: &MatchCreated,
        owner: store::models::UserId,
        finder: store::models::UserId,
        category: &str,
    ) {
        let link = format!("{}/{}", self.cfg.link_base, event.lost_item_id);

        self.dispatch.notify(
            owner,
            Notification::new(
                NotificationKind::Match,
                "New match found",
                format!(
                    "A potential match was found for your {category}. Confidence: {}%",
                    event.confidence
                ),
            )
            .with_link(link.clone()),
        );
        self.dispatch.notify(
            finder,
            Notification::new(
                NotificationKind::Match,
                "Your found item matches a report",
                format!(
                    "Someone lost a {category} that matches the item you found. Confidence: {}%",
                    event.confidence
                ),
            )
            .with_link(link),
        );
    }
}

/// Scoring profile for a lost report. `date_lost` is the temporal anchor.
fn lost_profile(item: &LostItem) -> ScoreInput {
    ScoreInput {
        category: item.category.clone(),
        name: effective_name(&item.item_name, &item.description),
        description: item.description.clone(),
        coordinates: item.coordinates,
        reported_at: item.date_lost,
    }
}

/// Scoring profile for a found report. Found reports record no separate
/// recovery date, so the report timestamp stands in.
fn found_profile(item: &FoundItem) -> ScoreInput {
    ScoreInput {
        category: item.category.clone(),
        name: effective_name(&item.item_name, &item.description),
        description: item.description.clone(),
        coordinates: item.coordinates,
        reported_at: item.created_at,
    }
}

/// Legacy reports may lack a name; derive one from the description.
fn effective_name(name: &str, description: &str) -> String {
    let trimmed = name.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    description.chars().take(DERIVED_NAME_LEN).collect()
}
