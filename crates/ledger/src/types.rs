use scoring::{ScoreDetails, ScoreWeights};
use serde::{Deserialize, Serialize};
use store::models::{FoundItem, ItemId, LostItem, MatchId};
use store::StoreError;
use thiserror::Error;

/// Which side of the pool a report belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Lost,
    Found,
}

/// A freshly submitted report to run a matching pass for.
#[derive(Debug, Clone)]
pub enum ItemReport {
    Lost(LostItem),
    Found(FoundItem),
}

impl ItemReport {
    pub fn kind(&self) -> ReportKind {
        match self {
            ItemReport::Lost(_) => ReportKind::Lost,
            ItemReport::Found(_) => ReportKind::Found,
        }
    }

    pub fn id(&self) -> ItemId {
        match self {
            ItemReport::Lost(item) => item.id,
            ItemReport::Found(item) => item.id,
        }
    }
}

/// Configuration for the matching pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Minimum confidence for a candidate pair to be locked in.
    #[serde(default = "LedgerConfig::default_threshold")]
    pub threshold: u8,
    /// Factor weights handed to the scorer.
    #[serde(default)]
    pub weights: ScoreWeights,
    /// Base path used to build deep links in match notifications.
    #[serde(default = "LedgerConfig::default_link_base")]
    pub link_base: String,
}

impl LedgerConfig {
    pub(crate) fn default_threshold() -> u8 {
        50
    }

    pub(crate) fn default_link_base() -> String {
        "/matches".to_string()
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            threshold: Self::default_threshold(),
            weights: ScoreWeights::default(),
            link_base: Self::default_link_base(),
        }
    }
}

/// Emitted for every pair the pass successfully locked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCreated {
    pub match_id: MatchId,
    pub lost_item_id: ItemId,
    pub found_item_id: ItemId,
    pub confidence: u8,
    pub details: ScoreDetails,
}

/// Errors produced by the matching ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
