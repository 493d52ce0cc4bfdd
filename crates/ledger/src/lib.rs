//! The matching ledger.
//!
//! On every new lost/found report the ledger scans the opposite-type pool of
//! active items, scores each candidate and, for every pair above the
//! confidence threshold, performs the atomic create-and-lock step through
//! the store. Losing a lock race is a normal outcome, not an error; the pass
//! continues with its remaining candidates.

pub mod engine;
pub mod metrics;
pub mod types;

pub use engine::MatchLedger;
pub use metrics::{set_ledger_metrics, LedgerMetrics};
pub use types::{ItemReport, LedgerConfig, LedgerError, MatchCreated, ReportKind};
