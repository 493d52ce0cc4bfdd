// Metrics hooks for the matching ledger.
//
// Callers install a global `LedgerMetrics` implementation via
// [`set_ledger_metrics`]; `MatchLedger` then reports per-pass latency and
// candidate counts. This keeps instrumentation decoupled from any specific
// metrics backend.
use std::sync::{Arc, RwLock};
use std::time::Duration;

use once_cell::sync::OnceCell;

use crate::types::ReportKind;

/// Metrics observer for matching passes.
pub trait LedgerMetrics: Send + Sync {
    /// Record the outcome of one matching pass.
    ///
    /// `kind` is the side the new report arrived on, `latency` the wall-clock
    /// duration of the pass, `candidates` the size of the opposite pool that
    /// was scored, and `created` the number of matches actually locked in.
    fn record_pass(&self, kind: ReportKind, latency: Duration, candidates: usize, created: usize);
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn LedgerMetrics>>> {
    static METRICS: OnceCell<RwLock<Option<Arc<dyn LedgerMetrics>>>> = OnceCell::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

pub(crate) fn metrics_recorder() -> Option<Arc<dyn LedgerMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

/// Install or clear the global ledger metrics recorder.
///
/// Typically called once during service startup so every `MatchLedger`
/// instance shares the same metrics backend.
pub fn set_ledger_metrics(recorder: Option<Arc<dyn LedgerMetrics>>) {
    let lock = metrics_lock();
    let mut guard = lock.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}
