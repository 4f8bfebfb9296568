use std::{collections::BTreeMap, sync::Arc};

use parking_lot::Mutex;
use pie_protocol::{ActionOutcome, ActionStatus};

/// Receives every recorded action outcome, including ones whose notice was
/// suppressed as a duplicate.
pub trait MetricsSink: Send + Sync {
    /// Record one outcome.
    fn record(&self, outcome: &ActionOutcome);
}

/// Sink that drops everything.
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record(&self, _outcome: &ActionOutcome) {}
}

/// Aggregated outcome counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutcomeTotals {
    /// Successful outcomes.
    pub success: u64,
    /// Failed outcomes.
    pub failure: u64,
    /// Skipped outcomes.
    pub skipped: u64,
    /// Sum of reported durations.
    pub total_duration_ms: u64,
    /// Outcome count per action id.
    pub by_action: BTreeMap<String, u64>,
}

impl OutcomeTotals {
    /// Total number of outcomes.
    pub fn total(&self) -> u64 {
        self.success + self.failure + self.skipped
    }
}

/// In-memory counters; clones share state.
#[derive(Clone, Default)]
pub struct OutcomeCounters {
    /// Shared totals.
    inner: Arc<Mutex<OutcomeTotals>>,
}

impl OutcomeCounters {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current totals.
    pub fn snapshot(&self) -> OutcomeTotals {
        self.inner.lock().clone()
    }
}

impl MetricsSink for OutcomeCounters {
    fn record(&self, outcome: &ActionOutcome) {
        let mut t = self.inner.lock();
        match outcome.status {
            ActionStatus::Success => t.success += 1,
            ActionStatus::Failure => t.failure += 1,
            ActionStatus::Skipped => t.skipped += 1,
        }
        t.total_duration_ms = t.total_duration_ms.saturating_add(outcome.duration_ms);
        *t.by_action.entry(outcome.action_id.clone()).or_default() += 1;
    }
}
