//! Action outcome recording: notice deduplication, history, metrics.

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::{Duration, Instant},
};

use pie_protocol::{ActionOutcome, ActionStatus, ActivationMode, CloseReason, NotifyKind};
use tracing::{debug, trace, warn};

use crate::{MetricsSink, UiDispatcher};

/// What recording an outcome means for the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recorded {
    /// A notice was shown for this outcome.
    pub surfaced: bool,
    /// The overlay should close for this reason.
    pub close: Option<CloseReason>,
}

/// Records action outcomes.
///
/// Notices for the same action id are shown at most once per dedup window,
/// measured from the last notice actually shown. Suppressed duplicates still
/// reach the metrics sink and the history ring, and still close the overlay.
/// Success closes a toggle-mode overlay; failures and skips never close here.
pub struct ActionOutcomeRecorder {
    /// Dedup window.
    window: Duration,
    /// Action id → time its last notice was shown.
    last_surfaced: HashMap<String, Instant>,
    /// Most recent outcomes, oldest first.
    history: VecDeque<ActionOutcome>,
    /// History capacity.
    capacity: usize,
    /// UI sink.
    ui: UiDispatcher,
    /// Metrics sink.
    metrics: Arc<dyn MetricsSink>,
}

impl ActionOutcomeRecorder {
    /// Create a recorder.
    pub fn new(
        window: Duration,
        capacity: usize,
        ui: UiDispatcher,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            window,
            last_surfaced: HashMap::new(),
            history: VecDeque::with_capacity(capacity),
            capacity,
            ui,
            metrics,
        }
    }

    /// Record an outcome. `open_mode` is the mode of the open overlay, if any.
    pub fn record(
        &mut self,
        outcome: ActionOutcome,
        open_mode: Option<ActivationMode>,
        now: Instant,
    ) -> Recorded {
        self.metrics.record(&outcome);
        self.last_surfaced
            .retain(|_, at| now.saturating_duration_since(*at) < self.window);

        let close = match (outcome.status, open_mode) {
            (ActionStatus::Success, Some(ActivationMode::Toggle)) => {
                Some(CloseReason::ActionSuccess)
            }
            _ => None,
        };
        let duplicate = self.last_surfaced.contains_key(&outcome.action_id);
        self.push_history(outcome.clone());
        if duplicate {
            trace!(action = %outcome.action_id, status = ?outcome.status, "outcome_deduplicated");
            return Recorded {
                surfaced: false,
                close,
            };
        }

        self.last_surfaced.insert(outcome.action_id.clone(), now);
        debug!(action = %outcome.action_id, status = ?outcome.status, "outcome_recorded");
        self.surface(outcome);
        Recorded {
            surfaced: true,
            close,
        }
    }

    /// Load history fetched on connect. No notices are shown and metrics are
    /// not touched; the newest entry becomes the last action.
    pub fn seed_history(&mut self, outcomes: Vec<ActionOutcome>) {
        let count = outcomes.len();
        for outcome in outcomes {
            self.push_history(outcome);
        }
        debug!(count, "history_seeded");
        if let Some(last) = self.history.back().cloned()
            && let Err(e) = self.ui.last_action(last)
        {
            warn!("failed to publish last action: {}", e);
        }
    }

    /// Recorded outcomes, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &ActionOutcome> {
        self.history.iter()
    }

    /// Most recent outcome.
    pub fn last(&self) -> Option<&ActionOutcome> {
        self.history.back()
    }

    /// Append to the ring, evicting the oldest entry when full.
    fn push_history(&mut self, outcome: ActionOutcome) {
        if self.capacity == 0 {
            return;
        }
        while self.history.len() >= self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(outcome);
    }

    /// Show a notice and publish the outcome as the last action.
    fn surface(&self, outcome: ActionOutcome) {
        let title = if outcome.action_name.is_empty() {
            outcome.action_id.clone()
        } else {
            outcome.action_name.clone()
        };
        let text = outcome.message.clone().unwrap_or_else(|| match outcome.status {
            ActionStatus::Success => format!("Completed in {} ms", outcome.duration_ms),
            ActionStatus::Failure => "Action failed".to_string(),
            ActionStatus::Skipped => "Action skipped".to_string(),
        });
        let kind = NotifyKind::from(outcome.status);
        if let Err(e) = self
            .ui
            .notice(kind, title, text)
            .and_then(|()| self.ui.last_action(outcome))
        {
            warn!("failed to surface action outcome: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use pie_protocol::{
        UiMsg,
        ipc::{UiRx, ui_channel},
    };

    use super::*;
    use crate::OutcomeCounters;

    const WINDOW: Duration = Duration::from_secs(2);

    fn recorder(capacity: usize) -> (ActionOutcomeRecorder, UiRx, OutcomeCounters) {
        let (tx, rx) = ui_channel();
        let counters = OutcomeCounters::new();
        let rec = ActionOutcomeRecorder::new(
            WINDOW,
            capacity,
            UiDispatcher::new(tx),
            Arc::new(counters.clone()),
        );
        (rec, rx, counters)
    }

    fn notices(rx: &mut UiRx) -> usize {
        let mut n = 0;
        while let Ok(msg) = rx.try_recv() {
            if matches!(msg, UiMsg::Notice { .. }) {
                n += 1;
            }
        }
        n
    }

    #[test]
    fn duplicate_within_window_is_suppressed_but_counted() {
        let (mut rec, mut rx, counters) = recorder(64);
        let t0 = Instant::now();
        let ok = ActionOutcome::new("term", "Terminal", ActionStatus::Success);
        assert!(rec.record(ok.clone(), None, t0).surfaced);
        assert!(!rec.record(ok.clone(), None, t0 + Duration::from_millis(1500)).surfaced);
        assert_eq!(notices(&mut rx), 1);
        assert_eq!(counters.snapshot().success, 2);
        assert_eq!(rec.history().count(), 2);
    }

    #[test]
    fn window_measured_from_last_surfaced_notice() {
        let (mut rec, mut rx, _) = recorder(64);
        let t0 = Instant::now();
        let ok = ActionOutcome::new("term", "Terminal", ActionStatus::Success);
        assert!(rec.record(ok.clone(), None, t0).surfaced);
        assert!(!rec.record(ok.clone(), None, t0 + Duration::from_millis(1900)).surfaced);
        // The suppressed duplicate did not extend the window.
        assert!(rec.record(ok, None, t0 + WINDOW).surfaced);
        assert_eq!(notices(&mut rx), 2);
    }

    #[test]
    fn different_actions_are_independent() {
        let (mut rec, mut rx, _) = recorder(64);
        let t0 = Instant::now();
        rec.record(ActionOutcome::new("a", "", ActionStatus::Failure), None, t0);
        rec.record(ActionOutcome::new("b", "", ActionStatus::Failure), None, t0);
        assert_eq!(notices(&mut rx), 2);
    }

    #[test]
    fn success_closes_only_toggle_overlay() {
        let (mut rec, _rx, _) = recorder(64);
        let t0 = Instant::now();
        let r = rec.record(
            ActionOutcome::new("a", "", ActionStatus::Success),
            Some(ActivationMode::Toggle),
            t0,
        );
        assert_eq!(r.close, Some(CloseReason::ActionSuccess));
        let r = rec.record(
            ActionOutcome::new("b", "", ActionStatus::Success),
            Some(ActivationMode::Hold),
            t0,
        );
        assert_eq!(r.close, None);
        let r = rec.record(
            ActionOutcome::new("c", "", ActionStatus::Skipped),
            Some(ActivationMode::Toggle),
            t0,
        );
        assert_eq!(r.close, None);
        let r = rec.record(
            ActionOutcome::new("d", "", ActionStatus::Success),
            None,
            t0,
        );
        assert_eq!(r.close, None);
    }

    #[test]
    fn suppressed_duplicate_still_closes() {
        let (mut rec, mut rx, _) = recorder(64);
        let t0 = Instant::now();
        let ok = ActionOutcome::new("term", "Terminal", ActionStatus::Success);
        let first = rec.record(ok.clone(), Some(ActivationMode::Toggle), t0);
        assert_eq!(first.close, Some(CloseReason::ActionSuccess));
        let later = t0 + Duration::from_millis(1000);
        let again = rec.record(ok, Some(ActivationMode::Toggle), later);
        assert!(!again.surfaced);
        assert_eq!(again.close, Some(CloseReason::ActionSuccess));
        assert_eq!(notices(&mut rx), 1);
    }

    #[test]
    fn history_is_bounded_and_seeding_is_silent() {
        let (mut rec, mut rx, counters) = recorder(3);
        let seeded = (0..5)
            .map(|i| ActionOutcome::new(format!("a{i}"), "", ActionStatus::Success))
            .collect();
        rec.seed_history(seeded);
        let ids: Vec<&str> = rec.history().map(|o| o.action_id.as_str()).collect();
        assert_eq!(ids, vec!["a2", "a3", "a4"]);
        assert_eq!(rec.last().map(|o| o.action_id.as_str()), Some("a4"));
        assert_eq!(notices(&mut rx), 0);
        assert_eq!(counters.snapshot().total(), 0);
    }

    #[test]
    fn message_and_kind_in_notice() {
        let (mut rec, mut rx, _) = recorder(8);
        let fail =
            ActionOutcome::new("a", "Launch", ActionStatus::Failure).with_message("not found");
        rec.record(fail, None, Instant::now());
        let Ok(UiMsg::Notice { kind, title, text }) = rx.try_recv() else {
            panic!("expected notice");
        };
        assert_eq!(kind, NotifyKind::Error);
        assert_eq!(title, "Launch");
        assert_eq!(text, "not found");
        assert!(matches!(rx.try_recv(), Ok(UiMsg::LastAction(_))));
    }
}
