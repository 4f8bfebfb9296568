//! The activation state machine.
//!
//! All inputs are synchronous method calls carrying an explicit `now`, so the
//! controller can be driven by the async [`crate::Engine`] or directly from
//! tests. Delayed behavior goes through [`TimerHost`] slots.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use pie_accel::{Accelerator, Conflict, KeyEvent};
use pie_protocol::{
    ActionOutcome, ActionStatus, ActivationMode, CloseReason, NotifyKind, StorageMode,
};
use tracing::{debug, info, trace, warn};

use crate::{
    ActionOutcomeRecorder, ActivationGate, Blocked, EngineConfig, KeyStateTracker, MetricsSink,
    ReleasePolicy, Result, Timings, UiDispatcher,
    ticker::{TimerFired, TimerHost, TimerSlot, Timers},
};

/// Action id used for outcomes the controller records about itself.
pub const ACTIVATION_ACTION_ID: &str = "activation";

/// Display name for [`ACTIVATION_ACTION_ID`] outcomes.
const ACTIVATION_ACTION_NAME: &str = "Pie menu";

/// What fired: a registration id and its parsed accelerator.
///
/// A synthetic trigger (from a UI toggle request) has neither and is treated
/// as the same trigger as whatever opened the overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trigger {
    /// Registration id; empty for synthetic triggers.
    pub id: String,
    /// Parsed accelerator, when known.
    pub accelerator: Option<Arc<Accelerator>>,
}

impl Trigger {
    /// Trigger for a registered accelerator.
    pub fn new(id: impl Into<String>, accelerator: Option<Arc<Accelerator>>) -> Self {
        Self {
            id: id.into(),
            accelerator,
        }
    }

    /// Trigger for a synthetic toggle or open request.
    pub fn synthetic() -> Self {
        Self::default()
    }

    /// True for synthetic triggers.
    pub fn is_synthetic(&self) -> bool {
        self.id.is_empty() && self.accelerator.is_none()
    }

    /// Whether `other` counts as the same trigger.
    fn same_as(&self, other: &Self) -> bool {
        if self.is_synthetic() || other.is_synthetic() || self.id == other.id {
            return true;
        }
        match (&self.accelerator, &other.accelerator) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Why an activation request changed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ignored {
    /// Another hotkey is still being processed.
    Locked,
    /// Too soon after the last close.
    Cooldown,
    /// Too soon after a toggle-mode open.
    Protected,
    /// Safe mode or a conflict refuses opening.
    Blocked(Blocked),
    /// A different accelerator fired while open in toggle mode.
    OtherTrigger,
    /// Open in hold mode; only a release closes it.
    Holding,
    /// Already open.
    AlreadyOpen,
    /// The close reason is not permitted in the current mode.
    Refused,
}

/// Result of an activation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The overlay opened in this mode.
    Opened(ActivationMode),
    /// The overlay closed for this reason.
    Closed(CloseReason),
    /// Nothing changed.
    Ignored(Ignored),
}

/// Point-in-time view of the controller state.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationSnapshot {
    /// Overlay visibility.
    pub is_open: bool,
    /// Mode of the open overlay, or the configured mode when closed.
    pub mode: ActivationMode,
    /// Last open time.
    pub opened_at: Option<Instant>,
    /// Last close time.
    pub closed_at: Option<Instant>,
    /// Chord holding the overlay open; hold mode only.
    pub active_accelerator: Option<Arc<Accelerator>>,
}

/// A slice selection awaiting its outcome.
#[derive(Debug, Clone)]
struct Selection {
    /// Selected action.
    action_id: String,
    /// Correlation id, when the UI supplied one.
    invocation_id: Option<String>,
}

impl Selection {
    /// True when `outcome` reports on this selection.
    fn matches(&self, outcome: &ActionOutcome) -> bool {
        match (&self.invocation_id, &outcome.invocation_id) {
            (Some(a), Some(b)) => a == b,
            _ => self.action_id == outcome.action_id,
        }
    }
}

/// State while the overlay is shown.
#[derive(Debug)]
struct OpenState {
    /// Mode fixed at open time.
    mode: ActivationMode,
    /// What opened it.
    trigger: Trigger,
    /// Pending selection, if any.
    selection: Option<Selection>,
}

/// Owns overlay visibility and every rule deciding when it may change.
pub struct ActivationController {
    /// Mode applied to the next open.
    mode: ActivationMode,
    /// Hold release policy.
    release: ReleasePolicy,
    /// Timing parameters.
    timings: Timings,
    /// Present while open.
    open: Option<OpenState>,
    /// Last open time.
    opened_at: Option<Instant>,
    /// Last close time.
    closed_at: Option<Instant>,
    /// Pending forced close reason.
    forced: Option<CloseReason>,
    /// Open/close gating.
    gate: ActivationGate,
    /// Held keys.
    keys: KeyStateTracker,
    /// Outcome recording.
    recorder: ActionOutcomeRecorder,
    /// Timer slots.
    timers: Timers,
    /// UI sink.
    ui: UiDispatcher,
}

/// Time elapsed since `at`, or `Duration::MAX` when never.
fn elapsed_since(at: Option<Instant>, now: Instant) -> Duration {
    at.map_or(Duration::MAX, |t| now.saturating_duration_since(t))
}

/// Log a failed UI send; UI delivery never aborts a transition.
fn emit(res: Result<()>) {
    if let Err(e) = res {
        warn!("UI update dropped: {}", e);
    }
}

impl ActivationController {
    /// Build a controller from configuration.
    pub fn new(
        cfg: &EngineConfig,
        timers: Box<dyn TimerHost>,
        ui: UiDispatcher,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        let timings = cfg.timings.clone();
        Self {
            mode: cfg.mode,
            release: cfg.release,
            gate: ActivationGate::new(timings.processing_lock()),
            keys: KeyStateTracker::new(),
            recorder: ActionOutcomeRecorder::new(
                timings.dedup_window(),
                cfg.history_capacity,
                ui.clone(),
                metrics,
            ),
            timers: Timers::new(timers),
            timings,
            open: None,
            opened_at: None,
            closed_at: None,
            forced: None,
            ui,
        }
    }

    /// Mode applied to the next open. An open overlay keeps its mode.
    pub fn set_mode(&mut self, mode: ActivationMode) {
        self.mode = mode;
    }

    /// Current state.
    pub fn snapshot(&self) -> ActivationSnapshot {
        ActivationSnapshot {
            is_open: self.open.is_some(),
            mode: self.open.as_ref().map_or(self.mode, |o| o.mode),
            opened_at: self.opened_at,
            closed_at: self.closed_at,
            active_accelerator: self
                .open
                .as_ref()
                .filter(|o| o.mode == ActivationMode::Hold)
                .and_then(|o| o.trigger.accelerator.clone()),
        }
    }

    /// True while the overlay is shown.
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Gating state.
    pub fn gate(&self) -> &ActivationGate {
        &self.gate
    }

    /// Held-key tracker.
    pub fn keys(&self) -> &KeyStateTracker {
        &self.keys
    }

    /// Outcome recorder.
    pub fn recorder(&self) -> &ActionOutcomeRecorder {
        &self.recorder
    }

    /// True when `slot` has a pending fire.
    pub fn is_armed(&self, slot: TimerSlot) -> bool {
        self.timers.is_armed(slot)
    }

    /// A trigger accelerator fired.
    pub fn hotkey_fired(&mut self, trigger: Trigger, now: Instant) -> Transition {
        if self.gate.is_locked(now) {
            trace!(id = %trigger.id, "hotkey_locked");
            return Transition::Ignored(Ignored::Locked);
        }
        self.gate.lock(now);
        let Some(open) = &self.open else {
            return self.try_open(trigger, now);
        };
        let same_trigger = open.trigger.same_as(&trigger);
        match open.mode {
            ActivationMode::Hold => {
                trace!(id = %trigger.id, "hotkey_while_holding");
                Transition::Ignored(Ignored::Holding)
            }
            ActivationMode::Toggle if !same_trigger => {
                debug!(id = %trigger.id, "hotkey_other_trigger_ignored");
                Transition::Ignored(Ignored::OtherTrigger)
            }
            ActivationMode::Toggle
                if elapsed_since(self.opened_at, now) < self.timings.toggle_protection() =>
            {
                debug!(id = %trigger.id, "hotkey_toggle_protected");
                Transition::Ignored(Ignored::Protected)
            }
            ActivationMode::Toggle => self.close_transition(CloseReason::HotkeyToggle, now),
        }
    }

    /// Synthetic toggle request; behaves like the trigger firing.
    pub fn toggle(&mut self, now: Instant) -> Transition {
        self.hotkey_fired(Trigger::synthetic(), now)
    }

    /// Synthetic open request.
    pub fn open(&mut self, now: Instant) -> Transition {
        if self.open.is_some() {
            return Transition::Ignored(Ignored::AlreadyOpen);
        }
        if self.gate.is_locked(now) {
            return Transition::Ignored(Ignored::Locked);
        }
        self.try_open(Trigger::synthetic(), now)
    }

    /// Close the overlay. Returns true when it was open and `reason` is
    /// permitted in its mode.
    pub fn close(&mut self, reason: CloseReason, now: Instant) -> bool {
        let Some(open) = &self.open else {
            trace!(?reason, "close_ignored_not_open");
            return false;
        };
        let mode = open.mode;
        if !self.gate.can_close(mode, reason) {
            debug!(?reason, ?mode, "close_refused");
            return false;
        }
        self.open = None;
        self.closed_at = Some(now);
        self.forced = None;
        self.timers.disarm_all();
        self.keys.clear();
        info!(?reason, ?mode, "overlay_closed");
        emit(self.ui.overlay_hidden(mode, reason));
        true
    }

    /// A key went down in the overlay window. Returns true for a fresh
    /// (non-repeat) press, which is the only kind that may trigger.
    pub fn key_down(&mut self, event: &KeyEvent, now: Instant) -> bool {
        let fresh = self.keys.on_key_down(event);
        self.timers.disarm(TimerSlot::BlurRelease);
        if fresh && self.open.is_some() && event.name() == "escape" {
            self.close(CloseReason::UserEscape, now);
        }
        fresh
    }

    /// A key went up in the overlay window.
    pub fn key_up(&mut self, event: &KeyEvent, now: Instant) {
        self.keys.on_key_up(event);
        if self.chord_released() {
            debug!(key = %event.name(), "hold_chord_released");
            self.close(CloseReason::KeyRelease, now);
        }
    }

    /// The overlay window lost focus.
    pub fn blur(&mut self, now: Instant) {
        match self.open.as_ref().map(|o| o.mode) {
            Some(ActivationMode::Hold) => {
                self.timers
                    .arm(TimerSlot::BlurRelease, now, self.timings.blur_release());
            }
            Some(ActivationMode::Toggle) => {}
            // Key-ups delivered elsewhere would leave stale entries.
            None => self.keys.clear(),
        }
    }

    /// The overlay window regained focus.
    pub fn focus(&mut self) {
        self.timers.disarm(TimerSlot::BlurRelease);
    }

    /// Pointer activity over a slice; restarts the idle timer.
    pub fn hover(&mut self, now: Instant) {
        if let Some(open) = &self.open
            && open.mode == ActivationMode::Toggle
            && let Some(after) = self.timings.auto_close()
        {
            self.timers.arm(TimerSlot::AutoClose, now, after);
        }
    }

    /// A slice was chosen; its outcome decides whether the overlay closes.
    pub fn select(&mut self, action_id: String, invocation_id: Option<String>) {
        let Some(open) = &mut self.open else {
            debug!(action = %action_id, "select_ignored_not_open");
            return;
        };
        debug!(action = %action_id, invocation = ?invocation_id, "slice_selected");
        open.selection = Some(Selection {
            action_id,
            invocation_id,
        });
    }

    /// An action outcome arrived.
    pub fn record_outcome(&mut self, outcome: ActionOutcome, now: Instant) {
        let open_mode = self.open.as_ref().map(|o| o.mode);
        let selected = self
            .open
            .as_ref()
            .and_then(|o| o.selection.as_ref())
            .is_some_and(|s| s.matches(&outcome));
        let failed = outcome.status == ActionStatus::Failure;
        let recorded = self.recorder.record(outcome, open_mode, now);
        if let Some(reason) = recorded.close {
            self.close(reason, now);
        } else if selected && failed {
            self.close(CloseReason::ActionFailure, now);
        }
    }

    /// Load action history fetched on connect.
    pub fn seed_history(&mut self, outcomes: Vec<ActionOutcome>) {
        self.recorder.seed_history(outcomes);
    }

    /// Foreground window fullscreen status changed.
    pub fn set_fullscreen(&mut self, fullscreen: bool, now: Instant) {
        if self.gate.set_fullscreen(fullscreen) {
            self.status_changed(now);
        }
    }

    /// Storage writability changed.
    pub fn set_storage_mode(&mut self, mode: StorageMode, now: Instant) {
        if self.gate.set_storage_mode(mode) {
            self.status_changed(now);
        }
    }

    /// Registration status of binding `id` changed; `None` reports on every
    /// binding at once.
    pub fn set_registration(
        &mut self,
        id: Option<&str>,
        registered: bool,
        conflicts: &[Conflict],
        now: Instant,
    ) {
        if !registered {
            let text = if conflicts.is_empty() {
                "The trigger shortcut could not be registered".to_string()
            } else {
                conflicts
                    .iter()
                    .map(|c| c.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; ")
            };
            warn!(id = ?id, ?conflicts, "hotkey_registration_failed");
            emit(self.ui.notice(NotifyKind::Warn, "Hotkey conflict".to_string(), text));
        }
        if self.gate.set_registered(id, registered) {
            self.status_changed(now);
        }
    }

    /// The hotkey conflict dialog opened or closed.
    pub fn set_conflict_dialog(&mut self, open: bool, now: Instant) {
        if self.gate.set_dialog_open(open) {
            self.status_changed(now);
        }
    }

    /// A timer slot fired.
    pub fn on_timer(&mut self, fired: TimerFired, now: Instant) {
        if !self.timers.accept(fired) {
            return;
        }
        match fired.slot {
            TimerSlot::AutoClose => {
                self.close(CloseReason::AutoClose, now);
            }
            TimerSlot::ForcedClose => {
                if let Some(reason) = self.forced.take() {
                    self.close(reason, now);
                }
            }
            TimerSlot::BlurRelease => {
                if self.open.as_ref().map(|o| o.mode) == Some(ActivationMode::Hold) {
                    debug!("blur_treated_as_release");
                    self.keys.clear();
                    self.close(CloseReason::KeyRelease, now);
                }
            }
        }
    }

    /// Open from the closed state, honoring cooldown and gating.
    fn try_open(&mut self, trigger: Trigger, now: Instant) -> Transition {
        if elapsed_since(self.closed_at, now) < self.timings.reopen_cooldown() {
            debug!(id = %trigger.id, "open_in_cooldown");
            return Transition::Ignored(Ignored::Cooldown);
        }
        if let Some(blocked) = self.gate.blocked() {
            info!(%blocked, "activation_blocked");
            self.record_skip(blocked.to_string(), now);
            return Transition::Ignored(Ignored::Blocked(blocked));
        }
        let mode = match (self.mode, &trigger.accelerator) {
            (ActivationMode::Hold, None) => {
                debug!(id = %trigger.id, "hold_without_chord_opens_toggle");
                ActivationMode::Toggle
            }
            (mode, _) => mode,
        };
        if mode == ActivationMode::Hold
            && let Some(accel) = &trigger.accelerator
        {
            self.keys.seed(accel.key_set());
        }
        if mode == ActivationMode::Toggle
            && let Some(after) = self.timings.auto_close()
        {
            self.timers.arm(TimerSlot::AutoClose, now, after);
        }
        let accelerator = trigger.accelerator.as_ref().map(|a| a.to_canonical());
        info!(?mode, id = %trigger.id, accel = ?accelerator, "overlay_opened");
        self.opened_at = Some(now);
        self.open = Some(OpenState {
            mode,
            trigger,
            selection: None,
        });
        emit(self.ui.overlay_shown(mode, accelerator));
        Transition::Opened(mode)
    }

    /// Close and report the transition.
    fn close_transition(&mut self, reason: CloseReason, now: Instant) -> Transition {
        if self.close(reason, now) {
            Transition::Closed(reason)
        } else {
            Transition::Ignored(Ignored::Refused)
        }
    }

    /// True when an open hold-mode chord counts as released.
    fn chord_released(&self) -> bool {
        let Some(open) = &self.open else {
            return false;
        };
        if open.mode != ActivationMode::Hold {
            return false;
        }
        let Some(accel) = &open.trigger.accelerator else {
            return false;
        };
        match self.release {
            ReleasePolicy::LastKey => !self.keys.any_held(accel.key_set()),
            ReleasePolicy::AnyKey => !self.keys.all_held(accel.key_set()),
        }
    }

    /// Record a skipped activation outcome.
    fn record_skip(&mut self, message: String, now: Instant) {
        let outcome = ActionOutcome::new(
            ACTIVATION_ACTION_ID,
            ACTIVATION_ACTION_NAME,
            ActionStatus::Skipped,
        )
        .with_message(message);
        self.recorder.record(outcome, None, now);
    }

    /// Publish gating status and schedule or cancel a forced close.
    fn status_changed(&mut self, now: Instant) {
        let safe_mode = self.gate.safe_mode();
        let conflict = self.gate.conflict();
        info!(safe_mode = ?safe_mode, conflict, "gate_status");
        emit(self.ui.status(safe_mode, conflict));

        let Some(mode) = self.open.as_ref().map(|o| o.mode) else {
            return;
        };
        match self.gate.forced_close(mode) {
            Some(reason) => {
                if self.forced.is_none() {
                    debug!(?reason, "forced_close_scheduled");
                    self.timers.arm(
                        TimerSlot::ForcedClose,
                        now,
                        self.timings.forced_close_grace(),
                    );
                    let blocked = match reason {
                        CloseReason::Conflict => Some(Blocked::Conflict),
                        _ => self.gate.safe_mode().map(Blocked::SafeMode),
                    };
                    if let Some(blocked) = blocked {
                        self.record_skip(blocked.to_string(), now);
                    }
                }
                self.forced = Some(reason);
            }
            None => {
                if self.forced.take().is_some() {
                    debug!("forced_close_cancelled");
                    self.timers.disarm(TimerSlot::ForcedClose);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pie_accel::ConflictCode;
    use pie_protocol::{SafeModeReason, UiMsg};

    use super::*;
    use crate::test_support::Harness;

    fn trigger(id: &str, text: &str) -> Trigger {
        Trigger::new(id, Accelerator::parse(text).map(Arc::new))
    }

    fn cfg(mode: ActivationMode) -> EngineConfig {
        EngineConfig {
            mode,
            ..EngineConfig::default()
        }
    }

    /// Key event for a normalized name with the given keys still held.
    fn key(name: &str, held: &[&str]) -> KeyEvent {
        let (k, code) = match name {
            "ctrl" => ("Control", "ControlLeft"),
            "shift" => ("Shift", "ShiftLeft"),
            "escape" => ("Escape", "Escape"),
            other => (other, ""),
        };
        KeyEvent {
            key: k.to_string(),
            code: code.to_string(),
            ctrl: held.contains(&"ctrl"),
            shift: held.contains(&"shift"),
            alt: held.contains(&"alt"),
            meta: held.contains(&"meta"),
            repeat: false,
        }
    }

    fn close_reason(msgs: &[UiMsg]) -> Option<CloseReason> {
        msgs.iter().find_map(|m| match m {
            UiMsg::Overlay {
                visible: false,
                reason,
                ..
            } => *reason,
            _ => None,
        })
    }

    const PIE: &str = "Control+Shift+P";

    #[test]
    fn toggle_protection_and_cooldown_scenario() {
        let mut h = Harness::new(&cfg(ActivationMode::Toggle));
        assert_eq!(
            h.fire(trigger("pie", PIE)),
            Transition::Opened(ActivationMode::Toggle)
        );
        assert_eq!(
            h.fire(trigger("pie", PIE)),
            Transition::Ignored(Ignored::Locked)
        );
        h.advance(Duration::from_millis(100));
        assert_eq!(
            h.fire(trigger("pie", PIE)),
            Transition::Ignored(Ignored::Protected)
        );
        assert!(h.controller.is_open());
        h.advance(Duration::from_millis(500));
        assert_eq!(
            h.fire(trigger("pie", PIE)),
            Transition::Closed(CloseReason::HotkeyToggle)
        );
        h.advance(Duration::from_millis(100));
        assert_eq!(
            h.fire(trigger("pie", PIE)),
            Transition::Ignored(Ignored::Cooldown)
        );
        h.advance(Duration::from_millis(200));
        assert_eq!(
            h.fire(trigger("pie", PIE)),
            Transition::Opened(ActivationMode::Toggle)
        );
    }

    #[test]
    fn duplicates_inside_lock_window_make_one_transition() {
        let mut h = Harness::new(&cfg(ActivationMode::Toggle));
        h.fire(trigger("pie", PIE));
        h.advance(Duration::from_millis(20));
        h.fire(trigger("pie", PIE));
        h.advance(Duration::from_millis(20));
        h.fire(trigger("pie", PIE));
        let overlays = h
            .drain_ui()
            .into_iter()
            .filter(|m| matches!(m, UiMsg::Overlay { .. }))
            .count();
        assert_eq!(overlays, 1);
        assert!(h.controller.is_open());
    }

    #[test]
    fn other_trigger_ignored_but_synthetic_toggle_closes() {
        let mut h = Harness::new(&cfg(ActivationMode::Toggle));
        h.fire(trigger("pie", PIE));
        h.advance(Duration::from_millis(600));
        assert_eq!(
            h.fire(trigger("other", "Alt+Q")),
            Transition::Ignored(Ignored::OtherTrigger)
        );
        h.advance(Duration::from_millis(60));
        let now = h.now();
        assert_eq!(
            h.controller.toggle(now),
            Transition::Closed(CloseReason::HotkeyToggle)
        );
    }

    #[test]
    fn hold_release_in_any_order_closes_on_last_key() {
        let orders = [
            ["ctrl", "shift", "p"],
            ["ctrl", "p", "shift"],
            ["shift", "ctrl", "p"],
            ["shift", "p", "ctrl"],
            ["p", "ctrl", "shift"],
            ["p", "shift", "ctrl"],
        ];
        for order in orders {
            let mut h = Harness::new(&cfg(ActivationMode::Hold));
            assert_eq!(
                h.fire(trigger("pie", PIE)),
                Transition::Opened(ActivationMode::Hold)
            );
            let mut remaining = vec!["ctrl", "shift", "p"];
            for (i, k) in order.iter().enumerate() {
                remaining.retain(|r| r != k);
                let now = h.now();
                h.controller.key_up(&key(k, &remaining), now);
                let last = i == order.len() - 1;
                assert_eq!(
                    h.controller.is_open(),
                    !last,
                    "{order:?} after releasing {k}"
                );
            }
            assert!(h.controller.keys().is_empty());
            assert_eq!(close_reason(&h.drain_ui()), Some(CloseReason::KeyRelease));
        }
    }

    #[test]
    fn any_key_policy_closes_on_first_release() {
        let mut h = Harness::new(&EngineConfig {
            mode: ActivationMode::Hold,
            release: ReleasePolicy::AnyKey,
            ..EngineConfig::default()
        });
        h.fire(trigger("pie", PIE));
        let now = h.now();
        h.controller.key_up(&key("shift", &["ctrl", "p"]), now);
        assert!(!h.controller.is_open());
    }

    #[test]
    fn hold_rejects_non_release_closes() {
        let mut h = Harness::new(&EngineConfig {
            mode: ActivationMode::Hold,
            timings: Timings {
                auto_close_ms: 100,
                ..Timings::default()
            },
            ..EngineConfig::default()
        });
        h.fire(trigger("pie", PIE));
        assert!(!h.controller.is_armed(TimerSlot::AutoClose));
        h.advance(Duration::from_millis(600));
        assert_eq!(
            h.fire(trigger("pie", PIE)),
            Transition::Ignored(Ignored::Holding)
        );
        let now = h.now();
        assert!(!h.controller.close(CloseReason::AutoClose, now));
        assert!(!h.controller.close(CloseReason::ActionSuccess, now));
        assert!(h.controller.is_open());
        assert!(h.controller.close(CloseReason::UserEscape, now));
    }

    #[test]
    fn safe_mode_does_not_close_hold() {
        let mut h = Harness::new(&cfg(ActivationMode::Hold));
        h.fire(trigger("pie", PIE));
        let now = h.now();
        h.controller.set_fullscreen(true, now);
        assert!(!h.controller.is_armed(TimerSlot::ForcedClose));
        h.advance(Duration::from_secs(1));
        assert!(h.controller.is_open());
        let now = h.now();
        h.controller.key_up(&key("p", &["ctrl", "shift"]), now);
        h.controller.key_up(&key("ctrl", &["shift"]), now);
        assert!(h.controller.is_open());
        h.controller.key_up(&key("shift", &[]), now);
        assert!(!h.controller.is_open());
    }

    #[test]
    fn safe_mode_closes_toggle_after_grace() {
        let mut h = Harness::new(&cfg(ActivationMode::Toggle));
        h.fire(trigger("pie", PIE));
        let now = h.now();
        h.controller.set_fullscreen(true, now);
        assert!(h.controller.is_armed(TimerSlot::ForcedClose));
        h.advance(Duration::from_millis(99));
        assert!(h.controller.is_open());
        h.advance(Duration::from_millis(2));
        assert!(!h.controller.is_open());
        assert_eq!(close_reason(&h.drain_ui()), Some(CloseReason::SafeMode));
        assert_eq!(h.metrics.snapshot().skipped, 1);
    }

    #[test]
    fn forced_close_cancelled_when_condition_clears() {
        let mut h = Harness::new(&cfg(ActivationMode::Toggle));
        h.fire(trigger("pie", PIE));
        let now = h.now();
        h.controller.set_storage_mode(StorageMode::ReadOnly, now);
        h.advance(Duration::from_millis(50));
        let now = h.now();
        h.controller.set_storage_mode(StorageMode::ReadWrite, now);
        assert!(!h.controller.is_armed(TimerSlot::ForcedClose));
        h.advance(Duration::from_millis(200));
        assert!(h.controller.is_open());
    }

    #[test]
    fn conflict_closes_hold_after_grace() {
        let mut h = Harness::new(&cfg(ActivationMode::Hold));
        h.fire(trigger("pie", PIE));
        let now = h.now();
        h.controller.set_conflict_dialog(true, now);
        h.advance(Duration::from_millis(150));
        assert!(!h.controller.is_open());
        assert_eq!(close_reason(&h.drain_ui()), Some(CloseReason::Conflict));
    }

    #[test]
    fn conflict_under_safe_mode_records_conflict_skip() {
        let mut h = Harness::new(&cfg(ActivationMode::Hold));
        h.fire(trigger("pie", PIE));
        let now = h.now();
        h.controller.set_fullscreen(true, now);
        assert_eq!(h.metrics.snapshot().skipped, 0);
        h.controller.set_conflict_dialog(true, now);
        assert!(h.controller.is_armed(TimerSlot::ForcedClose));
        let skip = h.controller.recorder().last().cloned();
        assert_eq!(
            skip.and_then(|o| o.message),
            Some(Blocked::Conflict.to_string())
        );
        h.advance(Duration::from_millis(150));
        assert_eq!(close_reason(&h.drain_ui()), Some(CloseReason::Conflict));
    }

    #[test]
    fn blocked_activation_records_deduplicated_skip() {
        let mut h = Harness::new(&cfg(ActivationMode::Toggle));
        let now = h.now();
        h.controller.set_storage_mode(StorageMode::ReadOnly, now);
        assert_eq!(
            h.fire(trigger("pie", PIE)),
            Transition::Ignored(Ignored::Blocked(Blocked::SafeMode(
                SafeModeReason::StorageReadOnly
            )))
        );
        h.advance(Duration::from_millis(300));
        assert!(matches!(
            h.fire(trigger("pie", PIE)),
            Transition::Ignored(Ignored::Blocked(_))
        ));
        assert_eq!(h.notice_count(), 1);
        assert_eq!(h.metrics.snapshot().skipped, 2);
        assert_eq!(
            h.controller.recorder().last().map(|o| o.action_id.as_str()),
            Some(ACTIVATION_ACTION_ID)
        );
    }

    #[test]
    fn registration_failure_blocks_and_notifies() {
        let mut h = Harness::new(&cfg(ActivationMode::Toggle));
        let now = h.now();
        let conflicts = vec![Conflict {
            code: ConflictCode::AlreadyRegistered,
            message: "taken by another app".to_string(),
        }];
        h.controller
            .set_registration(Some("pie"), false, &conflicts, now);
        let msgs = h.drain_ui();
        assert!(msgs.iter().any(|m| matches!(
            m,
            UiMsg::Notice { text, .. } if text == "taken by another app"
        )));
        assert!(msgs.contains(&UiMsg::Status {
            safe_mode: None,
            conflict: true
        }));
        assert!(matches!(
            h.fire(trigger("pie", PIE)),
            Transition::Ignored(Ignored::Blocked(Blocked::Conflict))
        ));
    }

    #[test]
    fn escape_closes_hold() {
        let mut h = Harness::new(&cfg(ActivationMode::Hold));
        h.fire(trigger("pie", PIE));
        let now = h.now();
        assert!(h
            .controller
            .key_down(&key("escape", &["ctrl", "shift"]), now));
        assert!(!h.controller.is_open());
        assert_eq!(close_reason(&h.drain_ui()), Some(CloseReason::UserEscape));
    }

    #[test]
    fn blur_releases_hold_unless_focus_returns() {
        let mut h = Harness::new(&cfg(ActivationMode::Hold));
        h.fire(trigger("pie", PIE));
        let now = h.now();
        h.controller.blur(now);
        h.advance(Duration::from_millis(100));
        h.controller.focus();
        h.advance(Duration::from_millis(200));
        assert!(h.controller.is_open());

        let now = h.now();
        h.controller.blur(now);
        h.advance(Duration::from_millis(150));
        assert!(!h.controller.is_open());
        assert_eq!(close_reason(&h.drain_ui()), Some(CloseReason::KeyRelease));
    }

    #[test]
    fn auto_close_extended_by_hover() {
        let mut h = Harness::new(&EngineConfig {
            timings: Timings {
                auto_close_ms: 1000,
                ..Timings::default()
            },
            ..EngineConfig::default()
        });
        h.fire(trigger("pie", PIE));
        h.advance(Duration::from_millis(800));
        let now = h.now();
        h.controller.hover(now);
        h.advance(Duration::from_millis(800));
        assert!(h.controller.is_open());
        h.advance(Duration::from_millis(200));
        assert!(!h.controller.is_open());
        assert_eq!(close_reason(&h.drain_ui()), Some(CloseReason::AutoClose));
    }

    #[test]
    fn outcomes_close_toggle_but_not_hold() {
        let mut h = Harness::new(&cfg(ActivationMode::Toggle));
        h.fire(trigger("pie", PIE));
        let now = h.now();
        h.controller
            .record_outcome(ActionOutcome::new("x", "", ActionStatus::Skipped), now);
        assert!(h.controller.is_open());
        h.controller
            .record_outcome(ActionOutcome::new("y", "", ActionStatus::Success), now);
        assert!(!h.controller.is_open());

        let mut h = Harness::new(&cfg(ActivationMode::Hold));
        h.fire(trigger("pie", PIE));
        let now = h.now();
        h.controller.select("y".to_string(), None);
        h.controller
            .record_outcome(ActionOutcome::new("y", "", ActionStatus::Success), now);
        h.controller
            .record_outcome(ActionOutcome::new("z", "", ActionStatus::Failure), now);
        assert!(h.controller.is_open());
    }

    #[test]
    fn repeated_success_inside_dedup_window_still_closes() {
        let mut h = Harness::new(&cfg(ActivationMode::Toggle));
        h.fire(trigger("pie", PIE));
        h.controller
            .select("term".to_string(), Some("inv-1".to_string()));
        let now = h.now();
        let ok = ActionOutcome::new("term", "Terminal", ActionStatus::Success);
        h.controller
            .record_outcome(ok.clone().with_invocation("inv-1"), now);
        assert!(!h.controller.is_open());

        h.advance(Duration::from_millis(600));
        assert_eq!(
            h.fire(trigger("pie", PIE)),
            Transition::Opened(ActivationMode::Toggle)
        );
        h.controller
            .select("term".to_string(), Some("inv-2".to_string()));
        h.advance(Duration::from_millis(400));
        let now = h.now();
        h.controller.record_outcome(ok.with_invocation("inv-2"), now);
        assert!(!h.controller.is_open());
        assert_eq!(h.notice_count(), 1);
        assert_eq!(h.metrics.snapshot().success, 2);
    }

    #[test]
    fn repeated_selected_failure_inside_dedup_window_still_closes() {
        let mut h = Harness::new(&cfg(ActivationMode::Toggle));
        h.fire(trigger("pie", PIE));
        let now = h.now();
        h.controller
            .record_outcome(ActionOutcome::new("b", "", ActionStatus::Failure), now);
        assert!(h.controller.is_open());
        h.controller.select("b".to_string(), None);
        h.advance(Duration::from_millis(500));
        let now = h.now();
        h.controller
            .record_outcome(ActionOutcome::new("b", "", ActionStatus::Failure), now);
        assert!(!h.controller.is_open());
        assert_eq!(h.notice_count(), 1);
    }

    #[test]
    fn selected_failure_closes_toggle() {
        let mut h = Harness::new(&cfg(ActivationMode::Toggle));
        h.fire(trigger("pie", PIE));
        let now = h.now();
        h.controller
            .record_outcome(ActionOutcome::new("a", "", ActionStatus::Failure), now);
        assert!(h.controller.is_open());
        h.controller
            .select("b".to_string(), Some("inv-7".to_string()));
        let fail = ActionOutcome::new("b", "", ActionStatus::Failure).with_invocation("inv-7");
        h.controller.record_outcome(fail, now);
        assert!(!h.controller.is_open());
        assert_eq!(close_reason(&h.drain_ui()), Some(CloseReason::ActionFailure));
    }

    #[test]
    fn hold_without_chord_falls_back_to_toggle() {
        let mut h = Harness::new(&cfg(ActivationMode::Hold));
        let now = h.now();
        assert_eq!(
            h.controller.open(now),
            Transition::Opened(ActivationMode::Toggle)
        );
        assert_eq!(
            h.controller.open(now),
            Transition::Ignored(Ignored::AlreadyOpen)
        );
        let snap = h.controller.snapshot();
        assert!(snap.is_open);
        assert_eq!(snap.mode, ActivationMode::Toggle);
        assert!(snap.active_accelerator.is_none());
    }

    #[test]
    fn snapshot_tracks_open_and_close_times() {
        let mut h = Harness::new(&cfg(ActivationMode::Hold));
        let t0 = h.now();
        h.fire(trigger("pie", PIE));
        let snap = h.controller.snapshot();
        assert_eq!(snap.opened_at, Some(t0));
        assert_eq!(
            snap.active_accelerator.map(|a| a.to_canonical()).as_deref(),
            Some("ctrl+shift+p")
        );
        h.advance(Duration::from_millis(40));
        let now = h.now();
        h.controller.close(CloseReason::UserEscape, now);
        let snap = h.controller.snapshot();
        assert!(!snap.is_open);
        assert_eq!(snap.mode, ActivationMode::Hold);
        assert_eq!(snap.closed_at, Some(now));
    }
}
