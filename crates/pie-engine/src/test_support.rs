//! Test support utilities for pie-engine unit and integration tests.
//! Built for tests and with the `test-utils` feature.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use parking_lot::Mutex;
use pie_accel::{RegisteredAccelerator, RegistrationStatus};
use pie_protocol::{
    ActionOutcome, BackendRequest, UiMsg,
    ipc::{UiRx, ui_channel},
};

use crate::{
    ActivationController, Backend, EngineConfig, Error, OutcomeCounters, Result, Transition,
    Trigger, UiDispatcher,
    ticker::{TimerFired, TimerHost, TimerSlot},
};

/// Timer host that only fires when told to. Clones share state.
#[derive(Clone, Default)]
pub struct ManualTimers {
    /// Armed slots with their token and deadline.
    armed: Arc<Mutex<BTreeMap<TimerSlot, (u64, Instant)>>>,
}

impl ManualTimers {
    /// Create an empty host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return the earliest fire due at or before `now`.
    pub fn take_due(&self, now: Instant) -> Option<(TimerFired, Instant)> {
        let mut armed = self.armed.lock();
        let (slot, token, at) = armed
            .iter()
            .filter(|(_, (_, at))| *at <= now)
            .min_by_key(|(_, (_, at))| *at)
            .map(|(slot, (token, at))| (*slot, *token, *at))?;
        armed.remove(&slot);
        Some((TimerFired { slot, token }, at))
    }

    /// Slots currently armed.
    pub fn pending(&self) -> Vec<TimerSlot> {
        self.armed.lock().keys().copied().collect()
    }
}

impl TimerHost for ManualTimers {
    fn arm(&mut self, slot: TimerSlot, token: u64, deadline: Instant) {
        self.armed.lock().insert(slot, (token, deadline));
    }

    fn disarm(&mut self, slot: TimerSlot) {
        self.armed.lock().remove(&slot);
    }
}

/// A controller on a manual clock, with its UI channel and metrics exposed.
pub struct Harness {
    /// Controller under test.
    pub controller: ActivationController,
    /// Timer host shared with the controller.
    pub timers: ManualTimers,
    /// UI messages sent by the controller.
    pub ui: UiRx,
    /// Metrics sink shared with the controller.
    pub metrics: OutcomeCounters,
    /// Current manual time.
    now: Instant,
}

impl Harness {
    /// Build a harness around a controller configured by `cfg`.
    pub fn new(cfg: &EngineConfig) -> Self {
        let timers = ManualTimers::new();
        let (tx, ui) = ui_channel();
        let metrics = OutcomeCounters::new();
        let controller = ActivationController::new(
            cfg,
            Box::new(timers.clone()),
            UiDispatcher::new(tx),
            Arc::new(metrics.clone()),
        );
        Self {
            controller,
            timers,
            ui,
            metrics,
            now: Instant::now(),
        }
    }

    /// Current manual time.
    pub fn now(&self) -> Instant {
        self.now
    }

    /// Move the clock forward, firing due timers in deadline order.
    pub fn advance(&mut self, by: Duration) {
        let target = self.now + by;
        while let Some((fired, at)) = self.timers.take_due(target) {
            self.now = self.now.max(at);
            self.controller.on_timer(fired, self.now);
        }
        self.now = target;
    }

    /// Fire `trigger` at the current time.
    pub fn fire(&mut self, trigger: Trigger) -> Transition {
        self.controller.hotkey_fired(trigger, self.now)
    }

    /// Drain every UI message sent so far.
    pub fn drain_ui(&mut self) -> Vec<UiMsg> {
        let mut out = Vec::new();
        while let Ok(msg) = self.ui.try_recv() {
            out.push(msg);
        }
        out
    }

    /// Number of notices among the pending UI messages (drains them).
    pub fn notice_count(&mut self) -> usize {
        self.drain_ui()
            .iter()
            .filter(|m| matches!(m, UiMsg::Notice { .. }))
            .count()
    }
}

/// Shared state behind [`MockBackend`].
#[derive(Default)]
struct MockState {
    /// Requests seen, in order.
    requests: Vec<BackendRequest>,
    /// History returned by `recent_actions`.
    history: Vec<ActionOutcome>,
    /// Status returned by `register_accelerator`.
    registration: Option<RegistrationStatus>,
    /// Per-id overrides of `registration`.
    registration_for: HashMap<String, RegistrationStatus>,
    /// Fail `recent_actions`.
    fail_history: bool,
}

/// Scriptable backend for tests. Clones share state.
#[derive(Clone, Default)]
pub struct MockBackend {
    /// Shared state.
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a mock that registers everything and has no history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: history returned on connect.
    pub fn with_history(self, history: Vec<ActionOutcome>) -> Self {
        self.state.lock().history = history;
        self
    }

    /// Builder: make the history fetch fail.
    pub fn failing_history(self) -> Self {
        self.state.lock().fail_history = true;
        self
    }

    /// Builder: status returned for every registration.
    pub fn with_registration(self, status: RegistrationStatus) -> Self {
        self.state.lock().registration = Some(status);
        self
    }

    /// Builder: status returned when registering `id`.
    pub fn with_registration_for(self, id: &str, status: RegistrationStatus) -> Self {
        self.state.lock().registration_for.insert(id.to_string(), status);
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<BackendRequest> {
        self.state.lock().requests.clone()
    }

    /// Record a request.
    fn log(&self, req: BackendRequest) {
        self.state.lock().requests.push(req);
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn register_accelerator(&self, id: &str, accelerator: &str) -> Result<RegistrationStatus> {
        self.log(BackendRequest::RegisterAccelerator {
            id: id.to_string(),
            accelerator: accelerator.to_string(),
        });
        let st = self.state.lock();
        Ok(st
            .registration_for
            .get(id)
            .or(st.registration.as_ref())
            .cloned()
            .unwrap_or(RegistrationStatus {
                registered: true,
                conflicts: Vec::new(),
            }))
    }

    async fn list_accelerators(&self) -> Result<Vec<RegisteredAccelerator>> {
        self.log(BackendRequest::ListAccelerators);
        Ok(Vec::new())
    }

    async fn resolve_active_profile(&self) -> Result<Option<String>> {
        self.log(BackendRequest::ResolveActiveProfile);
        Ok(Some("default".to_string()))
    }

    async fn subscribe_actions(&self) -> Result<()> {
        self.log(BackendRequest::SubscribeActions);
        Ok(())
    }

    async fn recent_actions(&self) -> Result<Vec<ActionOutcome>> {
        self.log(BackendRequest::RecentActions);
        let st = self.state.lock();
        if st.fail_history {
            return Err(Error::Backend("history unavailable".to_string()));
        }
        Ok(st.history.clone())
    }
}
