//! Pie Engine
//!
//! The pie engine decides when the radial launcher overlay is shown:
//! - gates opening on safe mode, hotkey conflicts and a processing lock
//! - runs the toggle / hold state machine with its timing windows
//! - records action outcomes with notice deduplication and a history ring
//! - emits overlay, status and notice messages to the UI layer
//!
//! [`ActivationController`] is the synchronous state machine and can be
//! driven directly. [`Engine`] owns one and feeds it from an inbound event
//! stream on a tokio runtime, with real timers and a [`Backend`] for
//! outbound requests.
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

mod config;
mod controller;
mod deps;
mod error;
mod gate;
mod key_state;
mod metrics;
mod notification;
mod outcome;
mod source;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;
pub mod ticker;

// Timing constant for the warning threshold
const EVENT_PROC_WARN_MS: u64 = 5;

use pie_accel::RegistrationStatus;
use pie_protocol::{
    ActionOutcome, BackendEvent, CloseReason, InboundEvent, LocalEvent, ipc::UiTx,
};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, trace, warn};

pub use config::{Binding, EngineConfig, ReleasePolicy, SourceKind, Timings, defaults};
pub use controller::{
    ACTIVATION_ACTION_ID, ActivationController, ActivationSnapshot, Ignored, Transition, Trigger,
};
pub use deps::{Backend, NoopBackend};
pub use error::{Error, Result};
pub use gate::{ActivationGate, Blocked};
pub use key_state::KeyStateTracker;
pub use metrics::{MetricsSink, NoopMetrics, OutcomeCounters, OutcomeTotals};
pub use notification::UiDispatcher;
pub use outcome::{ActionOutcomeRecorder, Recorded};
pub use source::{BackendSource, HotkeySource, LocalSource, source_for};

use ticker::{Ticker, TimerFired};

/// Results of spawned backend requests, applied on the engine loop.
enum Feedback {
    /// A backend registration finished.
    Registration {
        /// Binding id.
        id: String,
        /// Backend verdict.
        status: RegistrationStatus,
    },
    /// Action history fetched on connect.
    History(Vec<ActionOutcome>),
}

/// Current time on the tokio clock, so paused-time tests stay consistent.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Engine drives an [`ActivationController`] from inbound events.
///
/// Construct via [`Engine::new`], then either call [`Engine::run`] with an
/// event stream or feed events by hand through [`Engine::handle`].
pub struct Engine {
    /// The state machine.
    controller: ActivationController,
    /// Trigger source.
    source: Box<dyn HotkeySource>,
    /// Outbound request target.
    backend: Arc<dyn Backend>,
    /// Accelerators to bind on connect.
    bindings: Vec<Binding>,
    /// Replace duplicate bindings instead of refusing them.
    allow_conflicts: bool,
    /// Timer fires from the [`Ticker`].
    timer_rx: UnboundedReceiver<TimerFired>,
    /// Sender handed to spawned backend requests.
    feedback_tx: UnboundedSender<Feedback>,
    /// Results of spawned backend requests.
    feedback_rx: UnboundedReceiver<Feedback>,
}

impl Engine {
    /// Create an engine with the source named by `cfg` and no metrics.
    ///
    /// - `backend`: target for outbound requests
    /// - `ui`: channel for UI messages
    pub fn new(cfg: &EngineConfig, backend: Arc<dyn Backend>, ui: UiTx) -> Self {
        Self::with_parts(
            cfg,
            backend,
            source_for(cfg.source),
            ui,
            Arc::new(NoopMetrics),
        )
    }

    /// Create an engine from explicit parts.
    pub fn with_parts(
        cfg: &EngineConfig,
        backend: Arc<dyn Backend>,
        source: Box<dyn HotkeySource>,
        ui: UiTx,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        let (timer_tx, timer_rx) = unbounded_channel();
        let (feedback_tx, feedback_rx) = unbounded_channel();
        let controller = ActivationController::new(
            cfg,
            Box::new(Ticker::new(timer_tx)),
            UiDispatcher::new(ui),
            metrics,
        );
        Self {
            controller,
            source,
            backend,
            bindings: cfg.bindings.clone(),
            allow_conflicts: cfg.allow_conflicts,
            timer_rx,
            feedback_tx,
            feedback_rx,
        }
    }

    /// The controller being driven.
    pub fn controller(&self) -> &ActivationController {
        &self.controller
    }

    /// Current controller state.
    pub fn snapshot(&self) -> ActivationSnapshot {
        self.controller.snapshot()
    }

    /// Bind configured accelerators and start the backend session.
    ///
    /// Local registration happens immediately. Backend requests run on their
    /// own tasks and report back through [`Engine::run`]. A failed history
    /// fetch is logged and treated as empty.
    pub fn connect(&mut self) {
        let now = now();
        for binding in self.bindings.clone() {
            let status =
                self.source
                    .register(&binding.id, &binding.accelerator, self.allow_conflicts);
            if !status.registered || self.source.kind() == SourceKind::Local {
                self.controller.set_registration(
                    Some(&binding.id),
                    status.registered,
                    &status.conflicts,
                    now,
                );
                continue;
            }
            let backend = self.backend.clone();
            let tx = self.feedback_tx.clone();
            tokio::spawn(async move {
                let status = match backend
                    .register_accelerator(&binding.id, &binding.accelerator)
                    .await
                {
                    Ok(status) => status,
                    Err(e) => {
                        warn!(id = %binding.id, "backend registration failed: {}", e);
                        RegistrationStatus {
                            registered: false,
                            conflicts: Vec::new(),
                        }
                    }
                };
                if tx
                    .send(Feedback::Registration {
                        id: binding.id,
                        status,
                    })
                    .is_err()
                {
                    trace!("engine_gone_before_registration");
                }
            });
        }

        let backend = self.backend.clone();
        let tx = self.feedback_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = backend.subscribe_actions().await {
                warn!("action subscription failed: {}", e);
            }
            match backend.resolve_active_profile().await {
                Ok(profile) => debug!(profile = ?profile, "active_profile"),
                Err(e) => warn!("active profile lookup failed: {}", e),
            }
            match backend.list_accelerators().await {
                Ok(list) => debug!(count = list.len(), "backend_accelerators"),
                Err(e) => warn!("accelerator listing failed: {}", e),
            }
            let history = backend.recent_actions().await.unwrap_or_else(|e| {
                warn!("action history unavailable: {}", e);
                Vec::new()
            });
            if tx.send(Feedback::History(history)).is_err() {
                trace!("engine_gone_before_history");
            }
        });
    }

    /// Apply one inbound event.
    pub fn handle(&mut self, event: InboundEvent) {
        let start = Instant::now();
        match event {
            InboundEvent::Backend(ev) => self.handle_backend(ev),
            InboundEvent::Local(ev) => self.handle_local(ev),
        }
        let elapsed = start.elapsed();
        if elapsed > Duration::from_millis(EVENT_PROC_WARN_MS) {
            warn!("Event processing took {:?}", elapsed);
        }
    }

    /// Apply a backend push.
    fn handle_backend(&mut self, event: BackendEvent) {
        let now = now();
        match event {
            BackendEvent::HotkeyFired {
                accelerator_id,
                accelerator,
            } => {
                let trigger = self.source.fired(&accelerator_id, &accelerator);
                let t = self.controller.hotkey_fired(trigger, now);
                trace!(id = %accelerator_id, transition = ?t, "hotkey_fired");
            }
            BackendEvent::HotkeyRegistrationStatus {
                accelerator_id,
                registered,
                conflicts,
            } => self.controller.set_registration(
                accelerator_id.as_deref(),
                registered,
                &conflicts,
                now,
            ),
            BackendEvent::WindowStatus { is_fullscreen } => {
                self.controller.set_fullscreen(is_fullscreen, now);
            }
            BackendEvent::StorageMode { mode } => self.controller.set_storage_mode(mode, now),
            BackendEvent::ActionEvent(outcome) => self.controller.record_outcome(outcome, now),
        }
    }

    /// Apply an overlay window event.
    fn handle_local(&mut self, event: LocalEvent) {
        let now = now();
        match event {
            LocalEvent::KeyDown(key) => {
                if self.controller.key_down(&key, now)
                    && let Some(trigger) = self.source.key_down(&key)
                {
                    let t = self.controller.hotkey_fired(trigger, now);
                    trace!(key = %key.name(), transition = ?t, "local_trigger");
                }
            }
            LocalEvent::KeyUp(key) => self.controller.key_up(&key, now),
            LocalEvent::Blur => self.controller.blur(now),
            LocalEvent::Focus => self.controller.focus(),
            LocalEvent::Open => {
                let t = self.controller.open(now);
                trace!(transition = ?t, "synthetic_open");
            }
            LocalEvent::Close => {
                self.controller.close(CloseReason::UserEscape, now);
            }
            LocalEvent::Toggle => {
                let t = self.controller.toggle(now);
                trace!(transition = ?t, "synthetic_toggle");
            }
            LocalEvent::Select {
                action_id,
                invocation_id,
                ..
            } => self.controller.select(action_id, invocation_id),
            LocalEvent::Hover => self.controller.hover(now),
            LocalEvent::ConflictDialog { open } => self.controller.set_conflict_dialog(open, now),
        }
    }

    /// Apply the result of a spawned backend request.
    fn apply_feedback(&mut self, feedback: Feedback) {
        let now = now();
        match feedback {
            Feedback::Registration { id, status } => {
                debug!(id = %id, registered = status.registered, "backend_registration");
                self.controller
                    .set_registration(Some(&id), status.registered, &status.conflicts, now);
            }
            Feedback::History(history) => self.controller.seed_history(history),
        }
    }

    /// Connect, then process events until the inbound stream closes.
    pub async fn run(mut self, mut events: UnboundedReceiver<InboundEvent>) -> Result<()> {
        self.connect();
        loop {
            tokio::select! {
                ev = events.recv() => match ev {
                    Some(ev) => self.handle(ev),
                    None => {
                        debug!("inbound stream closed");
                        break;
                    }
                },
                Some(fired) = self.timer_rx.recv() => self.controller.on_timer(fired, now()),
                Some(feedback) = self.feedback_rx.recv() => self.apply_feedback(feedback),
            }
        }
        Ok(())
    }

    /// Process any timer fires and backend results already queued.
    ///
    /// Lets callers that feed [`Engine::handle`] by hand observe timers.
    pub fn pump(&mut self) {
        while let Ok(fired) = self.timer_rx.try_recv() {
            self.controller.on_timer(fired, now());
        }
        while let Ok(feedback) = self.feedback_rx.try_recv() {
            self.apply_feedback(feedback);
        }
    }
}
