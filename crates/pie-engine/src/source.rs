//! Hotkey trigger sources.
//!
//! Either the backend matches global shortcuts and pushes `hotkey-fired`
//! (the [`BackendSource`]), or the overlay window's own key events are
//! matched against registered accelerators (the [`LocalSource`]). Both
//! produce the same [`Trigger`], so the controller cannot tell them apart.

use pie_accel::{AcceleratorRegistry, KeyEvent, RegisteredAccelerator, RegistrationStatus};
use tracing::{debug, trace};

use crate::{SourceKind, Trigger};

/// Turns raw inputs into controller triggers.
pub trait HotkeySource: Send {
    /// Which kind of source this is.
    fn kind(&self) -> SourceKind;

    /// Bind an accelerator locally. Blocking conflicts refuse the binding.
    fn register(&mut self, id: &str, accelerator: &str, allow_conflicts: bool)
    -> RegistrationStatus;

    /// Current bindings.
    fn bindings(&self) -> Vec<RegisteredAccelerator>;

    /// Trigger for a backend `hotkey-fired` push.
    fn fired(&self, accelerator_id: &str, accelerator: &str) -> Trigger;

    /// Trigger for a fresh key press in the overlay window, if it matches.
    fn key_down(&self, event: &KeyEvent) -> Option<Trigger>;
}

/// Resolve a backend push against the registry, parsing the reported text
/// when the id is unknown.
fn resolve(registry: &AcceleratorRegistry, accelerator_id: &str, accelerator: &str) -> Trigger {
    let parsed = registry
        .get(accelerator_id)
        .map(|e| e.accelerator.clone())
        .or_else(|| registry.parse(accelerator));
    if parsed.is_none() {
        debug!(id = accelerator_id, accel = %accelerator, "fired_accelerator_unparsed");
    }
    Trigger::new(accelerator_id, parsed)
}

/// The backend matches accelerators; key events only feed hold bookkeeping.
#[derive(Default)]
pub struct BackendSource {
    /// Bindings requested from the backend.
    registry: AcceleratorRegistry,
}

impl BackendSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }
}

impl HotkeySource for BackendSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Backend
    }

    fn register(
        &mut self,
        id: &str,
        accelerator: &str,
        allow_conflicts: bool,
    ) -> RegistrationStatus {
        self.registry.register(id, accelerator, allow_conflicts)
    }

    fn bindings(&self) -> Vec<RegisteredAccelerator> {
        self.registry.list()
    }

    fn fired(&self, accelerator_id: &str, accelerator: &str) -> Trigger {
        resolve(&self.registry, accelerator_id, accelerator)
    }

    fn key_down(&self, _event: &KeyEvent) -> Option<Trigger> {
        None
    }
}

/// Key events from the overlay window are matched locally.
#[derive(Default)]
pub struct LocalSource {
    /// Locally matched bindings.
    registry: AcceleratorRegistry,
}

impl LocalSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }
}

impl HotkeySource for LocalSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Local
    }

    fn register(
        &mut self,
        id: &str,
        accelerator: &str,
        allow_conflicts: bool,
    ) -> RegistrationStatus {
        self.registry.register(id, accelerator, allow_conflicts)
    }

    fn bindings(&self) -> Vec<RegisteredAccelerator> {
        self.registry.list()
    }

    fn fired(&self, accelerator_id: &str, accelerator: &str) -> Trigger {
        resolve(&self.registry, accelerator_id, accelerator)
    }

    fn key_down(&self, event: &KeyEvent) -> Option<Trigger> {
        if event.repeat {
            return None;
        }
        let hit = self.registry.match_event(event)?;
        trace!(id = %hit.id, key = %event.name(), "local_match");
        Some(Trigger::new(hit.id.clone(), Some(hit.accelerator.clone())))
    }
}

/// Source for a configured [`SourceKind`].
pub fn source_for(kind: SourceKind) -> Box<dyn HotkeySource> {
    match kind {
        SourceKind::Backend => Box::new(BackendSource::new()),
        SourceKind::Local => Box::new(LocalSource::new()),
    }
}
