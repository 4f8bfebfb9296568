//! Activation gate: safe mode, hotkey conflicts and the processing lock.

use std::{
    collections::BTreeMap,
    fmt,
    time::{Duration, Instant},
};

use pie_protocol::{ActivationMode, CloseReason, SafeModeReason, StorageMode};

/// Why the gate refuses to open the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blocked {
    /// Safe mode is active.
    SafeMode(SafeModeReason),
    /// The trigger is unregistered or the conflict dialog is open.
    Conflict,
}

impl fmt::Display for Blocked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SafeMode(reason) => write!(f, "Safe mode: {reason}"),
            Self::Conflict => f.write_str("Hotkey conflict: the trigger shortcut is unavailable"),
        }
    }
}

/// Decides whether opens and closes are allowed.
///
/// Safe mode is derived from the last reported window and storage status,
/// fullscreen taking precedence. A conflict is active while any binding is
/// reported unregistered or the conflict dialog is showing.
#[derive(Debug)]
pub struct ActivationGate {
    /// Foreground window is fullscreen.
    fullscreen: bool,
    /// Last reported storage mode.
    storage: StorageMode,
    /// Binding id → last reported registration.
    registrations: BTreeMap<String, bool>,
    /// Conflict dialog is showing.
    dialog_open: bool,
    /// End of the current processing lock.
    lock_until: Option<Instant>,
    /// Length of the processing lock.
    lock_window: Duration,
}

impl ActivationGate {
    /// Create an open gate with the given processing lock length.
    pub fn new(lock_window: Duration) -> Self {
        Self {
            fullscreen: false,
            storage: StorageMode::ReadWrite,
            registrations: BTreeMap::new(),
            dialog_open: false,
            lock_until: None,
            lock_window,
        }
    }

    /// Active safe-mode reason, if any.
    pub fn safe_mode(&self) -> Option<SafeModeReason> {
        if self.fullscreen {
            Some(SafeModeReason::FullscreenTargetDetected)
        } else if self.storage == StorageMode::ReadOnly {
            Some(SafeModeReason::StorageReadOnly)
        } else {
            None
        }
    }

    /// True while a hotkey conflict suppresses activation.
    pub fn conflict(&self) -> bool {
        self.dialog_open || self.registrations.values().any(|r| !r)
    }

    /// Update fullscreen status; returns true when the safe-mode reason changed.
    pub fn set_fullscreen(&mut self, fullscreen: bool) -> bool {
        let before = self.safe_mode();
        self.fullscreen = fullscreen;
        before != self.safe_mode()
    }

    /// Update storage mode; returns true when the safe-mode reason changed.
    pub fn set_storage_mode(&mut self, mode: StorageMode) -> bool {
        let before = self.safe_mode();
        self.storage = mode;
        before != self.safe_mode()
    }

    /// Update registration status for binding `id`, or for every known
    /// binding when `id` is `None`. Returns true when the conflict flag changed.
    pub fn set_registered(&mut self, id: Option<&str>, registered: bool) -> bool {
        let before = self.conflict();
        match id {
            Some(id) => {
                self.registrations.insert(id.to_string(), registered);
            }
            None if self.registrations.is_empty() => {
                self.registrations.insert(String::new(), registered);
            }
            None => self.registrations.values_mut().for_each(|r| *r = registered),
        }
        before != self.conflict()
    }

    /// Binding ids currently reported unregistered.
    pub fn unregistered(&self) -> impl Iterator<Item = &str> {
        self.registrations
            .iter()
            .filter(|(_, registered)| !**registered)
            .map(|(id, _)| id.as_str())
    }

    /// Update conflict dialog visibility; returns true when the conflict flag changed.
    pub fn set_dialog_open(&mut self, open: bool) -> bool {
        let before = self.conflict();
        self.dialog_open = open;
        before != self.conflict()
    }

    /// Reason opening is refused, ignoring the processing lock.
    pub fn blocked(&self) -> Option<Blocked> {
        if let Some(reason) = self.safe_mode() {
            return Some(Blocked::SafeMode(reason));
        }
        self.conflict().then_some(Blocked::Conflict)
    }

    /// True while an activation request is being handled.
    pub fn is_locked(&self, now: Instant) -> bool {
        self.lock_until.is_some_and(|until| now < until)
    }

    /// Take the processing lock for one request.
    pub fn lock(&mut self, now: Instant) {
        self.lock_until = Some(now + self.lock_window);
    }

    /// True when nothing suppresses opening right now.
    pub fn can_open(&self, now: Instant) -> bool {
        self.blocked().is_none() && !self.is_locked(now)
    }

    /// Whether `reason` may close an overlay opened in `mode`.
    pub fn can_close(&self, mode: ActivationMode, reason: CloseReason) -> bool {
        match mode {
            ActivationMode::Toggle => true,
            ActivationMode::Hold => reason.permitted_in_hold(),
        }
    }

    /// Close an overlay open in `mode` should be forced with, given the
    /// current status. Hold mode ignores safe mode; conflicts close any mode.
    pub fn forced_close(&self, mode: ActivationMode) -> Option<CloseReason> {
        if self.conflict() {
            return Some(CloseReason::Conflict);
        }
        match (mode, self.safe_mode()) {
            (ActivationMode::Toggle, Some(_)) => Some(CloseReason::SafeMode),
            _ => None,
        }
    }
}
