//! Wire types exchanged between the desktop backend, the activation
//! controller and the overlay UI.
//!
//! - [`BackendEvent`]: pushed by the backend (hotkey fired, registration and
//!   safe-mode status, action results).
//! - [`LocalEvent`]: produced by the overlay window itself (key events, focus,
//!   synthetic open/close, slice selection).
//! - [`BackendRequest`]: fire-and-forget requests the controller issues.
//! - [`UiMsg`]: what the controller tells the UI layer.
//!
//! Everything serializes as JSON objects tagged by `type` with camelCase
//! fields, matching the webview bridge.

use std::fmt;

use pie_accel::{Conflict, KeyEvent};
use serde::{Deserialize, Serialize};

mod error;
pub use error::{Error, Result};

/// How the overlay reacts to its trigger accelerator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationMode {
    /// Press once to open, press again to close.
    #[default]
    Toggle,
    /// Open only while the chord stays pressed.
    Hold,
}

/// Why the overlay closed.
///
/// Every close goes through a single entry point keyed by this enum, so which
/// paths may close a hold-mode overlay is decided by the reason itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CloseReason {
    /// Escape key, backdrop click, or an explicit close request.
    UserEscape,
    /// The hold chord was released (or focus was lost while holding it).
    KeyRelease,
    /// The trigger accelerator fired again in toggle mode.
    HotkeyToggle,
    /// The toggle-mode idle timer elapsed.
    AutoClose,
    /// Safe mode engaged while open.
    SafeMode,
    /// Hotkey registration conflict while open.
    Conflict,
    /// The selected action reported success.
    ActionSuccess,
    /// The selected action reported failure.
    ActionFailure,
}

impl CloseReason {
    /// Reasons allowed to close an overlay opened in hold mode.
    pub fn permitted_in_hold(self) -> bool {
        matches!(self, Self::KeyRelease | Self::UserEscape | Self::Conflict)
    }
}

/// Conditions under which activation is suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SafeModeReason {
    /// The foreground window is fullscreen (game, presentation, video).
    FullscreenTargetDetected,
    /// Profile storage is read-only.
    StorageReadOnly,
}

impl SafeModeReason {
    /// Wire identifier (`fullscreen-target-detected`, `storage-read-only`).
    pub fn code(self) -> &'static str {
        match self {
            Self::FullscreenTargetDetected => "fullscreen-target-detected",
            Self::StorageReadOnly => "storage-read-only",
        }
    }
}

impl fmt::Display for SafeModeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FullscreenTargetDetected => {
                f.write_str("a fullscreen application is in the foreground")
            }
            Self::StorageReadOnly => f.write_str("profile storage is read-only"),
        }
    }
}

/// Storage writability as reported by the storage monitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    /// Profiles can be written.
    #[default]
    ReadWrite,
    /// Profiles cannot be written.
    ReadOnly,
}

/// Result classification of a dispatched action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    /// The action ran and succeeded.
    Success,
    /// The action ran and failed.
    Failure,
    /// The action was deliberately not run.
    Skipped,
}

/// Result of a dispatched (or deliberately skipped) action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    /// Action identifier; the deduplication key.
    #[serde(rename = "id")]
    pub action_id: String,
    /// Display name.
    #[serde(rename = "name", default)]
    pub action_name: String,
    /// Outcome classification.
    pub status: ActionStatus,
    /// Optional detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Wall-clock time of the outcome, in Unix milliseconds.
    #[serde(default)]
    pub timestamp: i64,
    /// Execution time.
    #[serde(default)]
    pub duration_ms: u64,
    /// Correlates an outcome with the selection that dispatched it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invocation_id: Option<String>,
}

impl ActionOutcome {
    /// Construct an outcome with no message, timing or invocation id.
    pub fn new(
        action_id: impl Into<String>,
        action_name: impl Into<String>,
        status: ActionStatus,
    ) -> Self {
        Self {
            action_id: action_id.into(),
            action_name: action_name.into(),
            status,
            message: None,
            timestamp: 0,
            duration_ms: 0,
            invocation_id: None,
        }
    }

    /// Builder: attach a message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Builder: attach an invocation id.
    pub fn with_invocation(mut self, invocation_id: impl Into<String>) -> Self {
        self.invocation_id = Some(invocation_id.into());
        self
    }

    /// Builder: set the timestamp (Unix milliseconds).
    pub fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Events pushed by the desktop backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum BackendEvent {
    /// A registered global accelerator was pressed.
    HotkeyFired {
        /// Registration id.
        accelerator_id: String,
        /// Accelerator text as registered.
        accelerator: String,
    },
    /// Registration or conflict state changed.
    HotkeyRegistrationStatus {
        /// Binding the status is for; absent means every binding.
        #[serde(default)]
        accelerator_id: Option<String>,
        /// True when the trigger is bound.
        registered: bool,
        /// Conflicts reported by the registration subsystem.
        #[serde(default)]
        conflicts: Vec<Conflict>,
    },
    /// Foreground window status.
    WindowStatus {
        /// True when the foreground window is fullscreen.
        is_fullscreen: bool,
    },
    /// Storage writability.
    StorageMode {
        /// Current storage mode.
        mode: StorageMode,
    },
    /// Result of a dispatched action.
    ActionEvent(ActionOutcome),
}

/// Events produced by the overlay window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum LocalEvent {
    /// Physical key press.
    KeyDown(KeyEvent),
    /// Physical key release.
    KeyUp(KeyEvent),
    /// The overlay window lost focus.
    Blur,
    /// The overlay window regained focus.
    Focus,
    /// Synthetic open request.
    Open,
    /// Synthetic close request (Escape, backdrop click).
    Close,
    /// Synthetic toggle request.
    Toggle,
    /// A slice was chosen and its action dispatched.
    Select {
        /// Bound action id.
        action_id: String,
        /// Display name.
        #[serde(default)]
        action_name: String,
        /// Invocation id the backend will echo in its action event.
        #[serde(default)]
        invocation_id: Option<String>,
    },
    /// The pointer is over a slice; extends the idle timer.
    Hover,
    /// The hotkey conflict dialog opened or closed.
    ConflictDialog {
        /// True while the dialog is shown.
        open: bool,
    },
}

/// Any inbound event, as read from a mixed stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InboundEvent {
    /// Backend push.
    Backend(BackendEvent),
    /// Overlay window event.
    Local(LocalEvent),
}

/// Requests the controller sends to the backend. None of them block the
/// controller; results come back as [`BackendEvent`]s or are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum BackendRequest {
    /// Bind a global accelerator.
    RegisterAccelerator {
        /// Registration id.
        id: String,
        /// Accelerator text.
        accelerator: String,
    },
    /// List active accelerators.
    ListAccelerators,
    /// Resolve the currently active profile.
    ResolveActiveProfile,
    /// Start streaming action events.
    SubscribeActions,
    /// Fetch recent action history.
    RecentActions,
}

/// Notice severity, used for UI styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyKind {
    /// Neutral.
    Info,
    /// Something was skipped or degraded.
    Warn,
    /// Something failed.
    Error,
    /// Something succeeded.
    Success,
}

impl From<ActionStatus> for NotifyKind {
    fn from(status: ActionStatus) -> Self {
        match status {
            ActionStatus::Success => Self::Success,
            ActionStatus::Failure => Self::Error,
            ActionStatus::Skipped => Self::Warn,
        }
    }
}

/// Messages sent from the controller to the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum UiMsg {
    /// Overlay visibility changed.
    Overlay {
        /// True when the overlay is shown.
        visible: bool,
        /// Activation mode in effect.
        mode: ActivationMode,
        /// Canonical trigger accelerator, if known.
        #[serde(default)]
        accelerator: Option<String>,
        /// Why it closed (hide only).
        #[serde(default)]
        reason: Option<CloseReason>,
    },
    /// Transient notice for the user.
    Notice {
        /// Severity.
        kind: NotifyKind,
        /// Title line.
        title: String,
        /// Body text.
        text: String,
    },
    /// Most recent surfaced action outcome.
    LastAction(ActionOutcome),
    /// Gating status changed.
    Status {
        /// Active safe-mode reason.
        #[serde(default)]
        safe_mode: Option<SafeModeReason>,
        /// True while a hotkey conflict suppresses activation.
        conflict: bool,
    },
}

/// Channel helpers and the line codec.
pub mod ipc {
    use super::UiMsg;

    /// Tokio unbounded sender for UI messages.
    pub type UiTx = tokio::sync::mpsc::UnboundedSender<UiMsg>;
    /// Tokio unbounded receiver for UI messages.
    pub type UiRx = tokio::sync::mpsc::UnboundedReceiver<UiMsg>;

    /// Create a standard unbounded UI channel (sender, receiver).
    pub fn ui_channel() -> (UiTx, UiRx) {
        tokio::sync::mpsc::unbounded_channel::<UiMsg>()
    }

    /// JSON-lines encoding for events and messages.
    pub mod codec;
}
