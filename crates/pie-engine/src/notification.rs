use pie_protocol::{
    ActionOutcome, ActivationMode, CloseReason, NotifyKind, SafeModeReason, UiMsg, ipc::UiTx,
};
use tracing::info;

use crate::{Error, Result};

/// Sends overlay, status and notice messages to the UI layer.
#[derive(Clone)]
pub struct UiDispatcher {
    /// UI channel.
    tx: UiTx,
}

impl UiDispatcher {
    /// Create a new dispatcher from a UI message channel.
    pub fn new(tx: UiTx) -> Self {
        Self { tx }
    }

    /// Send a raw UI message.
    pub fn send(&self, msg: UiMsg) -> Result<()> {
        self.tx.send(msg).map_err(|_| Error::ChannelClosed)
    }

    /// Show the overlay.
    pub fn overlay_shown(&self, mode: ActivationMode, accelerator: Option<String>) -> Result<()> {
        self.send(UiMsg::Overlay {
            visible: true,
            mode,
            accelerator,
            reason: None,
        })
    }

    /// Hide the overlay.
    pub fn overlay_hidden(&self, mode: ActivationMode, reason: CloseReason) -> Result<()> {
        self.send(UiMsg::Overlay {
            visible: false,
            mode,
            accelerator: None,
            reason: Some(reason),
        })
    }

    /// Publish gating status.
    pub fn status(&self, safe_mode: Option<SafeModeReason>, conflict: bool) -> Result<()> {
        self.send(UiMsg::Status {
            safe_mode,
            conflict,
        })
    }

    /// Send a notice with the given kind, title, and text.
    pub fn notice(&self, kind: NotifyKind, title: String, text: String) -> Result<()> {
        info!(kind = ?kind, title = %title, text = %text, "notification_display");
        self.send(UiMsg::Notice { kind, title, text })
    }

    /// Publish the most recent action outcome.
    pub fn last_action(&self, outcome: ActionOutcome) -> Result<()> {
        self.send(UiMsg::LastAction(outcome))
    }
}
