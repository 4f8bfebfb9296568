//! One-shot timers for the activation controller.
//!
//! The controller never sleeps. It arms named slots through a [`TimerHost`]
//! and is told when they fire. Each arm carries a fresh token, so a fire that
//! raced a disarm or a re-arm is recognized as stale and dropped.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use tokio::{sync::mpsc::UnboundedSender, time};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Named timer slots. Arming a slot replaces its previous deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerSlot {
    /// Toggle-mode idle timeout.
    AutoClose,
    /// Safe-mode or conflict close after the grace delay.
    ForcedClose,
    /// Focus loss treated as a hold release.
    BlurRelease,
}

/// A timer slot elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    /// Slot that fired.
    pub slot: TimerSlot,
    /// Token given when the slot was armed.
    pub token: u64,
}

/// Schedules timer fires back to the controller's owner.
pub trait TimerHost: Send {
    /// Arrange for `TimerFired { slot, token }` to be delivered at `deadline`.
    fn arm(&mut self, slot: TimerSlot, token: u64, deadline: Instant);
    /// Cancel a pending fire for `slot`, if any.
    fn disarm(&mut self, slot: TimerSlot);
}

/// Tokio timer host: one task per armed slot, posting fires to a channel.
pub struct Ticker {
    /// Cancellation handle per armed slot.
    entries: HashMap<TimerSlot, CancellationToken>,
    /// Fire channel.
    tx: UnboundedSender<TimerFired>,
}

impl Ticker {
    /// Create a ticker delivering fires on `tx`. Must be used inside a runtime.
    pub fn new(tx: UnboundedSender<TimerFired>) -> Self {
        Self {
            entries: HashMap::new(),
            tx,
        }
    }
}

impl TimerHost for Ticker {
    fn arm(&mut self, slot: TimerSlot, token: u64, deadline: Instant) {
        self.disarm(slot);
        let cancel = CancellationToken::new();
        let guard = cancel.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep_until(time::Instant::from_std(deadline)) => {
                    trace!(?slot, token, "timer_fired");
                    if tx.send(TimerFired { slot, token }).is_err() {
                        trace!(?slot, "timer_receiver_gone");
                    }
                }
                _ = guard.cancelled() => {
                    trace!(?slot, token, "timer_cancelled");
                }
            }
        });
        self.entries.insert(slot, cancel);
    }

    fn disarm(&mut self, slot: TimerSlot) {
        if let Some(cancel) = self.entries.remove(&slot) {
            cancel.cancel();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        for (_, cancel) in self.entries.drain() {
            cancel.cancel();
        }
    }
}

/// Token bookkeeping on top of a [`TimerHost`].
pub(crate) struct Timers {
    /// Backend that actually waits.
    host: Box<dyn TimerHost>,
    /// Current token per armed slot.
    armed: HashMap<TimerSlot, u64>,
    /// Next token to hand out.
    next: u64,
}

impl Timers {
    /// Wrap a host.
    pub(crate) fn new(host: Box<dyn TimerHost>) -> Self {
        Self {
            host,
            armed: HashMap::new(),
            next: 1,
        }
    }

    /// Arm `slot` to fire `after` from `now`.
    pub(crate) fn arm(&mut self, slot: TimerSlot, now: Instant, after: Duration) {
        let token = self.next;
        self.next += 1;
        self.armed.insert(slot, token);
        trace!(?slot, token, ms = after.as_millis(), "timer_armed");
        self.host.arm(slot, token, now + after);
    }

    /// Disarm `slot`.
    pub(crate) fn disarm(&mut self, slot: TimerSlot) {
        if self.armed.remove(&slot).is_some() {
            self.host.disarm(slot);
        }
    }

    /// Disarm every slot.
    pub(crate) fn disarm_all(&mut self) {
        for slot in [
            TimerSlot::AutoClose,
            TimerSlot::ForcedClose,
            TimerSlot::BlurRelease,
        ] {
            self.disarm(slot);
        }
    }

    /// True when `slot` has a pending fire.
    pub(crate) fn is_armed(&self, slot: TimerSlot) -> bool {
        self.armed.contains_key(&slot)
    }

    /// Consume a fire. Returns false for stale fires.
    pub(crate) fn accept(&mut self, fired: TimerFired) -> bool {
        if self.armed.get(&fired.slot) == Some(&fired.token) {
            self.armed.remove(&fired.slot);
            true
        } else {
            trace!(slot = ?fired.slot, token = fired.token, "timer_stale");
            false
        }
    }
}
