use std::collections::{BTreeSet, HashSet};

use pie_accel::{KeyEvent, Modifier};

/// Tracks which normalized keys are physically held.
///
/// Used to decide when a hold-mode chord has been released. Key names come
/// from [`KeyEvent::name`], so `"Control"` and `"ControlLeft"` both track as
/// `ctrl`.
#[derive(Debug, Default)]
pub struct KeyStateTracker {
    /// Currently held key names.
    held: HashSet<String>,
}

impl KeyStateTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return true if the key is currently considered down.
    pub fn is_down(&self, name: &str) -> bool {
        self.held.contains(name)
    }

    /// Record a key down; returns true for a fresh press, false for repeats.
    pub fn on_key_down(&mut self, event: &KeyEvent) -> bool {
        self.reconcile(event);
        let inserted = self.held.insert(event.name());
        inserted && !event.repeat
    }

    /// Record a key up.
    pub fn on_key_up(&mut self, event: &KeyEvent) {
        self.held.remove(&event.name());
        self.reconcile(event);
    }

    /// Mark every key of a chord as held (the chord that just opened the overlay).
    pub fn seed<'a>(&mut self, keys: impl IntoIterator<Item = &'a String>) {
        self.held.extend(keys.into_iter().cloned());
    }

    /// True when at least one key of `keys` is still held.
    pub fn any_held(&self, keys: &BTreeSet<String>) -> bool {
        keys.iter().any(|k| self.held.contains(k))
    }

    /// True when every key of `keys` is still held.
    pub fn all_held(&self, keys: &BTreeSet<String>) -> bool {
        keys.iter().all(|k| self.held.contains(k))
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.held.clear();
    }

    /// Number of held keys.
    pub fn len(&self) -> usize {
        self.held.len()
    }

    /// True when nothing is held.
    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    /// Drop modifiers the event reports as up. Recovers from key-ups that
    /// were delivered to another window.
    fn reconcile(&mut self, event: &KeyEvent) {
        let mods = event.modifiers();
        for m in Modifier::ALL {
            if !mods.contains(m) {
                self.held.remove(m.name());
            }
        }
    }
}
