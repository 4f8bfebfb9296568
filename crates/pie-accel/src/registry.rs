//! Accelerator registrations keyed by id, with conflict evaluation.

use std::{collections::BTreeMap, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Accelerator, AcceleratorCache, KeyEvent};

/// Chords the operating system keeps for itself, in canonical form.
const RESERVED: &[&str] = &[
    "alt+tab",
    "ctrl+alt+delete",
    "alt+f4",
    "meta+l",
    "meta+d",
    "meta+tab",
    "ctrl+meta+q",
    "ctrl+alt+f1",
    "ctrl+alt+f2",
    "ctrl+alt+f3",
    "ctrl+alt+f4",
];

/// Why an accelerator cannot (or should not) be registered.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictCode {
    /// Another id already holds an equal accelerator.
    DuplicateInternal,
    /// The chord belongs to the operating system.
    ReservedByPlatform,
    /// The text does not parse.
    InvalidAccelerator,
    /// The platform reports the chord as taken by another application.
    AlreadyRegistered,
}

impl ConflictCode {
    /// Blocking conflicts prevent registration even when conflicts are allowed.
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::InvalidAccelerator | Self::ReservedByPlatform)
    }
}

/// A single registration conflict.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    /// Conflict classification.
    pub code: ConflictCode,
    /// Human-readable description.
    pub message: String,
}

/// Outcome of a registration attempt.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct RegistrationStatus {
    /// True when the accelerator is now bound.
    pub registered: bool,
    /// Conflicts found while evaluating the request.
    #[serde(default)]
    pub conflicts: Vec<Conflict>,
}

/// A bound accelerator.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RegisteredAccelerator {
    /// Caller-chosen registration id.
    pub id: String,
    /// Parsed accelerator.
    pub accelerator: Arc<Accelerator>,
}

/// Id → accelerator bindings.
#[derive(Default)]
pub struct AcceleratorRegistry {
    /// Bindings ordered by id for stable listings.
    entries: BTreeMap<String, RegisteredAccelerator>,
    /// Parse memo.
    cache: AcceleratorCache,
}

impl AcceleratorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `text` through the registry's memo.
    pub fn parse(&self, text: &str) -> Option<Arc<Accelerator>> {
        self.cache.get_or_parse(text)
    }

    /// Evaluate conflicts for binding `text`, ignoring the binding named `ignore_id`.
    pub fn evaluate(&self, text: &str, ignore_id: Option<&str>) -> Vec<Conflict> {
        let mut conflicts = Vec::new();
        let Some(accel) = self.parse(text) else {
            conflicts.push(Conflict {
                code: ConflictCode::InvalidAccelerator,
                message: format!("Invalid accelerator: '{text}'"),
            });
            return conflicts;
        };
        if let Some(existing) = self.find_by_accelerator(&accel)
            && ignore_id != Some(existing.id.as_str())
        {
            conflicts.push(Conflict {
                code: ConflictCode::DuplicateInternal,
                message: format!("Accelerator already registered under id '{}'", existing.id),
            });
        }
        let canonical = accel.to_canonical();
        if RESERVED.contains(&canonical.as_str()) {
            conflicts.push(Conflict {
                code: ConflictCode::ReservedByPlatform,
                message: format!("Accelerator '{text}' is reserved by the operating system"),
            });
        }
        conflicts
    }

    /// Bind `text` under `id`.
    ///
    /// Blocking conflicts always refuse the binding. Other conflicts refuse it
    /// unless `allow_conflicts` is set, in which case the conflicting binding
    /// is replaced.
    pub fn register(&mut self, id: &str, text: &str, allow_conflicts: bool) -> RegistrationStatus {
        let conflicts = self.evaluate(text, Some(id));
        let blocked = conflicts.iter().any(|c| c.code.is_blocking());
        if blocked || (!conflicts.is_empty() && !allow_conflicts) {
            debug!(id, accel = %text, ?conflicts, "registration_refused");
            return RegistrationStatus {
                registered: false,
                conflicts,
            };
        }
        let Some(accelerator) = self.parse(text) else {
            // evaluate() already reported the parse failure as blocking.
            return RegistrationStatus {
                registered: false,
                conflicts,
            };
        };
        if let Some(other) = self.find_by_accelerator(&accelerator).map(|e| e.id.clone())
            && other != id
        {
            debug!(id, replaced = %other, "registration_replaces_duplicate");
            self.entries.remove(&other);
        }
        debug!(id, accel = %accelerator, "registered");
        self.entries.insert(
            id.to_string(),
            RegisteredAccelerator {
                id: id.to_string(),
                accelerator,
            },
        );
        RegistrationStatus {
            registered: true,
            conflicts: Vec::new(),
        }
    }

    /// Remove the binding for `id`, returning it if present.
    pub fn unregister(&mut self, id: &str) -> Option<RegisteredAccelerator> {
        self.entries.remove(id)
    }

    /// All bindings, ordered by id.
    pub fn list(&self) -> Vec<RegisteredAccelerator> {
        self.entries.values().cloned().collect()
    }

    /// Binding for `id`.
    pub fn get(&self, id: &str) -> Option<&RegisteredAccelerator> {
        self.entries.get(id)
    }

    /// Binding holding an accelerator equal to `accel`.
    pub fn find_by_accelerator(&self, accel: &Accelerator) -> Option<&RegisteredAccelerator> {
        self.entries
            .values()
            .find(|e| e.accelerator.as_ref() == accel)
    }

    /// First binding (by id) whose accelerator matches `event`.
    pub fn match_event(&self, event: &KeyEvent) -> Option<&RegisteredAccelerator> {
        self.entries
            .values()
            .find(|e| e.accelerator.matches(event))
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
