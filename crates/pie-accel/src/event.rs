use serde::{Deserialize, Serialize};

use crate::{Modifiers, normalize_key_name};

/// A physical key event as delivered by the overlay window.
///
/// Field names follow the DOM `KeyboardEvent` so events can be decoded
/// straight from the webview bridge.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEvent {
    /// Logical key value (`"P"`, `" "`, `"Control"`).
    #[serde(default)]
    pub key: String,
    /// Physical key code (`"KeyP"`, `"Space"`, `"ControlLeft"`).
    #[serde(default)]
    pub code: String,
    /// Control flag.
    #[serde(default, rename = "ctrlKey")]
    pub ctrl: bool,
    /// Shift flag.
    #[serde(default, rename = "shiftKey")]
    pub shift: bool,
    /// Alt flag.
    #[serde(default, rename = "altKey")]
    pub alt: bool,
    /// Meta flag.
    #[serde(default, rename = "metaKey")]
    pub meta: bool,
    /// OS auto-repeat.
    #[serde(default)]
    pub repeat: bool,
}

impl KeyEvent {
    /// Construct an event with no modifiers held.
    pub fn new(key: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            code: code.into(),
            ..Self::default()
        }
    }

    /// Builder: set modifier flags.
    pub fn with_modifiers(mut self, mods: Modifiers) -> Self {
        self.ctrl = mods.ctrl;
        self.shift = mods.shift;
        self.alt = mods.alt;
        self.meta = mods.meta;
        self
    }

    /// Modifier flags carried by the event.
    pub fn modifiers(&self) -> Modifiers {
        Modifiers {
            ctrl: self.ctrl,
            shift: self.shift,
            alt: self.alt,
            meta: self.meta,
        }
    }

    /// Normalized key name (see [`normalize_key_name`]).
    pub fn name(&self) -> String {
        normalize_key_name(&self.key, &self.code)
    }
}
