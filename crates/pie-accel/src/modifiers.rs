use std::fmt;

use serde::{Deserialize, Serialize};

/// The four modifier keys an accelerator can require.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Modifier {
    /// Control.
    Ctrl,
    /// Alt (Option on macOS).
    Alt,
    /// Shift.
    Shift,
    /// Meta (Command on macOS, Windows key elsewhere).
    Meta,
}

impl Modifier {
    /// All modifiers in canonical order.
    pub const ALL: [Self; 4] = [Self::Ctrl, Self::Alt, Self::Shift, Self::Meta];

    /// Parses a lower-cased accelerator token into a modifier.
    ///
    /// Accepts the synonyms used by desktop accelerator strings:
    /// - `control`, `ctrl`
    /// - `option`, `alt`
    /// - `cmd`, `command`, `win`, `meta`, `super`
    /// - `shift`
    ///
    /// `cmdorctrl` / `commandorcontrol` resolve to Meta on macOS and Ctrl
    /// everywhere else.
    pub fn from_spec(token: &str) -> Option<Self> {
        match token {
            "control" | "ctrl" => Some(Self::Ctrl),
            "option" | "alt" => Some(Self::Alt),
            "cmd" | "command" | "win" | "meta" | "super" => Some(Self::Meta),
            "shift" => Some(Self::Shift),
            "cmdorctrl" | "commandorcontrol" => {
                if cfg!(target_os = "macos") {
                    Some(Self::Meta)
                } else {
                    Some(Self::Ctrl)
                }
            }
            _ => None,
        }
    }

    /// Normalized key name, as stored in key sets and the pressed-key set.
    pub fn name(self) -> &'static str {
        match self {
            Self::Ctrl => "ctrl",
            Self::Alt => "alt",
            Self::Shift => "shift",
            Self::Meta => "meta",
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Modifier flags, as carried by both accelerators and key events.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Modifiers {
    /// Control held.
    pub ctrl: bool,
    /// Shift held.
    pub shift: bool,
    /// Alt/Option held.
    pub alt: bool,
    /// Meta/Command held.
    pub meta: bool,
}

impl Modifiers {
    /// Set the flag for `m`.
    pub fn insert(&mut self, m: Modifier) {
        match m {
            Modifier::Ctrl => self.ctrl = true,
            Modifier::Alt => self.alt = true,
            Modifier::Shift => self.shift = true,
            Modifier::Meta => self.meta = true,
        }
    }

    /// Return true if the flag for `m` is set.
    pub fn contains(&self, m: Modifier) -> bool {
        match m {
            Modifier::Ctrl => self.ctrl,
            Modifier::Alt => self.alt,
            Modifier::Shift => self.shift,
            Modifier::Meta => self.meta,
        }
    }

    /// Active modifiers in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = Modifier> + '_ {
        Modifier::ALL.into_iter().filter(|m| self.contains(*m))
    }

    /// True when no modifier is held.
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl FromIterator<Modifier> for Modifiers {
    fn from_iter<I: IntoIterator<Item = Modifier>>(iter: I) -> Self {
        let mut out = Self::default();
        for m in iter {
            out.insert(m);
        }
        out
    }
}
