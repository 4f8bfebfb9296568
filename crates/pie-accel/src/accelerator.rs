use std::{
    collections::BTreeSet,
    fmt,
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};

use crate::{
    KeyEvent, Modifier, Modifiers,
    spec::{code_to_key, primary_token},
};

/// A parsed accelerator: modifier flags plus an optional primary key.
///
/// Two accelerators are equal when their key sets are equal, so
/// `"Control+Shift+P"` and `"shift+ctrl+p"` compare equal while keeping their
/// original spelling for display.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Accelerator {
    /// Text the accelerator was parsed from.
    original: String,
    /// Required modifier flags.
    modifiers: Modifiers,
    /// The first non-modifier token, normalized.
    primary_key: Option<String>,
    /// Active modifier names plus the primary key.
    key_set: BTreeSet<String>,
}

impl Accelerator {
    /// Parses an accelerator of the form `"Control+Shift+P"`.
    ///
    /// - Components are separated by `+`, trimmed and compared case-insensitively.
    /// - Modifier synonyms are handled by [`Modifier::from_spec`].
    /// - The first non-modifier component becomes the primary key; any further
    ///   non-modifier components are ignored.
    /// - A component consisting only of whitespace is the space key.
    ///
    /// Returns `None` when the text is empty or only whitespace.
    pub fn parse(text: &str) -> Option<Self> {
        if text.trim().is_empty() {
            return None;
        }
        let mut modifiers = Modifiers::default();
        let mut primary_key = None;
        for raw in text.split('+') {
            let token = raw.trim().to_lowercase();
            let token = if token.is_empty() {
                if raw.is_empty() {
                    continue;
                }
                " ".to_string()
            } else {
                token
            };
            if let Some(m) = Modifier::from_spec(&token) {
                modifiers.insert(m);
            } else if primary_key.is_none() {
                primary_key = Some(primary_token(&token));
            }
        }
        if modifiers.is_empty() && primary_key.is_none() {
            return None;
        }
        let mut key_set: BTreeSet<String> =
            modifiers.iter().map(|m| m.name().to_string()).collect();
        if let Some(k) = &primary_key {
            key_set.insert(k.clone());
        }
        Some(Self {
            original: text.to_string(),
            modifiers,
            primary_key,
            key_set,
        })
    }

    /// The text this accelerator was parsed from.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Required modifier flags.
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Normalized primary key, if any.
    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    /// Normalized names of every key in the chord.
    pub fn key_set(&self) -> &BTreeSet<String> {
        &self.key_set
    }

    /// True when the accelerator names only modifiers.
    pub fn is_modifier_only(&self) -> bool {
        self.primary_key.is_none()
    }

    /// Returns true when `event` carries exactly this chord.
    ///
    /// Every modifier flag must agree (no extra or missing modifiers). The
    /// primary key is compared against the lower-cased `key`, falling back to
    /// the structural `code` for letters and digits; space matches either a
    /// literal `" "` key or the `Space` code. A modifier-only accelerator
    /// accepts any primary key.
    pub fn matches(&self, event: &KeyEvent) -> bool {
        if self.modifiers != event.modifiers() {
            return false;
        }
        let Some(primary) = self.primary_key.as_deref() else {
            return true;
        };
        if primary == "space" {
            return event.key == " " || event.code == "Space" || event.key == "Spacebar";
        }
        if event.key.to_lowercase() == primary {
            return true;
        }
        code_to_key(&event.code).is_some_and(|k| k == primary)
    }

    /// Returns the canonical string form: modifiers in `ctrl+alt+shift+meta`
    /// order followed by the primary key.
    pub fn to_canonical(&self) -> String {
        let mut out: Vec<&str> = self.modifiers.iter().map(Modifier::name).collect();
        if let Some(k) = &self.primary_key {
            out.push(k);
        }
        out.join("+")
    }
}

impl PartialEq for Accelerator {
    fn eq(&self, other: &Self) -> bool {
        self.key_set == other.key_set
    }
}

impl Eq for Accelerator {}

impl Hash for Accelerator {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key_set.hash(state);
    }
}

impl fmt::Display for Accelerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(key: &str, code: &str, mods: &[Modifier]) -> KeyEvent {
        KeyEvent::new(key, code).with_modifiers(mods.iter().copied().collect())
    }

    #[test]
    fn parse_control_shift_p() {
        let a = Accelerator::parse("Control+Shift+P").expect("parse");
        assert!(a.modifiers().ctrl && a.modifiers().shift);
        assert!(!a.modifiers().alt && !a.modifiers().meta);
        assert_eq!(a.primary_key(), Some("p"));
        let keys: Vec<&str> = a.key_set().iter().map(String::as_str).collect();
        assert_eq!(keys, vec!["ctrl", "p", "shift"]);
        assert_eq!(a.to_string(), "ctrl+shift+p");
        assert_eq!(a.original(), "Control+Shift+P");
    }

    #[test]
    fn matches_exact_modifiers_only() {
        let a = Accelerator::parse("Control+Shift+P").expect("parse");
        let good = KeyEvent {
            key: "P".into(),
            code: "KeyP".into(),
            ctrl: true,
            shift: true,
            alt: false,
            meta: false,
            repeat: false,
        };
        assert!(a.matches(&good));
        let extra_alt = KeyEvent {
            alt: true,
            ..good.clone()
        };
        assert!(!a.matches(&extra_alt));
        let missing_shift = KeyEvent {
            shift: false,
            ..good
        };
        assert!(!a.matches(&missing_shift));
    }

    #[test]
    fn every_single_modifier_flip_breaks_match() {
        let combos: Vec<(&str, Vec<Modifier>)> = vec![
            ("ctrl+k", vec![Modifier::Ctrl]),
            ("Alt+Shift+K", vec![Modifier::Alt, Modifier::Shift]),
            ("cmd+option+k", vec![Modifier::Meta, Modifier::Alt]),
            ("Win+Control+Alt+Shift+K", Modifier::ALL.to_vec()),
            ("k", vec![]),
        ];
        for (text, mods) in combos {
            let a = Accelerator::parse(text).expect("parse");
            let base = ev("k", "KeyK", &mods);
            assert!(a.matches(&base), "{text} should match");
            for m in Modifier::ALL {
                let mut flipped = base.clone();
                match m {
                    Modifier::Ctrl => flipped.ctrl = !flipped.ctrl,
                    Modifier::Alt => flipped.alt = !flipped.alt,
                    Modifier::Shift => flipped.shift = !flipped.shift,
                    Modifier::Meta => flipped.meta = !flipped.meta,
                }
                assert!(!a.matches(&flipped), "{text} must not match with {m} flipped");
            }
        }
    }

    #[test]
    fn code_fallback_for_composed_characters() {
        let a = Accelerator::parse("alt+p").expect("parse");
        assert!(a.matches(&ev("π", "KeyP", &[Modifier::Alt])));
        let d = Accelerator::parse("shift+1").expect("parse");
        assert!(d.matches(&ev("!", "Digit1", &[Modifier::Shift])));
        assert!(!d.matches(&ev("@", "Digit2", &[Modifier::Shift])));
    }

    #[test]
    fn space_variants() {
        for text in ["ctrl+space", "Ctrl+Spacebar", "ctrl+ "] {
            let a = Accelerator::parse(text).expect("parse");
            assert_eq!(a.primary_key(), Some("space"), "{text}");
            assert!(a.matches(&ev(" ", "Space", &[Modifier::Ctrl])));
            assert!(a.matches(&ev("", "Space", &[Modifier::Ctrl])));
            assert!(!a.matches(&ev("a", "KeyA", &[Modifier::Ctrl])));
        }
    }

    #[test]
    fn modifier_only_matches_any_key() {
        let a = Accelerator::parse("Ctrl+Alt").expect("parse");
        assert!(a.is_modifier_only());
        assert!(a.matches(&ev("x", "KeyX", &[Modifier::Ctrl, Modifier::Alt])));
        assert!(a.matches(&ev("Alt", "AltLeft", &[Modifier::Ctrl, Modifier::Alt])));
        assert!(!a.matches(&ev("x", "KeyX", &[Modifier::Ctrl])));
    }

    #[test]
    fn extra_primary_tokens_ignored() {
        let a = Accelerator::parse("ctrl+a+b").expect("parse");
        assert_eq!(a.primary_key(), Some("a"));
        assert_eq!(a.key_set().len(), 2);
    }

    #[test]
    fn empty_input_is_none() {
        assert!(Accelerator::parse("").is_none());
        assert!(Accelerator::parse("+").is_none());
        assert!(Accelerator::parse("++").is_none());
        assert!(Accelerator::parse("   ").is_none());
    }

    #[test]
    fn equality_by_key_set() {
        let a = Accelerator::parse("Control+Shift+P").expect("parse");
        let b = Accelerator::parse("shift+ctrl+p").expect("parse");
        let c = Accelerator::parse("ctrl+p").expect("parse");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn canonical_roundtrip() {
        for s in ["Command+Option+Space", "shift+ctrl+F5", "win+d", "alt"] {
            let a = Accelerator::parse(s).expect("parse");
            let again = Accelerator::parse(&a.to_canonical()).expect("reparse");
            assert_eq!(a, again, "{s} => {}", a.to_canonical());
        }
    }
}
