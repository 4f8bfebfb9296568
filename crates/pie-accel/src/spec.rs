//! Token and key-name normalization shared by parsing and matching.

use crate::Modifier;

/// Normalize a non-modifier accelerator token (already trimmed and lower-cased).
///
/// Space variants collapse to `space`; a few common shorthands map onto the
/// names key events report (`esc` → `escape`, `up` → `arrowup`, ...).
pub(crate) fn primary_token(token: &str) -> String {
    let name = match token {
        " " | "space" | "spacebar" => "space",
        "esc" => "escape",
        "return" => "enter",
        "del" => "delete",
        "up" => "arrowup",
        "down" => "arrowdown",
        "left" => "arrowleft",
        "right" => "arrowright",
        "pgup" => "pageup",
        "pgdn" => "pagedown",
        "plus" => "+",
        other => other,
    };
    name.to_string()
}

/// Structural fallback for letter and digit codes: `KeyP` → `p`, `Digit1` /
/// `Numpad1` → `1`.
pub(crate) fn code_to_key(code: &str) -> Option<String> {
    let tail = code
        .strip_prefix("Key")
        .or_else(|| code.strip_prefix("Digit"))
        .or_else(|| code.strip_prefix("Numpad"))?;
    let mut chars = tail.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphanumeric() => Some(c.to_ascii_lowercase().to_string()),
        _ => None,
    }
}

/// Modifier named by a key event's `key` field (`Control`, `Meta`, `OS`, ...).
fn modifier_for_key(key: &str) -> Option<Modifier> {
    match key {
        "Control" => Some(Modifier::Ctrl),
        "Shift" => Some(Modifier::Shift),
        "Alt" | "AltGraph" | "Option" => Some(Modifier::Alt),
        "Meta" | "OS" | "Super" | "Win" | "Command" | "Hyper" => Some(Modifier::Meta),
        _ => None,
    }
}

/// Modifier named by a physical `code` (`ControlLeft`, `MetaRight`, ...).
fn modifier_for_code(code: &str) -> Option<Modifier> {
    let side = code
        .strip_suffix("Left")
        .or_else(|| code.strip_suffix("Right"))?;
    match side {
        "Control" => Some(Modifier::Ctrl),
        "Shift" => Some(Modifier::Shift),
        "Alt" => Some(Modifier::Alt),
        "Meta" | "OS" => Some(Modifier::Meta),
        _ => None,
    }
}

/// Normalized name for a key event, as used in key sets and the pressed set.
///
/// Letters and digits are taken from `code` when it is structural, so a
/// shifted or option-composed character still maps to its physical key.
/// Modifier keys map to `ctrl`/`shift`/`alt`/`meta`, space to `space`, and
/// everything else to its lower-cased `key`.
pub fn normalize_key_name(key: &str, code: &str) -> String {
    if let Some(k) = code_to_key(code) {
        return k;
    }
    if let Some(m) = modifier_for_key(key).or_else(|| modifier_for_code(code)) {
        return m.name().to_string();
    }
    if key == " " || key == "Spacebar" || code == "Space" {
        return "space".to_string();
    }
    if key.is_empty() {
        return code.to_ascii_lowercase();
    }
    primary_token(&key.to_lowercase())
}
