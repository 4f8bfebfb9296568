//! Engine configuration, loaded from RON.

use std::{fs, path::Path, time::Duration};

use pie_protocol::ActivationMode;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default timing and sizing values.
pub mod defaults {
    /// Window after an accepted hotkey during which further hotkeys are dropped.
    pub const PROCESSING_LOCK_MS: u64 = 50;
    /// Minimum time a toggle-opened overlay stays open before the trigger may close it.
    pub const TOGGLE_PROTECTION_MS: u64 = 500;
    /// Minimum interval after a close before a new open is honored.
    pub const REOPEN_COOLDOWN_MS: u64 = 250;
    /// Delay before a safe-mode or conflict forced close takes effect.
    pub const FORCED_CLOSE_GRACE_MS: u64 = 100;
    /// Delay before a focus loss is treated as a hold-mode release.
    pub const BLUR_RELEASE_MS: u64 = 150;
    /// Toggle-mode idle timeout; zero disables it.
    pub const AUTO_CLOSE_MS: u64 = 0;
    /// Notices with the same action id inside this window are suppressed.
    pub const DEDUP_WINDOW_MS: u64 = 2000;
    /// Number of outcomes kept in the history ring.
    pub const HISTORY_CAPACITY: usize = 64;

    /// Serde default for [`super::Timings::processing_lock_ms`].
    pub(crate) fn processing_lock_ms() -> u64 {
        PROCESSING_LOCK_MS
    }
    /// Serde default for [`super::Timings::toggle_protection_ms`].
    pub(crate) fn toggle_protection_ms() -> u64 {
        TOGGLE_PROTECTION_MS
    }
    /// Serde default for [`super::Timings::reopen_cooldown_ms`].
    pub(crate) fn reopen_cooldown_ms() -> u64 {
        REOPEN_COOLDOWN_MS
    }
    /// Serde default for [`super::Timings::forced_close_grace_ms`].
    pub(crate) fn forced_close_grace_ms() -> u64 {
        FORCED_CLOSE_GRACE_MS
    }
    /// Serde default for [`super::Timings::blur_release_ms`].
    pub(crate) fn blur_release_ms() -> u64 {
        BLUR_RELEASE_MS
    }
    /// Serde default for [`super::Timings::dedup_window_ms`].
    pub(crate) fn dedup_window_ms() -> u64 {
        DEDUP_WINDOW_MS
    }
    /// Serde default for [`super::EngineConfig::history_capacity`].
    pub(crate) fn history_capacity() -> usize {
        HISTORY_CAPACITY
    }
}

/// When a hold-mode overlay counts as released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleasePolicy {
    /// Close once no key of the chord remains pressed.
    #[default]
    LastKey,
    /// Close as soon as any key of the chord is released.
    AnyKey,
}

/// Where hotkey triggers come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// The backend matches global shortcuts and pushes `hotkey-fired`.
    #[default]
    Backend,
    /// Key events from the overlay window are matched locally.
    Local,
}

/// Timing parameters, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Timings {
    /// See [`defaults::PROCESSING_LOCK_MS`].
    #[serde(default = "defaults::processing_lock_ms")]
    pub processing_lock_ms: u64,
    /// See [`defaults::TOGGLE_PROTECTION_MS`].
    #[serde(default = "defaults::toggle_protection_ms")]
    pub toggle_protection_ms: u64,
    /// See [`defaults::REOPEN_COOLDOWN_MS`].
    #[serde(default = "defaults::reopen_cooldown_ms")]
    pub reopen_cooldown_ms: u64,
    /// See [`defaults::FORCED_CLOSE_GRACE_MS`].
    #[serde(default = "defaults::forced_close_grace_ms")]
    pub forced_close_grace_ms: u64,
    /// See [`defaults::BLUR_RELEASE_MS`].
    #[serde(default = "defaults::blur_release_ms")]
    pub blur_release_ms: u64,
    /// See [`defaults::AUTO_CLOSE_MS`].
    #[serde(default)]
    pub auto_close_ms: u64,
    /// See [`defaults::DEDUP_WINDOW_MS`].
    #[serde(default = "defaults::dedup_window_ms")]
    pub dedup_window_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            processing_lock_ms: defaults::PROCESSING_LOCK_MS,
            toggle_protection_ms: defaults::TOGGLE_PROTECTION_MS,
            reopen_cooldown_ms: defaults::REOPEN_COOLDOWN_MS,
            forced_close_grace_ms: defaults::FORCED_CLOSE_GRACE_MS,
            blur_release_ms: defaults::BLUR_RELEASE_MS,
            auto_close_ms: defaults::AUTO_CLOSE_MS,
            dedup_window_ms: defaults::DEDUP_WINDOW_MS,
        }
    }
}

impl Timings {
    /// Processing lock window.
    pub fn processing_lock(&self) -> Duration {
        Duration::from_millis(self.processing_lock_ms)
    }

    /// Toggle protection window.
    pub fn toggle_protection(&self) -> Duration {
        Duration::from_millis(self.toggle_protection_ms)
    }

    /// Reopen cooldown.
    pub fn reopen_cooldown(&self) -> Duration {
        Duration::from_millis(self.reopen_cooldown_ms)
    }

    /// Forced-close grace delay.
    pub fn forced_close_grace(&self) -> Duration {
        Duration::from_millis(self.forced_close_grace_ms)
    }

    /// Blur release delay.
    pub fn blur_release(&self) -> Duration {
        Duration::from_millis(self.blur_release_ms)
    }

    /// Toggle-mode idle timeout, if enabled.
    pub fn auto_close(&self) -> Option<Duration> {
        (self.auto_close_ms > 0).then(|| Duration::from_millis(self.auto_close_ms))
    }

    /// Notice deduplication window.
    pub fn dedup_window(&self) -> Duration {
        Duration::from_millis(self.dedup_window_ms)
    }
}

/// A trigger accelerator to bind at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Binding {
    /// Registration id.
    pub id: String,
    /// Accelerator text, e.g. `"Control+Shift+P"`.
    pub accelerator: String,
}

/// Top-level engine configuration.
///
/// Every field has a default, so `()` is a valid configuration:
///
/// ```ron
/// (
///     mode: hold,
///     release: any_key,
///     source: local,
///     bindings: [(id: "pie", accelerator: "Control+Shift+P")],
///     timings: (auto_close_ms: 4000),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Activation mode used for new opens.
    #[serde(default)]
    pub mode: ActivationMode,
    /// Hold-mode release policy.
    #[serde(default)]
    pub release: ReleasePolicy,
    /// Hotkey trigger source.
    #[serde(default)]
    pub source: SourceKind,
    /// Accelerators registered on connect.
    #[serde(default)]
    pub bindings: Vec<Binding>,
    /// Replace an internal duplicate instead of refusing the binding.
    #[serde(default)]
    pub allow_conflicts: bool,
    /// Timing parameters.
    #[serde(default)]
    pub timings: Timings,
    /// Outcome history capacity.
    #[serde(default = "defaults::history_capacity")]
    pub history_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: ActivationMode::default(),
            release: ReleasePolicy::default(),
            source: SourceKind::default(),
            bindings: Vec::new(),
            allow_conflicts: false,
            timings: Timings::default(),
            history_capacity: defaults::HISTORY_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from RON text.
    pub fn from_ron(text: &str) -> Result<Self> {
        Ok(ron::from_str(text)?)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = EngineConfig::from_ron("()").expect("parse");
        assert_eq!(cfg.mode, ActivationMode::Toggle);
        assert_eq!(cfg.release, ReleasePolicy::LastKey);
        assert_eq!(cfg.source, SourceKind::Backend);
        assert_eq!(cfg.timings, Timings::default());
        assert_eq!(cfg.history_capacity, defaults::HISTORY_CAPACITY);
        assert!(cfg.timings.auto_close().is_none());
    }

    #[test]
    fn partial_timings_keep_other_defaults() {
        let cfg = EngineConfig::from_ron(
            r#"(
                mode: hold,
                release: any_key,
                source: local,
                bindings: [(id: "pie", accelerator: "Control+Shift+P")],
                timings: (auto_close_ms: 4000, reopen_cooldown_ms: 100),
            )"#,
        )
        .expect("parse");
        assert_eq!(cfg.mode, ActivationMode::Hold);
        assert_eq!(cfg.release, ReleasePolicy::AnyKey);
        assert_eq!(cfg.source, SourceKind::Local);
        assert_eq!(cfg.bindings[0].accelerator, "Control+Shift+P");
        assert_eq!(cfg.timings.auto_close(), Some(Duration::from_secs(4)));
        assert_eq!(cfg.timings.reopen_cooldown(), Duration::from_millis(100));
        assert_eq!(
            cfg.timings.toggle_protection_ms,
            defaults::TOGGLE_PROTECTION_MS
        );
    }

    #[test]
    fn unknown_fields_rejected() {
        assert!(matches!(
            EngineConfig::from_ron("(modes: hold)"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = EngineConfig::load(Path::new("/nonexistent/pie.ron")).expect_err("missing");
        assert!(err.to_string().contains("/nonexistent/pie.ron"), "{err}");
    }
}
