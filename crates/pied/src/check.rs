//! The `check` and `parse` commands.

use pie_accel::{Accelerator, AcceleratorRegistry};
use pie_engine::EngineConfig;
use ron::ser::{PrettyConfig, to_string_pretty};
use tracing::debug;

use crate::error::{Error, Result};

/// Print the effective configuration and the verdict for each binding.
pub fn check(cfg: &EngineConfig) -> Result<()> {
    println!("{}", to_string_pretty(cfg, PrettyConfig::new())?);
    let mut refused = 0;
    for line in evaluate(cfg) {
        if line.starts_with("refused") {
            refused += 1;
        }
        println!("{line}");
    }
    if refused > 0 {
        return Err(Error::BindingsRefused(refused));
    }
    Ok(())
}

/// Register every binding in a scratch registry, one report line each.
fn evaluate(cfg: &EngineConfig) -> Vec<String> {
    let mut registry = AcceleratorRegistry::new();
    cfg.bindings
        .iter()
        .map(|b| {
            let status = registry.register(&b.id, &b.accelerator, cfg.allow_conflicts);
            debug!(id = %b.id, registered = status.registered, "binding_checked");
            if status.registered {
                format!("ok       {} = {}", b.id, b.accelerator)
            } else {
                let why: Vec<&str> = status.conflicts.iter().map(|c| c.message.as_str()).collect();
                format!("refused  {} = {} ({})", b.id, b.accelerator, why.join("; "))
            }
        })
        .collect()
}

/// Canonical form and key set of `text`.
fn describe(text: &str) -> Result<String> {
    let accel =
        Accelerator::parse(text).ok_or_else(|| Error::InvalidAccelerator(text.to_string()))?;
    let keys: Vec<&str> = accel.key_set().iter().map(String::as_str).collect();
    Ok(format!("{text}\t{accel}\t[{}]", keys.join(", ")))
}

/// Print each accelerator's canonical form; fails on the first one that
/// does not parse.
pub fn parse(accelerators: &[String]) -> Result<()> {
    for text in accelerators {
        println!("{}", describe(text)?);
    }
    Ok(())
}
