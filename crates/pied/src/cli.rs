//! Command-line interface definitions for pied.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use logging::LogArgs;

/// Command-line interface for the `pied` binary.
#[derive(Parser, Debug)]
#[command(
    name = "pied",
    about = "Hotkey activation controller for the pie overlay",
    version
)]
pub struct Cli {
    /// Logging controls shared across pie binaries.
    #[command(flatten)]
    pub log: LogArgs,

    /// Engine configuration file (RON). Defaults apply when omitted.
    #[arg(long, short, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// What to do.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the controller over JSON-lines events.
    Serve(ServeArgs),
    /// Validate the configuration and evaluate its bindings.
    Check,
    /// Parse accelerators and print their canonical form.
    Parse(ParseArgs),
}

/// Arguments for the `serve` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Read events from this file instead of stdin.
    #[arg(long, short, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Keep running this long after input ends so pending timers can fire.
    #[arg(long, default_value_t = 0, value_name = "MS")]
    pub linger_ms: u64,
}

/// Arguments for the `parse` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ParseArgs {
    /// Accelerator strings, e.g. `Control+Shift+P`.
    #[arg(value_name = "ACCELERATOR", num_args = 1..)]
    pub accelerators: Vec<String>,
}
