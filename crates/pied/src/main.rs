//! Entry point for the `pied` binary.

mod backend;
mod check;
mod cli;
mod error;
mod serve;

use std::process;

use clap::Parser;
use pie_engine::EngineConfig;
use tokio::runtime::Builder;
use tracing::{error, info};

use crate::{
    cli::{Cli, Commands},
    error::Result,
};

fn main() {
    if let Err(err) = run() {
        error!("{err}");
        eprintln!("error: {err}");
        process::exit(1);
    }
}

/// Parse CLI arguments, install logging, and dispatch to the chosen subcommand.
fn run() -> Result<()> {
    let Cli {
        log,
        config,
        command,
    } = Cli::parse();
    logging::init(&log);

    let cfg = match &config {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            EngineConfig::load(path)?
        }
        None => EngineConfig::default(),
    };

    match command {
        Commands::Serve(args) => {
            let rt = Builder::new_current_thread().enable_all().build()?;
            rt.block_on(serve::run(cfg, &args))
        }
        Commands::Check => check::check(&cfg),
        Commands::Parse(args) => check::parse(&args.accelerators),
    }
}
