//! Error handling for the pied crate.

use std::{io, result};

use thiserror::Error;
use tokio::task::JoinError;

/// Convenient result type for pied operations.
pub type Result<T> = result::Result<T, Error>;

/// Errors that can occur while running pied.
#[derive(Debug, Error)]
pub enum Error {
    /// Wrapper for standard I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Engine setup or configuration errors.
    #[error("Engine error: {0}")]
    Engine(#[from] pie_engine::Error),
    /// Wire encoding errors.
    #[error("Protocol error: {0}")]
    Protocol(#[from] pie_protocol::Error),
    /// Configuration could not be rendered.
    #[error("Failed to render configuration: {0}")]
    Render(#[from] ron::Error),
    /// A background task panicked or was cancelled.
    #[error("Task failed: {0}")]
    Join(#[from] JoinError),
    /// One or more configured bindings cannot be registered.
    #[error("{0} binding(s) refused")]
    BindingsRefused(usize),
    /// One or more accelerators did not parse.
    #[error("Invalid accelerator: {0}")]
    InvalidAccelerator(String),
}
