use std::{io, path::PathBuf, result::Result as StdResult};

use thiserror::Error;

/// Convenient result type for the engine crate.
pub type Result<T> = StdResult<T, Error>;

/// Unified error type for the pie engine.
///
/// Controller transitions never return errors; these cover configuration,
/// the backend seam and the UI channel.
#[derive(Debug, Error)]
pub enum Error {
    /// The UI event channel has been closed by the receiver.
    #[error("UI channel closed")]
    ChannelClosed,

    /// I/O failure while reading configuration.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Configuration text did not parse.
    #[error("Config error: {0}")]
    Config(#[from] ron::error::SpannedError),

    /// A backend request failed.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Wire encode/decode failure.
    #[error("Protocol error: {0}")]
    Protocol(#[from] pie_protocol::Error),
}
