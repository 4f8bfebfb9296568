use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type for the protocol crate.
pub type Result<T> = StdResult<T, Error>;

/// Errors from encoding or decoding wire messages.
#[derive(Debug, Error)]
pub enum Error {
    /// The line was not valid JSON for the expected type.
    #[error("decode error: {0}")]
    Decode(#[source] serde_json::Error),
    /// Serialization failed.
    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),
    /// An empty line where a message was expected.
    #[error("empty message")]
    Empty,
}
