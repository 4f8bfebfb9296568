use serde::{Serialize, de::DeserializeOwned};

use crate::{Error, InboundEvent, Result};

/// Encode a message as a single JSON line (without the trailing newline).
pub fn encode_line<T: Serialize>(msg: &T) -> Result<String> {
    serde_json::to_string(msg).map_err(Error::Encode)
}

/// Decode one JSON line into `T`.
///
/// # Errors
/// Returns [`Error::Empty`] for blank lines and [`Error::Decode`] when the
/// line is not a valid `T`.
pub fn decode_line<T: DeserializeOwned>(line: &str) -> Result<T> {
    let line = line.trim();
    if line.is_empty() {
        return Err(Error::Empty);
    }
    serde_json::from_str(line).map_err(Error::Decode)
}

/// Decode one line of a mixed backend/local event stream.
pub fn decode_inbound(line: &str) -> Result<InboundEvent> {
    decode_line(line)
}
