//! JSON codec for [`Update`] frames.
//!
//! Wire format: one UTF-8 JSON object per WebSocket text frame.  There is no
//! additional framing; the transport delivers whole frames.

use crate::protocol::messages::Update;
use thiserror::Error;
use tracing::trace;

/// Errors that can occur during frame encoding or decoding.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The frame was empty or whitespace only.
    #[error("empty frame")]
    EmptyFrame,

    /// The frame was not a valid `Update` (bad JSON, unknown module, wrong field type).
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// The update could not be serialized.
    #[error("failed to encode update: {0}")]
    Encode(String),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes an [`Update`] into the JSON text sent to clients.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialization fails.
///
/// # Examples
///
/// ```rust
/// use collab_core::protocol::{decode_update, encode_update};
/// use collab_core::{Module, Update};
///
/// let update = Update::new(Module::Editor).with_id("alice").with_room("lvl1");
/// let text = encode_update(&update).unwrap();
/// assert_eq!(decode_update(&text).unwrap(), update);
/// ```
pub fn encode_update(update: &Update) -> Result<String, ProtocolError> {
    serde_json::to_string(update).map_err(|e| ProtocolError::Encode(e.to_string()))
}

/// Decodes one [`Update`] from a text frame.
///
/// # Errors
///
/// Returns [`ProtocolError::EmptyFrame`] for blank input and
/// [`ProtocolError::MalformedFrame`] for anything serde rejects.
pub fn decode_update(text: &str) -> Result<Update, ProtocolError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ProtocolError::EmptyFrame);
    }
    serde_json::from_str(trimmed).map_err(|e| {
        trace!(len = trimmed.len(), "rejecting frame: {e}");
        ProtocolError::MalformedFrame(e.to_string())
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
