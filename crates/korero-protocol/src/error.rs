//! Error types for the protocol layer.

/// Errors raised while encoding or decoding wire messages.
///
/// A decode failure means the client sent something malformed; the
/// server reports it back to that client only as a transport fault.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Malformed JSON, an unknown `type` tag, or missing fields.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// Parsed fine but breaks a protocol rule.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
