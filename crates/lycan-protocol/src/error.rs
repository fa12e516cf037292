//! Error types for the protocol layer.

/// Errors that can occur while encoding, decoding, or validating events.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The frame is not valid JSON or does not match any known event.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The event decoded but its contents break a protocol rule, such as
    /// an empty player name.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The text is not a well-formed room code.
    #[error("invalid room code: {0:?}")]
    InvalidRoomCode(String),
}
