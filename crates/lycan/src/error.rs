//! Unified error type for the Lycan server.

use lycan_protocol::ProtocolError;
use lycan_room::RoomError;
use lycan_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impls, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum LycanError {
    /// A transport-level error (bind, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid payload).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (full, not found, wrong phase).
    #[error(transparent)]
    Room(#[from] RoomError),
}

#[cfg(test)]
mod tests {
    use lycan_protocol::RoomCode;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err: LycanError = TransportError::ConnectionClosed("gone".into()).into();
        assert!(matches!(err, LycanError::Transport(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: LycanError = ProtocolError::InvalidMessage("bad".into()).into();
        assert!(matches!(err, LycanError::Protocol(_)));
    }

    #[test]
    fn test_from_room_error_keeps_message() {
        let code = RoomCode::parse("AB12CD").unwrap();
        let err: LycanError = RoomError::NotFound(code).into();
        assert!(matches!(err, LycanError::Room(RoomError::NotFound(_))));
        assert!(err.to_string().contains("AB12CD"));
    }
}
