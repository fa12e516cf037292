/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed by the peer or by us.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Writing a frame failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Reading a frame failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The peer sent a binary frame that is not valid UTF-8.
    #[error("frame is not valid UTF-8")]
    InvalidFrame,

    /// Binding the listener or completing the upgrade failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),
}
