//! Converting events to and from text frames.
//!
//! The gateway only needs something implementing [`Codec`]. JSON is the
//! only format browsers get today, but nothing above this module depends
//! on that.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to text frames and decodes them back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into one text frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Parses one text frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the text is malformed or does
    /// not match the expected type.
    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// ```rust
/// use lycan_protocol::{ClientEvent, Codec, JsonCodec};
///
/// let event: ClientEvent = JsonCodec.decode(r#"{"event":"list-rooms"}"#).unwrap();
/// assert_eq!(event, ClientEvent::ListRooms);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}
