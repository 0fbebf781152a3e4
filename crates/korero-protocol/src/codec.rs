//! Converting messages to and from bytes.
//!
//! The server is generic over [`Codec`] so the wire format can change
//! without touching rooms or handlers. [`JsonCodec`] is what browsers
//! speak and what every deployment uses today.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to bytes and decodes them back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task.
pub trait Codec: Send + Sync + 'static {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// JSON over `serde_json`.
///
/// ```rust
/// use korero_protocol::{ClientMessage, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let msg: ClientMessage = codec.decode(br#"{"type":"PING"}"#).unwrap();
/// assert_eq!(msg, ClientMessage::Ping);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClientMessage, ErrorKind, ServerMessage};

    #[test]
    fn test_json_codec_decodes_client_message() {
        let msg: ClientMessage = JsonCodec
            .decode(br#"{"type":"VOTE","approved":false}"#)
            .unwrap();
        assert_eq!(msg, ClientMessage::Vote { approved: false });
    }

    #[test]
    fn test_json_codec_garbage_is_decode_error() {
        let err = JsonCodec.decode::<ClientMessage>(b"not json").unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn test_json_codec_encodes_error_message() {
        let bytes = JsonCodec
            .encode(&ServerMessage::Error {
                kind: ErrorKind::TransportFault,
                message: "bad frame".into(),
            })
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["type"], "ERROR");
        assert_eq!(value["kind"], "TRANSPORT_FAULT");
    }
}
