//! Codecs - converting between typed values and byte payloads.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::CodecError;

/// Codec between a typed value and an opaque byte payload.
///
/// Implementations must round-trip: decoding an encoded value yields a
/// value equal to the original. Stores and watchers are parameterized by a
/// codec rather than hard-wired to one format.
///
/// # Implementing Custom Codecs
///
/// ```rust
/// use bytes::Bytes;
/// use keybus_typed::{Codec, CodecError};
///
/// struct PlainTextCodec;
///
/// impl Codec<String> for PlainTextCodec {
///     fn encode(&self, value: &String) -> Result<Bytes, CodecError> {
///         Ok(Bytes::from(value.clone().into_bytes()))
///     }
///
///     fn decode(&self, bytes: &[u8]) -> Result<String, CodecError> {
///         String::from_utf8(bytes.to_vec()).map_err(|e| CodecError::decode(e.to_string()))
///     }
/// }
/// ```
pub trait Codec<T>: Send + Sync {
    /// Encode a value to bytes.
    fn encode(&self, value: &T) -> Result<Bytes, CodecError>;

    /// Decode a value from bytes.
    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError>;
}

/// The default codec: JSON via serde.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<T> Codec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> Result<Bytes, CodecError> {
        let bytes =
            serde_json::to_vec(value).map_err(|e| CodecError::encode(e.to_string()))?;
        Ok(Bytes::from(bytes))
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Account {
        id: String,
        balance: i64,
    }

    #[test]
    fn json_codec_roundtrip() {
        let codec = JsonCodec;
        let original = Account {
            id: "a-1".to_string(),
            balance: 42,
        };

        let bytes = codec.encode(&original).unwrap();
        let decoded: Account = codec.decode(&bytes).unwrap();

        assert_eq!(original, decoded);
    }

    #[test]
    fn json_codec_rejects_garbage() {
        let codec = JsonCodec;
        let result: Result<Account, _> = codec.decode(b"not json{");
        assert!(matches!(result, Err(CodecError::Decode { .. })));
    }

    #[test]
    fn json_codec_rejects_empty_input() {
        let codec = JsonCodec;
        let result: Result<Account, _> = codec.decode(b"");
        assert!(matches!(result, Err(CodecError::Decode { .. })));
    }

    #[test]
    fn roundtrip_holds_for_primitives() {
        let codec = JsonCodec;
        for value in [0u64, 1, u64::MAX] {
            let bytes = codec.encode(&value).unwrap();
            let decoded: u64 = codec.decode(&bytes).unwrap();
            assert_eq!(value, decoded);
        }
    }
}
