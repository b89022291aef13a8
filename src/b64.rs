//! Base64 text encoding for byte fields in JSON
//!
//! Byte strings travel as standard (padded) base64 strings, the usual JSON
//! rendering of raw bytes. `null` or a missing field decodes as empty.
//! Use with `#[serde(with = "crate::b64")]`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serializer};

/// Encode raw bytes as standard base64
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode standard base64 text
pub fn decode(text: &[u8]) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(text)
}

pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&encode(bytes))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(text) => decode(text.as_bytes()).map_err(serde::de::Error::custom),
        None => Ok(Vec::new()),
    }
}
