//! Serialization helpers shared by the JWT formatter.

use anyhow::Result;
use base64::Engine;
use serde::{de::DeserializeOwned, Serialize};

/// Helper trait to ser/de any serde-implementing value to/from the JSON
/// layout that gets signed in the JWT representation: struct fields are
/// emitted in declaration order, nested maps sort their keys, and no
/// insignificant whitespace is produced.
pub trait CanonicalJson: Serialize + DeserializeOwned {
    fn to_canonical_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    fn from_canonical_json(json_bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(json_bytes)?)
    }
}

impl<T> CanonicalJson for T where T: Serialize + DeserializeOwned {}

/// Helper trait to encode structs as base64 as part of creating a JWT
pub trait Base64Encode: CanonicalJson {
    fn jwt_base64_encode(&self) -> Result<String> {
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(self.to_canonical_json()?))
    }
}

impl<T> Base64Encode for T where T: CanonicalJson {}
