//! The varsig signature envelope.
//!
//! The DAG-CBOR representation of a UCAN carries its signature as a
//! self-describing byte string: a varint multicodec naming the signature
//! algorithm, a varint length, the raw signature bytes and, only for the
//! `NONSTANDARD` sentinel code, a trailing UTF-8 algorithm name.
//! See: <https://github.com/ucan-wg/ucan-ipld#25-signature>

use crate::crypto::{JwtSignatureAlgorithm, KeyMaterial};
use anyhow::{anyhow, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{fmt::Display, str::FromStr};

// See <https://github.com/ucan-wg/ts-ucan/blob/99c9fc4f89fc917cf08d7fb09685705876b960f4/packages/default-plugins/src/prefixes.ts#L1-L6>
// See <https://github.com/multiformats/unsigned-varint>
pub const NONSTANDARD_VARSIG_PREFIX: u64 = 0xd000;
pub const ES256K_VARSIG_PREFIX: u64 = 0xd0e7;
pub const BLS12381G1_VARSIG_PREFIX: u64 = 0xd0ea;
pub const BLS12381G2_VARSIG_PREFIX: u64 = 0xd0eb;
pub const EDDSA_VARSIG_PREFIX: u64 = 0xd0ed;
pub const EIP191_VARSIG_PREFIX: u64 = 0xd191;
pub const ES256_VARSIG_PREFIX: u64 = 0xd01200;
pub const ES384_VARSIG_PREFIX: u64 = 0xd01201;
pub const ES512_VARSIG_PREFIX: u64 = 0xd01202;
pub const RS256_VARSIG_PREFIX: u64 = 0xd01205;

pub(crate) fn varsig_prefix(algorithm: JwtSignatureAlgorithm) -> u64 {
    match algorithm {
        JwtSignatureAlgorithm::EdDSA => EDDSA_VARSIG_PREFIX,
        JwtSignatureAlgorithm::RS256 => RS256_VARSIG_PREFIX,
        JwtSignatureAlgorithm::ES256 => ES256_VARSIG_PREFIX,
        JwtSignatureAlgorithm::ES384 => ES384_VARSIG_PREFIX,
        JwtSignatureAlgorithm::ES512 => ES512_VARSIG_PREFIX,
        JwtSignatureAlgorithm::ES256K => ES256K_VARSIG_PREFIX,
        JwtSignatureAlgorithm::BLS12381G1 => BLS12381G1_VARSIG_PREFIX,
        JwtSignatureAlgorithm::BLS12381G2 => BLS12381G2_VARSIG_PREFIX,
        JwtSignatureAlgorithm::EIP191 => EIP191_VARSIG_PREFIX,
    }
}

pub(crate) fn algorithm_for_prefix(prefix: u64) -> Option<JwtSignatureAlgorithm> {
    match prefix {
        EDDSA_VARSIG_PREFIX => Some(JwtSignatureAlgorithm::EdDSA),
        RS256_VARSIG_PREFIX => Some(JwtSignatureAlgorithm::RS256),
        ES256_VARSIG_PREFIX => Some(JwtSignatureAlgorithm::ES256),
        ES384_VARSIG_PREFIX => Some(JwtSignatureAlgorithm::ES384),
        ES512_VARSIG_PREFIX => Some(JwtSignatureAlgorithm::ES512),
        ES256K_VARSIG_PREFIX => Some(JwtSignatureAlgorithm::ES256K),
        BLS12381G1_VARSIG_PREFIX => Some(JwtSignatureAlgorithm::BLS12381G1),
        BLS12381G2_VARSIG_PREFIX => Some(JwtSignatureAlgorithm::BLS12381G2),
        EIP191_VARSIG_PREFIX => Some(JwtSignatureAlgorithm::EIP191),
        _ => None,
    }
}

/// A UCAN signature in its varsig envelope form.
///
/// The envelope is kept verbatim; the algorithm code is only validated when
/// an accessor needs it, so foreign envelopes survive decode/encode
/// bit-exactly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(#[serde(with = "serde_bytes")] Vec<u8>);

impl Signature {
    /// Wrap `raw` signature bytes in an envelope for a standard algorithm
    /// code. The `NONSTANDARD` sentinel is rejected here; use
    /// [`Signature::create_named`] for algorithms outside the varsig table.
    pub fn create(code: u64, raw: &[u8]) -> Result<Self> {
        if algorithm_for_prefix(code).is_none() {
            return Err(anyhow!("Unknown signature algorithm code 0x{code:x}"));
        }

        Ok(Signature::envelope(code, raw, None))
    }

    /// Wrap `raw` signature bytes in an envelope for the algorithm with the
    /// given JWT name, falling back to a `NONSTANDARD` envelope with the
    /// name appended when it is not in the varsig table.
    pub fn create_named(name: &str, raw: &[u8]) -> Self {
        match JwtSignatureAlgorithm::from_str(name) {
            Ok(algorithm) => Signature::envelope(varsig_prefix(algorithm), raw, None),
            Err(_) => Signature::envelope(NONSTANDARD_VARSIG_PREFIX, raw, Some(name)),
        }
    }

    /// Reinterpret bytes as a signature envelope. The algorithm code is not
    /// validated until it is read through [`Signature::algorithm`].
    pub fn decode(bytes: &[u8]) -> Self {
        Signature(bytes.to_vec())
    }

    /// The envelope bytes
    pub fn encode(&self) -> &[u8] {
        &self.0
    }

    fn envelope(code: u64, raw: &[u8], name: Option<&str>) -> Self {
        let mut code_buffer = unsigned_varint::encode::u64_buffer();
        let code_bytes = unsigned_varint::encode::u64(code, &mut code_buffer);
        let mut size_buffer = unsigned_varint::encode::usize_buffer();
        let size_bytes = unsigned_varint::encode::usize(raw.len(), &mut size_buffer);

        let mut bytes = [code_bytes, size_bytes, raw].concat();
        if let Some(name) = name {
            bytes.extend_from_slice(name.as_bytes());
        }

        Signature(bytes)
    }

    fn parts(&self) -> Result<(u64, &[u8], Option<&str>)> {
        let (code, buffer) =
            unsigned_varint::decode::u64(&self.0).map_err(|error| anyhow!("{error}"))?;
        let (size, buffer) =
            unsigned_varint::decode::usize(buffer).map_err(|error| anyhow!("{error}"))?;

        if buffer.len() < size {
            return Err(anyhow!(
                "Expected a signature of {size} bytes, instead got {}",
                buffer.len()
            ));
        }

        let name = match code {
            NONSTANDARD_VARSIG_PREFIX => Some(
                std::str::from_utf8(&buffer[size..])
                    .map_err(|_| anyhow!("Signature algorithm name is not valid UTF-8"))?,
            ),
            _ => None,
        };

        Ok((code, &buffer[..size], name))
    }

    /// The varsig multicodec of this signature
    pub fn code(&self) -> Result<u64> {
        self.parts().map(|(code, _, _)| code)
    }

    /// The size of the raw signature in bytes
    pub fn size(&self) -> Result<usize> {
        self.parts().map(|(_, raw, _)| raw.len())
    }

    /// The raw signature bytes, without the envelope
    pub fn raw(&self) -> Result<&[u8]> {
        self.parts().map(|(_, raw, _)| raw)
    }

    /// The JWT name of the signature algorithm
    pub fn algorithm(&self) -> Result<String> {
        let (code, _, name) = self.parts()?;

        match name {
            Some(name) => Ok(name.to_owned()),
            None => algorithm_for_prefix(code)
                .map(|algorithm| algorithm.to_string())
                .ok_or_else(|| anyhow!("Unknown signature algorithm code 0x{code:x}")),
        }
    }

    /// Check this signature over `payload` against the given key
    pub async fn verify<K: KeyMaterial>(&self, key: &K, payload: &[u8]) -> Result<()> {
        key.verify(payload, self.raw()?).await
    }

    /// The DAG-JSON form of this signature: `{"/": {"bytes": …}}`
    pub fn to_json(&self) -> Value {
        json!({
            "/": {
                "bytes": base64::engine::general_purpose::STANDARD_NO_PAD.encode(&self.0)
            }
        })
    }

    /// Read a signature back from its DAG-JSON form
    pub fn from_json(value: &Value) -> Result<Self> {
        let bytes = value
            .get("/")
            .and_then(|value| value.get("bytes"))
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("Expected a signature shaped as {{\"/\": {{\"bytes\": …}}}}, instead got {value}"))?;

        Ok(Signature(
            base64::engine::general_purpose::STANDARD_NO_PAD.decode(bytes)?,
        ))
    }
}

impl From<Vec<u8>> for Signature {
    fn from(bytes: Vec<u8>) -> Self {
        Signature(bytes)
    }
}

impl<T: AsRef<[u8]>> TryFrom<(JwtSignatureAlgorithm, T)> for Signature {
    type Error = anyhow::Error;

    fn try_from((algorithm, signature): (JwtSignatureAlgorithm, T)) -> Result<Self, Self::Error> {
        Signature::create(varsig_prefix(algorithm), signature.as_ref())
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&self.0)
        )
    }
}

impl FromStr for Signature {
    type Err = anyhow::Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Ok(Signature(
            base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(input)?,
        ))
    }
}
