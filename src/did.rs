//! Principals: byte-tagged DIDs.
//!
//! A [`Principal`] stores the canonical byte form used by the DAG-CBOR
//! representation. For `did:key` DIDs the bytes are the multicodec-tagged
//! public key; every other DID method is carried as the `did:` multicodec
//! (`0x0d1d`) followed by the UTF-8 method and identifier.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt::Display, str::FromStr};

pub const DID_PREFIX: &str = "did:";
pub const DID_KEY_PREFIX: &str = "did:key:z";

// Multicodec tags for the public key algorithms recognized in did:key
pub const ED25519_CODE: u64 = 0xed;
pub const SECP256K1_CODE: u64 = 0xe7;
pub const BLS12381G1_CODE: u64 = 0xea;
pub const BLS12381G2_CODE: u64 = 0xeb;
pub const P256_CODE: u64 = 0x1200;
pub const P384_CODE: u64 = 0x1201;
pub const P521_CODE: u64 = 0x1202;
pub const RSA_CODE: u64 = 0x1205;

/// Multicodec tag for DIDs of any method other than `did:key`
pub const DID_CORE_CODE: u64 = 0x0d1d;

/// Varint encoding of [`ED25519_CODE`], for key backends that assemble
/// `did:key` strings directly
pub const ED25519_MAGIC_BYTES: &[u8] = &[0xed, 0x01];

// Two tag bytes plus a compressed curve point
const P256_COMPRESSED_SIZE: usize = 35;

/// An entity identified by a DID, such as the issuer or audience of a UCAN.
///
/// Holds the canonical byte form along with the string form computed at
/// construction time, so [`Principal::did`] is a cheap accessor and
/// `format(parse(did)) == did` for every DID this crate accepts.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Principal {
    bytes: Vec<u8>,
    did: String,
}

impl Principal {
    /// The DID string form of this principal
    pub fn did(&self) -> &str {
        &self.did
    }

    /// The canonical multicodec-tagged byte form of this principal
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl TryFrom<Vec<u8>> for Principal {
    type Error = anyhow::Error;

    fn try_from(bytes: Vec<u8>) -> Result<Self> {
        let (code, rest) =
            unsigned_varint::decode::u64(&bytes).map_err(|error| anyhow!("{error}"))?;

        let did = match code {
            DID_CORE_CODE => {
                let suffix = std::str::from_utf8(rest)
                    .map_err(|_| anyhow!("DID method suffix is not valid UTF-8"))?;
                [DID_PREFIX, suffix].concat()
            }
            P256_CODE if bytes.len() > P256_COMPRESSED_SIZE => {
                return Err(anyhow!("Only p256-pub compressed is supported."))
            }
            ED25519_CODE | SECP256K1_CODE | BLS12381G1_CODE | BLS12381G2_CODE | P256_CODE
            | P384_CODE | P521_CODE | RSA_CODE => {
                [DID_KEY_PREFIX, &bs58::encode(&bytes).into_string()].concat()
            }
            _ => {
                return Err(anyhow!(
                    "Unsupported key algorithm with multicode 0x{code:x}"
                ))
            }
        };

        Ok(Principal { bytes, did })
    }
}

impl FromStr for Principal {
    type Err = anyhow::Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if let Some(stripped) = input.strip_prefix(DID_KEY_PREFIX) {
            Principal::try_from(bs58::decode(stripped).into_vec()?)
        } else if let Some(stripped) = input.strip_prefix(DID_PREFIX) {
            let mut buffer = unsigned_varint::encode::u64_buffer();
            let tag = unsigned_varint::encode::u64(DID_CORE_CODE, &mut buffer);

            Ok(Principal {
                bytes: [tag, stripped.as_bytes()].concat(),
                did: input.to_owned(),
            })
        } else {
            Err(anyhow!("This is not a DID: {input}"))
        }
    }
}

impl TryFrom<&str> for Principal {
    type Error = anyhow::Error;

    fn try_from(input: &str) -> Result<Self> {
        Principal::from_str(input)
    }
}

impl Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.did)
    }
}

impl Serialize for Principal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serde_bytes::Bytes::new(&self.bytes).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Principal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = serde_bytes::ByteBuf::deserialize(deserializer)?;
        Principal::try_from(bytes.into_vec()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use crate::{did::Principal, tests::helpers::dag_cbor_roundtrip};

    #[cfg(target_arch = "wasm32")]
    use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};

    #[cfg(target_arch = "wasm32")]
    wasm_bindgen_test_configure!(run_in_browser);

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
    #[cfg_attr(not(target_arch = "wasm32"), test)]
    fn it_round_trips_a_principal_did() {
        let did_string = "did:key:z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK";
        let principal = dag_cbor_roundtrip(&Principal::from_str(did_string).unwrap()).unwrap();
        assert_eq!(did_string, principal.did());

        let did_string = "did:web:example.com";
        let principal = dag_cbor_roundtrip(&Principal::from_str(did_string).unwrap()).unwrap();
        assert_eq!(did_string, principal.did());
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
    #[cfg_attr(not(target_arch = "wasm32"), test)]
    fn it_rejects_strings_that_are_not_dids() {
        assert!(Principal::from_str("key:z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK").is_err());
        assert!(Principal::from_str("").is_err());
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
    #[cfg_attr(not(target_arch = "wasm32"), test)]
    fn it_rejects_unknown_key_algorithms() {
        // varint tag 0x99 is not a recognized key algorithm
        let bytes = [vec![0x99, 0x01], vec![0u8; 32]].concat();
        let error = Principal::try_from(bytes).unwrap_err();

        assert!(error.to_string().contains("Unsupported key algorithm"));
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
    #[cfg_attr(not(target_arch = "wasm32"), test)]
    fn it_only_accepts_compressed_p256_keys() {
        let mut compressed_point = vec![0x02u8];
        compressed_point.extend_from_slice(&[0xabu8; 32]);
        let compressed = [&[0x80u8, 0x24], compressed_point.as_slice()].concat();

        let principal = Principal::try_from(compressed).unwrap();
        let parsed = Principal::from_str(principal.did()).unwrap();
        assert_eq!(principal, parsed);

        let mut uncompressed_point = vec![0x04u8];
        uncompressed_point.extend_from_slice(&[0xabu8; 64]);
        let uncompressed = [&[0x80u8, 0x24], uncompressed_point.as_slice()].concat();

        let error = Principal::try_from(uncompressed).unwrap_err();
        assert!(error.to_string().contains("p256-pub compressed"));
    }
}
