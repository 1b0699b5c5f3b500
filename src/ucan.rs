use crate::{
    capability::Capabilities,
    crypto::KeyMaterial,
    did::Principal,
    ipld::{Link, Multihash, UcanIpld, DAG_CBOR_CODEC, IDENTITY_CODE},
    jwt,
    time::now,
    varsig::Signature,
};
use anyhow::{anyhow, Context, Result};
use cid::multihash::{Code, MultihashDigest};
use libipld_core::{codec::Codec, raw::RawCodec};
use serde::{ser::SerializeMap, Serialize, Serializer};
use serde_json::{json, Value};
use std::str::FromStr;

/// The UCAN token format version produced by this crate
pub const UCAN_VERSION: &str = "0.9.1";

/// Multicodec name of this codec
pub const CODEC_NAME: &str = "dag-ucan";

/// The fields of a UCAN, independent of any wire representation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UcanPayload {
    pub(crate) ucv: String,
    pub(crate) iss: Principal,
    pub(crate) aud: Principal,
    pub(crate) att: Capabilities,
    pub(crate) exp: Option<u64>,
    pub(crate) nbf: Option<u64>,
    pub(crate) nnc: Option<String>,
    pub(crate) fct: Vec<Value>,
    pub(crate) prf: Vec<Link>,
}

/// An encoded UCAN together with the content address of its bytes
#[derive(Clone, Debug)]
pub struct UcanBlock {
    pub cid: Link,
    pub bytes: Vec<u8>,
}

/// A parsed UCAN.
///
/// A `Ucan` is immutable and is always in one of two representations:
///
/// - **canonical**: the token either originated here or round-tripped
///   byte-exactly through the canonical JWT formatter. [`Ucan::encode`]
///   yields DAG-CBOR and [`Ucan::to_cid`] links it with the DAG-CBOR codec.
/// - **retained JWT**: re-encoding the token would have changed the bytes
///   its signature covers, so the original text is kept. [`Ucan::encode`]
///   yields those bytes verbatim and [`Ucan::to_cid`] links them with the
///   RAW codec.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ucan {
    payload: UcanPayload,
    signature: Signature,
    jwt: Option<String>,
}

impl Ucan {
    pub(crate) fn new(payload: UcanPayload, signature: Signature, jwt: Option<String>) -> Self {
        Ucan {
            payload,
            signature,
            jwt,
        }
    }

    /// True when this UCAN is in the canonical representation
    pub fn is_canonical(&self) -> bool {
        self.jwt.is_none()
    }

    /// The JWT string form of this UCAN: the canonical serialization, or
    /// the original token text when that was retained
    pub fn format(&self) -> Result<String> {
        match &self.jwt {
            Some(jwt) => Ok(jwt.clone()),
            None => jwt::format_token(&self.payload, &self.signature),
        }
    }

    /// The byte form of this UCAN: DAG-CBOR when canonical, the UTF-8 of
    /// the original token otherwise
    pub fn encode(&self) -> Result<Vec<u8>> {
        match &self.jwt {
            Some(jwt) => Ok(jwt.as_bytes().to_vec()),
            None => Ok(serde_ipld_dagcbor::to_vec(&UcanIpld::from(self))?),
        }
    }

    /// Interpret bytes as a UCAN: first as DAG-CBOR and, failing that, as
    /// UTF-8 JWT text. Errors from the DAG-CBOR attempt are not surfaced;
    /// the JWT path decides the outcome.
    pub fn decode(bytes: &[u8]) -> Result<Ucan> {
        match serde_ipld_dagcbor::from_slice::<UcanIpld>(bytes)
            .map_err(anyhow::Error::from)
            .and_then(Ucan::try_from)
        {
            Ok(ucan) => Ok(ucan),
            Err(_) => {
                let token = std::str::from_utf8(bytes)
                    .context("Could not decode UCAN: neither DAG-CBOR nor UTF-8 JWT text")?;
                Ucan::from_str(token)
            }
        }
    }

    /// Encode this UCAN and address the bytes, using SHA-256 unless another
    /// hasher is given. The CID codec is DAG-CBOR for canonical tokens and
    /// RAW for retained JWTs.
    pub fn write(&self, hasher: Option<Code>) -> Result<UcanBlock> {
        let (codec, bytes): (u64, Vec<u8>) = match &self.jwt {
            Some(jwt) => {
                let codec = RawCodec;
                (codec.into(), codec.encode(jwt.as_bytes())?)
            }
            None => (
                DAG_CBOR_CODEC,
                serde_ipld_dagcbor::to_vec(&UcanIpld::from(self))?,
            ),
        };

        let digest = match hasher.unwrap_or(Code::Sha2_256) {
            // The identity "hash" inlines the token into its own link
            Code::Identity => Multihash::wrap(IDENTITY_CODE, &bytes)?,
            code => code.digest(&bytes).resize()?,
        };

        Ok(UcanBlock {
            cid: Link::new_v1(codec, digest),
            bytes,
        })
    }

    /// The content address of this UCAN's encoded form
    pub fn to_cid(&self, hasher: Option<Code>) -> Result<Link> {
        Ok(self.write(hasher)?.cid)
    }

    /// The exact bytes this UCAN's signature covers
    pub fn signed_data(&self) -> Result<Vec<u8>> {
        match &self.jwt {
            Some(jwt) => {
                let (signed, _) = jwt
                    .rsplit_once('.')
                    .ok_or_else(|| anyhow!("Retained JWT is missing its signature segment"))?;
                Ok(signed.as_bytes().to_vec())
            }
            None => Ok(
                jwt::format_sign_payload(&self.payload, &self.signature.algorithm()?)?
                    .into_bytes(),
            ),
        }
    }

    /// True only when the key's DID is the issuer's DID and the signature
    /// verifies over the signed data. Never errors; failures of any kind
    /// read as an invalid signature.
    pub async fn check_signature<K: KeyMaterial>(&self, key: &K) -> bool {
        let did = match key.get_did().await {
            Ok(did) => did,
            Err(_) => return false,
        };

        if did != self.issuer().did() {
            return false;
        }

        let signed_data = match self.signed_data() {
            Ok(signed_data) => signed_data,
            Err(_) => return false,
        };

        self.signature.verify(key, &signed_data).await.is_ok()
    }

    /// Validate the UCAN's timestamps and signature against the given key
    pub async fn validate<K: KeyMaterial>(&self, now_time: Option<u64>, key: &K) -> Result<()> {
        if self.is_expired(now_time) {
            return Err(anyhow!("Expired"));
        }

        if self.is_too_early() {
            return Err(anyhow!("Not active yet (too early)"));
        }

        let did = key.get_did().await?;
        if did != self.issuer().did() {
            return Err(anyhow!(
                "Verification key {did} does not match issuer {}",
                self.issuer().did()
            ));
        }

        self.signature.verify(key, &self.signed_data()?).await
    }

    /// Returns true if the UCAN has past its expiration date
    pub fn is_expired(&self, now_time: Option<u64>) -> bool {
        match self.payload.exp {
            Some(exp) => exp <= now_time.unwrap_or_else(now),
            None => false,
        }
    }

    /// Returns true if the not-before ("nbf") time is still in the future
    pub fn is_too_early(&self) -> bool {
        match self.payload.nbf {
            Some(nbf) => now() <= nbf,
            None => false,
        }
    }

    /// Returns true if this UCAN's lifetime begins no later than the other
    /// Note that if a UCAN specifies an NBF but the other does not, the
    /// other has an unbounded start time and this function will return
    /// false.
    pub fn lifetime_begins_before(&self, other: &Ucan) -> bool {
        match (self.payload.nbf, other.payload.nbf) {
            (Some(nbf), Some(other_nbf)) => nbf <= other_nbf,
            (Some(_), None) => false,
            _ => true,
        }
    }

    /// Returns true if this UCAN expires no earlier than the other
    pub fn lifetime_ends_after(&self, other: &Ucan) -> bool {
        match (self.payload.exp, other.payload.exp) {
            (Some(exp), Some(other_exp)) => exp >= other_exp,
            (Some(_), None) => false,
            (None, _) => true,
        }
    }

    /// Returns true if this UCAN's lifetime fully encompasses the other
    pub fn lifetime_encompasses(&self, other: &Ucan) -> bool {
        self.lifetime_begins_before(other) && self.lifetime_ends_after(other)
    }

    pub fn version(&self) -> &str {
        &self.payload.ucv
    }

    pub fn issuer(&self) -> &Principal {
        &self.payload.iss
    }

    pub fn audience(&self) -> &Principal {
        &self.payload.aud
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.payload.att
    }

    /// The expiration time in UTC Unix seconds; `None` means "never"
    pub fn expires_at(&self) -> Option<u64> {
        self.payload.exp
    }

    pub fn not_before(&self) -> Option<u64> {
        self.payload.nbf
    }

    pub fn nonce(&self) -> Option<&str> {
        self.payload.nnc.as_deref()
    }

    pub fn facts(&self) -> &[Value] {
        &self.payload.fct
    }

    pub fn proofs(&self) -> &[Link] {
        &self.payload.prf
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

/// The DAG-JSON projection of the token: principals as DID strings, proofs
/// as `{"/": …}` links, the signature as `{"/": {"bytes": …}}`, with empty
/// and absent optional fields omitted.
impl Serialize for Ucan {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;

        map.serialize_entry("v", self.version())?;
        map.serialize_entry("iss", self.issuer().did())?;
        map.serialize_entry("aud", self.audience().did())?;
        map.serialize_entry("att", &self.payload.att)?;
        map.serialize_entry("exp", &self.payload.exp)?;

        let prf: Vec<Value> = self
            .payload
            .prf
            .iter()
            .map(|link| json!({ "/": link.to_string() }))
            .collect();
        map.serialize_entry("prf", &prf)?;

        if !self.payload.fct.is_empty() {
            map.serialize_entry("fct", &self.payload.fct)?;
        }

        if let Some(nonce) = &self.payload.nnc {
            map.serialize_entry("nnc", nonce)?;
        }

        if let Some(not_before) = &self.payload.nbf {
            map.serialize_entry("nbf", not_before)?;
        }

        map.serialize_entry("s", &self.signature.to_json())?;

        map.end()
    }
}

/// Deserialize an encoded UCAN token string reference into a UCAN
impl<'a> TryFrom<&'a str> for Ucan {
    type Error = anyhow::Error;

    fn try_from(ucan_token: &str) -> Result<Self, Self::Error> {
        Ucan::from_str(ucan_token)
    }
}

/// Deserialize an encoded UCAN token string into a UCAN
impl TryFrom<String> for Ucan {
    type Error = anyhow::Error;

    fn try_from(ucan_token: String) -> Result<Self, Self::Error> {
        Ucan::from_str(ucan_token.as_str())
    }
}

/// Deserialize an encoded UCAN token string reference into a UCAN
impl FromStr for Ucan {
    type Err = anyhow::Error;

    fn from_str(ucan_token: &str) -> Result<Self, Self::Err> {
        let (payload, signature) = jwt::parse_token(ucan_token)?;

        // A token the canonical formatter reproduces byte-exactly is
        // promoted to the DAG-CBOR representation. Any other layout was
        // signed over bytes this crate would not re-emit, so the original
        // text is retained
        let canonical = jwt::format_token(&payload, &signature)?;
        let jwt = match canonical == ucan_token {
            true => None,
            false => Some(ucan_token.to_owned()),
        };

        Ok(Ucan::new(payload, signature, jwt))
    }
}
