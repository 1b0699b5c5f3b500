use crate::{
    capability::{Capabilities, Capability},
    did::Principal,
    ipld::Link,
    schema,
    ucan::{Ucan, UcanPayload},
    varsig::Signature,
};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The DAG-CBOR layout of a canonical UCAN.
///
/// `iss`/`aud` are multicodec-tagged byte strings, `prf` entries are real
/// links and `s` is the varsig envelope. `fct`, `nnc` and `nbf` are only
/// present when they carry a value; `exp` is always present, `null` meaning
/// "never expires".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UcanIpld {
    pub v: String,
    pub iss: Principal,
    pub aud: Principal,
    pub att: Vec<Capability>,
    pub exp: Option<u64>,
    #[serde(default)]
    pub prf: Vec<Link>,
    pub s: Signature,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fct: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nnc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<u64>,
}

impl From<&Ucan> for UcanIpld {
    fn from(ucan: &Ucan) -> Self {
        UcanIpld {
            v: ucan.version().to_owned(),
            iss: ucan.issuer().clone(),
            aud: ucan.audience().clone(),
            att: ucan.capabilities().to_vec(),
            exp: ucan.expires_at(),
            prf: ucan.proofs().to_vec(),
            s: ucan.signature().clone(),
            fct: match ucan.facts() {
                [] => None,
                facts => Some(facts.to_vec()),
            },
            nnc: ucan
                .nonce()
                .filter(|nonce| !nonce.is_empty())
                .map(str::to_owned),
            nbf: ucan.not_before().filter(|seconds| *seconds != 0),
        }
    }
}

impl TryFrom<UcanIpld> for Ucan {
    type Error = anyhow::Error;

    fn try_from(ipld: UcanIpld) -> Result<Self> {
        if !schema::is_version(&ipld.v) {
            return Err(anyhow!(
                "Payload has invalid 'v: {}', expected a semantic version",
                Value::String(ipld.v)
            ));
        }

        let att = Capabilities::try_from(ipld.att)?;
        let fct = ipld.fct.unwrap_or_default();
        schema::check_facts(&fct)?;

        let payload = UcanPayload {
            ucv: ipld.v,
            iss: ipld.iss,
            aud: ipld.aud,
            att,
            exp: ipld.exp,
            // Zero and empty values are omitted by the encoder, so they are
            // folded to "absent" here to keep decode(encode(m)) stable
            nbf: ipld.nbf.filter(|seconds| *seconds != 0),
            nnc: ipld.nnc.filter(|nonce| !nonce.is_empty()),
            fct,
            prf: ipld.prf,
        };

        Ok(Ucan::new(payload, ipld.s, None))
    }
}
