//! The JWT face of a UCAN: segment splitting and the canonical emission.
//!
//! The payload emitted here is the byte sequence that gets signed, so its
//! layout is frozen: top-level keys appear in the order `iss, aud, att,
//! exp, prf` followed by `fct`, `nnc` and `nbf` only when they carry a
//! value, and nested maps sort their keys.

use crate::{schema, serde::Base64Encode, ucan::UcanPayload, varsig::Signature};
use anyhow::{anyhow, Context, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub(crate) const JWT_TYPE: &str = "JWT";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct UcanHeader {
    pub alg: String,
    pub ucv: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct JwtPayload {
    iss: String,
    aud: String,
    att: Vec<Value>,
    exp: Option<u64>,
    #[serde(default)]
    prf: Vec<String>,
    #[serde(skip_serializing_if = "skip_facts", default)]
    fct: Vec<Value>,
    #[serde(skip_serializing_if = "skip_nonce", default)]
    nnc: Option<String>,
    #[serde(skip_serializing_if = "skip_not_before", default)]
    nbf: Option<u64>,
}

fn skip_facts(facts: &Vec<Value>) -> bool {
    facts.is_empty()
}

fn skip_nonce(nonce: &Option<String>) -> bool {
    !matches!(nonce, Some(nonce) if !nonce.is_empty())
}

fn skip_not_before(not_before: &Option<u64>) -> bool {
    !matches!(not_before, Some(seconds) if *seconds != 0)
}

impl TryFrom<&UcanPayload> for JwtPayload {
    type Error = anyhow::Error;

    fn try_from(payload: &UcanPayload) -> Result<Self> {
        let att = payload
            .att
            .iter()
            .map(|capability| serde_json::to_value(capability).map_err(anyhow::Error::from))
            .collect::<Result<Vec<Value>>>()?;

        Ok(JwtPayload {
            iss: payload.iss.did().to_owned(),
            aud: payload.aud.did().to_owned(),
            att,
            exp: payload.exp,
            prf: payload.prf.iter().map(|link| link.to_string()).collect(),
            fct: payload.fct.clone(),
            nnc: payload.nnc.clone(),
            nbf: payload.nbf,
        })
    }
}

/// The `<base64url(header)>.<base64url(payload)>` prefix of the token: the
/// exact bytes an issuer signs.
pub(crate) fn format_sign_payload(payload: &UcanPayload, algorithm: &str) -> Result<String> {
    let header = UcanHeader {
        alg: algorithm.to_owned(),
        ucv: payload.ucv.clone(),
        typ: JWT_TYPE.to_owned(),
    };

    Ok(format!(
        "{}.{}",
        header.jwt_base64_encode()?,
        JwtPayload::try_from(payload)?.jwt_base64_encode()?
    ))
}

/// Emit the canonical JWT form of a model.
pub(crate) fn format_token(payload: &UcanPayload, signature: &Signature) -> Result<String> {
    let signed_data = format_sign_payload(payload, &signature.algorithm()?)?;

    Ok(format!(
        "{signed_data}.{}",
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(signature.raw()?)
    ))
}

/// Split and validate a JWT token string into the typed model.
pub(crate) fn parse_token(token: &str) -> Result<(UcanPayload, Signature)> {
    let parts: Vec<&str> = token.split('.').collect();
    let [header, payload, signature] = parts.as_slice() else {
        return Err(anyhow!(
            "Can't parse UCAN: {token}: Expected JWT format: 3 dot-separated base64url-encoded values."
        ));
    };

    let header_bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(header)
        .context("Could not decode UCAN header base64")?;
    let header: Value =
        serde_json::from_slice(&header_bytes).context("Could not parse UCAN header JSON")?;
    let (algorithm, ucv) = schema::read_header(&header)?;

    let payload_bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .context("Could not decode UCAN payload base64")?;
    let payload: Value =
        serde_json::from_slice(&payload_bytes).context("Could not parse UCAN payload JSON")?;
    let payload = schema::read_payload(&payload, ucv)?;

    let signature_bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(signature)
        .context("Could not decode UCAN signature base64")?;
    let signature = Signature::try_from((algorithm, signature_bytes.as_slice()))?;

    Ok((payload, signature))
}
