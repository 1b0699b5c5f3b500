//! Shape validation for decoded token payloads.
//!
//! Everything here is structural: fields are checked for presence and form
//! and normalized into the typed model, but no signature or delegation
//! semantics are evaluated. Error messages carry the path of the offending
//! field (`att[0].can`) and its value as JSON.

use crate::{
    capability::{Capabilities, Capability},
    crypto::JwtSignatureAlgorithm,
    did::Principal,
    ipld::{Link, Multihash, IDENTITY_CODE, RAW_CODEC},
    jwt::JWT_TYPE,
    ucan::UcanPayload,
};
use anyhow::{anyhow, Result};
use serde_json::Value;
use std::str::FromStr;

pub(crate) fn is_version(input: &str) -> bool {
    let mut parts = input.split('.');

    matches!(
        (parts.next(), parts.next(), parts.next(), parts.next()),
        (Some(major), Some(minor), Some(patch), None)
            if [major, minor, patch].iter().all(|part| {
                !part.is_empty() && part.bytes().all(|byte| byte.is_ascii_digit())
            })
    )
}

pub(crate) fn read_header(header: &Value) -> Result<(JwtSignatureAlgorithm, String)> {
    if header.get("typ").and_then(Value::as_str) != Some(JWT_TYPE) {
        return Err(anyhow!(
            "Header has invalid type 'typ: {}'",
            header.get("typ").unwrap_or(&Value::Null)
        ));
    }

    let ucv = match header.get("ucv").and_then(Value::as_str) {
        Some(ucv) if is_version(ucv) => ucv.to_owned(),
        _ => {
            return Err(anyhow!(
                "Header has invalid version 'ucv: {}'",
                header.get("ucv").unwrap_or(&Value::Null)
            ))
        }
    };

    let algorithm = header
        .get("alg")
        .and_then(Value::as_str)
        .and_then(|alg| JwtSignatureAlgorithm::from_str(alg).ok())
        .ok_or_else(|| {
            anyhow!(
                "Header has invalid algorithm 'alg: {}'",
                header.get("alg").unwrap_or(&Value::Null)
            )
        })?;

    Ok((algorithm, ucv))
}

pub(crate) fn read_payload(payload: &Value, ucv: String) -> Result<UcanPayload> {
    Ok(UcanPayload {
        ucv,
        iss: read_principal(payload, "iss")?,
        aud: read_principal(payload, "aud")?,
        att: read_capabilities(payload.get("att"))?,
        exp: read_expiration(payload.get("exp"))?,
        nbf: read_integer(payload.get("nbf"), "nbf")?,
        nnc: read_nonce(payload.get("nnc"))?,
        fct: read_facts(payload.get("fct"))?,
        prf: read_proofs(payload.get("prf"))?,
    })
}

fn read_principal(payload: &Value, at: &str) -> Result<Principal> {
    let value = payload.get(at).unwrap_or(&Value::Null);
    let did = value.as_str().ok_or_else(|| {
        anyhow!("Payload has invalid '{at}: {value}', expected a DID string")
    })?;

    Principal::from_str(did)
        .map_err(|error| anyhow!("Payload has invalid '{at}: {value}', {error}"))
}

fn read_capabilities(value: Option<&Value>) -> Result<Capabilities> {
    let elements = value.and_then(Value::as_array).ok_or_else(|| {
        anyhow!(
            "Payload has invalid 'att: {}', expected a non-empty list of capabilities",
            value.unwrap_or(&Value::Null)
        )
    })?;

    let capabilities = elements
        .iter()
        .enumerate()
        .map(|(index, element)| {
            serde_json::from_value::<Capability>(element.clone())
                .map_err(|error| anyhow!("Payload has invalid 'att[{index}]: {element}', {error}"))
        })
        .collect::<Result<Vec<Capability>>>()?;

    Capabilities::try_from(capabilities)
}

fn read_expiration(value: Option<&Value>) -> Result<Option<u64>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => match value.as_u64() {
            Some(seconds) => Ok(Some(seconds)),
            None => Err(anyhow!(
                "Payload has invalid 'exp: {value}', expected an integer or null"
            )),
        },
    }
}

fn read_integer(value: Option<&Value>, at: &str) -> Result<Option<u64>> {
    match value {
        None => Ok(None),
        Some(value) => match value.as_u64() {
            Some(seconds) => Ok(Some(seconds)),
            None => Err(anyhow!(
                "Payload has invalid '{at}: {value}', expected an integer"
            )),
        },
    }
}

fn read_nonce(value: Option<&Value>) -> Result<Option<String>> {
    match value {
        None => Ok(None),
        Some(Value::String(nonce)) => Ok(Some(nonce.clone())),
        Some(value) => Err(anyhow!(
            "Payload has invalid 'nnc: {value}', expected a string"
        )),
    }
}

fn read_facts(value: Option<&Value>) -> Result<Vec<Value>> {
    match value {
        None => Ok(Vec::new()),
        Some(value) => {
            let facts = value.as_array().ok_or_else(|| {
                anyhow!("Payload has invalid 'fct: {value}', expected a list of facts")
            })?;

            check_facts(facts)?;
            Ok(facts.clone())
        }
    }
}

pub(crate) fn check_facts(facts: &[Value]) -> Result<()> {
    for (index, fact) in facts.iter().enumerate() {
        if !fact.is_object() {
            return Err(anyhow!(
                "Payload has invalid 'fct[{index}]: {fact}', expected an object"
            ));
        }
    }

    Ok(())
}

fn read_proofs(value: Option<&Value>) -> Result<Vec<Link>> {
    match value {
        None => Ok(Vec::new()),
        Some(value) => {
            let proofs = value.as_array().ok_or_else(|| {
                anyhow!("Payload has invalid 'prf: {value}', expected a list of proofs")
            })?;

            proofs
                .iter()
                .enumerate()
                .map(|(index, element)| match element.as_str() {
                    Some(proof) => read_proof(proof),
                    None => Err(anyhow!(
                        "Payload has invalid 'prf[{index}]: {element}', expected a CID string"
                    )),
                })
                .collect()
        }
    }
}

/// Proofs in the JWT representation are strings: either a CID in text form,
/// or an entire embedded token, which is synthesized into a RAW CID whose
/// identity multihash carries the token bytes.
pub(crate) fn read_proof(proof: &str) -> Result<Link> {
    match Link::try_from(proof) {
        Ok(link) => Ok(link),
        Err(_) => Ok(Link::new_v1(
            RAW_CODEC,
            Multihash::wrap(IDENTITY_CODE, proof.as_bytes())?,
        )),
    }
}
