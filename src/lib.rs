//! UCAN tokens over the IPLD data model.
//!
//! [UCANs][UCAN docs] are bearer credentials that delegate capabilities from
//! an issuer to an audience, optionally chained through proofs. This crate
//! implements the `0.9.x` token format with two interchangeable wire
//! representations:
//!
//! - the canonical **DAG-CBOR** representation, addressed by a CID with the
//!   DAG-CBOR multicodec, and
//! - the compatibility **JWT** representation, which carries the exact token
//!   text produced by other UCAN libraries.
//!
//! The signed portion of a UCAN is a specific JSON serialization, so key
//! order and whitespace are load-bearing: re-encoding a foreign token can
//! invalidate its signature. When parsing, this crate re-emits the token
//! from its parsed model and compares the result against the input. Tokens
//! that round-trip byte-exactly are promoted to the canonical DAG-CBOR
//! representation; all others retain their original JWT bytes, and
//! [`Ucan::encode`], [`Ucan::format`] and [`Ucan::to_cid`] operate on those
//! bytes instead.
//!
//! # Examples
//!
//! Issue a signed token with [`builder::UcanBuilder`]. Signing requires a
//! [`crypto::KeyMaterial`] implementation; a reference Ed25519 backend is
//! available behind the `ed25519` feature.
//!
//! ```rust
//! use dag_ucan::{builder::UcanBuilder, crypto::KeyMaterial};
//!
//! async fn generate_token<'a, K: KeyMaterial>(
//!     issuer_key: &'a K,
//!     audience_did: &'a str,
//! ) -> Result<String, anyhow::Error> {
//!     UcanBuilder::default()
//!         .issued_by(issuer_key)
//!         .for_audience(audience_did)
//!         .with_lifetime(60)
//!         .claiming_capability(("mailto:someone@example.com", "msg/send"))
//!         .build()?
//!         .sign()
//!         .await?
//!         .format()
//! }
//! ```
//!
//! Parsing never verifies signatures; that is deferred to the caller via
//! [`Ucan::check_signature`] so that the cryptographic backends stay out of
//! this crate.
//!
//! ```rust
//! use dag_ucan::Ucan;
//!
//! fn read_token(token: &str) -> Result<Ucan, anyhow::Error> {
//!     let ucan = Ucan::try_from(token)?;
//!     anyhow::ensure!(!ucan.is_expired(None), "token has expired");
//!     Ok(ucan)
//! }
//! ```
//!
//! [UCAN docs]: https://ucan.xyz/
//! [DID Key spec]: https://w3c-ccg.github.io/did-method-key/

pub mod builder;
pub mod capability;
pub mod crypto;
pub mod did;
pub mod ipld;
pub mod key_material;
pub mod serde;
pub mod time;
pub mod ucan;
pub mod varsig;

mod jwt;
mod schema;

pub use self::ucan::Ucan;

#[cfg(test)]
mod tests;
