//! Cryptographic seams of the crate.
//!
//! Concrete signing and verification backends are intentionally not part of
//! this library. Anything that can name its JWT algorithm, resolve its own
//! DID and sign or verify a byte payload may be used to issue and check
//! tokens by implementing [`KeyMaterial`].

mod key;
mod signature;

pub use key::*;
pub use signature::*;
