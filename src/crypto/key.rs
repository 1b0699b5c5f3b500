use crate::did::Principal;
use anyhow::Result;
use async_trait::async_trait;
use std::str::FromStr;

#[cfg(not(target_arch = "wasm32"))]
pub trait KeyMaterialConditionalSendSync: Send + Sync {}

#[cfg(not(target_arch = "wasm32"))]
impl<K> KeyMaterialConditionalSendSync for K where K: KeyMaterial + Send + Sync {}

#[cfg(target_arch = "wasm32")]
pub trait KeyMaterialConditionalSendSync {}

#[cfg(target_arch = "wasm32")]
impl<K> KeyMaterialConditionalSendSync for K where K: KeyMaterial {}

/// The capability interface for signers and verifiers.
///
/// Issuing a UCAN means asking a [`KeyMaterial`] implementation to sign the
/// canonical JWT payload; checking one means handing the signed bytes and
/// the raw signature back to it. Signing and verification are the only
/// possibly-asynchronous operations in this crate; implementations are free
/// to suspend (hardware keys, remote signers, web crypto).
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait KeyMaterial: KeyMaterialConditionalSendSync {
    /// The JWT `alg` name of the signatures this key produces
    fn get_jwt_algorithm_name(&self) -> String;

    /// The DID that identifies this key
    async fn get_did(&self) -> Result<String>;

    /// Sign some data with this key
    async fn sign(&self, payload: &[u8]) -> Result<Vec<u8>>;

    /// Verify the alleged signature of some data against this key
    async fn verify(&self, payload: &[u8], signature: &[u8]) -> Result<()>;

    /// This key's DID in its byte-tagged [`Principal`] form, ready to be
    /// placed in a token's `iss` or `aud` field
    async fn principal(&self) -> Result<Principal> {
        Principal::from_str(&self.get_did().await?)
    }
}
