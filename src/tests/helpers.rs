use super::fixtures::Identities;
use crate::{
    builder::UcanBuilder, capability::Capability, key_material::ed25519::Ed25519KeyMaterial,
};
use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};
use serde_ipld_dagcbor::{from_slice, to_vec};

pub fn dag_cbor_roundtrip<T>(data: &T) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    Ok(from_slice(&to_vec(data)?)?)
}

pub async fn scaffold_ucan_builder(
    identities: &Identities,
) -> Result<UcanBuilder<'_, Ed25519KeyMaterial>> {
    let send_email_as_bob = Capability::from(("mailto:bob@email.com", "email/send"));
    let send_email_as_alice = Capability::from(("mailto:alice@email.com", "email/send"));

    let leaf_ucan_alice = UcanBuilder::default()
        .issued_by(&identities.alice_key)
        .for_audience(identities.mallory_did.as_str())
        .with_expiration(1664232146010)
        .claiming_capability(&send_email_as_alice)
        .build()?
        .sign()
        .await?;

    let leaf_ucan_bob = UcanBuilder::default()
        .issued_by(&identities.bob_key)
        .for_audience(identities.mallory_did.as_str())
        .with_expiration(1664232146010)
        .claiming_capability(&send_email_as_bob)
        .build()?
        .sign()
        .await?;

    let builder = UcanBuilder::default()
        .issued_by(&identities.mallory_key)
        .for_audience(identities.alice_did.as_str())
        .with_expiration(1664232146010)
        .witnessed_by(&leaf_ucan_alice, None)
        .witnessed_by(&leaf_ucan_bob, None)
        .claiming_capability(&send_email_as_alice)
        .claiming_capability(&send_email_as_bob);

    Ok(builder)
}
