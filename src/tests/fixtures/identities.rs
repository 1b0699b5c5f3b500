use crate::{crypto::KeyMaterial, key_material::ed25519::Ed25519KeyMaterial};
use base64::Engine;
use ed25519_dalek::SigningKey;

pub struct Identities {
    pub alice_key: Ed25519KeyMaterial,
    pub bob_key: Ed25519KeyMaterial,
    pub mallory_key: Ed25519KeyMaterial,

    pub alice_did: String,
    pub bob_did: String,
    pub mallory_did: String,
}

/// An adaptation of the fixtures used in the canonical ts-ucan repo
/// See: https://github.com/ucan-wg/ts-ucan/blob/main/tests/fixtures.ts
impl Identities {
    pub async fn new() -> Self {
        let alice_key = key_material_from("U+bzp2GaFQHso587iSFWPSeCzbSfn/CbNHEz7ilKRZ1UQMmMS7qq4UhTzKn3X9Nj/4xgrwa+UqhMOeo4Ki8JUw==");
        let bob_key = key_material_from("G4+QCX1b3a45IzQsQd4gFMMe0UB1UOx9bCsh8uOiKLER69eAvVXvc8P2yc4Iig42Bv7JD2zJxhyFALyTKBHipg==");
        let mallory_key = key_material_from("LR9AL2MYkMARuvmV3MJV8sKvbSOdBtpggFCW8K62oZDR6UViSXdSV/dDcD8S9xVjS61vh62JITx7qmLgfQUSZQ==");

        Identities {
            alice_did: alice_key.get_did().await.unwrap(),
            bob_did: bob_key.get_did().await.unwrap(),
            mallory_did: mallory_key.get_did().await.unwrap(),

            alice_key,
            bob_key,
            mallory_key,
        }
    }
}

fn key_material_from(encoded_secret: &str) -> Ed25519KeyMaterial {
    // NOTE: tweetnacl secret keys concat the public keys, so we only care
    // about the first 32 bytes
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded_secret)
        .unwrap();
    let secret: [u8; 32] = bytes[0..32].try_into().unwrap();
    let signing_key = SigningKey::from_bytes(&secret);

    Ed25519KeyMaterial(signing_key.verifying_key(), Some(signing_key))
}
