mod validate {
    use crate::{
        builder::UcanBuilder,
        tests::fixtures::Identities,
        time::now,
        ucan::{Ucan, UCAN_VERSION},
    };
    use anyhow::Result;
    use serde_json::json;

    #[cfg(target_arch = "wasm32")]
    use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};

    #[cfg(target_arch = "wasm32")]
    wasm_bindgen_test_configure!(run_in_browser);

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
    #[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
    async fn it_round_trips_with_format() {
        let identities = Identities::new().await;

        let ucan = UcanBuilder::default()
            .issued_by(&identities.alice_key)
            .for_audience(identities.bob_did.as_str())
            .with_lifetime(30)
            .claiming_capability(("mailto:alice@email.com", "email/send"))
            .build()
            .unwrap()
            .sign()
            .await
            .unwrap();

        let token = ucan.format().unwrap();
        let decoded_ucan = Ucan::try_from(token.as_str()).unwrap();

        assert_eq!(decoded_ucan, ucan);
        assert!(decoded_ucan.check_signature(&identities.alice_key).await);
        decoded_ucan
            .validate(None, &identities.alice_key)
            .await
            .unwrap();
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
    #[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
    async fn it_rejects_signatures_from_other_keys() {
        let identities = Identities::new().await;

        let ucan = UcanBuilder::default()
            .issued_by(&identities.alice_key)
            .for_audience(identities.bob_did.as_str())
            .claiming_capability(("mailto:alice@email.com", "email/send"))
            .build()
            .unwrap()
            .sign()
            .await
            .unwrap();

        assert!(ucan.check_signature(&identities.alice_key).await);
        assert!(!ucan.check_signature(&identities.bob_key).await);
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
    #[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
    async fn it_identifies_a_ucan_that_is_not_active_yet() {
        let identities = Identities::new().await;

        let ucan = UcanBuilder::default()
            .issued_by(&identities.alice_key)
            .for_audience(identities.bob_did.as_str())
            .claiming_capability(("mailto:alice@email.com", "email/send"))
            .not_before(now() + 30)
            .with_lifetime(120)
            .build()
            .unwrap()
            .sign()
            .await
            .unwrap();

        assert!(ucan.is_too_early());
        assert!(ucan.validate(None, &identities.alice_key).await.is_err());
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
    #[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
    async fn it_identifies_a_ucan_that_has_become_active() {
        let identities = Identities::new().await;
        let ucan = UcanBuilder::default()
            .issued_by(&identities.alice_key)
            .for_audience(identities.bob_did.as_str())
            .claiming_capability(("mailto:alice@email.com", "email/send"))
            .not_before(1000)
            .with_lifetime(30)
            .build()
            .unwrap()
            .sign()
            .await
            .unwrap();

        assert!(!ucan.is_too_early());
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
    #[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
    async fn it_treats_the_expiration_bound_as_inclusive() {
        let identities = Identities::new().await;
        let expiration = now() + 1000;

        let ucan = UcanBuilder::default()
            .issued_by(&identities.alice_key)
            .for_audience(identities.bob_did.as_str())
            .claiming_capability(("mailto:alice@email.com", "email/send"))
            .with_expiration(expiration)
            .build()
            .unwrap()
            .sign()
            .await
            .unwrap();

        assert!(!ucan.is_expired(Some(expiration - 1)));
        assert!(ucan.is_expired(Some(expiration)));
        assert!(ucan.is_expired(Some(expiration + 1)));
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
    #[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
    async fn it_never_expires_without_an_expiration() {
        let identities = Identities::new().await;

        let ucan = UcanBuilder::default()
            .issued_by(&identities.alice_key)
            .for_audience(identities.bob_did.as_str())
            .claiming_capability(("mailto:alice@email.com", "email/send"))
            .with_no_expiration()
            .build()
            .unwrap()
            .sign()
            .await
            .unwrap();

        assert_eq!(ucan.expires_at(), None);
        assert!(!ucan.is_expired(Some(u64::MAX)));
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
    #[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
    async fn it_can_be_serialized_as_json() -> Result<()> {
        let identities = Identities::new().await;

        let ucan = UcanBuilder::default()
            .issued_by(&identities.alice_key)
            .for_audience(identities.bob_did.as_str())
            .not_before(1000)
            .with_lifetime(30)
            .with_fact(json!({ "foo": "bar" }))
            .claiming_capability(("mailto:alice@email.com", "email/send"))
            .build()?
            .sign()
            .await?;

        let ucan_json = serde_json::to_value(ucan.clone())?;

        assert_eq!(
            ucan_json,
            serde_json::json!({
                "v": UCAN_VERSION,
                "iss": identities.alice_did,
                "aud": identities.bob_did,
                "att": [{
                    "can": "email/send",
                    "with": "mailto:alice@email.com"
                }],
                "exp": ucan.expires_at(),
                "prf": [],
                "fct": [{ "foo": "bar" }],
                "nbf": 1000,
                "s": ucan.signature().to_json()
            })
        );
        Ok(())
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
    #[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
    async fn it_implements_partial_eq() {
        let identities = Identities::new().await;
        let ucan_a = UcanBuilder::default()
            .issued_by(&identities.alice_key)
            .for_audience(identities.bob_did.as_str())
            .claiming_capability(("mailto:alice@email.com", "email/send"))
            .with_expiration(10000000)
            .build()
            .unwrap()
            .sign()
            .await
            .unwrap();

        let ucan_b = UcanBuilder::default()
            .issued_by(&identities.alice_key)
            .for_audience(identities.bob_did.as_str())
            .claiming_capability(("mailto:alice@email.com", "email/send"))
            .with_expiration(10000000)
            .build()
            .unwrap()
            .sign()
            .await
            .unwrap();

        let ucan_c = UcanBuilder::default()
            .issued_by(&identities.alice_key)
            .for_audience(identities.bob_did.as_str())
            .claiming_capability(("mailto:alice@email.com", "email/send"))
            .with_expiration(20000000)
            .build()
            .unwrap()
            .sign()
            .await
            .unwrap();

        assert!(ucan_a == ucan_b);
        assert!(ucan_a != ucan_c);
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
    #[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
    async fn test_lifetime_ends_after() -> Result<()> {
        let identities = Identities::new().await;
        let forever_ucan = UcanBuilder::default()
            .issued_by(&identities.alice_key)
            .for_audience(identities.bob_did.as_str())
            .claiming_capability(("mailto:alice@email.com", "email/send"))
            .with_no_expiration()
            .build()?
            .sign()
            .await?;
        let early_ucan = UcanBuilder::default()
            .issued_by(&identities.alice_key)
            .for_audience(identities.bob_did.as_str())
            .claiming_capability(("mailto:alice@email.com", "email/send"))
            .with_lifetime(2000)
            .build()?
            .sign()
            .await?;
        let later_ucan = UcanBuilder::default()
            .issued_by(&identities.alice_key)
            .for_audience(identities.bob_did.as_str())
            .claiming_capability(("mailto:alice@email.com", "email/send"))
            .with_lifetime(4000)
            .build()?
            .sign()
            .await?;

        assert_eq!(forever_ucan.expires_at(), None);
        assert!(forever_ucan.lifetime_ends_after(&early_ucan));
        assert!(!early_ucan.lifetime_ends_after(&forever_ucan));
        assert!(later_ucan.lifetime_ends_after(&early_ucan));

        Ok(())
    }
}

mod representation {
    use crate::{
        builder::UcanBuilder,
        ipld::{DAG_CBOR_CODEC, RAW_CODEC},
        tests::fixtures::Identities,
        ucan::Ucan,
    };
    use base64::Engine;
    use cid::multihash::Code;

    #[cfg(target_arch = "wasm32")]
    use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};

    #[cfg(target_arch = "wasm32")]
    wasm_bindgen_test_configure!(run_in_browser);

    fn base64url(bytes: &[u8]) -> String {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    }

    /// A well-formed token laid out the way another library would: same
    /// fields, different JSON key order, so the canonical formatter cannot
    /// reproduce its signed bytes.
    fn foreign_token(identities: &Identities) -> String {
        let header = r#"{"typ":"JWT","alg":"EdDSA","ucv":"0.9.1"}"#;
        let payload = format!(
            r#"{{"iss":"{}","aud":"{}","exp":null,"att":[{{"with":"mailto:alice@email.com","can":"email/send"}}],"prf":[]}}"#,
            identities.alice_did, identities.bob_did
        );

        format!(
            "{}.{}.{}",
            base64url(header.as_bytes()),
            base64url(payload.as_bytes()),
            base64url(&[0xaa; 64])
        )
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
    #[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
    async fn it_promotes_tokens_it_formatted_itself() {
        let identities = Identities::new().await;

        let ucan = UcanBuilder::default()
            .issued_by(&identities.alice_key)
            .for_audience(identities.bob_did.as_str())
            .claiming_capability(("mailto:alice@email.com", "email/send"))
            .build()
            .unwrap()
            .sign()
            .await
            .unwrap();

        let token = ucan.format().unwrap();
        let parsed = Ucan::try_from(token.as_str()).unwrap();

        assert!(parsed.is_canonical());
        assert_eq!(parsed.format().unwrap(), token);
        assert_eq!(parsed.to_cid(None).unwrap().codec(), DAG_CBOR_CODEC);
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
    #[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
    async fn it_retains_the_bytes_of_foreign_tokens() {
        let identities = Identities::new().await;
        let token = foreign_token(&identities);

        let parsed = Ucan::try_from(token.as_str()).unwrap();

        assert!(!parsed.is_canonical());
        assert_eq!(parsed.format().unwrap(), token);
        assert_eq!(parsed.encode().unwrap(), token.as_bytes());
        assert_eq!(parsed.issuer().did(), identities.alice_did);

        let link = parsed.to_cid(None).unwrap();
        assert_eq!(link.codec(), RAW_CODEC);

        let inlined = parsed.write(Some(Code::Identity)).unwrap();
        assert_eq!(inlined.cid.hash().code(), 0);
        assert_eq!(inlined.cid.hash().digest(), token.as_bytes());
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
    #[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
    async fn it_decodes_what_it_encodes() {
        let identities = Identities::new().await;

        let canonical = UcanBuilder::default()
            .issued_by(&identities.alice_key)
            .for_audience(identities.bob_did.as_str())
            .claiming_capability(("mailto:alice@email.com", "email/send"))
            .with_nonce("1701")
            .build()
            .unwrap()
            .sign()
            .await
            .unwrap();

        let decoded = Ucan::decode(&canonical.encode().unwrap()).unwrap();
        assert_eq!(decoded, canonical);
        assert!(decoded.is_canonical());

        let foreign = Ucan::try_from(foreign_token(&identities).as_str()).unwrap();
        let decoded = Ucan::decode(&foreign.encode().unwrap()).unwrap();
        assert_eq!(decoded, foreign);
        assert!(!decoded.is_canonical());
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
    #[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
    async fn it_verifies_signatures_of_retained_tokens() {
        let identities = Identities::new().await;

        // Produce a valid signature over a non-canonical payload by signing
        // the foreign layout directly
        let header = r#"{"typ":"JWT","alg":"EdDSA","ucv":"0.9.1"}"#;
        let payload = format!(
            r#"{{"iss":"{}","aud":"{}","exp":null,"att":[{{"with":"mailto:alice@email.com","can":"email/send"}}],"prf":[]}}"#,
            identities.alice_did, identities.bob_did
        );
        let signed_data = format!(
            "{}.{}",
            base64url(header.as_bytes()),
            base64url(payload.as_bytes())
        );

        use crate::crypto::KeyMaterial;
        let signature = identities
            .alice_key
            .sign(signed_data.as_bytes())
            .await
            .unwrap();
        let token = format!("{signed_data}.{}", base64url(&signature));

        let parsed = Ucan::try_from(token.as_str()).unwrap();
        assert!(!parsed.is_canonical());
        assert!(parsed.check_signature(&identities.alice_key).await);
        assert!(!parsed.check_signature(&identities.bob_key).await);
    }
}
