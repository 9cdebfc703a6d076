mod common;

use common::{Harness, Wallet, BUCKET, NOW};
use playback_access_service::cache::KeyValueStore;
use playback_access_service::error::{AccessError, DenyReason};
use playback_access_service::models::{AccessRequest, AuthProof, Visibility};
use playback_access_service::services::Decision;
use std::time::Duration;

const MINUTE: i64 = 60_000;

#[tokio::test]
async fn delegated_action_issues_link_for_signed_video() {
    let h = Harness::new().with_video("tok1", "vid1", Visibility::Protected);
    let wallet = Wallet::from_seed(1);

    let link = h
        .engine
        .request_access(&wallet.delegated_request("tok1", "vid1", "n1", NOW + 10 * MINUTE))
        .await
        .unwrap();

    assert_eq!(link.video_id, "vid1");
    assert_eq!(link.object_prefix, "vid1/data/");
    assert!(!link.public);

    let issued = h.links.issued();
    assert_eq!(issued.len(), 1);
    assert_eq!(issued[0].0, BUCKET);
    assert_eq!(issued[0].1, "vid1/data/");
    assert_eq!(issued[0].2, Duration::from_secs(4 * 60 * 60));
}

#[tokio::test]
async fn replayed_nonce_is_denied() {
    let h = Harness::new().with_video("tok1", "vid1", Visibility::Protected);
    let wallet = Wallet::from_seed(1);
    let request = wallet.delegated_request("tok1", "vid1", "n1", NOW + 10 * MINUTE);

    assert!(h.engine.request_access(&request).await.is_ok());

    let err = h.engine.request_access(&request).await.unwrap_err();
    assert!(matches!(
        err,
        AccessError::Unauthorized(DenyReason::NonceReused)
    ));
    assert_eq!(h.links.issued().len(), 1);
}

#[tokio::test]
async fn existing_grant_follows_delegated_action() {
    let h = Harness::new().with_video("tok1", "vid1", Visibility::Protected);
    let wallet = Wallet::from_seed(2);

    h.engine
        .request_access(&wallet.delegated_request("tok1", "vid1", "n1", NOW + 10 * MINUTE))
        .await
        .unwrap();

    let decision = h
        .engine
        .authorize(&wallet.existing_grant_request("tok1"))
        .await
        .unwrap();
    assert_eq!(
        decision,
        Decision::Authorized {
            video_id: "vid1".into()
        }
    );
}

#[tokio::test]
async fn existing_grant_without_prior_grant_is_denied() {
    let h = Harness::new().with_video("tok1", "vid1", Visibility::Protected);
    let wallet = Wallet::from_seed(3);

    let decision = h
        .engine
        .authorize(&wallet.existing_grant_request("tok1"))
        .await
        .unwrap();
    assert_eq!(decision, Decision::Denied(DenyReason::NoGrant));
}

#[tokio::test]
async fn grant_is_scoped_to_the_address_that_earned_it() {
    let h = Harness::new().with_video("tok1", "vid1", Visibility::Protected);
    let owner = Wallet::from_seed(4);
    let stranger = Wallet::from_seed(5);

    h.engine
        .request_access(&owner.delegated_request("tok1", "vid1", "n1", NOW + 10 * MINUTE))
        .await
        .unwrap();

    let decision = h
        .engine
        .authorize(&stranger.existing_grant_request("tok1"))
        .await
        .unwrap();
    assert_eq!(decision, Decision::Denied(DenyReason::NoGrant));
}

#[tokio::test]
async fn grant_lapses_with_the_proof_that_minted_it() {
    let h = Harness::new().with_video("tok1", "vid1", Visibility::Protected);
    let wallet = Wallet::from_seed(6);

    h.engine
        .request_access(&wallet.delegated_request("tok1", "vid1", "n1", NOW + MINUTE))
        .await
        .unwrap();

    h.clock.advance(Duration::from_secs(61));

    let decision = h
        .engine
        .authorize(&wallet.existing_grant_request("tok1"))
        .await
        .unwrap();
    assert_eq!(decision, Decision::Denied(DenyReason::NoGrant));
}

#[tokio::test]
async fn claimed_address_is_compared_case_insensitively() {
    let h = Harness::new().with_video("tok1", "vid1", Visibility::Protected);
    let wallet = Wallet::from_seed(7);

    h.engine
        .request_access(&wallet.delegated_request("tok1", "vid1", "n1", NOW + 10 * MINUTE))
        .await
        .unwrap();

    let mut request = wallet.existing_grant_request("tok1");
    request.auth_sig.address = format!("0x{}", request.auth_sig.address[2..].to_uppercase());

    let decision = h.engine.authorize(&request).await.unwrap();
    assert!(matches!(decision, Decision::Authorized { .. }));
}

#[tokio::test]
async fn public_video_skips_signature_checks() {
    let h = Harness::new().with_video("tok1", "vid1", Visibility::Public);

    let request = AccessRequest {
        token_id: Some("tok1".into()),
        auth_sig: AuthProof {
            sig: "0xnot-a-signature".into(),
            derived_via: "whatever".into(),
            signed_message: "{".into(),
            address: "nobody".into(),
        },
    };

    let link = h.engine.request_access(&request).await.unwrap();
    assert_eq!(link.object_prefix, "vid1/data/");
    assert!(link.public);
}

#[tokio::test]
async fn signature_from_another_wallet_is_denied() {
    let h = Harness::new().with_video("tok1", "vid1", Visibility::Protected);
    let user = Wallet::from_seed(8);
    let impostor = Wallet::from_seed(9);

    let mut request = impostor.delegated_request("tok1", "vid1", "n1", NOW + 10 * MINUTE);
    request.auth_sig.address = user.address();

    let decision = h.engine.authorize(&request).await.unwrap();
    assert_eq!(decision, Decision::Denied(DenyReason::InvalidSignature));
}

#[tokio::test]
async fn tampered_message_is_denied() {
    let h = Harness::new().with_video("tok1", "vid1", Visibility::Protected);
    let wallet = Wallet::from_seed(10);

    let mut request = wallet.delegated_request("tok1", "vid1", "n1", NOW + 10 * MINUTE);
    request.auth_sig.signed_message = wallet.delegated_message("vid2", "tok1", "n1", NOW + 10 * MINUTE);

    let decision = h.engine.authorize(&request).await.unwrap();
    assert_eq!(decision, Decision::Denied(DenyReason::InvalidSignature));
}

#[tokio::test]
async fn unsupported_derivation_is_denied() {
    let h = Harness::new().with_video("tok1", "vid1", Visibility::Protected);
    let wallet = Wallet::from_seed(11);

    let request = wallet.request(Some("tok1"), "siwe", "hello");
    let decision = h.engine.authorize(&request).await.unwrap();
    assert_eq!(decision, Decision::Denied(DenyReason::UnsupportedDerivation));
}

#[tokio::test]
async fn legacy_derivation_values_are_accepted() {
    let h = Harness::new().with_video("tok1", "vid1", Visibility::Protected);
    let wallet = Wallet::from_seed(12);

    let message = wallet.delegated_message("vid1", "tok1", "n1", NOW + 10 * MINUTE);
    let decision = h
        .engine
        .authorize(&wallet.request(Some("tok1"), "lit.action", &message))
        .await
        .unwrap();
    assert!(matches!(decision, Decision::Authorized { .. }));

    let decision = h
        .engine
        .authorize(&wallet.request(Some("tok1"), "loop.web3.auth", "session"))
        .await
        .unwrap();
    assert!(matches!(decision, Decision::Authorized { .. }));
}

#[tokio::test]
async fn expired_payload_is_denied_without_consuming_nonce() {
    let h = Harness::new().with_video("tok1", "vid1", Visibility::Protected);
    let wallet = Wallet::from_seed(13);

    let decision = h
        .engine
        .authorize(&wallet.delegated_request("tok1", "vid1", "n1", NOW))
        .await
        .unwrap();
    assert_eq!(decision, Decision::Denied(DenyReason::Expired));

    assert_eq!(h.kv.get("nonce:n1").await.unwrap(), None);
}

#[tokio::test]
async fn malformed_payload_is_a_bad_request() {
    let h = Harness::new().with_video("tok1", "vid1", Visibility::Protected);
    let wallet = Wallet::from_seed(14);

    let request = wallet.request(Some("tok1"), "delegated-action", "not json");
    let err = h.engine.authorize(&request).await.unwrap_err();
    assert!(matches!(err, AccessError::BadRequest(_)));
}

#[tokio::test]
async fn payload_video_id_is_used_without_token() {
    let h = Harness::new();
    let wallet = Wallet::from_seed(15);

    let message = wallet.delegated_message("vid9", "tok9", "n1", NOW + 10 * MINUTE);
    let link = h
        .engine
        .request_access(&wallet.request(None, "delegated-action", &message))
        .await
        .unwrap();

    assert_eq!(link.object_prefix, "vid9/data/");
    assert_eq!(h.videos.lookups(), 0);
}

#[tokio::test]
async fn request_without_any_video_is_a_bad_request() {
    let h = Harness::new();
    let wallet = Wallet::from_seed(16);

    let message = wallet.delegated_message("", "tok9", "n1", NOW + 10 * MINUTE);
    let err = h
        .engine
        .request_access(&wallet.request(None, "delegated-action", &message))
        .await
        .unwrap_err();

    assert!(matches!(err, AccessError::BadRequest(_)));
    assert!(h.links.issued().is_empty());
}

#[tokio::test]
async fn empty_token_is_treated_as_absent() {
    let h = Harness::new().with_video("tok1", "vid1", Visibility::Public);
    let wallet = Wallet::from_seed(17);

    let mut request = wallet.existing_grant_request("tok1");
    request.token_id = Some(String::new());

    let decision = h.engine.authorize(&request).await.unwrap();
    assert_eq!(decision, Decision::Denied(DenyReason::NoGrant));
    assert_eq!(h.videos.lookups(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_with_same_nonce_authorize_at_most_once() {
    let h = Harness::new().with_video("tok1", "vid1", Visibility::Protected);
    let wallet = Wallet::from_seed(18);
    let request = wallet.delegated_request("tok1", "vid1", "shared", NOW + 10 * MINUTE);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let engine = h.engine.clone();
            let request = request.clone();
            tokio::spawn(async move { engine.authorize(&request).await })
        })
        .collect();

    let mut authorized = 0;
    let mut replayed = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            Decision::Authorized { .. } => authorized += 1,
            Decision::Denied(DenyReason::NonceReused) => replayed += 1,
            other => panic!("unexpected decision: {other:?}"),
        }
    }

    assert_eq!(authorized, 1);
    assert_eq!(replayed, 15);
}

#[tokio::test]
async fn metadata_is_served_from_cache_after_first_lookup() {
    let h = Harness::new().with_video("tok1", "vid1", Visibility::Public);
    let request = AccessRequest {
        token_id: Some("tok1".into()),
        auth_sig: AuthProof::default(),
    };

    h.engine.request_access(&request).await.unwrap();
    h.engine.request_access(&request).await.unwrap();

    assert_eq!(h.videos.lookups(), 1);
    let cached = h.kv.get("token:tok1").await.unwrap().unwrap();
    assert!(cached.contains("\"vid1\""));
}

#[tokio::test]
async fn undecodable_cache_entry_is_an_error() {
    let h = Harness::new().with_video("tok1", "vid1", Visibility::Public);
    h.kv.set("token:tok1", "{not json", None).await.unwrap();

    let request = AccessRequest {
        token_id: Some("tok1".into()),
        auth_sig: AuthProof::default(),
    };
    let err = h.engine.authorize(&request).await.unwrap_err();

    assert!(matches!(err, AccessError::Cache(_)));
    assert_eq!(h.videos.lookups(), 0);
}

#[tokio::test]
async fn unknown_token_is_not_found() {
    let h = Harness::new();
    let wallet = Wallet::from_seed(19);

    let err = h
        .engine
        .request_access(&wallet.existing_grant_request("missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::NotFound(_)));
}

#[tokio::test]
async fn failed_cache_population_does_not_fail_request() {
    let h = Harness::new().with_video("tok1", "vid1", Visibility::Public);
    h.kv.fail_writes(true);

    let request = AccessRequest {
        token_id: Some("tok1".into()),
        auth_sig: AuthProof::default(),
    };
    let link = h.engine.request_access(&request).await.unwrap();
    assert_eq!(link.object_prefix, "vid1/data/");

    h.kv.fail_writes(false);
    assert_eq!(h.kv.get("token:tok1").await.unwrap(), None);
}

#[tokio::test]
async fn unreachable_cache_is_a_transient_error() {
    let h = Harness::new().with_video("tok1", "vid1", Visibility::Protected);
    let wallet = Wallet::from_seed(20);
    h.kv.fail_reads(true);

    let err = h
        .engine
        .authorize(&wallet.existing_grant_request("tok1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::Cache(_)));
    assert!(err.is_transient());
}
