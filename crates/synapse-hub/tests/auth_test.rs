//! Token issue and verification.

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use synapse_core::errors::AuthError;
use synapse_core::now_ms;
use synapse_hub::{Claims, Scope, TokenIssuer, TokenVerifier};
use synapse_protocol::SyncPayload;
use test_fixtures::{edge, edge_message, episode, episode_message, T0};

const KEY: [u8; 32] = [7u8; 32];

fn issuer() -> TokenIssuer {
    TokenIssuer::new("synapse-hub", KEY)
}

fn claims(expiry: i64) -> Claims {
    Claims {
        issuer: "synapse-hub".to_string(),
        subject: "agent-a".to_string(),
        expiry,
        roles: vec!["agent".to_string()],
        scopes: vec![Scope::EpisodesRead, Scope::EpisodesWrite],
        tenant_id: "acme".to_string(),
    }
}

#[test]
fn issued_token_verifies_to_its_claims() {
    let expected = claims(now_ms() + 60_000);
    let token = issuer().issue(&expected).unwrap();

    let verified = issuer().verifier(0).verify(&token, now_ms()).unwrap();

    assert_eq!(verified, expected);
    assert!(verified.has_scope(Scope::EpisodesWrite));
    assert!(!verified.has_scope(Scope::CausalWrite));
}

#[test]
fn minted_token_authenticates_matching_identity() {
    let token = issuer()
        .mint("agent-a", "acme", &Scope::ALL, Duration::from_secs(60))
        .unwrap();
    let verifier = issuer().verifier(0);

    let claims = verifier.authenticate(&token, "agent-a", "acme", now_ms()).unwrap();
    assert_eq!(claims.scopes, Scope::ALL.to_vec());

    let err = verifier.authenticate(&token, "agent-b", "acme", now_ms()).unwrap_err();
    assert!(matches!(err, AuthError::IdentityMismatch { .. }));
    let err = verifier.authenticate(&token, "agent-a", "globex", now_ms()).unwrap_err();
    assert!(matches!(err, AuthError::IdentityMismatch { .. }));
}

#[test]
fn token_signed_with_another_key_is_refused() {
    let forged = TokenIssuer::new("synapse-hub", [9u8; 32])
        .issue(&claims(now_ms() + 60_000))
        .unwrap();

    let err = issuer().verifier(0).verify(&forged, now_ms()).unwrap_err();
    assert_eq!(err, AuthError::InvalidSignature);
}

#[test]
fn edited_claims_break_the_signature() {
    let token = issuer().issue(&claims(now_ms() + 60_000)).unwrap();
    let (_, mac) = token.split_once('.').unwrap();

    let mut widened = claims(now_ms() + 60_000);
    widened.scopes = Scope::ALL.to_vec();
    let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&widened).unwrap());
    let tampered = format!("{body}.{mac}");

    let err = issuer().verifier(0).verify(&tampered, now_ms()).unwrap_err();
    assert_eq!(err, AuthError::InvalidSignature);
}

#[test]
fn expiry_is_exclusive_and_leeway_extends_it() {
    let now = now_ms();
    let token = issuer().issue(&claims(now)).unwrap();

    let err = issuer().verifier(0).verify(&token, now).unwrap_err();
    assert_eq!(err, AuthError::Expired { expiry_ms: now });

    assert!(issuer().verifier(5_000).verify(&token, now + 1).is_ok());
    assert!(issuer().verifier(5_000).verify(&token, now + 5_000).is_err());
}

#[test]
fn foreign_issuer_is_untrusted() {
    let mut foreign = claims(now_ms() + 60_000);
    foreign.issuer = "someone-else".to_string();
    let token = issuer().issue(&foreign).unwrap();

    let err = issuer().verifier(0).verify(&token, now_ms()).unwrap_err();
    assert!(matches!(err, AuthError::UntrustedIssuer { .. }));
}

#[test]
fn garbage_tokens_are_malformed_or_missing() {
    let verifier = TokenVerifier::new("synapse-hub", KEY, 0);
    assert_eq!(verifier.verify("", now_ms()).unwrap_err(), AuthError::MissingCredential);
    assert!(matches!(
        verifier.verify("no-dot-here", now_ms()).unwrap_err(),
        AuthError::MalformedToken { .. }
    ));
    assert!(matches!(
        verifier.verify("abc.c2hvcnQ", now_ms()).unwrap_err(),
        AuthError::MalformedToken { .. }
    ));
}

#[test]
fn secret_derived_keys_agree() {
    let a = TokenIssuer::from_secret("synapse-hub", b"correct horse battery staple");
    let b = TokenIssuer::from_secret("synapse-hub", b"correct horse battery staple");
    let token = a.issue(&claims(now_ms() + 60_000)).unwrap();
    assert!(b.verifier(0).verify(&token, now_ms()).is_ok());
}

#[test]
fn scopes_parse_and_map_to_payloads() {
    for scope in Scope::ALL {
        assert_eq!(Scope::parse(scope.as_str()), Some(scope));
    }
    assert_eq!(Scope::parse("episodes:delete"), None);
    assert_eq!(
        serde_json::to_string(&Scope::ReconciliationRequest).unwrap(),
        "\"reconciliation:request\""
    );

    let ep = episode_message(1, "A", &[("A", 1)], episode("ep", "t", "A", T0));
    let ed = edge_message(2, "A", &[("A", 2)], edge("m1", "m2", 0.1, 0.5, 3));
    assert_eq!(Scope::for_payload(&ep.payload), Some(Scope::EpisodesWrite));
    assert_eq!(Scope::for_payload(&ed.payload), Some(Scope::CausalWrite));
    let response = SyncPayload::ReconciliationResponse(synapse_protocol::ReconciliationResponse {
        records: Vec::new(),
        hub_clock: Default::default(),
    });
    assert_eq!(Scope::for_payload(&response), None);
}

#[test]
fn require_names_the_missing_scope() {
    let err = claims(now_ms() + 1).require(Scope::SkillsWrite).unwrap_err();
    assert_eq!(
        err,
        AuthError::MissingScope {
            scope: "skills:write".to_string()
        }
    );
}
