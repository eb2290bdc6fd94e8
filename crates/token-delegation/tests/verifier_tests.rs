//! Challenge answer verification against a mocked key set endpoint.

mod common;

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use token_delegation::config::Config;
use token_delegation::error::VerifyError;
use token_delegation::verify::{ChallengeAnswerVerifier, TokenValidator};

use common::{KID, POOL_ID};

fn verifier_for(server: &MockServer) -> ChallengeAnswerVerifier {
    let config = common::config_for(server);
    ChallengeAnswerVerifier::new(TokenValidator::new(&config, POOL_ID).unwrap())
}

fn tamper_signature(token: &str) -> String {
    let (signed, signature) = token.rsplit_once('.').unwrap();
    let mut sig: Vec<char> = signature.chars().collect();
    let mid = sig.len() / 2;
    sig[mid] = if sig[mid] == 'A' { 'B' } else { 'A' };
    format!("{signed}.{}", sig.into_iter().collect::<String>())
}

// =============================================================================
// Accepted answers
// =============================================================================

#[tokio::test]
async fn test_valid_token_is_accepted() {
    let server = MockServer::start().await;
    common::mount_jwks(&server, vec![common::jwk(KID)]).await;

    let token = common::valid_token(&server);
    assert!(verifier_for(&server).verify_challenge_answer(&token).await);
}

#[tokio::test]
async fn test_validate_returns_claims() {
    let server = MockServer::start().await;
    common::mount_jwks(&server, vec![common::jwk(KID)]).await;

    let config = common::config_for(&server);
    let validator = TokenValidator::new(&config, POOL_ID).unwrap();
    let claims = validator.validate(&common::valid_token(&server)).await.unwrap();

    assert_eq!(claims.sub, "7d4f-user");
    assert_eq!(claims.iss, common::issuer(&server));
    assert_eq!(claims.username.as_deref(), Some("alice"));
    assert_eq!(claims.token_use.as_deref(), Some("access"));
}

#[tokio::test]
async fn test_token_within_leeway_is_accepted() {
    let server = MockServer::start().await;
    common::mount_jwks(&server, vec![common::jwk(KID)]).await;

    let claims = common::access_claims(&common::issuer(&server), common::now() - 10);
    let token = common::sign(KID, &claims);
    assert!(verifier_for(&server).verify_challenge_answer(&token).await);
}

// =============================================================================
// Rejected answers
// =============================================================================

#[tokio::test]
async fn test_tampered_signature_is_rejected() {
    let server = MockServer::start().await;
    common::mount_jwks(&server, vec![common::jwk(KID)]).await;

    let token = tamper_signature(&common::valid_token(&server));
    assert!(!verifier_for(&server).verify_challenge_answer(&token).await);
}

#[tokio::test]
async fn test_token_from_foreign_key_with_known_kid_is_rejected() {
    let server = MockServer::start().await;
    common::mount_jwks(&server, vec![common::jwk(KID)]).await;

    let claims = common::access_claims(&common::issuer(&server), common::now() + 3600);
    let token = common::sign_foreign(KID, &claims);
    assert!(!verifier_for(&server).verify_challenge_answer(&token).await);
}

#[tokio::test]
async fn test_symmetric_algorithm_is_rejected() {
    let server = MockServer::start().await;
    common::mount_jwks(&server, vec![common::jwk(KID)]).await;

    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(KID.to_string());
    let claims = common::access_claims(&common::issuer(&server), common::now() + 3600);
    let token =
        jsonwebtoken::encode(&header, &claims, &EncodingKey::from_secret(b"AQAB")).unwrap();

    assert!(!verifier_for(&server).verify_challenge_answer(&token).await);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let server = MockServer::start().await;
    common::mount_jwks(&server, vec![common::jwk(KID)]).await;

    let claims = common::access_claims(&common::issuer(&server), common::now() - 3600);
    let token = common::sign(KID, &claims);
    assert!(!verifier_for(&server).verify_challenge_answer(&token).await);
}

#[tokio::test]
async fn test_wrong_issuer_is_rejected() {
    let server = MockServer::start().await;
    common::mount_jwks(&server, vec![common::jwk(KID)]).await;

    let claims =
        common::access_claims("https://idp.example/eu-north-1_OTHER", common::now() + 3600);
    let token = common::sign(KID, &claims);
    assert!(!verifier_for(&server).verify_challenge_answer(&token).await);
}

#[tokio::test]
async fn test_token_without_kid_is_rejected() {
    let server = MockServer::start().await;
    common::mount_jwks(&server, vec![common::jwk(KID)]).await;

    let claims = common::access_claims(&common::issuer(&server), common::now() + 3600);
    let key = EncodingKey::from_rsa_pem(include_bytes!("fixtures/signing_key.pem")).unwrap();
    let token = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key).unwrap();

    let config = common::config_for(&server);
    let validator = TokenValidator::new(&config, POOL_ID).unwrap();
    assert!(matches!(validator.validate(&token).await, Err(VerifyError::MissingKeyId)));
}

#[tokio::test]
async fn test_malformed_answers_are_rejected() {
    let server = MockServer::start().await;
    let verifier = verifier_for(&server);

    assert!(!verifier.verify_challenge_answer("").await);
    assert!(!verifier.verify_challenge_answer("not-a-token").await);
    assert!(!verifier.verify_challenge_answer("a.b.c").await);
}

// =============================================================================
// Key set fetching
// =============================================================================

#[tokio::test]
async fn test_unknown_kid_refetches_once_then_rejects() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(common::jwks_path()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::jwks(vec![common::jwk(KID)])),
        )
        .expect(2)
        .mount(&server)
        .await;

    let claims = common::access_claims(&common::issuer(&server), common::now() + 3600);
    let token = common::sign("unknown-kid", &claims);

    let config = common::config_for(&server);
    let validator = TokenValidator::new(&config, POOL_ID).unwrap();
    assert!(matches!(
        validator.validate(&token).await,
        Err(VerifyError::UnknownKeyId(kid)) if kid == "unknown-kid"
    ));
}

#[tokio::test]
async fn test_key_set_is_cached_between_verifications() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(common::jwks_path()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::jwks(vec![common::jwk(KID)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let verifier = verifier_for(&server);
    let token = common::valid_token(&server);

    assert!(verifier.verify_challenge_answer(&token).await);
    assert!(verifier.verify_challenge_answer(&token).await);
    assert!(verifier.verify_challenge_answer(&token).await);
}

#[tokio::test]
async fn test_rotated_key_is_picked_up() {
    let server = MockServer::start().await;

    // Stale set served first, then the rotated one
    Mock::given(method("GET"))
        .and(path(common::jwks_path()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::jwks(vec![common::jwk("old-key")])),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(common::jwks_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::jwks(vec![
            common::jwk("old-key"),
            common::jwk(KID),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let token = common::valid_token(&server);
    assert!(verifier_for(&server).verify_challenge_answer(&token).await);
}

#[tokio::test]
async fn test_rotated_in_foreign_key_does_not_verify_old_signature() {
    let server = MockServer::start().await;
    common::mount_jwks(&server, vec![common::foreign_jwk(KID)]).await;

    let token = common::valid_token(&server);
    assert!(!verifier_for(&server).verify_challenge_answer(&token).await);
}

#[tokio::test]
async fn test_key_set_server_error_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(common::jwks_path()))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let token = common::valid_token(&server);
    assert!(!verifier_for(&server).verify_challenge_answer(&token).await);
}

#[tokio::test]
async fn test_unparseable_key_set_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(common::jwks_path()))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let token = common::valid_token(&server);
    assert!(!verifier_for(&server).verify_challenge_answer(&token).await);
}

#[tokio::test]
async fn test_unreachable_key_set_is_rejected() {
    let config = Config::for_testing("http://127.0.0.1:1");
    let verifier = ChallengeAnswerVerifier::new(TokenValidator::new(&config, POOL_ID).unwrap());

    let claims = common::access_claims(&config.issuer(POOL_ID), common::now() + 3600);
    let token = common::sign(KID, &claims);

    let started = std::time::Instant::now();
    assert!(!verifier.verify_challenge_answer(&token).await);
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
}
