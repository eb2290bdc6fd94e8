//! Shared helpers: signing keys, token minting and a mock key set endpoint.
#![allow(dead_code)]

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use token_delegation::config::Config;

pub const POOL_ID: &str = "eu-north-1_TEST";
pub const KID: &str = "test-key-1";

const SIGNING_KEY_PEM: &str = include_str!("../fixtures/signing_key.pem");
const FOREIGN_KEY_PEM: &str = include_str!("../fixtures/foreign_key.pem");

/// Public modulus of `signing_key.pem`.
const SIGNING_KEY_N: &str = concat!(
    "m_J6tX2Q4TIiLev1AHft_IBsGHqmORKm5YTlRbmol0pKJFgcfnqNZihnHj75phF5mU2wb9sHztQBz0vu",
    "qXC6n4eZg2LZSvDHPy3cq4BYGpuwJ40P1RHnJjHsnn6YRg0I2iItc0Hr_IcGq3w_BdKqPf4x8nP3izPh",
    "2kVze2aoSswRO09YRTm2sDFhDQOROag-7sIP6XSKgkkyvbX5Mcr5-ruKycZ-ZWJr3q5VGpkSrB9K8WrF",
    "9IDu9HM9fpy5jlv1wZ1c2G1TV5Q_ixkgzRiRtrrjHwdwCoXEDl1PsNgQuUo79Q8XgntB1-oiDfM8WJtv",
    "zVg58bO8HKZz6SYpx_fdNQ",
);

/// Public modulus of `foreign_key.pem`.
const FOREIGN_KEY_N: &str = concat!(
    "2DAyGROYpVXZYkbBTy2jatshi3xmD2U91fB15cyS4N52HdoJZdohGwA6VqD0blGHRfLa25wHDa2IzBrr",
    "zUyp5nkZdHSXhlns3LThZ4C-B6pjZ_WcIRz4slLzKfbPr0fjmiW7GLYgiYSWLn-hdkrjkgleen4q5_a2",
    "91GFhtEQrtLcYAIOThEMhNs_Fa0idLXIiURJy5lpLqd95u6rPtIB3_GQkBCFOGbAMrXww9Mg47w2Ltmg",
    "l0-Xt5UnnMTnYXySs7EafA9UxFeLgxDTEtc0lb6OH7qkqEw7W08lbAs01d_kctF9sUv_D_PSS5GRslBZ",
    "qA54lg-s2AC7-Gu4O0NZVw",
);

pub fn now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
}

pub fn issuer(server: &MockServer) -> String {
    format!("{}/{}", server.uri(), POOL_ID)
}

pub fn jwks_path() -> String {
    format!("/{POOL_ID}/.well-known/jwks.json")
}

/// Config whose issuer and key set URL point at `server`.
pub fn config_for(server: &MockServer) -> Config {
    Config::for_testing(&server.uri())
}

/// A key set entry for `kid` backed by `signing_key.pem`.
pub fn jwk(kid: &str) -> serde_json::Value {
    json!({"kty": "RSA", "kid": kid, "alg": "RS256", "use": "sig", "n": SIGNING_KEY_N, "e": "AQAB"})
}

/// A key set entry for `kid` backed by `foreign_key.pem`.
pub fn foreign_jwk(kid: &str) -> serde_json::Value {
    json!({"kty": "RSA", "kid": kid, "alg": "RS256", "use": "sig", "n": FOREIGN_KEY_N, "e": "AQAB"})
}

pub fn jwks(keys: Vec<serde_json::Value>) -> serde_json::Value {
    json!({ "keys": keys })
}

/// Serve `keys` as the pool's key set.
pub async fn mount_jwks(server: &MockServer, keys: Vec<serde_json::Value>) {
    Mock::given(method("GET"))
        .and(path(jwks_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks(keys)))
        .mount(server)
        .await;
}

pub fn access_claims(iss: &str, exp: u64) -> serde_json::Value {
    json!({
        "sub": "7d4f-user",
        "iss": iss,
        "exp": exp,
        "iat": exp.saturating_sub(3600),
        "client_id": "caller-client",
        "username": "alice",
        "token_use": "access",
        "scope": "resources/booking-service"
    })
}

fn sign_with(pem: &str, kid: &str, claims: &serde_json::Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap();
    jsonwebtoken::encode(&header, claims, &key).unwrap()
}

/// An RS256 token signed by `signing_key.pem`.
pub fn sign(kid: &str, claims: &serde_json::Value) -> String {
    sign_with(SIGNING_KEY_PEM, kid, claims)
}

/// An RS256 token signed by `foreign_key.pem`.
pub fn sign_foreign(kid: &str, claims: &serde_json::Value) -> String {
    sign_with(FOREIGN_KEY_PEM, kid, claims)
}

/// A valid access token for the mock pool.
pub fn valid_token(server: &MockServer) -> String {
    sign(KID, &access_claims(&issuer(server), now() + 3600))
}
