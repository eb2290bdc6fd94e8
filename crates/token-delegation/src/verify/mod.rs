//! Challenge answer verification.
//!
//! # Verification flow
//!
//! 1. Decode the JWT header (no verification) to extract `kid`.
//! 2. Fetch the pool's key set (cached; refreshed once on unknown `kid`).
//! 3. Rebuild the RSA public key from the matching JWK.
//! 4. Verify the signature with RS256 only, plus `exp` and `iss`.
//!
//! The token's own `alg` header never selects the algorithm; a token
//! declaring anything but RS256 fails.

pub mod jwks;

use std::sync::Arc;

use jsonwebtoken::jwk::{AlgorithmParameters, JwkSet};
use jsonwebtoken::{Algorithm, DecodingKey, TokenData, Validation};
use serde::Deserialize;

use crate::config::Config;
use crate::error::VerifyError;

pub use jwks::KeySetCache;

/// Clock skew tolerated on `exp`.
const LEEWAY_SECS: u64 = 60;

/// Claims read from a verified token.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub iss: String,
    pub exp: u64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub token_use: Option<String>,
}

/// Verifies bearer tokens against the IdP's published signing keys.
#[derive(Debug, Clone)]
pub struct TokenValidator {
    keys: Arc<KeySetCache>,
    jwks_url: String,
    issuer: String,
}

impl TokenValidator {
    /// Create a validator for one user pool.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(config: &Config, user_pool_id: &str) -> anyhow::Result<Self> {
        let keys = Arc::new(KeySetCache::new(config)?);
        Ok(Self::with_key_cache(keys, config.jwks_url(user_pool_id), config.issuer(user_pool_id)))
    }

    /// Create a validator sharing an existing key set cache.
    #[must_use]
    pub fn with_key_cache(
        keys: Arc<KeySetCache>,
        jwks_url: impl Into<String>,
        issuer: impl Into<String>,
    ) -> Self {
        Self { keys, jwks_url: jwks_url.into(), issuer: issuer.into() }
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError`] if the token is malformed, signed with an
    /// unknown key, fails signature or claim checks, or the key set cannot
    /// be fetched.
    pub async fn validate(&self, token: &str) -> Result<TokenClaims, VerifyError> {
        if token.is_empty() {
            return Err(VerifyError::Empty);
        }

        let header = jsonwebtoken::decode_header(token)?;
        let kid = header.kid.ok_or(VerifyError::MissingKeyId)?;

        let key = self.find_decoding_key(&kid).await?;
        let data: TokenData<TokenClaims> =
            jsonwebtoken::decode(token, &key, &build_validation(&self.issuer))?;

        Ok(data.claims)
    }

    /// Find a decoding key by `kid`, refreshing the key set once if not found.
    async fn find_decoding_key(&self, kid: &str) -> Result<DecodingKey, VerifyError> {
        let jwks = self.keys.get(&self.jwks_url).await?;
        if let Some(key) = find_key_in_jwks(&jwks, kid) {
            return Ok(key);
        }

        tracing::debug!(kid, "Key not found in cached key set, refreshing");
        let jwks = self.keys.refresh(&self.jwks_url).await?;
        find_key_in_jwks(&jwks, kid).ok_or_else(|| VerifyError::UnknownKeyId(kid.to_string()))
    }
}

/// Find an RSA JWK by `kid` and convert it to a `DecodingKey`.
fn find_key_in_jwks(jwks: &JwkSet, kid: &str) -> Option<DecodingKey> {
    let jwk = jwks.keys.iter().find(|k| k.common.key_id.as_deref() == Some(kid))?;

    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e).ok(),
        _ => None,
    }
}

fn build_validation(issuer: &str) -> Validation {
    let mut v = Validation::new(Algorithm::RS256);
    v.leeway = LEEWAY_SECS;
    // Access tokens carry `client_id`, not `aud`
    v.validate_aud = false;
    v.set_issuer(&[issuer]);
    v.set_required_spec_claims(&["exp", "iss"]);
    v
}

/// Boolean gate deciding whether a challenge answer is an authentic token.
#[derive(Debug, Clone)]
pub struct ChallengeAnswerVerifier {
    validator: TokenValidator,
}

impl ChallengeAnswerVerifier {
    #[must_use]
    pub const fn new(validator: TokenValidator) -> Self {
        Self { validator }
    }

    /// `true` only if `answer` is a token whose signature verifies.
    ///
    /// Every failure (parse, network, unknown key, bad signature, expiry)
    /// is `false`; the reason is logged, never returned.
    pub async fn verify_challenge_answer(&self, answer: &str) -> bool {
        match self.validator.validate(answer).await {
            Ok(claims) => {
                tracing::debug!(
                    sub = %claims.sub,
                    username = claims.username.as_deref().unwrap_or_default(),
                    token_use = claims.token_use.as_deref().unwrap_or_default(),
                    "Challenge answer verified"
                );
                true
            }
            Err(e) => {
                tracing::info!(error = %e, "Challenge answer rejected");
                false
            }
        }
    }
}
