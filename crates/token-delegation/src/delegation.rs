//! Caller-side delegation token acquisition.
//!
//! Drives exactly two IdP round trips:
//! 1. open a custom-auth exchange for the resource owner,
//! 2. answer its challenge with the caller's own access token, sending the
//!    target scope as exchange metadata.
//!
//! Nothing is retried here. A session that fails locally is abandoned and
//! left to expire on the IdP side.

use std::sync::Arc;

use crate::error::{DelegationError, DelegationResult};
use crate::idp::{AuthStep, IdentityProvider, RespondToChallenge, StartCustomAuth};
use crate::params::ClientCredentials;
use crate::secret_hash::compute_secret_hash;

/// Everything one exchange needs. Never persisted.
#[derive(Clone)]
pub struct DelegationCredential {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub original_access_token: String,
    pub target_scope: String,
}

impl DelegationCredential {
    /// Build a credential from an incoming request's context.
    ///
    /// `authorization` is the raw `Authorization` header (`Bearer <token>` or
    /// a bare token); `username` is the resource owner claim established by
    /// the request's authorizer.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::Precondition`] if either is missing.
    pub fn from_request(
        authorization: Option<&str>,
        username: Option<&str>,
        client: &ClientCredentials,
        target_scope: impl Into<String>,
    ) -> DelegationResult<Self> {
        let username = username
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                DelegationError::precondition(
                    "username",
                    "username claim not set in the authorization result",
                )
            })?;

        let token = authorization.and_then(bearer_token).ok_or_else(|| {
            DelegationError::precondition("access_token", "access token not present in the headers")
        })?;

        Ok(Self {
            client_id: client.client_id.clone(),
            client_secret: client.client_secret.clone(),
            username: username.to_string(),
            original_access_token: token.to_string(),
            target_scope: target_scope.into(),
        })
    }

    fn check(&self) -> DelegationResult<()> {
        let required = [
            ("username", self.username.as_str()),
            ("access_token", self.original_access_token.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("target_scope", self.target_scope.as_str()),
        ];

        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(DelegationError::precondition(*field, "must not be empty")),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for DelegationCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegationCredential")
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("target_scope", &self.target_scope)
            .finish_non_exhaustive()
    }
}

/// Extract the token from an `Authorization` header value.
#[must_use]
pub fn bearer_token(header: &str) -> Option<&str> {
    let header = header.trim();
    let token = match header.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        Some(_) => return None,
        None => header,
    };
    (!token.is_empty()).then_some(token)
}

/// Trades a caller's token for a narrower delegation token.
#[derive(Clone)]
pub struct DelegationClient {
    idp: Arc<dyn IdentityProvider>,
}

impl DelegationClient {
    #[must_use]
    pub fn new(idp: Arc<dyn IdentityProvider>) -> Self {
        Self { idp }
    }

    /// Obtain a new access token scoped to `credential.target_scope`.
    ///
    /// # Errors
    ///
    /// - [`DelegationError::Precondition`] before any network call if an input is missing
    /// - [`DelegationError::UpstreamUnavailable`] if the IdP cannot be reached
    /// - [`DelegationError::AuthenticationRejected`] if the IdP refuses the exchange
    pub async fn acquire_delegation_token(
        &self,
        credential: &DelegationCredential,
    ) -> DelegationResult<String> {
        credential.check()?;

        let secret_hash = compute_secret_hash(
            &credential.client_id,
            &credential.client_secret,
            &credential.username,
        );

        let challenge = match self
            .idp
            .start_custom_auth(StartCustomAuth {
                client_id: &credential.client_id,
                username: &credential.username,
                secret_hash: &secret_hash,
            })
            .await
            .map_err(|e| log_failure(credential, 1, e.into()))?
        {
            AuthStep::Challenge(challenge) => challenge,
            AuthStep::Authenticated(_) => {
                return Err(log_failure(
                    credential,
                    1,
                    DelegationError::rejected("tokens issued without a challenge"),
                ));
            }
        };

        tracing::debug!(
            client_id = %credential.client_id,
            challenge = %challenge.challenge_name,
            "Exchange opened"
        );

        let step = self
            .idp
            .respond_to_challenge(RespondToChallenge {
                client_id: &credential.client_id,
                username: &credential.username,
                session: &challenge.session,
                challenge_name: &challenge.challenge_name,
                answer: &credential.original_access_token,
                secret_hash: &secret_hash,
                scope: &credential.target_scope,
            })
            .await
            .map_err(|e| log_failure(credential, 2, e.into()))?;

        let result = match step {
            AuthStep::Authenticated(result) => result,
            AuthStep::Challenge(next) => {
                return Err(log_failure(
                    credential,
                    2,
                    DelegationError::rejected(format!(
                        "exchange not finished after two rounds (next challenge {})",
                        next.challenge_name
                    )),
                ));
            }
        };

        let token = result.access_token.filter(|t| !t.is_empty()).ok_or_else(|| {
            log_failure(credential, 2, DelegationError::rejected("result carries no access token"))
        })?;

        tracing::info!(
            client_id = %credential.client_id,
            scope = %credential.target_scope,
            "Delegation token issued"
        );
        Ok(token)
    }
}

fn log_failure(
    credential: &DelegationCredential,
    round: u8,
    err: DelegationError,
) -> DelegationError {
    match &err {
        DelegationError::AuthenticationRejected { reason } => tracing::warn!(
            client_id = %credential.client_id,
            round,
            reason = %reason,
            "Delegation denied"
        ),
        other => tracing::warn!(
            client_id = %credential.client_id,
            round,
            error = %other,
            "Delegation exchange failed"
        ),
    }
    err
}

impl std::fmt::Debug for DelegationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegationClient").finish_non_exhaustive()
    }
}
