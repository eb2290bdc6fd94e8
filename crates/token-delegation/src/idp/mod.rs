//! Identity provider client.
//!
//! Provides the [`IdentityProvider`] seam the delegation client drives, and
//! [`CognitoClient`], an async HTTP implementation with:
//! - Connection pooling via reqwest
//! - Bounded request and connect timeouts
//! - Typed IdP error documents mapped to [`ClientError`]
//! - SigV4 signing for the IAM-authenticated admin operations
//!
//! Exchange rounds are never retried here: a failed round abandons its session.

mod signing;
mod wire;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::{Config, api};
use crate::error::{ClientError, ClientResult};

pub use signing::RequestSigner;
use wire::{
    AuthResponse, CUSTOM_AUTH_FLOW, DESCRIBE_USER_POOL_CLIENT, DescribeUserPoolClientRequest,
    DescribeUserPoolClientResponse, ErrorDocument, INITIATE_AUTH, InitiateAuthRequest,
    RESPOND_TO_AUTH_CHALLENGE, RespondToAuthChallengeRequest,
};

const AMZ_JSON: &str = "application/x-amz-json-1.1";
const AMZ_TARGET: &str = "X-Amz-Target";

/// Round 1: open a custom-authentication exchange.
#[derive(Debug, Clone, Copy)]
pub struct StartCustomAuth<'a> {
    pub client_id: &'a str,
    pub username: &'a str,
    pub secret_hash: &'a str,
}

/// Round 2: answer the pending challenge of a session.
#[derive(Clone, Copy)]
pub struct RespondToChallenge<'a> {
    pub client_id: &'a str,
    pub username: &'a str,
    pub session: &'a str,
    pub challenge_name: &'a str,
    pub answer: &'a str,
    pub secret_hash: &'a str,
    /// Requested scope, sent as exchange metadata.
    pub scope: &'a str,
}

impl std::fmt::Debug for RespondToChallenge<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RespondToChallenge")
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("challenge_name", &self.challenge_name)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// A challenge the IdP expects to be answered within `session`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChallenge {
    pub session: String,
    pub challenge_name: String,
}

/// Tokens issued at the end of a successful exchange.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthenticationResult {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl std::fmt::Debug for AuthenticationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationResult")
            .field("has_access_token", &self.access_token.is_some())
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Outcome of one exchange round.
#[derive(Debug, Clone)]
pub enum AuthStep {
    /// The IdP poses (another) challenge.
    Challenge(PendingChallenge),
    /// The IdP issued tokens.
    Authenticated(AuthenticationResult),
}

/// The IdP operations a delegation exchange needs.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Begin a custom-authentication exchange.
    async fn start_custom_auth(&self, request: StartCustomAuth<'_>) -> ClientResult<AuthStep>;

    /// Answer the pending challenge of an exchange.
    async fn respond_to_challenge(
        &self,
        request: RespondToChallenge<'_>,
    ) -> ClientResult<AuthStep>;
}

/// HTTP client for the IdP's JSON API.
#[derive(Clone)]
pub struct CognitoClient {
    /// HTTP client.
    client: Client,

    /// API base URL.
    endpoint: String,

    /// Request timeout, reported on timeouts.
    request_timeout: Duration,

    /// Signer for admin operations; the exchange rounds go unsigned.
    signer: Option<RequestSigner>,
}

impl CognitoClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(AMZ_JSON));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(api::MAX_KEEPALIVE)
            .pool_idle_timeout(api::KEEPALIVE_EXPIRY)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/", config.idp_endpoint.trim_end_matches('/')),
            request_timeout: config.request_timeout,
            signer: None,
        })
    }

    /// Sign admin operations with `signer`.
    #[must_use]
    pub fn with_signer(mut self, signer: RequestSigner) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Scopes an OAuth client is registered for.
    ///
    /// This is an IAM-authenticated operation and needs a signer.
    ///
    /// # Errors
    ///
    /// Returns error if no signer is configured, or on API failure.
    pub async fn describe_client_allowed_scopes(
        &self,
        user_pool_id: &str,
        client_id: &str,
    ) -> ClientResult<Vec<String>> {
        let request = DescribeUserPoolClientRequest { user_pool_id, client_id };
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| ClientError::Signing("no credentials configured".into()))?;
        let response: DescribeUserPoolClientResponse =
            self.call(DESCRIBE_USER_POOL_CLIENT, &request, Some(signer)).await?;

        Ok(response.user_pool_client.map(|c| c.allowed_oauth_scopes).unwrap_or_default())
    }

    /// POST one operation and decode its response.
    async fn call<B, T>(
        &self,
        target: &'static str,
        body: &B,
        signer: Option<&RequestSigner>,
    ) -> ClientResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let body = serde_json::to_string(body)?;

        tracing::debug!(target_op = target, signed = signer.is_some(), "Calling IdP");

        let mut request = self.client.post(&self.endpoint).header(AMZ_TARGET, target);
        if let Some(signer) = signer {
            let signed = [("content-type", AMZ_JSON), ("x-amz-target", target)];
            for (name, value) in signer.sign_post(&self.endpoint, &signed, body.as_bytes()).await? {
                request = request.header(name, value);
            }
        }

        let response = request.body(body).send().await.map_err(|e| self.transport_error(e))?;

        let response = self.handle_response(response).await?;
        let text = response.text().await.map_err(|e| self.transport_error(e))?;

        serde_json::from_str(&text).map_err(ClientError::from)
    }

    fn transport_error(&self, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::Timeout(self.request_timeout)
        } else {
            ClientError::Http(err)
        }
    }

    /// Handle API response status codes.
    async fn handle_response(
        &self,
        response: reqwest::Response,
    ) -> ClientResult<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        match status.as_u16() {
            429 => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1);

                Err(ClientError::rate_limited(retry_after))
            }
            400..=499 => {
                let text = response.text().await.unwrap_or_default();
                match serde_json::from_str::<ErrorDocument>(&text) {
                    Ok(doc) => Err(ClientError::service(doc.kind, doc.message)),
                    Err(_) => Err(ClientError::UnexpectedStatus {
                        status: status.as_u16(),
                        message: text,
                    }),
                }
            }
            500..=599 => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::server(status.as_u16(), text))
            }
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::UnexpectedStatus { status: status.as_u16(), message: text })
            }
        }
    }
}

#[async_trait]
impl IdentityProvider for CognitoClient {
    async fn start_custom_auth(&self, request: StartCustomAuth<'_>) -> ClientResult<AuthStep> {
        let body = InitiateAuthRequest {
            auth_flow: CUSTOM_AUTH_FLOW,
            client_id: request.client_id,
            auth_parameters: HashMap::from([
                ("USERNAME", request.username),
                ("SECRET_HASH", request.secret_hash),
            ]),
        };

        let response: AuthResponse = self.call(INITIATE_AUTH, &body, None).await?;
        AuthStep::try_from(response)
    }

    async fn respond_to_challenge(
        &self,
        request: RespondToChallenge<'_>,
    ) -> ClientResult<AuthStep> {
        let body = RespondToAuthChallengeRequest {
            challenge_name: request.challenge_name,
            client_id: request.client_id,
            session: request.session,
            challenge_responses: HashMap::from([
                ("USERNAME", request.username),
                ("ANSWER", request.answer),
                ("SECRET_HASH", request.secret_hash),
            ]),
            client_metadata: HashMap::from([("scope", request.scope)]),
        };

        let response: AuthResponse = self.call(RESPOND_TO_AUTH_CHALLENGE, &body, None).await?;
        AuthStep::try_from(response)
    }
}

impl std::fmt::Debug for CognitoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CognitoClient")
            .field("endpoint", &self.endpoint)
            .field("signed", &self.signer.is_some())
            .finish()
    }
}
