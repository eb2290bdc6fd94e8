//! JSON documents exchanged with the IdP (`application/x-amz-json-1.1`).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

use super::{AuthStep, AuthenticationResult, PendingChallenge};

pub(super) const INITIATE_AUTH: &str = "AWSCognitoIdentityProviderService.InitiateAuth";
pub(super) const RESPOND_TO_AUTH_CHALLENGE: &str =
    "AWSCognitoIdentityProviderService.RespondToAuthChallenge";
pub(super) const DESCRIBE_USER_POOL_CLIENT: &str =
    "AWSCognitoIdentityProviderService.DescribeUserPoolClient";

pub(super) const CUSTOM_AUTH_FLOW: &str = "CUSTOM_AUTH";

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct InitiateAuthRequest<'a> {
    pub auth_flow: &'a str,
    pub client_id: &'a str,
    pub auth_parameters: HashMap<&'static str, &'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct RespondToAuthChallengeRequest<'a> {
    pub challenge_name: &'a str,
    pub client_id: &'a str,
    pub session: &'a str,
    pub challenge_responses: HashMap<&'static str, &'a str>,
    pub client_metadata: HashMap<&'static str, &'a str>,
}

/// Shared response shape of `InitiateAuth` and `RespondToAuthChallenge`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct AuthResponse {
    #[serde(default)]
    pub challenge_name: Option<String>,
    #[serde(default)]
    pub session: Option<String>,
    #[serde(default)]
    pub authentication_result: Option<AuthenticationResult>,
}

impl TryFrom<AuthResponse> for AuthStep {
    type Error = ClientError;

    fn try_from(response: AuthResponse) -> Result<Self, Self::Error> {
        if let Some(result) = response.authentication_result {
            return Ok(Self::Authenticated(result));
        }

        match (response.challenge_name, response.session) {
            (Some(challenge_name), Some(session)) => {
                Ok(Self::Challenge(PendingChallenge { session, challenge_name }))
            }
            _ => Err(ClientError::unexpected("response carries neither tokens nor a challenge")),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct DescribeUserPoolClientRequest<'a> {
    pub user_pool_id: &'a str,
    pub client_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct DescribeUserPoolClientResponse {
    #[serde(default)]
    pub user_pool_client: Option<UserPoolClient>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UserPoolClient {
    #[serde(rename = "AllowedOAuthScopes", default)]
    pub allowed_oauth_scopes: Vec<String>,
}

/// Error document returned with 4xx/5xx statuses.
#[derive(Debug, Deserialize)]
pub(super) struct ErrorDocument {
    #[serde(rename = "__type")]
    pub kind: String,
    #[serde(default, alias = "Message")]
    pub message: String,
}
