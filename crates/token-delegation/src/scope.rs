//! Scope negotiation for issued tokens.
//!
//! A requested scope only survives if the calling OAuth client is registered
//! for it. Over-requested scopes are dropped silently, so a caller can never
//! widen its token past its client's registration by stuffing metadata.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ClientResult;
use crate::idp::CognitoClient;

/// Read-only view of which scopes each OAuth client may request.
#[async_trait]
pub trait ClientScopeRegistry: Send + Sync {
    /// Scopes `client_id` is allowed to request.
    async fn allowed_scopes(&self, client_id: &str) -> ClientResult<HashSet<String>>;
}

/// Registry held in memory.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct StaticScopeRegistry {
    clients: HashMap<String, HashSet<String>>,
}

impl StaticScopeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client's allowed scopes.
    #[must_use]
    pub fn with_client<I, S>(mut self, client_id: impl Into<String>, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clients.insert(client_id.into(), scopes.into_iter().map(Into::into).collect());
        self
    }

    /// Load a `{"client-id": ["scope", ...]}` JSON document.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl ClientScopeRegistry for StaticScopeRegistry {
    async fn allowed_scopes(&self, client_id: &str) -> ClientResult<HashSet<String>> {
        Ok(self.clients.get(client_id).cloned().unwrap_or_default())
    }
}

/// Registry backed by the IdP's OAuth client records.
///
/// The client needs a [`crate::idp::RequestSigner`]; the lookup is an
/// IAM-authenticated admin operation.
#[derive(Debug, Clone)]
pub struct CognitoScopeRegistry {
    client: CognitoClient,
    user_pool_id: String,
}

impl CognitoScopeRegistry {
    #[must_use]
    pub fn new(client: CognitoClient, user_pool_id: impl Into<String>) -> Self {
        Self { client, user_pool_id: user_pool_id.into() }
    }
}

#[async_trait]
impl ClientScopeRegistry for CognitoScopeRegistry {
    async fn allowed_scopes(&self, client_id: &str) -> ClientResult<HashSet<String>> {
        let scopes =
            self.client.describe_client_allowed_scopes(&self.user_pool_id, client_id).await?;
        Ok(scopes.into_iter().collect())
    }
}

/// Scope overrides for one token generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimsAndScopeOverride {
    #[serde(default)]
    pub scopes_to_add: Vec<String>,
}

/// Overrides for the tokens about to be minted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token_generation: Option<ClaimsAndScopeOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_generation: Option<ClaimsAndScopeOverride>,
}

impl TokenOverrides {
    /// The same scope list for both token kinds.
    #[must_use]
    pub fn with_scopes(scopes: Vec<String>) -> Self {
        Self {
            id_token_generation: Some(ClaimsAndScopeOverride { scopes_to_add: scopes.clone() }),
            access_token_generation: Some(ClaimsAndScopeOverride { scopes_to_add: scopes }),
        }
    }
}

/// Intersects requested scopes with a client's registered scopes.
#[derive(Clone)]
pub struct ScopeNegotiator {
    registry: Arc<dyn ClientScopeRegistry>,
}

impl ScopeNegotiator {
    #[must_use]
    pub fn new(registry: Arc<dyn ClientScopeRegistry>) -> Self {
        Self { registry }
    }

    /// Scopes to add to the tokens issued for `client_id`.
    ///
    /// An absent or blank request yields an empty list without consulting
    /// the registry. Order of first appearance is kept; duplicates collapse.
    ///
    /// # Errors
    ///
    /// Returns error if the registry lookup fails.
    pub async fn negotiate_scopes(
        &self,
        client_id: &str,
        requested: Option<&str>,
    ) -> ClientResult<Vec<String>> {
        let requested: Vec<&str> = requested.unwrap_or_default().split_whitespace().collect();
        if requested.is_empty() {
            return Ok(Vec::new());
        }

        let allowed = self.registry.allowed_scopes(client_id).await?;

        let mut granted: Vec<String> = Vec::with_capacity(requested.len());
        for scope in requested {
            if allowed.contains(scope) && !granted.iter().any(|g| g == scope) {
                granted.push(scope.to_string());
            }
        }

        tracing::debug!(client_id, granted = ?granted, "Negotiated scopes");
        Ok(granted)
    }
}

impl std::fmt::Debug for ScopeNegotiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeNegotiator").finish_non_exhaustive()
    }
}
