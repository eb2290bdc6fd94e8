//! Named parameter lookups (user pool id, client credentials).

use std::collections::HashMap;

use async_trait::async_trait;

use crate::config::params;
use crate::error::ParameterError;

/// Read-only source of named configuration parameters.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Fetch a parameter by its hierarchical name (e.g. `/delegation/userpool/id`).
    async fn get_parameter(&self, name: &str) -> Result<String, ParameterError>;
}

/// Parameters held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticParameterStore {
    values: HashMap<String, String>,
}

impl StaticParameterStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

#[async_trait]
impl ParameterStore for StaticParameterStore {
    async fn get_parameter(&self, name: &str) -> Result<String, ParameterError> {
        self.values.get(name).cloned().ok_or_else(|| ParameterError::NotFound(name.to_string()))
    }
}

/// Parameters read from environment variables.
///
/// `/delegation/clients/booking-service/id` is read from
/// `DELEGATION_CLIENTS_BOOKING_SERVICE_ID`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvParameterStore;

impl EnvParameterStore {
    /// Environment variable name for a parameter.
    #[must_use]
    pub fn variable_name(name: &str) -> String {
        name.trim_start_matches('/')
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect()
    }
}

#[async_trait]
impl ParameterStore for EnvParameterStore {
    async fn get_parameter(&self, name: &str) -> Result<String, ParameterError> {
        let var = Self::variable_name(name);
        match std::env::var(&var) {
            Ok(value) if !value.is_empty() => Ok(value),
            Ok(_) => Err(ParameterError::Invalid {
                name: name.to_string(),
                message: format!("{var} is empty"),
            }),
            Err(_) => Err(ParameterError::NotFound(name.to_string())),
        }
    }
}

/// OAuth client credentials of a calling service.
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ClientCredentials {
    /// Load a service's client id and secret.
    pub async fn load(store: &dyn ParameterStore, service: &str) -> Result<Self, ParameterError> {
        let client_id = store.get_parameter(&params::client_id(service)).await?;
        let client_secret = store.get_parameter(&params::client_secret(service)).await?;
        Ok(Self { client_id, client_secret })
    }
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials").field("client_id", &self.client_id).finish()
    }
}

/// Resolve the user pool id the delegation flow is bound to.
pub async fn resolve_user_pool_id(
    configured: Option<&str>,
    store: &dyn ParameterStore,
) -> Result<String, ParameterError> {
    match configured {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => store.get_parameter(params::USER_POOL_ID).await,
    }
}
