//! Configuration for the delegation exchange.

use std::time::Duration;

use anyhow::Context;

/// IdP endpoint and client tuning constants.
pub mod api {
    use std::time::Duration;

    /// Region used when none is configured.
    pub const DEFAULT_REGION: &str = "eu-north-1";

    /// Request timeout for every IdP call.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

    /// How long a fetched signing key set is reused (1 hour).
    pub const KEY_CACHE_TTL: Duration = Duration::from_secs(3600);

    /// Maximum number of cached key sets (one per issuer).
    pub const KEY_CACHE_MAX_SIZE: u64 = 16;

    /// Maximum keepalive connections.
    pub const MAX_KEEPALIVE: usize = 10;

    /// Keepalive expiry.
    pub const KEEPALIVE_EXPIRY: Duration = Duration::from_secs(30);

    /// Public IdP endpoint for a region.
    #[must_use]
    pub fn endpoint_for_region(region: &str) -> String {
        format!("https://cognito-idp.{region}.amazonaws.com")
    }
}

/// Parameter-store names.
pub mod params {
    /// Identifier of the user pool the delegation flow is bound to.
    pub const USER_POOL_ID: &str = "/delegation/userpool/id";

    /// Client id parameter for a calling service.
    #[must_use]
    pub fn client_id(service: &str) -> String {
        format!("/delegation/clients/{service}/id")
    }

    /// Client secret parameter for a calling service.
    #[must_use]
    pub fn client_secret(service: &str) -> String {
        format!("/delegation/clients/{service}/secret")
    }
}

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// IdP region.
    pub region: String,

    /// Base URL for IdP calls (overridable for mock servers).
    pub idp_endpoint: String,

    /// User pool id; resolved from the parameter store when absent.
    pub user_pool_id: Option<String>,

    /// Request timeout.
    pub request_timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Signing key set cache TTL.
    pub key_cache_ttl: Duration,

    /// Maximum cached key sets.
    pub key_cache_max_size: u64,

    /// Transient-failure retries for the key set fetch. Exchange rounds are never retried.
    pub key_fetch_retries: u32,

    /// Shared secret required on trigger routes (optional).
    pub hook_auth_token: Option<String>,
}

impl Config {
    /// Create a configuration for a region's public IdP endpoint.
    #[must_use]
    pub fn new(region: impl Into<String>) -> Self {
        let region = region.into();
        Self {
            idp_endpoint: api::endpoint_for_region(&region),
            region,
            user_pool_id: None,
            request_timeout: api::REQUEST_TIMEOUT,
            connect_timeout: api::CONNECT_TIMEOUT,
            key_cache_ttl: api::KEY_CACHE_TTL,
            key_cache_max_size: api::KEY_CACHE_MAX_SIZE,
            key_fetch_retries: 0,
            hook_auth_token: None,
        }
    }

    /// Create a test configuration pointing at a mock server.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            region: api::DEFAULT_REGION.to_string(),
            idp_endpoint: base_url.trim_end_matches('/').to_string(),
            user_pool_id: Some("eu-north-1_TEST".to_string()),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            key_cache_ttl: Duration::from_secs(300),
            key_cache_max_size: 4,
            key_fetch_retries: 0,
            hook_auth_token: None,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns error if environment variables are invalid.
    pub fn from_env() -> anyhow::Result<Self> {
        let region =
            std::env::var("AWS_REGION").unwrap_or_else(|_| api::DEFAULT_REGION.to_string());
        let mut config = Self::new(region);

        if let Ok(endpoint) = std::env::var("DELEGATION_IDP_ENDPOINT") {
            config.idp_endpoint = endpoint.trim_end_matches('/').to_string();
        }
        config.user_pool_id = std::env::var("DELEGATION_USER_POOL_ID").ok();
        config.hook_auth_token = std::env::var("DELEGATION_HOOK_AUTH_TOKEN").ok();
        if let Ok(retries) = std::env::var("DELEGATION_KEY_FETCH_RETRIES") {
            config.key_fetch_retries =
                retries.parse().context("DELEGATION_KEY_FETCH_RETRIES must be an integer")?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the endpoint is a usable absolute URL.
    ///
    /// # Errors
    ///
    /// Returns error if `idp_endpoint` does not parse as an http(s) URL.
    pub fn validate(&self) -> anyhow::Result<()> {
        let url = url::Url::parse(&self.idp_endpoint)
            .with_context(|| format!("invalid IdP endpoint '{}'", self.idp_endpoint))?;
        anyhow::ensure!(
            matches!(url.scheme(), "http" | "https"),
            "IdP endpoint must be http(s), got '{}'",
            url.scheme()
        );
        Ok(())
    }

    /// Token issuer for a user pool.
    #[must_use]
    pub fn issuer(&self, user_pool_id: &str) -> String {
        format!("{}/{}", self.idp_endpoint, user_pool_id)
    }

    /// Published signing key set location for a user pool.
    #[must_use]
    pub fn jwks_url(&self, user_pool_id: &str) -> String {
        format!("{}/.well-known/jwks.json", self.issuer(user_pool_id))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(api::DEFAULT_REGION)
    }
}
