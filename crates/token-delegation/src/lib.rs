//! Token Delegation
//!
//! Trades a caller's access token for a new, narrower token that lets one
//! service act on a user's behalf against another, using an identity
//! provider's custom challenge authentication.
//!
//! # Components
//!
//! - **Caller side**: [`DelegationClient`] drives the two-round exchange
//! - **IdP side**: [`triggers::DelegationHooks`] decide the challenge, verify
//!   the answer and negotiate scopes
//! - **Hook server**: [`server::HookServer`] exposes the hooks over HTTP
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use token_delegation::{CognitoClient, Config, DelegationClient, DelegationCredential};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let client = DelegationClient::new(Arc::new(CognitoClient::new(&config)?));
//!
//!     let credential = DelegationCredential {
//!         client_id: "client-1".into(),
//!         client_secret: "secret-1".into(),
//!         username: "alice".into(),
//!         original_access_token: "eyJ...".into(),
//!         target_scope: "resources/review-service".into(),
//!     };
//!     let token = client.acquire_delegation_token(&credential).await?;
//!     println!("{token}");
//!     Ok(())
//! }
//! ```

pub mod challenge;
pub mod config;
pub mod delegation;
pub mod error;
pub mod idp;
pub mod params;
pub mod scope;
pub mod secret_hash;
pub mod server;
pub mod triggers;
pub mod verify;

pub use challenge::{ChallengeDecision, ChallengeRecord, decide_challenge};
pub use config::Config;
pub use delegation::{DelegationClient, DelegationCredential};
pub use error::{ClientError, DelegationError, ParameterError, VerifyError};
pub use idp::{CognitoClient, IdentityProvider, RequestSigner};
pub use scope::{ClientScopeRegistry, ScopeNegotiator};
pub use secret_hash::compute_secret_hash;
pub use triggers::DelegationHooks;
pub use verify::{ChallengeAnswerVerifier, TokenValidator};
