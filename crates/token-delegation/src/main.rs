//! Token Delegation - Entry Point
//!
//! Computes secret hashes, runs one delegation exchange, or serves the IdP
//! trigger hooks over HTTP.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use token_delegation::{
    ChallengeAnswerVerifier, CognitoClient, Config, DelegationClient, DelegationCredential,
    DelegationHooks, RequestSigner, ScopeNegotiator, TokenValidator, compute_secret_hash,
    params::{ClientCredentials, EnvParameterStore, resolve_user_pool_id},
    scope::{ClientScopeRegistry, CognitoScopeRegistry, StaticScopeRegistry},
    server::HookServer,
};

#[derive(Parser, Debug)]
#[command(name = "token-delegation")]
#[command(about = "Delegated access-token exchange over custom challenge authentication")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG", global = true)]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the secret hash for a client and user
    SecretHash {
        #[arg(long)]
        client_id: String,
        #[arg(long, env = "DELEGATION_CLIENT_SECRET", hide_env_values = true)]
        client_secret: String,
        #[arg(long)]
        username: String,
    },

    /// Trade an access token for a delegation token and print it
    Exchange {
        /// Load client credentials for this service from the parameter store
        #[arg(long)]
        service: Option<String>,
        #[arg(long, required_unless_present = "service")]
        client_id: Option<String>,
        #[arg(
            long,
            env = "DELEGATION_CLIENT_SECRET",
            hide_env_values = true,
            required_unless_present = "service"
        )]
        client_secret: Option<String>,
        /// Resource owner the token is issued for
        #[arg(long)]
        username: String,
        /// Caller's access token (`Bearer` prefix optional)
        #[arg(long, env = "DELEGATION_ACCESS_TOKEN", hide_env_values = true)]
        token: String,
        /// Scope to request for the delegation token
        #[arg(long)]
        scope: String,
    },

    /// Serve the IdP trigger hooks over HTTP
    Serve {
        #[arg(long, default_value = "8000", env = "PORT")]
        port: u16,
        /// JSON file mapping client ids to allowed scopes; the IdP's client
        /// records are used when absent
        #[arg(long, env = "DELEGATION_SCOPE_REGISTRY")]
        scope_registry: Option<PathBuf>,
    },
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    // stdout carries command output
    if json {
        subscriber
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    match cli.command {
        Command::SecretHash { client_id, client_secret, username } => {
            println!("{}", compute_secret_hash(&client_id, &client_secret, &username));
        }
        Command::Exchange { service, client_id, client_secret, username, token, scope } => {
            let config = Config::from_env()?;
            let client = match service {
                Some(service) => ClientCredentials::load(&EnvParameterStore, &service).await?,
                None => ClientCredentials {
                    client_id: client_id.unwrap_or_default(),
                    client_secret: client_secret.unwrap_or_default(),
                },
            };

            let credential = DelegationCredential::from_request(
                Some(token.as_str()),
                Some(username.as_str()),
                &client,
                scope,
            )?;

            let delegation = DelegationClient::new(Arc::new(CognitoClient::new(&config)?));
            let token = delegation.acquire_delegation_token(&credential).await?;
            println!("{token}");
        }
        Command::Serve { port, scope_registry } => {
            tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting token delegation hooks");

            let config = Config::from_env()?;
            let pool_id =
                resolve_user_pool_id(config.user_pool_id.as_deref(), &EnvParameterStore).await?;
            tracing::info!(
                user_pool_id = %pool_id,
                issuer = %config.issuer(&pool_id),
                "Bound to user pool"
            );

            let registry: Arc<dyn ClientScopeRegistry> = match scope_registry {
                Some(path) => {
                    tracing::info!(path = %path.display(), "Using static scope registry");
                    Arc::new(StaticScopeRegistry::from_file(&path)?)
                }
                None => {
                    let signer = RequestSigner::from_default_chain(&config.region).await?;
                    tracing::info!(region = %config.region, "Using IdP scope registry");
                    let client = CognitoClient::new(&config)?.with_signer(signer);
                    Arc::new(CognitoScopeRegistry::new(client, &pool_id))
                }
            };

            let verifier = ChallengeAnswerVerifier::new(TokenValidator::new(&config, &pool_id)?);
            let hooks = DelegationHooks::new(verifier, ScopeNegotiator::new(registry));

            HookServer::new(hooks, config.hook_auth_token.clone()).run_http(port).await?;
        }
    }

    Ok(())
}
