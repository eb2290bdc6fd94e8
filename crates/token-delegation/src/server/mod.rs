//! Trigger hook server.
//!
//! Exposes [`DelegationHooks`] over HTTP so the IdP (or a thin function
//! adapter in front of it) can call them.

pub mod transport;

use std::net::SocketAddr;

use crate::triggers::DelegationHooks;

/// HTTP server for the IdP trigger hooks.
#[derive(Debug)]
pub struct HookServer {
    hooks: DelegationHooks,
    auth_token: Option<String>,
}

impl HookServer {
    /// Create a new server. `auth_token`, when set, is required on every
    /// trigger request.
    #[must_use]
    pub const fn new(hooks: DelegationHooks, auth_token: Option<String>) -> Self {
        Self { hooks, auth_token }
    }

    /// Run the server until CTRL+C.
    ///
    /// # Errors
    ///
    /// Returns error if the port cannot be bound or the server fails.
    pub async fn run_http(self, port: u16) -> anyhow::Result<()> {
        if self.auth_token.is_none() {
            tracing::warn!("No hook auth token configured, trigger routes are unauthenticated");
        }

        let router = transport::create_router(self.hooks, self.auth_token);
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Hook server listening on http://{}", addr);

        axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

        tracing::info!("Hook server shut down");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}
