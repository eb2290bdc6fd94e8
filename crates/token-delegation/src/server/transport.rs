//! HTTP transport for the trigger hooks.
//!
//! Each trigger is a JSON POST carrying the IdP event document; the reply is
//! the same document with `response` filled. When a hook auth token is
//! configured, every trigger request must present it as a bearer token.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use subtle::ConstantTimeEq;
use tower_http::trace::TraceLayer;

use crate::delegation::bearer_token;
use crate::triggers::{
    DefineAuthChallengeEvent, DelegationHooks, PreTokenGenerationEvent, VerifyAuthChallengeEvent,
};

/// Shared state for HTTP handlers.
pub struct HookState {
    pub hooks: DelegationHooks,
    /// Bearer token trigger callers must present, if any.
    pub auth_token: Option<String>,
}

/// Create the HTTP router for the trigger hooks.
pub fn create_router(hooks: DelegationHooks, auth_token: Option<String>) -> Router {
    let state = Arc::new(HookState { hooks, auth_token });

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(health_check))
        .route("/triggers/define-auth-challenge", post(handle_define_auth_challenge))
        .route("/triggers/verify-auth-challenge-response", post(handle_verify_auth_challenge))
        .route("/triggers/pre-token-generation", post(handle_pre_token_generation))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "token-delegation",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn handle_define_auth_challenge(
    State(state): State<Arc<HookState>>,
    headers: HeaderMap,
    Json(event): Json<DefineAuthChallengeEvent>,
) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    Json(DelegationHooks::define_auth_challenge(event)).into_response()
}

async fn handle_verify_auth_challenge(
    State(state): State<Arc<HookState>>,
    headers: HeaderMap,
    Json(event): Json<VerifyAuthChallengeEvent>,
) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    Json(state.hooks.verify_auth_challenge_response(event).await).into_response()
}

async fn handle_pre_token_generation(
    State(state): State<Arc<HookState>>,
    headers: HeaderMap,
    Json(event): Json<PreTokenGenerationEvent>,
) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }

    match state.hooks.pre_token_generation(event).await {
        Ok(event) => Json(event).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Scope registry lookup failed");
            error_response(StatusCode::BAD_GATEWAY, "scope registry unavailable")
        }
    }
}

fn authorize(state: &HookState, headers: &HeaderMap) -> Result<(), Response> {
    let Some(expected) = state.auth_token.as_deref() else {
        return Ok(());
    };

    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .unwrap_or_default();

    if bool::from(presented.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        tracing::warn!("Trigger request with missing or wrong hook token");
        Err(error_response(StatusCode::UNAUTHORIZED, "unauthorized"))
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}
