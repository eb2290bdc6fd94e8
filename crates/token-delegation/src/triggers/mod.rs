//! IdP-side trigger hooks.
//!
//! The IdP calls three hooks while a custom-auth exchange runs:
//!
//! | Trigger | Hook | Decides |
//! |---------|------|---------|
//! | define auth challenge | [`define_auth_challenge`] | next step |
//! | verify challenge response | [`verify_auth_challenge_response`] | answer correct? |
//! | pre token generation | [`pre_token_generation`] | scopes to add |
//!
//! [`define_auth_challenge`]: DelegationHooks::define_auth_challenge
//! [`verify_auth_challenge_response`]: DelegationHooks::verify_auth_challenge_response
//! [`pre_token_generation`]: DelegationHooks::pre_token_generation
//!
//! Each hook takes the event document and returns it with `response` filled.

pub mod events;

use crate::challenge::decide_challenge;
use crate::error::ClientResult;
use crate::scope::{ScopeNegotiator, TokenOverrides};
use crate::verify::ChallengeAnswerVerifier;

pub use events::{
    CallerContext, DefineAuthChallengeEvent, DefineAuthChallengeRequest, PreTokenGenerationEvent,
    PreTokenGenerationRequest, PreTokenGenerationResponse, TriggerEvent, VerifyAuthChallengeEvent,
    VerifyAuthChallengeRequest, VerifyAuthChallengeResponse,
};

/// Client metadata key carrying the requested scope.
pub const SCOPE_METADATA_KEY: &str = "scope";

/// The three hooks, sharing one verifier and negotiator.
#[derive(Debug, Clone)]
pub struct DelegationHooks {
    verifier: ChallengeAnswerVerifier,
    negotiator: ScopeNegotiator,
}

impl DelegationHooks {
    #[must_use]
    pub const fn new(verifier: ChallengeAnswerVerifier, negotiator: ScopeNegotiator) -> Self {
        Self { verifier, negotiator }
    }

    /// Fill in the next exchange step from the session history.
    #[must_use]
    pub fn define_auth_challenge(mut event: DefineAuthChallengeEvent) -> DefineAuthChallengeEvent {
        event.response = decide_challenge(&event.request.session);
        event
    }

    /// Mark the answer correct iff it is an authentic access token.
    pub async fn verify_auth_challenge_response(
        &self,
        mut event: VerifyAuthChallengeEvent,
    ) -> VerifyAuthChallengeEvent {
        let answer = event.request.challenge_answer.as_deref().unwrap_or_default();
        let answer_correct = self.verifier.verify_challenge_answer(answer).await;

        tracing::info!(
            client_id = %event.caller_context.client_id,
            user = event.user_name.as_deref().unwrap_or_default(),
            answer_correct,
            "Verified challenge answer"
        );

        event.response = VerifyAuthChallengeResponse { answer_correct };
        event
    }

    /// Add the negotiated scopes to both the id and access token.
    ///
    /// # Errors
    ///
    /// Returns error if the client scope registry cannot be read. Token
    /// issuance must not proceed in that case.
    pub async fn pre_token_generation(
        &self,
        mut event: PreTokenGenerationEvent,
    ) -> ClientResult<PreTokenGenerationEvent> {
        let client_id = event.caller_context.client_id.as_str();
        let requested =
            event.request.client_metadata.get(SCOPE_METADATA_KEY).map(String::as_str);

        let scopes = self.negotiator.negotiate_scopes(client_id, requested).await?;

        tracing::info!(client_id, scopes = ?scopes, "Adding negotiated scopes");

        event.response = PreTokenGenerationResponse {
            claims_and_scope_override_details: TokenOverrides::with_scopes(scopes),
        };
        Ok(event)
    }
}
