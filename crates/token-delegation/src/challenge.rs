//! Custom-authentication state machine.
//!
//! The IdP re-evaluates the exchange on every round by handing over the
//! challenge history so far. The decision depends only on the round index
//! (history length) and the result of the last round, which bounds every
//! exchange to exactly two IdP round trips.

use serde::{Deserialize, Serialize};

/// Name of the single custom challenge posed by this protocol.
pub const DELEGATION_CHALLENGE: &str = "DELEGATION";

/// One completed round of an exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRecord {
    pub challenge_name: String,
    pub challenge_result: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge_metadata: Option<String>,
}

impl ChallengeRecord {
    #[must_use]
    pub fn new(challenge_name: impl Into<String>, challenge_result: bool) -> Self {
        Self { challenge_name: challenge_name.into(), challenge_result, challenge_metadata: None }
    }
}

/// Where an exchange stands, derived from its history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    /// No round has completed yet.
    AwaitingFirstChallenge,
    /// The delegation challenge has been answered.
    AwaitingVerification { answer_correct: bool },
    /// History longer than the protocol allows.
    Exhausted,
}

impl ExchangeState {
    /// Derive the state from a challenge history.
    #[must_use]
    pub fn from_history(history: &[ChallengeRecord]) -> Self {
        Self::from_round(history.len(), history.last().map(|r| r.challenge_result))
    }

    /// Derive the state from a round index and the last round's result.
    #[must_use]
    pub const fn from_round(round: usize, last_result: Option<bool>) -> Self {
        match (round, last_result) {
            (0, _) => Self::AwaitingFirstChallenge,
            (1, Some(answer_correct)) => Self::AwaitingVerification { answer_correct },
            _ => Self::Exhausted,
        }
    }

    /// The decision the IdP should act on in this state.
    #[must_use]
    pub fn decide(self) -> ChallengeDecision {
        match self {
            Self::AwaitingFirstChallenge => ChallengeDecision::challenge(DELEGATION_CHALLENGE),
            Self::AwaitingVerification { answer_correct: true } => {
                ChallengeDecision::issue_tokens()
            }
            Self::AwaitingVerification { answer_correct: false } | Self::Exhausted => {
                ChallengeDecision::fail()
            }
        }
    }
}

/// What the IdP does next. Exactly one of the three outcomes is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeDecision {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge_name: Option<String>,
    pub issue_tokens: bool,
    pub fail_authentication: bool,
}

impl ChallengeDecision {
    fn challenge(name: &str) -> Self {
        Self {
            challenge_name: Some(name.to_string()),
            issue_tokens: false,
            fail_authentication: false,
        }
    }

    const fn issue_tokens() -> Self {
        Self {
            challenge_name: None,
            issue_tokens: true,
            fail_authentication: false,
        }
    }

    const fn fail() -> Self {
        Self {
            challenge_name: None,
            issue_tokens: false,
            fail_authentication: true,
        }
    }
}

/// Decide the next step of an exchange from its challenge history.
#[must_use]
pub fn decide_challenge(history: &[ChallengeRecord]) -> ChallengeDecision {
    let state = ExchangeState::from_history(history);
    let decision = state.decide();
    tracing::debug!(round = history.len(), ?state, ?decision, "Decided challenge step");
    decision
}
