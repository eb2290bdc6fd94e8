//! IdP trigger event documents.
//!
//! Every trigger shares one envelope; only `request` and `response` differ.
//! The incoming `response` is discarded (the IdP sends it with null fields)
//! and rebuilt by the hook.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::challenge::{ChallengeDecision, ChallengeRecord};
use crate::scope::TokenOverrides;

/// Read JSON `null` as the type's default; the IdP sends null for empty maps.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Envelope shared by all triggers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound(
    serialize = "Req: Serialize, Resp: Serialize",
    deserialize = "Req: Deserialize<'de>, Resp: Default"
))]
pub struct TriggerEvent<Req, Resp> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_pool_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub caller_context: CallerContext,
    pub request: Req,
    #[serde(default, skip_deserializing)]
    pub response: Resp,
}

/// Who triggered the exchange.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_sdk_version: Option<String>,
    #[serde(default)]
    pub client_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefineAuthChallengeRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_attributes: HashMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub session: Vec<ChallengeRecord>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub client_metadata: HashMap<String, String>,
    #[serde(default)]
    pub user_not_found: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyAuthChallengeRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_attributes: HashMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub private_challenge_parameters: HashMap<String, String>,
    #[serde(default)]
    pub challenge_answer: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub client_metadata: HashMap<String, String>,
    #[serde(default)]
    pub user_not_found: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyAuthChallengeResponse {
    pub answer_correct: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreTokenGenerationRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_attributes: HashMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub group_configuration: serde_json::Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub client_metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreTokenGenerationResponse {
    pub claims_and_scope_override_details: TokenOverrides,
}

pub type DefineAuthChallengeEvent = TriggerEvent<DefineAuthChallengeRequest, ChallengeDecision>;
pub type VerifyAuthChallengeEvent =
    TriggerEvent<VerifyAuthChallengeRequest, VerifyAuthChallengeResponse>;
pub type PreTokenGenerationEvent =
    TriggerEvent<PreTokenGenerationRequest, PreTokenGenerationResponse>;
