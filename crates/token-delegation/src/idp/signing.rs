//! SigV4 request signing for IAM-authenticated IdP operations.

use std::time::SystemTime;

use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_sigv4::http_request::{SignableBody, SignableRequest, SigningSettings, sign};
use aws_sigv4::sign::v4;

use crate::error::{ClientError, ClientResult};

/// Service name the IdP's signatures are scoped to.
const SIGNING_NAME: &str = "cognito-idp";

/// Signs requests with credentials from an AWS credentials provider.
#[derive(Clone)]
pub struct RequestSigner {
    credentials: SharedCredentialsProvider,
    region: String,
}

impl RequestSigner {
    #[must_use]
    pub fn new(credentials: SharedCredentialsProvider, region: impl Into<String>) -> Self {
        Self { credentials, region: region.into() }
    }

    /// Load credentials from the default AWS provider chain.
    ///
    /// # Errors
    ///
    /// Returns error if the chain yields no credentials provider.
    pub async fn from_default_chain(region: &str) -> anyhow::Result<Self> {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest()).load().await;
        let credentials = sdk_config
            .credentials_provider()
            .ok_or_else(|| anyhow::anyhow!("no AWS credentials provider configured"))?;

        Ok(Self::new(credentials, region))
    }

    /// Compute the signature headers for one POST.
    pub(super) async fn sign_post(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> ClientResult<Vec<(String, String)>> {
        let identity = self
            .credentials
            .provide_credentials()
            .await
            .map_err(|e| ClientError::Signing(e.to_string()))?
            .into();

        let params = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.region)
            .name(SIGNING_NAME)
            .time(SystemTime::now())
            .settings(SigningSettings::default())
            .build()
            .map_err(|e| ClientError::Signing(e.to_string()))?
            .into();

        let signable = SignableRequest::new(
            "POST",
            url,
            headers.iter().copied(),
            SignableBody::Bytes(body),
        )
        .map_err(|e| ClientError::Signing(e.to_string()))?;

        let (instructions, _signature) = sign(signable, &params)
            .map_err(|e| ClientError::Signing(e.to_string()))?
            .into_parts();

        Ok(instructions
            .headers()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect())
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner").field("region", &self.region).finish_non_exhaustive()
    }
}
