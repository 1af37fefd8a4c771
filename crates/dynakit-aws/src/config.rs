//! Connection settings for the AWS adapters.

use std::env;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;

/// Where and as whom to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsConfig {
    /// AWS region.
    pub region: String,
    /// Endpoint override, e.g. a local DynamoDB-compatible server.
    pub endpoint_url: Option<String>,
    /// Static access key; the SDK default chain is used when unset.
    pub access_key: Option<String>,
    /// Static secret key, used together with `access_key`.
    pub secret_key: Option<String>,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_owned(),
            endpoint_url: None,
            access_key: None,
            secret_key: None,
        }
    }
}

impl AwsConfig {
    /// Create configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `AWS_REGION` / `DEFAULT_REGION` | `us-east-1` |
    /// | `DYNAKIT_ENDPOINT_URL` | unset |
    /// | `AWS_ACCESS_KEY_ID` | unset |
    /// | `AWS_SECRET_ACCESS_KEY` | unset |
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            region: env::var("AWS_REGION")
                .or_else(|_| env::var("DEFAULT_REGION"))
                .unwrap_or_else(|_| "us-east-1".to_owned()),
            endpoint_url: env::var("DYNAKIT_ENDPOINT_URL").ok(),
            access_key: env::var("AWS_ACCESS_KEY_ID").ok(),
            secret_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
        }
    }

    /// Point at a specific endpoint.
    #[must_use]
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// Use static credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    /// Load an SDK configuration from these settings.
    pub async fn load(&self) -> SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()));
        if let Some(endpoint_url) = &self.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }
        if let (Some(access_key), Some(secret_key)) = (&self.access_key, &self.secret_key) {
            loader = loader.credentials_provider(Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "dynakit",
            ));
        }
        loader.load().await
    }
}
