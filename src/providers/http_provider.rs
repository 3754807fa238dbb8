use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::{Credentials, Identity};
use crate::providers::{IdentityProvider, ProviderError};

/// The config needed for a remote identity service exposing `POST {uri}/sign-in`.
#[derive(Deserialize, Serialize, Debug, JsonSchema, Clone)]
pub struct HttpProviderConfig {
    pub name: String,
    pub uri: String,
    /// Transport timeout for a single sign-in request.
    #[serde(default = "default_timeout_in_ms")]
    pub timeout_in_ms: u64,
}

fn default_timeout_in_ms() -> u64 {
    10_000
}

/// Failure body the identity service may return alongside a non-2xx status.
#[derive(Deserialize, Debug, Default)]
struct FailureBody {
    kind: Option<String>,
    message: Option<String>,
}

/// A provider that forwards credentials to a remote identity service.
pub struct HttpProvider {
    config: HttpProviderConfig,
    client: reqwest::Client,
}

impl HttpProvider {
    pub fn new(config: &HttpProviderConfig) -> Result<Self, String> {
        info!(
            "Creating HttpProvider '{}' for '{}'",
            config.name, config.uri
        );
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_in_ms))
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;
        Ok(Self {
            config: config.clone(),
            client,
        })
    }

    fn sign_in_url(&self) -> String {
        format!("{}/sign-in", self.config.uri.trim_end_matches('/'))
    }
}

#[async_trait]
impl IdentityProvider for HttpProvider {
    fn get_name(&self) -> &str {
        &self.config.name
    }

    fn get_type(&self) -> &str {
        "http"
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<Identity, ProviderError> {
        let url = self.sign_in_url();
        debug!("Sending sign-in request for '{}' to {}", credentials.email, url);

        let response = self
            .client
            .post(&url)
            .json(credentials)
            .send()
            .await
            .map_err(|e| ProviderError::Unreachable(format!("Error sending request: {}", e)))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ProviderError::Unreachable(format!("Error reading response body: {}", e))
        })?;

        if status.is_success() {
            let identity: Identity = serde_json::from_str(&body)
                .map_err(|e| ProviderError::Unknown(format!("Error parsing identity: {}", e)))?;
            if !identity.is_well_formed() {
                return Err(ProviderError::Unknown(
                    "Identity is missing 'id' or 'email'".to_string(),
                ));
            }
            return Ok(identity);
        }

        let failure: FailureBody = serde_json::from_str(&body).unwrap_or_default();
        let message = failure
            .message
            .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
            .unwrap_or_else(|| format!("Unexpected status code: {}", status));

        warn!(
            "Identity provider '{}' rejected sign-in with status {}",
            self.config.name, status
        );
        Err(match (status.as_u16(), failure.kind.as_deref()) {
            (401 | 403, _) | (_, Some("InvalidCredentials")) => {
                ProviderError::InvalidCredentials(message)
            }
            (_, Some("Unreachable")) => ProviderError::Unreachable(message),
            _ => ProviderError::Unknown(message),
        })
    }
}
