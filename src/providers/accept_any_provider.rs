use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::{Credentials, Identity};
use crate::providers::{IdentityProvider, ProviderError};

/// Development stand-in for a real identity service.
#[derive(Deserialize, Serialize, Debug, JsonSchema, Clone)]
pub struct AcceptAnyProviderConfig {
    pub name: String,
    /// Artificial delay before answering, to exercise loading states.
    #[serde(default)]
    pub latency_in_ms: u64,
}

/// Accepts any email with a non-empty password and mints a fresh id for it.
/// Never use this in front of real data.
pub struct AcceptAnyProvider {
    config: AcceptAnyProviderConfig,
}

impl AcceptAnyProvider {
    pub fn new(config: &AcceptAnyProviderConfig) -> Self {
        info!(
            "Creating AcceptAnyProvider '{}'; every non-empty password will be accepted",
            config.name
        );
        Self {
            config: config.clone(),
        }
    }
}

#[async_trait]
impl IdentityProvider for AcceptAnyProvider {
    fn get_name(&self) -> &str {
        &self.config.name
    }

    fn get_type(&self) -> &str {
        "accept-any"
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<Identity, ProviderError> {
        if self.config.latency_in_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.latency_in_ms)).await;
        }
        if credentials.password.is_empty() {
            return Err(ProviderError::InvalidCredentials(
                "Password must not be empty".to_string(),
            ));
        }

        let id = uuid::Uuid::new_v4().to_string();
        debug!("Accepted '{}' as id '{}'", credentials.email, id);
        Ok(Identity::new(id, &credentials.email, None))
    }
}
