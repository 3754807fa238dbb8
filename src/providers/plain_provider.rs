use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{Credentials, Identity};
use crate::providers::{IdentityProvider, ProviderError};

/// PlainProviderConfig lists the accounts a local deployment accepts.
#[derive(Deserialize, Serialize, Debug, JsonSchema, Clone)]
pub struct PlainProviderConfig {
    /// A friendly name for logs.
    pub name: String,
    pub users: Vec<PlainUserEntry>,
}

/// Represents a single account (identity + password).
#[derive(Deserialize, Serialize, Debug, JsonSchema, Clone)]
pub struct PlainUserEntry {
    pub id: String,
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

/// A `PlainProvider` compares credentials to the user list in `PlainProviderConfig`.
/// Emails match case-insensitively, passwords exactly.
pub struct PlainProvider {
    pub config: PlainProviderConfig,
}

impl PlainProvider {
    pub fn new(config: &PlainProviderConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

#[async_trait]
impl IdentityProvider for PlainProvider {
    fn get_name(&self) -> &str {
        &self.config.name
    }

    fn get_type(&self) -> &str {
        "plain"
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<Identity, ProviderError> {
        debug!("Plain sign-in attempt for '{}'", credentials.email);
        self.config
            .users
            .iter()
            .find(|entry| {
                entry.email.eq_ignore_ascii_case(&credentials.email)
                    && entry.password == credentials.password
            })
            .map(|entry| Identity::new(&entry.id, &entry.email, entry.name.clone()))
            .ok_or_else(|| {
                ProviderError::InvalidCredentials("Wrong email or password".to_string())
            })
    }
}
