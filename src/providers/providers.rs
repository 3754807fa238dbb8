use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    accept_any_provider::{AcceptAnyProvider, AcceptAnyProviderConfig},
    http_provider::{HttpProvider, HttpProviderConfig},
    plain_provider::{PlainProvider, PlainProviderConfig},
};
use crate::models::{Credentials, Identity};

/// Configuration options for the identity provider.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone)]
#[serde(tag = "type")]
pub enum ProviderConfig {
    #[serde(rename = "accept-any")]
    AcceptAny(AcceptAnyProviderConfig),
    #[serde(rename = "http")]
    Http(HttpProviderConfig),
    #[serde(rename = "plain")]
    Plain(PlainProviderConfig),
}

/// Why an identity provider refused to produce an identity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
    #[error("identity provider unreachable: {0}")]
    Unreachable(String),
    #[error("identity provider error: {0}")]
    Unknown(String),
}

impl ProviderError {
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::InvalidCredentials(_) => "InvalidCredentials",
            ProviderError::Unreachable(_) => "Unreachable",
            ProviderError::Unknown(_) => "Unknown",
        }
    }

    /// The provider's own explanation, without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            ProviderError::InvalidCredentials(m)
            | ProviderError::Unreachable(m)
            | ProviderError::Unknown(m) => m,
        }
    }
}

/// An identity provider verifies credentials and returns the matching identity.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    fn get_name(&self) -> &str;
    fn get_type(&self) -> &str;
    async fn authenticate(&self, credentials: &Credentials) -> Result<Identity, ProviderError>;
}

/// Create an identity provider from a given config.
pub fn create_identity_provider(
    config: &ProviderConfig,
) -> Result<Arc<dyn IdentityProvider>, String> {
    let provider: Arc<dyn IdentityProvider> = match config {
        ProviderConfig::AcceptAny(cfg) => Arc::new(AcceptAnyProvider::new(cfg)),
        ProviderConfig::Http(cfg) => Arc::new(HttpProvider::new(cfg)?),
        ProviderConfig::Plain(cfg) => Arc::new(PlainProvider::new(cfg)),
    };
    info!(
        "Created identity provider '{}' of type '{}'",
        provider.get_name(),
        provider.get_type()
    );
    Ok(provider)
}
