//! Process startup.
//!
//! Builds the one `SessionManager` a process uses from configuration and
//! resolves the persisted session before anything reads it. The manager holds
//! no resources besides its store handle, so there is no matching teardown.

use tracing::info;

use crate::config::ConfigV1;
use crate::models::SessionState;
use crate::providers::create_identity_provider;
use crate::session::SessionManager;
use crate::store::{create_store, SessionStore};

/// Wire the configured store backend and identity provider into a manager.
///
/// # Errors
///
/// Returns an error if the session TTL is out of range, the store is enabled
/// without a backend, or the provider cannot be constructed.
pub fn build_session_manager(config: &ConfigV1) -> Result<SessionManager, String> {
    config.session.validate()?;
    let backend = create_store(&config.store)?;
    let store = SessionStore::from_config(backend, &config.store);
    let provider = create_identity_provider(&config.provider)?;
    Ok(SessionManager::new(store, provider, config.session.clone()))
}

/// Build the manager and run `initialize()` so the session is settled before
/// any consumer is handed the manager.
pub async fn run(config: &ConfigV1) -> Result<SessionManager, String> {
    let manager = build_session_manager(config)?;
    info!("Restoring session from '{}'", manager.store().key());
    match manager.initialize().await {
        SessionState::Authenticated(identity) => {
            info!("Resumed session for '{}'", identity.label())
        }
        other => info!("Starting {}", other),
    }
    Ok(manager)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LoggingConfig, SessionConfig, StoreConfig};
    use crate::providers::accept_any_provider::AcceptAnyProviderConfig;
    use crate::providers::ProviderConfig;

    fn config(store: StoreConfig) -> ConfigV1 {
        ConfigV1 {
            logging: LoggingConfig::default(),
            store,
            provider: ProviderConfig::AcceptAny(AcceptAnyProviderConfig {
                name: "dev".to_string(),
                latency_in_ms: 0,
            }),
            session: SessionConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_run_settles_session() {
        let manager = run(&config(StoreConfig::default())).await.unwrap();
        assert_eq!(manager.current_state(), SessionState::Unauthenticated);
        assert_eq!(manager.store().key(), "authsession.auth_user");
    }

    #[test]
    fn test_enabled_store_without_backend_fails() {
        let store = StoreConfig {
            backend: None,
            ..StoreConfig::default()
        };
        assert!(build_session_manager(&config(store)).is_err());
    }

    #[test]
    fn test_out_of_range_ttl_fails() {
        let mut config = config(StoreConfig::default());
        config.session.ttl_in_secs = Some(i64::MAX);
        assert!(build_session_manager(&config).is_err());
    }
}
