//! The session state machine.
//!
//! ```text
//! Uninitialized --initialize--> Loading --> Authenticated | Unauthenticated
//! Unauthenticated --sign_in ok--> Authenticated
//! Authenticated   --sign_in ok--> Authenticated (identity replaced)
//! *               --sign_in err--> Unauthenticated
//! *               --sign_out-->    Unauthenticated
//! ```
//!
//! Mutating operations are serialized by one async mutex that also holds the
//! last state published to subscribers. They run on spawned tasks, so a
//! caller that stops awaiting does not cancel them. A panic inside an
//! operation (from a provider or store) is caught and the session is settled
//! `Unauthenticated` rather than left `Loading`.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, error, info, warn};

use super::error::SessionError;
use super::subscribers::{Subscribers, Subscription};
use crate::config::SessionConfig;
use crate::models::{Credentials, Identity, PersistedRecord, SessionState};
use crate::providers::IdentityProvider;
use crate::store::SessionStore;

/// Single authority for the current [`SessionState`] and sole writer of the
/// persisted session.
///
/// Cloning is cheap and every clone drives the same session, so one instance
/// created at startup can be handed to every consumer.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

struct Inner {
    store: SessionStore,
    provider: Arc<dyn IdentityProvider>,
    config: SessionConfig,
    state: RwLock<SessionState>,
    /// Serializes transitions; holds the last state subscribers were told about.
    transitions: Mutex<SessionState>,
    initialized: OnceCell<()>,
    subscribers: Arc<Subscribers>,
}

impl SessionManager {
    pub fn new(
        store: SessionStore,
        provider: Arc<dyn IdentityProvider>,
        config: SessionConfig,
    ) -> Self {
        SessionManager {
            inner: Arc::new(Inner {
                store,
                provider,
                config,
                state: RwLock::new(SessionState::Uninitialized),
                transitions: Mutex::new(SessionState::Uninitialized),
                initialized: OnceCell::new(),
                subscribers: Arc::new(Subscribers::default()),
            }),
        }
    }

    /// Load the persisted session, once.
    ///
    /// Concurrent and repeated calls share the first call's outcome. A
    /// corrupt, stale or expired record is removed and the session starts
    /// signed out; this never fails.
    pub async fn initialize(&self) -> SessionState {
        let outcome = self
            .run("initialize", |inner| async move { inner.ensure_initialized().await })
            .await;
        if let Err(e) = outcome {
            error!("Session initialization did not complete: {}", e);
        }
        self.current_state()
    }

    /// Verify credentials with the identity provider and persist the result.
    ///
    /// On failure the session ends `Unauthenticated` and the store is not
    /// touched. Empty credentials are rejected before anything changes.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, SessionError> {
        if email.is_empty() || password.is_empty() {
            return Err(SessionError::EmptyCredentials);
        }
        let credentials = Credentials::new(email, password);
        self.run("sign-in", move |inner| async move { inner.sign_in(credentials).await })
            .await?
    }

    /// Forget the current session locally. Always completes, whatever the
    /// prior state.
    pub async fn sign_out(&self) {
        let outcome = self
            .run("sign-out", |inner| async move { inner.sign_out().await })
            .await;
        if let Err(e) = outcome {
            error!("Sign-out did not complete: {}", e);
        }
    }

    /// Snapshot of the current state. Never waits on an in-flight operation.
    pub fn current_state(&self) -> SessionState {
        self.inner.current_state()
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.current_state().identity().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_state().is_authenticated()
    }

    /// Register `callback` for every change of the settled session state.
    ///
    /// The current state is not replayed; read [`current_state`](Self::current_state)
    /// alongside registering if it is needed. `Loading` is never delivered.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        self.inner.subscribers.register(Arc::new(callback))
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    pub fn store(&self) -> &SessionStore {
        &self.inner.store
    }

    /// Drive `operation` to completion on its own task. A panic is logged,
    /// the session recovers out of `Loading`, and the caller gets
    /// `Interrupted`.
    async fn run<T, F, Fut>(&self, name: &'static str, operation: F) -> Result<T, SessionError>
    where
        F: FnOnce(Arc<Inner>) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = self.inner.clone();
        let operation = operation(inner.clone());
        tokio::spawn(async move {
            match AssertUnwindSafe(operation).catch_unwind().await {
                Ok(value) => Ok(value),
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!(
                        event_name = "session.operation.panicked",
                        event_domain = "session",
                        operation = name,
                        "Session {} panicked: {}",
                        name,
                        message
                    );
                    inner.recover().await;
                    Err(SessionError::Interrupted(format!("{} panicked: {}", name, message)))
                }
            }
        })
        .await
        .map_err(|e| SessionError::Interrupted(e.to_string()))?
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.current_state())
            .field("store_key", &self.inner.store.key())
            .field("provider", &self.inner.provider.get_name())
            .field("subscribers", &self.inner.subscribers.len())
            .finish()
    }
}

impl Inner {
    fn current_state(&self) -> SessionState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_state(&self, next: SessionState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Make `next` the current state and tell subscribers if the settled
    /// state changed. Callers hold the `transitions` lock.
    fn settle(&self, published: &mut SessionState, next: SessionState) {
        self.set_state(next.clone());
        if *published == next {
            debug!("Session state unchanged ({})", next.kind());
            return;
        }
        info!(
            event_name = "session.transition",
            event_domain = "session",
            from = published.kind(),
            to = next.kind(),
            "session {}",
            next
        );
        *published = next.clone();
        self.subscribers.notify(&next);
    }

    async fn ensure_initialized(&self) {
        self.initialized
            .get_or_init(|| async {
                let mut published = self.transitions.lock().await;
                self.load(&mut published).await;
            })
            .await;
    }

    async fn load(&self, published: &mut SessionState) {
        self.set_state(SessionState::Loading);

        let next = match self.store.read().await {
            Ok(None) => {
                debug!("No persisted session under '{}'", self.store.key());
                SessionState::Unauthenticated
            }
            Err(e) => {
                warn!("Could not read persisted session, starting signed out: {}", e);
                SessionState::Unauthenticated
            }
            Ok(Some(raw)) => match PersistedRecord::decode_bytes(&raw, Utc::now().timestamp()) {
                Ok(record) => {
                    debug!(
                        "Restored session record version {} for '{}'",
                        record.version, record.identity.email
                    );
                    SessionState::Authenticated(record.identity)
                }
                Err(e) => {
                    warn!(
                        event_name = "session.record.discarded",
                        event_domain = "session",
                        reason = e.reason(),
                        "Discarding persisted session: {}",
                        e
                    );
                    if let Err(e) = self.store.clear().await {
                        warn!("Failed to remove discarded session record: {}", e);
                    }
                    SessionState::Unauthenticated
                }
            },
        };

        self.settle(published, next);
    }

    async fn sign_in(&self, credentials: Credentials) -> Result<Identity, SessionError> {
        self.ensure_initialized().await;
        let mut published = self.transitions.lock().await;
        self.set_state(SessionState::Loading);

        info!(
            "Signing in '{}' with provider '{}'",
            credentials.email,
            self.provider.get_name()
        );
        let identity = match self.provider.authenticate(&credentials).await {
            Ok(identity) if identity.is_well_formed() => identity,
            Ok(_) => {
                warn!(
                    "Provider '{}' returned an identity without id or email",
                    self.provider.get_name()
                );
                self.settle(&mut published, SessionState::Unauthenticated);
                return Err(SessionError::ProviderUnknown(
                    "Identity is missing 'id' or 'email'".to_string(),
                ));
            }
            Err(e) => {
                warn!(
                    event_name = "session.sign_in.failed",
                    event_domain = "session",
                    provider_name = self.provider.get_name(),
                    failure_kind = e.kind(),
                    "Sign-in failed for '{}': {}",
                    credentials.email,
                    e
                );
                self.settle(&mut published, SessionState::Unauthenticated);
                return Err(e.into());
            }
        };

        let record = match PersistedRecord::new(
            identity.clone(),
            Utc::now().timestamp(),
            self.config.ttl_in_secs,
        ) {
            Ok(record) => record,
            Err(e) => {
                error!("Cannot build session record for '{}': {}", identity.email, e);
                self.abandon(&mut published).await;
                return Err(SessionError::Misconfigured(e));
            }
        };
        if let Err(e) = self.store.write(&record).await {
            error!("Failed to persist session for '{}': {}", identity.email, e);
            self.abandon(&mut published).await;
            return Err(SessionError::StoreUnavailable(e));
        }

        self.settle(&mut published, SessionState::Authenticated(identity.clone()));
        Ok(identity)
    }

    /// End a sign-in that verified but could not be persisted. Any earlier
    /// record is removed so a restart cannot restore the previous identity.
    async fn abandon(&self, published: &mut SessionState) {
        if let Err(e) = self.store.clear().await {
            warn!("Failed to clear previous session record: {}", e);
        }
        self.settle(published, SessionState::Unauthenticated);
    }

    /// Settle a session left `Loading` by an operation that panicked.
    async fn recover(&self) {
        let mut published = self.transitions.lock().await;
        if self.current_state().is_loading() {
            warn!("Recovering interrupted session operation; session is now signed out");
            self.settle(&mut published, SessionState::Unauthenticated);
        }
    }

    async fn sign_out(&self) {
        self.ensure_initialized().await;
        let mut published = self.transitions.lock().await;
        if let Err(e) = self.store.clear().await {
            warn!("Failed to clear persisted session on sign-out: {}", e);
        }
        self.settle(&mut published, SessionState::Unauthenticated);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderError;
    use crate::store::{KeyValueStore, MemoryStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider that accepts a single password and counts calls.
    struct FixedProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl IdentityProvider for FixedProvider {
        fn get_name(&self) -> &str {
            "fixed"
        }

        fn get_type(&self) -> &str {
            "test"
        }

        async fn authenticate(
            &self,
            credentials: &Credentials,
        ) -> Result<Identity, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match credentials.password.as_str() {
                "secret" => Ok(Identity::new("1", &credentials.email, None)),
                "blank" => Ok(Identity::new("", &credentials.email, None)),
                "boom" => panic!("provider exploded"),
                _ => Err(ProviderError::InvalidCredentials("wrong password".into())),
            }
        }
    }

    fn manager() -> (SessionManager, Arc<MemoryStore>, Arc<FixedProvider>) {
        let backend = Arc::new(MemoryStore::new());
        let provider = Arc::new(FixedProvider {
            calls: AtomicUsize::new(0),
        });
        let store = SessionStore::new(backend.clone(), "test", "auth_user");
        let manager = SessionManager::new(store, provider.clone(), SessionConfig::default());
        (manager, backend, provider)
    }

    #[tokio::test]
    async fn test_starts_uninitialized() {
        let (manager, _, _) = manager();
        assert_eq!(manager.current_state(), SessionState::Uninitialized);
    }

    #[tokio::test]
    async fn test_empty_credentials_skip_provider() {
        let (manager, _, provider) = manager();
        manager.initialize().await;

        assert_eq!(
            manager.sign_in("", "secret").await,
            Err(SessionError::EmptyCredentials)
        );
        assert_eq!(
            manager.sign_in("a@b.com", "").await,
            Err(SessionError::EmptyCredentials)
        );
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(manager.current_state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_sign_in_before_initialize_initializes_first() {
        let (manager, backend, _) = manager();
        backend
            .set("test.auth_user", br#"{"id":"9","email":"old@b.com"}"#)
            .await
            .unwrap();

        let identity = manager.sign_in("a@b.com", "secret").await.unwrap();
        assert_eq!(manager.current_state(), SessionState::Authenticated(identity));

        // A later initialize must not resurrect the older record.
        let state = manager.initialize().await;
        assert_eq!(state.identity().map(|i| i.email.as_str()), Some("a@b.com"));
    }

    #[tokio::test]
    async fn test_identity_without_id_is_rejected() {
        let (manager, backend, _) = manager();
        manager.initialize().await;

        let err = manager.sign_in("a@b.com", "blank").await.unwrap_err();
        assert!(matches!(err, SessionError::ProviderUnknown(_)));
        assert_eq!(manager.current_state(), SessionState::Unauthenticated);
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_ttl_sets_expiry_on_written_record() {
        let backend = Arc::new(MemoryStore::new());
        let provider = Arc::new(FixedProvider {
            calls: AtomicUsize::new(0),
        });
        let manager = SessionManager::new(
            SessionStore::new(backend.clone(), "test", "auth_user"),
            provider,
            SessionConfig {
                ttl_in_secs: Some(60),
            },
        );
        manager.sign_in("a@b.com", "secret").await.unwrap();

        let raw = backend.get("test.auth_user").await.unwrap().unwrap();
        let record: PersistedRecord = serde_json::from_slice(&raw).unwrap();
        assert_eq!(record.expires_at, record.issued_at.map(|t| t + 60));
    }

    #[tokio::test]
    async fn test_overflowing_ttl_fails_sign_in_without_panicking() {
        let backend = Arc::new(MemoryStore::new());
        let provider = Arc::new(FixedProvider {
            calls: AtomicUsize::new(0),
        });
        let manager = SessionManager::new(
            SessionStore::new(backend.clone(), "test", "auth_user"),
            provider,
            SessionConfig {
                ttl_in_secs: Some(i64::MAX),
            },
        );
        manager.initialize().await;

        let err = manager.sign_in("a@b.com", "secret").await.unwrap_err();
        assert!(matches!(err, SessionError::Misconfigured(_)));
        assert_eq!(manager.current_state(), SessionState::Unauthenticated);
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_negative_ttl_does_not_write_an_expired_record() {
        let backend = Arc::new(MemoryStore::new());
        let provider = Arc::new(FixedProvider {
            calls: AtomicUsize::new(0),
        });
        let manager = SessionManager::new(
            SessionStore::new(backend.clone(), "test", "auth_user"),
            provider,
            SessionConfig {
                ttl_in_secs: Some(-60),
            },
        );

        let err = manager.sign_in("a@b.com", "secret").await.unwrap_err();
        assert!(matches!(err, SessionError::Misconfigured(_)));
        assert!(!manager.is_authenticated());
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_panicking_provider_does_not_leave_loading() {
        let (manager, backend, _) = manager();
        manager.initialize().await;

        let err = manager.sign_in("a@b.com", "boom").await.unwrap_err();
        assert!(matches!(err, SessionError::Interrupted(ref m) if m.contains("provider exploded")));
        assert_eq!(manager.current_state(), SessionState::Unauthenticated);
        assert!(backend.is_empty().await);

        // The transition lock was released, so later operations still run.
        let identity = manager.sign_in("a@b.com", "secret").await.unwrap();
        assert_eq!(manager.current_state(), SessionState::Authenticated(identity));
    }

    #[tokio::test]
    async fn test_panic_after_sign_in_notifies_once() {
        let (manager, _, _) = manager();
        manager.initialize().await;
        manager.sign_in("a@b.com", "secret").await.unwrap();

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _subscription = manager.subscribe(move |state| {
            sink.lock().unwrap().push(state.clone());
        });

        assert!(manager.sign_in("a@b.com", "boom").await.is_err());
        assert_eq!(
            *seen.lock().unwrap(),
            vec![SessionState::Unauthenticated]
        );
    }

    #[test]
    fn test_panic_message_reads_common_payloads() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&"owned".to_string()), "owned");
        assert_eq!(panic_message(&42_u8), "unknown panic payload");
    }

    #[tokio::test]
    async fn test_debug_does_not_block() {
        let (manager, _, _) = manager();
        let printed = format!("{:?}", manager);
        assert!(printed.contains("test.auth_user"));
        assert!(printed.contains("Uninitialized"));
    }
}
