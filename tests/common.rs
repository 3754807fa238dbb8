#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use authsession::config::SessionConfig;
use authsession::models::{Credentials, Identity, SessionState};
use authsession::providers::{IdentityProvider, ProviderError};
use authsession::session::SessionManager;
use authsession::store::{KeyValueStore, MemoryStore, SessionStore};
use tokio::sync::Semaphore;

pub const NAMESPACE: &str = "test";
pub const KEY: &str = "auth_user";
pub const SCOPED_KEY: &str = "test.auth_user";

/// Memory-backed store that counts traffic and can be told to fail or stall.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
    pub removes: AtomicUsize,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub read_delay: Mutex<Option<Duration>>,
}

impl CountingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn seed(&self, raw: &str) {
        self.seed_bytes(raw.as_bytes()).await;
    }

    pub async fn seed_bytes(&self, raw: &[u8]) {
        self.inner.set(SCOPED_KEY, raw).await.unwrap();
    }

    /// The stored record as text; panics if it is not UTF-8.
    pub async fn raw(&self) -> Option<String> {
        self.inner
            .get(SCOPED_KEY)
            .await
            .unwrap()
            .map(|bytes| String::from_utf8(bytes).unwrap())
    }

    pub async fn raw_bytes(&self) -> Option<Vec<u8>> {
        self.inner.get(SCOPED_KEY).await.unwrap()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, String> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let delay = *self.read_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err("disk unavailable".to_string());
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), String> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err("disk full".to_string());
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), String> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(key).await
    }

    fn get_name(&self) -> &str {
        "counting"
    }
}

/// Accepts any non-empty password except the magic ones below, and can hold
/// every answer until the test releases it.
///
/// - `wrong` -> InvalidCredentials
/// - `offline` -> Unreachable
pub struct ScriptedProvider {
    pub calls: AtomicUsize,
    gate: Option<Semaphore>,
}

impl ScriptedProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            gate: None,
        })
    }

    /// Every `authenticate` waits for one `release()`.
    pub fn gated() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            gate: Some(Semaphore::new(0)),
        })
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }
}

#[async_trait]
impl IdentityProvider for ScriptedProvider {
    fn get_name(&self) -> &str {
        "scripted"
    }

    fn get_type(&self) -> &str {
        "test"
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<Identity, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        match credentials.password.as_str() {
            "wrong" => Err(ProviderError::InvalidCredentials(
                "Wrong email or password".to_string(),
            )),
            "offline" => Err(ProviderError::Unreachable("connection refused".to_string())),
            _ => Ok(Identity::new(
                format!("id-{}", credentials.email),
                &credentials.email,
                None,
            )),
        }
    }
}

pub fn build_manager(
    store: Arc<dyn KeyValueStore>,
    provider: Arc<dyn IdentityProvider>,
) -> SessionManager {
    SessionManager::new(
        SessionStore::new(store, NAMESPACE, KEY),
        provider,
        SessionConfig::default(),
    )
}

/// Records every state a subscriber is handed.
pub fn record_notifications(manager: &SessionManager) -> Arc<Mutex<Vec<SessionState>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let _subscription = manager.subscribe(move |state| sink.lock().unwrap().push(state.clone()));
    seen
}

/// Poll until `predicate` holds for the current state, or panic after 2s.
pub async fn wait_for<F>(manager: &SessionManager, predicate: F) -> SessionState
where
    F: Fn(&SessionState) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let state = manager.current_state();
            if predicate(&state) {
                return state;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("state did not settle in time")
}
