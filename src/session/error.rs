use crate::providers::ProviderError;

/// Failures surfaced to callers of [`SessionManager::sign_in`](super::SessionManager::sign_in).
///
/// None of these leave the session in `Loading`; see the manager for the
/// resulting state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("email and password must not be empty")]
    EmptyCredentials,
    #[error("invalid credentials: {0}")]
    CredentialsInvalid(String),
    #[error("identity provider unreachable: {0}")]
    ProviderUnreachable(String),
    #[error("identity provider error: {0}")]
    ProviderUnknown(String),
    #[error("could not persist session: {0}")]
    StoreUnavailable(String),
    #[error("session is misconfigured: {0}")]
    Misconfigured(String),
    #[error("session operation did not complete: {0}")]
    Interrupted(String),
}

impl From<ProviderError> for SessionError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidCredentials(m) => SessionError::CredentialsInvalid(m),
            ProviderError::Unreachable(m) => SessionError::ProviderUnreachable(m),
            ProviderError::Unknown(m) => SessionError::ProviderUnknown(m),
        }
    }
}
