use serde::{Deserialize, Serialize};

/// The authenticated principal, as issued by an identity provider.
///
/// An `Identity` is a snapshot: session transitions replace it with a new
/// value, nothing mutates it in place.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Opaque identifier, stable for the lifetime of the principal.
    pub id: String,
    /// Contact address; unique as far as the provider guarantees.
    pub email: String,
    /// Optional human-readable name, stored as `name`.
    #[serde(rename = "name", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Identity {
    pub fn new(id: impl Into<String>, email: impl Into<String>, display_name: Option<String>) -> Self {
        Identity {
            id: id.into(),
            email: email.into(),
            display_name,
        }
    }

    /// Both `id` and `email` are required and must be non-empty.
    pub fn is_well_formed(&self) -> bool {
        !self.id.is_empty() && !self.email.is_empty()
    }

    /// What a UI should show for this principal.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }
}

/// Email/password pair handed to an identity provider.
///
/// `Debug` is implemented by hand so passwords never end up in logs.
#[derive(Serialize, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}
