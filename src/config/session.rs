use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Longest TTL accepted from configuration (100 years).
pub const MAX_TTL_IN_SECS: i64 = 100 * 365 * 24 * 60 * 60;

/// Session lifetime policy.
#[derive(Deserialize, Serialize, Debug, JsonSchema, Clone, Default, PartialEq, Eq)]
pub struct SessionConfig {
    /// Seconds a sign-in stays valid across restarts. Unset means sessions
    /// only end on sign-out.
    #[serde(default)]
    pub ttl_in_secs: Option<i64>,
}

impl SessionConfig {
    /// Reject TTLs that are not positive or that are too large to stamp
    /// onto a record.
    pub fn validate(&self) -> Result<(), String> {
        match self.ttl_in_secs {
            Some(ttl) if ttl <= 0 => Err(format!(
                "session.ttl_in_secs must be positive, got {}",
                ttl
            )),
            Some(ttl) if ttl > MAX_TTL_IN_SECS => Err(format!(
                "session.ttl_in_secs must be at most {}, got {}",
                MAX_TTL_IN_SECS, ttl
            )),
            _ => Ok(()),
        }
    }
}
