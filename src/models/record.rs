//! The on-disk form of a session.
//!
//! Current records are a self-describing envelope:
//!
//! ```json
//! { "schema": "authsession/record", "version": 2,
//!   "identity": { "id": "1", "email": "a@b.com", "name": "Ada" },
//!   "issued_at": 1700000000, "expires_at": 1700604800 }
//! ```
//!
//! Records written before the envelope existed are a bare identity object
//! (`{ "id": "1", "email": "a@b.com" }`) and are read as version 1.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::identity::Identity;

pub const RECORD_SCHEMA: &str = "authsession/record";
pub const RECORD_VERSION: u64 = 2;
const LEGACY_VERSION: u64 = 1;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PersistedRecord {
    pub schema: String,
    pub version: u64,
    pub identity: Identity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

/// Why a stored record was rejected. Every variant leads to the record being
/// discarded; none of them is surfaced to callers of the session manager.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("record is malformed: {0}")]
    Malformed(String),
    #[error("record is missing required field '{0}'")]
    MissingField(&'static str),
    #[error("record schema '{0}' is not recognised")]
    UnknownSchema(String),
    #[error("record version {0} is not supported")]
    UnsupportedVersion(u64),
    #[error("record expired at {0}")]
    Expired(i64),
}

impl RecordError {
    /// Coarse classification used in log events.
    pub fn reason(&self) -> &'static str {
        match self {
            RecordError::Malformed(_) | RecordError::MissingField(_) => "corrupt",
            RecordError::UnknownSchema(_) | RecordError::UnsupportedVersion(_) => "stale",
            RecordError::Expired(_) => "expired",
        }
    }
}

impl PersistedRecord {
    /// Build a current-version record. `ttl_in_secs` sets `expires_at`
    /// relative to `issued_at`; it must be positive and the sum must fit in
    /// an `i64`.
    pub fn new(
        identity: Identity,
        issued_at: i64,
        ttl_in_secs: Option<i64>,
    ) -> Result<Self, String> {
        let expires_at = match ttl_in_secs {
            None => None,
            Some(ttl) if ttl <= 0 => {
                return Err(format!("Session TTL must be positive, got {}", ttl));
            }
            Some(ttl) => Some(issued_at.checked_add(ttl).ok_or_else(|| {
                format!(
                    "Session TTL of {} seconds overflows the expiry timestamp",
                    ttl
                )
            })?),
        };
        Ok(PersistedRecord {
            schema: RECORD_SCHEMA.to_string(),
            version: RECORD_VERSION,
            identity,
            issued_at: Some(issued_at),
            expires_at,
        })
    }

    pub fn encode(&self) -> Result<String, String> {
        serde_json::to_string(self).map_err(|e| format!("Failed to encode session record: {}", e))
    }

    /// Decode stored bytes. Anything that is not UTF-8 is malformed.
    pub fn decode_bytes(raw: &[u8], now: i64) -> Result<PersistedRecord, RecordError> {
        let text = std::str::from_utf8(raw)
            .map_err(|e| RecordError::Malformed(format!("record is not valid UTF-8: {}", e)))?;
        Self::decode(text, now)
    }

    /// Decode a stored record, rejecting anything corrupt, from an unknown
    /// schema or version, or already expired at `now` (unix seconds).
    pub fn decode(raw: &str, now: i64) -> Result<PersistedRecord, RecordError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| RecordError::Malformed(e.to_string()))?;
        let object = value
            .as_object()
            .ok_or_else(|| RecordError::Malformed("expected a JSON object".to_string()))?;

        let record = match object.get("version") {
            None => Self::from_legacy(object)?,
            Some(version) => {
                let version = version.as_u64().ok_or_else(|| {
                    RecordError::Malformed("version is not an unsigned integer".to_string())
                })?;
                match version {
                    LEGACY_VERSION => Self::from_legacy(object)?,
                    RECORD_VERSION => Self::from_envelope(object)?,
                    other => return Err(RecordError::UnsupportedVersion(other)),
                }
            }
        };

        if let Some(expires_at) = record.expires_at {
            if expires_at <= now {
                return Err(RecordError::Expired(expires_at));
            }
        }
        Ok(record)
    }

    fn from_legacy(object: &Map<String, Value>) -> Result<PersistedRecord, RecordError> {
        Ok(PersistedRecord {
            schema: RECORD_SCHEMA.to_string(),
            version: LEGACY_VERSION,
            identity: identity_from(object)?,
            issued_at: None,
            expires_at: None,
        })
    }

    fn from_envelope(object: &Map<String, Value>) -> Result<PersistedRecord, RecordError> {
        let schema = object
            .get("schema")
            .and_then(Value::as_str)
            .ok_or(RecordError::MissingField("schema"))?;
        if schema != RECORD_SCHEMA {
            return Err(RecordError::UnknownSchema(schema.to_string()));
        }
        let identity = object
            .get("identity")
            .and_then(Value::as_object)
            .ok_or(RecordError::MissingField("identity"))?;

        Ok(PersistedRecord {
            schema: schema.to_string(),
            version: RECORD_VERSION,
            identity: identity_from(identity)?,
            issued_at: optional_i64(object, "issued_at")?,
            expires_at: optional_i64(object, "expires_at")?,
        })
    }
}

fn identity_from(object: &Map<String, Value>) -> Result<Identity, RecordError> {
    let id = required_str(object, "id")?;
    let email = required_str(object, "email")?;
    let display_name = match object.get("name") {
        None | Some(Value::Null) => None,
        Some(Value::String(name)) => Some(name.clone()),
        Some(_) => return Err(RecordError::Malformed("name is not a string".to_string())),
    };
    Ok(Identity::new(id, email, display_name))
}

fn required_str(object: &Map<String, Value>, field: &'static str) -> Result<String, RecordError> {
    match object.get(field).and_then(Value::as_str) {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(RecordError::MissingField(field)),
    }
}

fn optional_i64(object: &Map<String, Value>, field: &str) -> Result<Option<i64>, RecordError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| RecordError::Malformed(format!("{} is not an integer", field))),
    }
}
