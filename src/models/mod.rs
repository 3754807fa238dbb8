pub mod identity;
pub mod record;
pub mod session_state;

pub use identity::{Credentials, Identity};
pub use record::{PersistedRecord, RecordError};
pub use session_state::SessionState;
