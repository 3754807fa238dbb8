pub mod error;
pub mod manager;
pub mod subscribers;

pub use error::SessionError;
pub use manager::SessionManager;
pub use subscribers::Subscription;
