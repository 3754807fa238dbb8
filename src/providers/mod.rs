pub mod accept_any_provider;
pub mod http_provider;
pub mod plain_provider;
pub mod providers;

// Re-export from providers.rs so we can do "use crate::providers::*;"
pub use providers::*;
