// This module re-exports important pieces for convenience,
// so we can "use crate::config::*" easily.
pub mod config;
pub mod logging;
pub mod session;
pub mod store;

pub use config::*;
pub use logging::*;
pub use session::*;
pub use store::*;
