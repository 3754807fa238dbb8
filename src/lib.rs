//! Library exports for authsession, shared between the binary and tests.
//!
//! The crate keeps track of who is signed in: [`session::SessionManager`]
//! owns the state machine, [`store`] persists it across restarts and
//! [`providers`] verify credentials.

pub mod config;
pub mod models;
pub mod providers;
pub mod session;
pub mod startup;
pub mod store;
pub mod utils;
