//! Core module - configuration, shared state, server and errors
//!
//! - [`Config`] - environment driven configuration
//! - [`ServerState`] - handles shared by every connection
//! - [`Server`] - control server accept loop
//! - [`BridgeError`] - setup and serving errors

pub mod config;
pub mod error;
pub mod server;
pub mod state;

pub use config::Config;
pub use error::{BridgeError, Result};
pub use server::Server;
pub use state::ServerState;
