#![forbid(unsafe_code)]

//! Game-session bridge: launches, observes, and drives one game session on
//! behalf of a tool-protocol client.

pub mod config;
pub mod errors;
pub mod host;
pub mod logs;
pub mod mcp;
pub mod models;
pub mod rpc;
pub mod session;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
