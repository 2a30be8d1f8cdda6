//! Remedia HTTP Server Library
//!
//! Router, configuration and state wiring, exposed for tests and embedding.

pub mod api;
pub mod config;
pub mod error;
pub mod state;
