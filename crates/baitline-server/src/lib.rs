//! Baitline Server
//!
//! Configuration and router assembly shared by the `baitline-server` binary
//! and the end-to-end tests.

pub mod app;
pub mod config;

pub use app::{StoreReadiness, build_app};
pub use config::{LogFormat, LoggingConfig, ServerConfig};
