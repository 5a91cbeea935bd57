// ABOUTME: Library root for orgdeploy - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod components;
pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod formatter;
pub mod hooks;
pub mod output;
pub mod progress;
pub mod tracking;
pub mod transport;
pub mod types;
