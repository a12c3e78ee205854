//! # Core Module
//!
//! Shared configuration for the content pipeline and re-exports of the
//! lower-level modules other subsystems depend on.
//!
//! ## Organization
//!
//! - **Config**: Content root, hot-reload switch and polling interval
//! - **Foundation**: Low-level utilities (time, logging, math)
//! - **Content**: Loading, caching and hot swapping

pub mod config;

// Re-export foundation modules for convenience
pub use crate::foundation;
pub use crate::content;

// Re-export commonly used config types
pub use config::{ContentConfig, MIN_POLL_INTERVAL_MS};
pub use crate::config::{Config, ConfigError};
