//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Math types used by material content
//! - Time sources for hot-reload polling
//! - Logging utilities

pub mod math;
pub mod time;
pub mod logging;
