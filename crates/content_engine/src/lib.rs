//! # Content Engine
//!
//! Hot-swapping content management for real-time rendering applications.
//!
//! ## Features
//!
//! - **Typed Loading**: `load::<T>(path)` with pluggable readers per content type
//! - **Caching**: One live object per (type, case-insensitive path)
//! - **Dependency Tracking**: Nested loads are recorded per object
//! - **Hot Reloading**: Polled modification times, in-place swaps that keep identity
//! - **Bulk Disposal**: Native resources released once on unload
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use content_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     content_engine::foundation::logging::init();
//!
//!     let config = ContentConfig::load_from_file("content.toml").unwrap_or_default();
//!     let mut content = ContentManager::from_config(&config)?;
//!
//!     let shader = content.load::<ShaderSource>("shaders/lit.frag")?;
//!     loop {
//!         // Edits to lit.frag or anything it includes land in `shader`
//!         content.update_content();
//!         println!("{} bytes of shader code", shader.borrow().code.len());
//!         # break;
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod core;

pub mod config;
pub mod content;
pub mod foundation;

/// Common imports for content users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError},
        content::{
            CachingKey, Capabilities, Content, ContentDirectory, ContentError, ContentManager, ContentProvider,
            ContentReader, ContentRef, FileSystemDirectory, InPlaceReader, MaterialLibrary, MemoryDirectory,
            ShaderSource, Text, Texture, UpdateSummary,
        },
        core::config::ContentConfig,
        foundation::time::{Clock, ManualClock, SystemClock},
    };
}
