//! Content pipeline: loading, caching and hot swapping
//!
//! Content objects are read from a [`ContentDirectory`] by pluggable
//! [`ContentReader`]s and cached per (type, normalized path). Nested loads a
//! reader makes while building an object are recorded as that object's
//! dependencies. [`ContentManager::update_content`] polls modification times
//! and re-reads stale objects into their existing identity, so everything
//! holding a [`ContentRef`] sees the new state.

pub mod directory;
pub mod disposal;
pub mod error;
pub mod key;
pub mod manager;
pub mod path;
pub mod provider;
pub mod reader;
pub mod readers;

mod cache;

pub use directory::{ContentDirectory, FileSystemDirectory, MemoryDirectory};
pub use disposal::DisposableRegistry;
pub use error::ContentError;
pub use key::{CachingKey, Capabilities, Content, ContentRef, ContentType, DisposableRef, ErasedContent};
pub use manager::{ContentManager, UpdateSummary};
pub use path::{normalize, NormalizedPath};
pub use provider::{ContentProvider, DependencyRecorder, DependencySet};
pub use reader::{ContentReader, InPlaceReader, ReaderRegistry};
pub use readers::{
    Material, MaterialLibrary, MaterialReader, ShaderInclude, ShaderIncludeReader, ShaderSource,
    ShaderSourceReader, Text, TextReader, Texture, TextureReader,
};
