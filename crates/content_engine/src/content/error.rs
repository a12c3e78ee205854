//! Content loading errors

use thiserror::Error;

use super::key::CachingKey;
use super::path::NormalizedPath;

/// Errors raised while loading or hot swapping content
#[derive(Error, Debug)]
pub enum ContentError {
    /// Source file does not exist
    #[error("Content not found: {path}")]
    NotFound {
        /// Offending path
        path: String,
    },

    /// Reading or stat-ing the source failed for another reason
    #[error("IO error on '{path}': {source}")]
    Io {
        /// Offending path
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A reader failed to pull bytes from its stream
    #[error("Failed to read content stream: {0}")]
    Stream(#[from] std::io::Error),

    /// No reader is registered for the type, including via fallbacks
    #[error("No content reader registered for {type_name}")]
    NoReader {
        /// Requested type
        type_name: &'static str,
    },

    /// A reader rejected the source data
    #[error("Invalid data: {message}")]
    InvalidData {
        /// Parser message
        message: String,
    },

    /// A key was requested while it was already being loaded
    #[error("Cyclic dependency on {key}")]
    CyclicDependency {
        /// Key requested twice on the same load stack
        key: CachingKey,
    },

    /// An erased object did not have the expected type
    #[error("Type mismatch: expected {expected}")]
    TypeMismatch {
        /// Type the caller asked for
        expected: &'static str,
    },

    /// An object could not be updated because it is currently borrowed
    #[error("{type_name} is borrowed and cannot be updated in place")]
    Busy {
        /// Type of the borrowed object
        type_name: &'static str,
    },

    /// The manager has been disposed
    #[error("Content manager has been disposed")]
    Disposed,

    /// Path-based load failure with context
    #[error("Failed to load {type_name} from '{path}': {source}")]
    Load {
        /// Requested path
        path: String,
        /// Requested type
        type_name: &'static str,
        /// What went wrong
        #[source]
        source: Box<ContentError>,
    },
}

impl ContentError {
    /// Shorthand for reader parse failures
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData { message: message.into() }
    }

    /// Attach path/type context, unless it is already the outermost layer
    pub(crate) fn loading(self, path: &str, type_name: &'static str) -> Self {
        if let Self::Load {
            path: existing,
            type_name: existing_type,
            ..
        } = &self
        {
            if *existing_type == type_name && NormalizedPath::new(existing) == NormalizedPath::new(path) {
                return self;
            }
        }
        Self::Load {
            path: path.to_string(),
            type_name,
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping [`ContentError::Load`] context layers
    pub fn root_cause(&self) -> &ContentError {
        let mut current = self;
        while let Self::Load { source, .. } = current {
            current = source;
        }
        current
    }

    /// Whether the root cause is a missing file
    pub fn is_not_found(&self) -> bool {
        matches!(self.root_cause(), Self::NotFound { .. })
    }
}
