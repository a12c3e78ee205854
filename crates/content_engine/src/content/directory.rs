//! Content directories
//!
//! A [`ContentDirectory`] resolves relative content paths against a root and
//! provides read streams and modification times. It is a pure I/O façade:
//! nothing is cached at this layer.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::SystemTime;

use super::error::ContentError;
use super::path::NormalizedPath;
use crate::foundation::time::{Clock, SystemClock};

/// Source of content bytes and timestamps
pub trait ContentDirectory {
    /// Open `path` for reading
    fn open_read(&self, path: &NormalizedPath) -> Result<Box<dyn Read>, ContentError>;

    /// Last modification time of `path`
    fn last_write_time(&self, path: &NormalizedPath) -> Result<SystemTime, ContentError>;
}

fn map_io_error(path: &NormalizedPath, error: io::Error) -> ContentError {
    if error.kind() == io::ErrorKind::NotFound {
        ContentError::NotFound {
            path: path.source_path().to_string(),
        }
    } else {
        ContentError::Io {
            path: path.source_path().to_string(),
            source: error,
        }
    }
}

/// Directory on the local file system
#[derive(Debug, Clone)]
pub struct FileSystemDirectory {
    root: PathBuf,
}

impl FileSystemDirectory {
    /// Create a directory rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root every path is resolved against
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute (root-joined) location of `path`
    pub fn resolve(&self, path: &NormalizedPath) -> PathBuf {
        self.root.join(path.source_path())
    }
}

impl ContentDirectory for FileSystemDirectory {
    fn open_read(&self, path: &NormalizedPath) -> Result<Box<dyn Read>, ContentError> {
        let full_path = self.resolve(path);
        let file = File::open(&full_path).map_err(|e| map_io_error(path, e))?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn last_write_time(&self, path: &NormalizedPath) -> Result<SystemTime, ContentError> {
        std::fs::metadata(self.resolve(path))
            .and_then(|metadata| metadata.modified())
            .map_err(|e| map_io_error(path, e))
    }
}

#[derive(Debug)]
struct MemoryFile {
    bytes: Vec<u8>,
    modified: SystemTime,
}

/// In-memory directory
///
/// Clones share the same files, so content can be edited after the directory
/// has been handed to a manager. Writes are stamped with the directory's
/// clock. Useful for embedded content and for deterministic tests.
#[derive(Clone)]
pub struct MemoryDirectory {
    files: Rc<RefCell<HashMap<NormalizedPath, MemoryFile>>>,
    clock: Rc<dyn Clock>,
}

impl MemoryDirectory {
    /// Create an empty directory stamped by the system clock
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Create an empty directory stamped by `clock`
    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            files: Rc::new(RefCell::new(HashMap::new())),
            clock: Rc::new(clock),
        }
    }

    /// Create or overwrite a file
    pub fn write(&self, path: &str, bytes: impl Into<Vec<u8>>) {
        let modified = self.clock.now();
        self.files.borrow_mut().insert(
            NormalizedPath::new(path),
            MemoryFile {
                bytes: bytes.into(),
                modified,
            },
        );
    }

    /// Bump a file's modification time without changing its bytes
    pub fn touch(&self, path: &str) -> bool {
        let modified = self.clock.now();
        match self.files.borrow_mut().get_mut(&NormalizedPath::new(path)) {
            Some(file) => {
                file.modified = modified;
                true
            }
            None => false,
        }
    }

    /// Delete a file
    pub fn remove(&self, path: &str) -> bool {
        self.files.borrow_mut().remove(&NormalizedPath::new(path)).is_some()
    }

    /// Whether a file exists
    pub fn contains(&self, path: &str) -> bool {
        self.files.borrow().contains_key(&NormalizedPath::new(path))
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentDirectory for MemoryDirectory {
    fn open_read(&self, path: &NormalizedPath) -> Result<Box<dyn Read>, ContentError> {
        let files = self.files.borrow();
        let file = files.get(path).ok_or_else(|| ContentError::NotFound {
            path: path.source_path().to_string(),
        })?;
        Ok(Box::new(Cursor::new(file.bytes.clone())))
    }

    fn last_write_time(&self, path: &NormalizedPath) -> Result<SystemTime, ContentError> {
        self.files
            .borrow()
            .get(path)
            .map(|file| file.modified)
            .ok_or_else(|| ContentError::NotFound {
                path: path.source_path().to_string(),
            })
    }
}
