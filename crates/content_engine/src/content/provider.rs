//! Content provider interface and dependency recording
//!
//! Readers resolve nested content through a [`ContentProvider`]. While one
//! object is being read (or re-read for a hot swap) the manager hands its
//! reader a [`DependencyRecorder`] instead of itself: every path-based load
//! passes through unchanged but its key is remembered, and the collected set
//! becomes that object's dependency set.

use std::collections::HashSet;
use std::io::Read;
use std::rc::Rc;

use super::error::ContentError;
use super::key::{downcast_content, CachingKey, Content, ContentRef, ContentType, DisposableRef, ErasedContent};
use super::path::NormalizedPath;

/// Keys loaded while constructing one content object
pub type DependencySet = HashSet<CachingKey>;

/// Capability interface exposed to readers and application code
///
/// The erased methods are what implementors provide; callers normally use
/// the typed helpers on `dyn ContentProvider` ([`load`](#method.load),
/// [`load_from_stream`](#method.load_from_stream), [`add`](#method.add)).
pub trait ContentProvider {
    /// Load (or fetch from cache) the object of `content_type` at `path`
    fn load_erased(&mut self, content_type: ContentType, path: &NormalizedPath) -> Result<ErasedContent, ContentError>;

    /// Read a fresh, uncached object of `content_type` from `stream`
    fn load_stream_erased(
        &mut self,
        content_type: ContentType,
        stream: &mut dyn Read,
    ) -> Result<ErasedContent, ContentError>;

    /// Register an object for bulk disposal
    fn track_disposable(&mut self, object: DisposableRef);
}

impl<'p> dyn ContentProvider + 'p {
    /// Load `T` from `path`
    pub fn load<T: Content>(&mut self, path: &str) -> Result<ContentRef<T>, ContentError> {
        let erased = self.load_erased(ContentType::of::<T>(), &NormalizedPath::new(path))?;
        downcast_content(erased)
    }

    /// Read `T` from an already opened stream; never cached
    pub fn load_from_stream<T: Content>(&mut self, stream: &mut dyn Read) -> Result<ContentRef<T>, ContentError> {
        let erased = self.load_stream_erased(ContentType::of::<T>(), stream)?;
        downcast_content(erased)
    }

    /// Register an externally constructed object for disposal and hand it back
    pub fn add<T: Content>(&mut self, object: ContentRef<T>) -> ContentRef<T> {
        let handle: DisposableRef = Rc::clone(&object) as DisposableRef;
        self.track_disposable(handle);
        object
    }
}

/// Provider proxy that records path-based loads
///
/// Lives for exactly one read. Stream loads and `add` are forwarded without
/// being recorded. The recorder never touches the cache itself.
pub struct DependencyRecorder<'a> {
    inner: &'a mut dyn ContentProvider,
    dependencies: DependencySet,
}

impl<'a> DependencyRecorder<'a> {
    /// Wrap `inner` for one read
    pub fn new(inner: &'a mut dyn ContentProvider) -> Self {
        Self {
            inner,
            dependencies: DependencySet::new(),
        }
    }

    /// Keys recorded so far
    pub fn dependencies(&self) -> &DependencySet {
        &self.dependencies
    }

    /// Finish recording
    pub fn into_dependencies(self) -> DependencySet {
        self.dependencies
    }
}

impl ContentProvider for DependencyRecorder<'_> {
    fn load_erased(&mut self, content_type: ContentType, path: &NormalizedPath) -> Result<ErasedContent, ContentError> {
        self.dependencies.insert(CachingKey::new(content_type, path.clone()));
        self.inner.load_erased(content_type, path)
    }

    fn load_stream_erased(
        &mut self,
        content_type: ContentType,
        stream: &mut dyn Read,
    ) -> Result<ErasedContent, ContentError> {
        self.inner.load_stream_erased(content_type, stream)
    }

    fn track_disposable(&mut self, object: DisposableRef) {
        self.inner.track_disposable(object);
    }
}
