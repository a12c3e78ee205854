//! Content cache and dependency graph
//!
//! One [`CacheNode`] per hot-swap-eligible object, keyed by [`CachingKey`].
//! Each node stores its dependency set by value, so the cache map itself is
//! the adjacency structure: there are no back-pointers, and a node's edges
//! are replaced wholesale whenever it is (re)read.
//!
//! Change detection polls modification times. A node is stale when its own
//! source changed since the last sweep, or when a dependency that has no node
//! of its own (and so can never be swapped and checked by itself) changed.

use std::collections::HashMap;
use std::io::Read;
use std::time::SystemTime;

use super::directory::ContentDirectory;
use super::error::ContentError;
use super::key::{CachingKey, ContentType, ErasedContent};
use super::path::NormalizedPath;
use super::provider::{ContentProvider, DependencySet};
use super::reader::ResolvedReader;

/// How a cached object absorbs a re-read of its source
#[derive(Clone)]
pub(crate) enum HotSwapAction {
    /// Read a fresh instance and hand it to the object's own `hot_swap`
    Replace(ResolvedReader),
    /// Let the reader overwrite the existing instance
    ReadInto(ResolvedReader),
}

impl HotSwapAction {
    /// Pick the strategy for `content_type`; the type's own capability wins
    pub(crate) fn select(content_type: ContentType, reader: &ResolvedReader) -> Option<Self> {
        if content_type.is_hot_swappable() {
            Some(Self::Replace(reader.clone()))
        } else if reader.supports_in_place() {
            Some(Self::ReadInto(reader.clone()))
        } else {
            None
        }
    }

    /// Re-read `stream` into `object`
    pub(crate) fn apply(
        &self,
        content_type: ContentType,
        object: &ErasedContent,
        stream: &mut dyn Read,
        provider: &mut dyn ContentProvider,
    ) -> Result<(), ContentError> {
        match self {
            Self::Replace(reader) => {
                let replacement = reader.read(stream, provider)?;
                content_type.swap(object, replacement)
            }
            Self::ReadInto(reader) => reader.read_into(object, stream, provider),
        }
    }

    /// Short name for log output
    pub(crate) fn describe(&self) -> &'static str {
        match self {
            Self::Replace(_) => "replace",
            Self::ReadInto(_) => "read-into",
        }
    }
}

/// One live content object and what it was built from
pub(crate) struct CacheNode {
    pub(crate) object: ErasedContent,
    pub(crate) dependencies: DependencySet,
    pub(crate) action: HotSwapAction,
}

/// Keyed store of cache nodes plus the last sweep time
pub(crate) struct ContentCache {
    nodes: HashMap<CachingKey, CacheNode>,
    last_check: SystemTime,
}

impl ContentCache {
    /// Create an empty cache whose first sweep compares against `now`
    pub(crate) fn new(now: SystemTime) -> Self {
        Self {
            nodes: HashMap::new(),
            last_check: now,
        }
    }

    pub(crate) fn get(&self, key: &CachingKey) -> Option<&ErasedContent> {
        self.nodes.get(key).map(|node| &node.object)
    }

    pub(crate) fn contains(&self, key: &CachingKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Insert a node; an existing node for the key is kept
    pub(crate) fn insert(&mut self, key: CachingKey, node: CacheNode) -> bool {
        if self.nodes.contains_key(&key) {
            log::warn!("Refusing to replace existing cache node for {}", key);
            return false;
        }
        self.nodes.insert(key, node);
        true
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
    }

    pub(crate) fn dependencies(&self, key: &CachingKey) -> Option<&DependencySet> {
        self.nodes.get(key).map(|node| &node.dependencies)
    }

    /// Clone out what a hot swap of `key` needs
    pub(crate) fn node_parts(&self, key: &CachingKey) -> Option<(ErasedContent, HotSwapAction)> {
        self.nodes
            .get(key)
            .map(|node| (node.object.clone(), node.action.clone()))
    }

    /// Replace a node's dependency set after a successful re-read
    pub(crate) fn replace_dependencies(&mut self, key: &CachingKey, dependencies: DependencySet) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.dependencies = dependencies;
        }
    }

    pub(crate) fn last_check(&self) -> SystemTime {
        self.last_check
    }

    pub(crate) fn set_last_check(&mut self, at: SystemTime) {
        self.last_check = at;
    }

    /// Keys whose node must be re-read because something changed after `since`
    pub(crate) fn changed_since(&self, directory: &dyn ContentDirectory, since: SystemTime) -> Vec<CachingKey> {
        self.nodes
            .iter()
            .filter(|(key, node)| {
                if modified_after(directory, &key.path, since) {
                    log::trace!("{} changed on disk", key);
                    return true;
                }
                node.dependencies
                    .iter()
                    .filter(|dependency| !self.nodes.contains_key(*dependency))
                    .any(|dependency| {
                        let changed = modified_after(directory, &dependency.path, since);
                        if changed {
                            log::trace!("{} changed through uncached dependency {}", key, dependency);
                        }
                        changed
                    })
            })
            .map(|(key, _)| key.clone())
            .collect()
    }
}

fn modified_after(directory: &dyn ContentDirectory, path: &NormalizedPath, since: SystemTime) -> bool {
    match directory.last_write_time(path) {
        Ok(modified) => modified > since,
        Err(e) => {
            log::debug!("Could not stat '{}': {}", path, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::directory::MemoryDirectory;
    use crate::content::key::{Capabilities, Content, DisposableRef};
    use crate::content::reader::{ContentReader, InPlaceReader, ReaderRegistry};
    use crate::foundation::time::{Clock, ManualClock};
    use std::io::Cursor;
    use std::time::Duration;

    #[derive(Debug, PartialEq)]
    struct Note(String);
    impl Content for Note {}

    #[derive(Debug, PartialEq)]
    struct Sticky(String);
    impl Content for Sticky {
        fn capabilities() -> Capabilities {
            Capabilities::HOT_SWAP
        }
    }

    struct NoteReader;
    impl ContentReader<Note> for NoteReader {
        fn read(&self, stream: &mut dyn Read, _p: &mut dyn ContentProvider) -> Result<Note, ContentError> {
            let mut text = String::new();
            stream.read_to_string(&mut text)?;
            Ok(Note(text))
        }

        fn in_place(&self) -> Option<&dyn InPlaceReader<Note>> {
            Some(self)
        }
    }

    impl InPlaceReader<Note> for NoteReader {
        fn read_into(&self, existing: &mut Note, stream: &mut dyn Read, p: &mut dyn ContentProvider) -> Result<(), ContentError> {
            *existing = self.read(stream, p)?;
            Ok(())
        }
    }

    struct StickyReader;
    impl ContentReader<Sticky> for StickyReader {
        fn read(&self, stream: &mut dyn Read, _p: &mut dyn ContentProvider) -> Result<Sticky, ContentError> {
            let mut text = String::new();
            stream.read_to_string(&mut text)?;
            Ok(Sticky(text))
        }
    }

    struct NoNested;
    impl ContentProvider for NoNested {
        fn load_erased(&mut self, ty: ContentType, _p: &NormalizedPath) -> Result<ErasedContent, ContentError> {
            Err(ContentError::NoReader { type_name: ty.name() })
        }
        fn load_stream_erased(&mut self, ty: ContentType, _s: &mut dyn Read) -> Result<ErasedContent, ContentError> {
            Err(ContentError::NoReader { type_name: ty.name() })
        }
        fn track_disposable(&mut self, _object: DisposableRef) {}
    }

    fn registry() -> ReaderRegistry {
        let mut registry = ReaderRegistry::new();
        registry.set_reader::<Note, _>(NoteReader);
        registry.set_reader::<Sticky, _>(StickyReader);
        registry
    }

    fn note_node(registry: &ReaderRegistry, text: &str, dependencies: &[CachingKey]) -> CacheNode {
        let ty = ContentType::of::<Note>();
        let reader = registry.resolve(ty).unwrap();
        CacheNode {
            object: ty.wrap(Box::new(Note(text.to_string()))).unwrap(),
            dependencies: dependencies.iter().cloned().collect(),
            action: HotSwapAction::select(ty, &reader).unwrap(),
        }
    }

    #[test]
    fn test_select_prefers_type_capability() {
        let registry = registry();

        let sticky = ContentType::of::<Sticky>();
        let action = HotSwapAction::select(sticky, &registry.resolve(sticky).unwrap());
        assert!(matches!(action, Some(HotSwapAction::Replace(_))));

        let note = ContentType::of::<Note>();
        let action = HotSwapAction::select(note, &registry.resolve(note).unwrap());
        assert!(matches!(action, Some(HotSwapAction::ReadInto(_))));
    }

    #[test]
    fn test_select_rejects_plain_reader() {
        struct Plain;
        impl Content for Plain {}
        struct PlainReader;
        impl ContentReader<Plain> for PlainReader {
            fn read(&self, _s: &mut dyn Read, _p: &mut dyn ContentProvider) -> Result<Plain, ContentError> {
                Ok(Plain)
            }
        }

        let mut registry = ReaderRegistry::new();
        registry.set_reader::<Plain, _>(PlainReader);
        let ty = ContentType::of::<Plain>();
        assert!(HotSwapAction::select(ty, &registry.resolve(ty).unwrap()).is_none());
    }

    #[test]
    fn test_replace_action_keeps_identity() {
        let registry = registry();
        let ty = ContentType::of::<Sticky>();
        let action = HotSwapAction::select(ty, &registry.resolve(ty).unwrap()).unwrap();
        let object = ty.wrap(Box::new(Sticky("old".to_string()))).unwrap();
        let before = object.clone();

        action
            .apply(ty, &object, &mut Cursor::new("new".to_string()), &mut NoNested)
            .unwrap();

        assert!(std::rc::Rc::ptr_eq(&before, &object));
        let sticky = object.downcast_ref::<std::cell::RefCell<Sticky>>().unwrap();
        assert_eq!(sticky.borrow().0, "new");
    }

    #[test]
    fn test_insert_keeps_single_node_per_key() {
        let registry = registry();
        let mut cache = ContentCache::new(SystemTime::UNIX_EPOCH);
        let key = CachingKey::of::<Note>("a.txt");

        assert!(cache.insert(key.clone(), note_node(&registry, "one", &[])));
        assert!(!cache.insert(CachingKey::of::<Note>("A.TXT"), note_node(&registry, "two", &[])));
        assert_eq!(cache.len(), 1);

        let note = cache.get(&key).unwrap().downcast_ref::<std::cell::RefCell<Note>>().unwrap();
        assert_eq!(note.borrow().0, "one");
    }

    #[test]
    fn test_changed_since_own_source() {
        let clock = ManualClock::default();
        let directory = MemoryDirectory::with_clock(clock.clone());
        directory.write("a.txt", "a");
        directory.write("b.txt", "b");

        let registry = registry();
        let mut cache = ContentCache::new(clock.now());
        cache.insert(CachingKey::of::<Note>("a.txt"), note_node(&registry, "a", &[]));
        cache.insert(CachingKey::of::<Note>("b.txt"), note_node(&registry, "b", &[]));

        assert!(cache.changed_since(&directory, cache.last_check()).is_empty());

        clock.advance(Duration::from_secs(2));
        directory.write("b.txt", "b2");

        let changed = cache.changed_since(&directory, cache.last_check());
        assert_eq!(changed, vec![CachingKey::of::<Note>("b.txt")]);
    }

    #[test]
    fn test_changed_since_uncached_dependency() {
        let clock = ManualClock::default();
        let directory = MemoryDirectory::with_clock(clock.clone());
        directory.write("shader.glsl", "main");
        directory.write("common.glsl", "lib");
        directory.write("cached.txt", "x");

        let registry = registry();
        let mut cache = ContentCache::new(clock.now());
        let uncached = CachingKey::of::<Sticky>("common.glsl");
        let cached = CachingKey::of::<Note>("cached.txt");
        cache.insert(
            CachingKey::of::<Note>("shader.glsl"),
            note_node(&registry, "main", &[uncached, cached.clone()]),
        );
        cache.insert(cached, note_node(&registry, "x", &[]));

        clock.advance(Duration::from_secs(2));
        directory.write("common.glsl", "lib2");

        let changed = cache.changed_since(&directory, cache.last_check());
        assert_eq!(changed, vec![CachingKey::of::<Note>("shader.glsl")]);
    }

    #[test]
    fn test_cached_dependency_does_not_flag_dependent() {
        let clock = ManualClock::default();
        let directory = MemoryDirectory::with_clock(clock.clone());
        directory.write("outer.txt", "o");
        directory.write("inner.txt", "i");

        let registry = registry();
        let mut cache = ContentCache::new(clock.now());
        let inner = CachingKey::of::<Note>("inner.txt");
        cache.insert(CachingKey::of::<Note>("outer.txt"), note_node(&registry, "o", &[inner.clone()]));
        cache.insert(inner.clone(), note_node(&registry, "i", &[]));

        clock.advance(Duration::from_secs(2));
        directory.write("inner.txt", "i2");

        assert_eq!(cache.changed_since(&directory, cache.last_check()), vec![inner]);
    }

    #[test]
    fn test_missing_source_counts_as_unchanged() {
        let clock = ManualClock::default();
        let directory = MemoryDirectory::with_clock(clock.clone());
        let registry = registry();
        let mut cache = ContentCache::new(clock.now());
        cache.insert(CachingKey::of::<Note>("gone.txt"), note_node(&registry, "g", &[]));

        clock.advance(Duration::from_secs(2));
        assert!(cache.changed_since(&directory, cache.last_check()).is_empty());
    }

    #[test]
    fn test_replace_dependencies_wholesale() {
        let registry = registry();
        let mut cache = ContentCache::new(SystemTime::UNIX_EPOCH);
        let key = CachingKey::of::<Note>("a.txt");
        cache.insert(key.clone(), note_node(&registry, "a", &[CachingKey::of::<Note>("old.txt")]));

        let fresh: DependencySet = [CachingKey::of::<Note>("new.txt")].into_iter().collect();
        cache.replace_dependencies(&key, fresh.clone());

        assert_eq!(cache.dependencies(&key), Some(&fresh));
        cache.clear();
        assert!(!cache.contains(&key));
    }
}
