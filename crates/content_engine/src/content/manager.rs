//! Content manager
//!
//! Public entry point of the content pipeline. Wires a [`ContentDirectory`],
//! the reader registry and the cache together, and drives the periodic
//! hot-swap sweep.
//!
//! # Example
//!
//! ```no_run
//! use content_engine::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ContentConfig::default().with_root_directory("resources");
//! let mut content = ContentManager::from_config(&config)?;
//!
//! let greeting = content.load::<Text>("greeting.txt")?;
//! loop {
//!     content.update_content();
//!     println!("{}", greeting.borrow().value);
//! #   break;
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::io::Read;
use std::rc::Rc;
use std::time::Duration;

use super::cache::{CacheNode, ContentCache, HotSwapAction};
use super::directory::{ContentDirectory, FileSystemDirectory};
use super::disposal::DisposableRegistry;
use super::error::ContentError;
use super::key::{downcast_content, CachingKey, Content, ContentRef, ContentType, DisposableRef, ErasedContent};
use super::path::NormalizedPath;
use super::provider::{ContentProvider, DependencyRecorder, DependencySet};
use super::reader::{ContentReader, ReaderRegistry};
use super::readers;
use crate::config::ConfigError;
use crate::core::config::{ContentConfig, MIN_POLL_INTERVAL_MS};
use crate::foundation::time::{Clock, Stopwatch, SystemClock};

/// Outcome of one [`ContentManager::update_content`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Whether a sweep actually ran (false when rate limited or disabled)
    pub swept: bool,
    /// Cache nodes examined
    pub checked: usize,
    /// Nodes hot swapped successfully
    pub swapped: usize,
    /// Nodes whose hot swap failed and kept their previous state
    pub failed: usize,
}

/// Loads, caches and hot swaps content
pub struct ContentManager {
    directory: Box<dyn ContentDirectory>,
    readers: ReaderRegistry,
    cache: ContentCache,
    disposables: DisposableRegistry,
    clock: Box<dyn Clock>,
    config: ContentConfig,
    poll_interval: Duration,
    in_flight: HashSet<CachingKey>,
    disposed: bool,
}

impl ContentManager {
    /// Create a manager over `directory` using the wall clock
    pub fn new(directory: impl ContentDirectory + 'static, config: ContentConfig) -> Self {
        Self::with_clock(directory, SystemClock, config)
    }

    /// Create a manager whose polling runs on `clock`
    pub fn with_clock(
        directory: impl ContentDirectory + 'static,
        clock: impl Clock + 'static,
        config: ContentConfig,
    ) -> Self {
        let minimum = Duration::from_millis(MIN_POLL_INTERVAL_MS);
        let mut poll_interval = config.poll_interval();
        if poll_interval < minimum {
            log::warn!(
                "Poll interval of {}ms raised to the {}ms minimum",
                config.poll_interval_ms,
                MIN_POLL_INTERVAL_MS
            );
            poll_interval = minimum;
        }

        let now = clock.now();
        Self {
            directory: Box::new(directory),
            readers: ReaderRegistry::new(),
            cache: ContentCache::new(now),
            disposables: DisposableRegistry::new(),
            clock: Box::new(clock),
            config,
            poll_interval,
            in_flight: HashSet::new(),
            disposed: false,
        }
    }

    /// Create a file-system backed manager with the built-in readers
    pub fn from_config(config: &ContentConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        log::info!("Content root: {}", config.root_directory.display());

        let directory = FileSystemDirectory::new(config.root_directory.clone());
        Ok(Self::new(directory, config.clone()).with_builtin_readers())
    }

    /// Register the built-in readers and return `self`
    pub fn with_builtin_readers(mut self) -> Self {
        self.register_builtin_readers();
        self
    }

    /// Register readers for text, shader sources, textures and materials
    pub fn register_builtin_readers(&mut self) {
        readers::register_builtin(&mut self.readers);
    }

    /// Register `reader` for `T`; the last registration wins
    pub fn set_reader<T, R>(&mut self, reader: R)
    where
        T: Content,
        R: ContentReader<T> + 'static,
    {
        self.readers.set_reader::<T, R>(reader);
    }

    /// Let `S` be read by `B`'s reader when `S` has none of its own
    pub fn declare_subtype<S, B>(&mut self)
    where
        S: Content + From<B>,
        B: Content,
    {
        self.readers.declare_subtype::<S, B>();
    }

    /// Registered readers
    pub fn readers(&self) -> &ReaderRegistry {
        &self.readers
    }

    /// Active configuration
    pub fn config(&self) -> &ContentConfig {
        &self.config
    }

    /// Load `T` from `path`, returning the cached object when there is one
    pub fn load<T: Content>(&mut self, path: &str) -> Result<ContentRef<T>, ContentError> {
        let erased = self.load_path(ContentType::of::<T>(), &NormalizedPath::new(path))?;
        downcast_content(erased)
    }

    /// Read a fresh `T` from `stream`; never cached or hot swapped
    pub fn load_from_stream<T: Content>(&mut self, stream: &mut dyn Read) -> Result<ContentRef<T>, ContentError> {
        let erased = self.load_stream(ContentType::of::<T>(), stream)?;
        downcast_content(erased)
    }

    /// Track an externally built object for disposal and hand it back
    pub fn add<T: Content>(&mut self, object: ContentRef<T>) -> ContentRef<T> {
        let handle: DisposableRef = Rc::clone(&object) as DisposableRef;
        self.track_disposable(handle);
        object
    }

    /// Run a hot-swap sweep if hot reload is on and the poll interval elapsed
    pub fn update_content(&mut self) -> UpdateSummary {
        if self.disposed || !self.config.hot_reload {
            return UpdateSummary::default();
        }

        let now = self.clock.now();
        let elapsed = now.duration_since(self.cache.last_check()).unwrap_or(Duration::ZERO);
        if elapsed < self.poll_interval {
            return UpdateSummary::default();
        }

        self.sweep()
    }

    /// Run a hot-swap sweep now, ignoring the poll interval and hot-reload switch
    pub fn force_update(&mut self) -> UpdateSummary {
        if self.disposed {
            return UpdateSummary::default();
        }
        self.sweep()
    }

    /// Dispose every tracked object and empty the cache
    ///
    /// The manager stays usable; later loads read from the directory again.
    pub fn unload(&mut self) {
        let cached = self.cache.len();
        let disposed = self.disposables.dispose_all();
        self.cache.clear();
        if cached > 0 || disposed > 0 {
            log::info!("Unloaded {} cached object(s), disposed {}", cached, disposed);
        }
    }

    /// Unload once and refuse further loads
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.unload();
        self.disposed = true;
    }

    /// Whether [`dispose`](Self::dispose) has run
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Whether `T` at `path` has a cache node
    pub fn is_cached<T: Content>(&self, path: &str) -> bool {
        self.cache.contains(&CachingKey::of::<T>(path))
    }

    /// Number of cache nodes
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    /// Dependency set recorded for `T` at `path` during its last (re)read
    pub fn dependencies_of<T: Content>(&self, path: &str) -> Option<&DependencySet> {
        self.cache.dependencies(&CachingKey::of::<T>(path))
    }

    /// Number of objects awaiting disposal
    pub fn tracked_disposables(&self) -> usize {
        self.disposables.len()
    }

    fn ensure_live(&self) -> Result<(), ContentError> {
        if self.disposed {
            Err(ContentError::Disposed)
        } else {
            Ok(())
        }
    }

    fn load_path(&mut self, content_type: ContentType, path: &NormalizedPath) -> Result<ErasedContent, ContentError> {
        self.ensure_live()?;

        let key = CachingKey::new(content_type, path.clone());
        // A cached node being swapped is mutably borrowed; never hand it out
        if self.in_flight.contains(&key) {
            return Err(ContentError::CyclicDependency { key }.loading(path.source_path(), content_type.name()));
        }
        if let Some(object) = self.cache.get(&key) {
            log::debug!("Cache hit for {}", key);
            return Ok(Rc::clone(object));
        }

        self.in_flight.insert(key.clone());
        let result = self.read_uncached(&key);
        self.in_flight.remove(&key);

        result.map_err(|e| e.loading(path.source_path(), content_type.name()))
    }

    fn read_uncached(&mut self, key: &CachingKey) -> Result<ErasedContent, ContentError> {
        let content_type = key.content_type;
        let reader = self.readers.resolve(content_type)?;
        let mut stream = self.directory.open_read(&key.path)?;

        let mut recorder = DependencyRecorder::new(self);
        let value = reader.read(&mut stream, &mut recorder)?;
        let dependencies = recorder.into_dependencies();
        let object = content_type.wrap(value)?;

        match HotSwapAction::select(content_type, &reader) {
            Some(action) => {
                log::info!(
                    "Loaded {} ({} dependencies, hot swap: {})",
                    key,
                    dependencies.len(),
                    action.describe()
                );
                self.cache.insert(
                    key.clone(),
                    CacheNode {
                        object: Rc::clone(&object),
                        dependencies,
                        action,
                    },
                );
            }
            None => log::info!("Loaded {} (not hot swappable, not cached)", key),
        }

        self.track_object(content_type, &object);
        Ok(object)
    }

    fn load_stream(&mut self, content_type: ContentType, stream: &mut dyn Read) -> Result<ErasedContent, ContentError> {
        self.ensure_live()?;

        let reader = self.readers.resolve(content_type)?;
        let value = reader.read(stream, self)?;
        let object = content_type.wrap(value)?;
        log::debug!("Read {} from stream", content_type);

        self.track_object(content_type, &object);
        Ok(object)
    }

    fn track_object(&mut self, content_type: ContentType, object: &ErasedContent) {
        if !content_type.is_disposable() {
            return;
        }
        if let Some(handle) = content_type.disposable(object) {
            self.disposables.track(handle);
        }
    }

    fn sweep(&mut self) -> UpdateSummary {
        let stopwatch = Stopwatch::start_new();
        let now = self.clock.now();
        let changed = self.cache.changed_since(self.directory.as_ref(), self.cache.last_check());

        let mut summary = UpdateSummary {
            swept: true,
            checked: self.cache.len(),
            ..UpdateSummary::default()
        };

        for key in changed {
            match self.hot_swap(&key) {
                Ok(()) => summary.swapped += 1,
                Err(e) => {
                    log::warn!("Hot swap of {} failed, keeping previous state: {}", key, e);
                    summary.failed += 1;
                }
            }
        }

        self.cache.set_last_check(now);
        log::debug!(
            "Content sweep checked {} node(s), swapped {}, failed {} in {:.2}ms",
            summary.checked,
            summary.swapped,
            summary.failed,
            stopwatch.elapsed_millis()
        );
        summary
    }

    fn hot_swap(&mut self, key: &CachingKey) -> Result<(), ContentError> {
        let Some((object, action)) = self.cache.node_parts(key) else {
            return Ok(());
        };

        if !self.in_flight.insert(key.clone()) {
            return Err(ContentError::CyclicDependency { key: key.clone() });
        }
        let result = self.reread(key, &object, &action);
        self.in_flight.remove(key);

        let dependencies = result.map_err(|e| e.loading(key.path.source_path(), key.content_type.name()))?;
        log::info!(
            "Hot swapped {} ({}, {} dependencies)",
            key,
            action.describe(),
            dependencies.len()
        );
        self.cache.replace_dependencies(key, dependencies);
        Ok(())
    }

    fn reread(
        &mut self,
        key: &CachingKey,
        object: &ErasedContent,
        action: &HotSwapAction,
    ) -> Result<DependencySet, ContentError> {
        let mut stream = self.directory.open_read(&key.path)?;
        let mut recorder = DependencyRecorder::new(self);
        action.apply(key.content_type, object, &mut stream, &mut recorder)?;
        Ok(recorder.into_dependencies())
    }
}

impl ContentProvider for ContentManager {
    fn load_erased(&mut self, content_type: ContentType, path: &NormalizedPath) -> Result<ErasedContent, ContentError> {
        self.load_path(content_type, path)
    }

    fn load_stream_erased(
        &mut self,
        content_type: ContentType,
        stream: &mut dyn Read,
    ) -> Result<ErasedContent, ContentError> {
        self.load_stream(content_type, stream)
    }

    fn track_disposable(&mut self, object: DisposableRef) {
        if self.disposed {
            log::warn!("Content added after the manager was disposed will not be released");
            return;
        }
        self.disposables.track(object);
    }
}

impl Drop for ContentManager {
    fn drop(&mut self) {
        self.dispose();
    }
}
