// End-to-end behavior of the content manager through the public API:
// caching, dependency recording, hot swapping, failure isolation and disposal.

use std::cell::Cell;
use std::io::Read;
use std::rc::Rc;
use std::time::Duration;

use content_engine::content::normalize;
use content_engine::prelude::*;

#[derive(Debug)]
struct Shader {
    source: String,
}
impl Content for Shader {}

/// Counts reads; a source starting with `!` is rejected
#[derive(Clone, Default)]
struct ShaderReader {
    reads: Rc<Cell<usize>>,
}

impl ContentReader<Shader> for ShaderReader {
    fn read(&self, stream: &mut dyn Read, _provider: &mut dyn ContentProvider) -> Result<Shader, ContentError> {
        self.reads.set(self.reads.get() + 1);
        let mut source = String::new();
        stream.read_to_string(&mut source)?;
        if source.starts_with('!') {
            return Err(ContentError::invalid_data("shader failed to compile"));
        }
        Ok(Shader { source })
    }

    fn in_place(&self) -> Option<&dyn InPlaceReader<Shader>> {
        Some(self)
    }
}

impl InPlaceReader<Shader> for ShaderReader {
    fn read_into(
        &self,
        existing: &mut Shader,
        stream: &mut dyn Read,
        provider: &mut dyn ContentProvider,
    ) -> Result<(), ContentError> {
        *existing = self.read(stream, provider)?;
        Ok(())
    }
}

/// Builds a program from the shader paths listed one per line
#[derive(Debug)]
struct Factory {
    shaders: Vec<ContentRef<Shader>>,
}
impl Content for Factory {}

struct FactoryReader;

impl ContentReader<Factory> for FactoryReader {
    fn read(&self, stream: &mut dyn Read, provider: &mut dyn ContentProvider) -> Result<Factory, ContentError> {
        let mut listing = String::new();
        stream.read_to_string(&mut listing)?;
        let shaders = listing
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| provider.load::<Shader>(line.trim()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Factory { shaders })
    }

    fn in_place(&self) -> Option<&dyn InPlaceReader<Factory>> {
        Some(self)
    }
}

impl InPlaceReader<Factory> for FactoryReader {
    fn read_into(
        &self,
        existing: &mut Factory,
        stream: &mut dyn Read,
        provider: &mut dyn ContentProvider,
    ) -> Result<(), ContentError> {
        *existing = self.read(stream, provider)?;
        Ok(())
    }
}

/// Native handle released on unload
#[derive(Debug, Default)]
struct Buffer {
    releases: usize,
}

impl Content for Buffer {
    fn capabilities() -> Capabilities {
        Capabilities::HOT_SWAP | Capabilities::DISPOSE
    }

    fn dispose(&mut self) {
        self.releases += 1;
    }
}

struct BufferReader {
    reads: Rc<Cell<usize>>,
}

impl ContentReader<Buffer> for BufferReader {
    fn read(&self, _stream: &mut dyn Read, _provider: &mut dyn ContentProvider) -> Result<Buffer, ContentError> {
        self.reads.set(self.reads.get() + 1);
        Ok(Buffer::default())
    }
}

struct Fixture {
    content: ContentManager,
    directory: MemoryDirectory,
    clock: ManualClock,
    shader_reads: Rc<Cell<usize>>,
    buffer_reads: Rc<Cell<usize>>,
}

impl Fixture {
    fn new() -> Self {
        let clock = ManualClock::default();
        let directory = MemoryDirectory::with_clock(clock.clone());
        let mut content = ContentManager::with_clock(directory.clone(), clock.clone(), ContentConfig::default())
            .with_builtin_readers();

        let shader_reader = ShaderReader::default();
        let shader_reads = Rc::clone(&shader_reader.reads);
        let buffer_reads = Rc::new(Cell::new(0));
        content.set_reader::<Shader, _>(shader_reader);
        content.set_reader::<Factory, _>(FactoryReader);
        content.set_reader::<Buffer, _>(BufferReader {
            reads: Rc::clone(&buffer_reads),
        });

        Self {
            content,
            directory,
            clock,
            shader_reads,
            buffer_reads,
        }
    }

    /// Let time pass, then write, so the edit is newer than the last sweep
    fn edit(&self, path: &str, text: &str) {
        self.clock.advance(Duration::from_millis(1500));
        self.directory.write(path, text);
    }
}

#[test]
fn test_normalization_is_idempotent() {
    for raw in ["A/B.png", "a\\b.PNG", "/Shaders//Lit.frag/", "\\x\\"] {
        assert_eq!(normalize(&normalize(raw)), normalize(raw));
    }
    assert_eq!(normalize("A/B.png"), normalize("a\\b.PNG"));
}

#[test]
fn test_cache_hit_returns_same_object() {
    let mut fx = Fixture::new();
    fx.directory.write("a.glsl", "void main() {}");

    let first = fx.content.load::<Shader>("a.glsl").unwrap();
    let second = fx.content.load::<Shader>("A.GLSL").unwrap();

    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(fx.shader_reads.get(), 1);
}

#[test]
fn test_nested_loads_become_dependencies() {
    let mut fx = Fixture::new();
    fx.directory.write("a.glsl", "vertex");
    fx.directory.write("b.glsl", "fragment");
    fx.directory.write("program.list", "a.glsl\nb.glsl\n");

    let program = fx.content.load::<Factory>("program.list").unwrap();
    let shader = fx.content.load::<Shader>("a.glsl").unwrap();

    let deps = fx.content.dependencies_of::<Factory>("program.list").unwrap();
    assert!(deps.contains(&CachingKey::of::<Shader>("a.glsl")));
    assert!(deps.contains(&CachingKey::of::<Shader>("b.glsl")));
    assert!(Rc::ptr_eq(&program.borrow().shaders[0], &shader));
    assert_eq!(fx.shader_reads.get(), 2);
}

#[test]
fn test_hot_swap_preserves_identity() {
    let mut fx = Fixture::new();
    fx.directory.write("a.glsl", "v1");
    fx.directory.write("program.list", "a.glsl\n");
    let program = fx.content.load::<Factory>("program.list").unwrap();
    let shader = fx.content.load::<Shader>("a.glsl").unwrap();

    fx.edit("a.glsl", "v2");
    let summary = fx.content.update_content();

    assert!(summary.swept);
    assert_eq!(summary.swapped, 1);
    assert!(Rc::ptr_eq(&shader, &fx.content.load::<Shader>("a.glsl").unwrap()));
    assert_eq!(shader.borrow().source, "v2");
    // The program still points at the same, now updated, shader
    assert_eq!(program.borrow().shaders[0].borrow().source, "v2");
}

#[test]
fn test_failed_swap_is_isolated() {
    let mut fx = Fixture::new();
    fx.directory.write("a.glsl", "a1");
    fx.directory.write("b.glsl", "b1");
    let a = fx.content.load::<Shader>("a.glsl").unwrap();
    let b = fx.content.load::<Shader>("b.glsl").unwrap();

    fx.edit("a.glsl", "!broken");
    fx.directory.write("b.glsl", "b2");
    let summary = fx.content.update_content();

    assert_eq!(summary.checked, 2);
    assert_eq!(summary.swapped, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(a.borrow().source, "a1");
    assert_eq!(b.borrow().source, "b2");

    // Fixing the file recovers on the next sweep
    fx.edit("a.glsl", "a3");
    assert_eq!(fx.content.update_content().swapped, 1);
    assert_eq!(a.borrow().source, "a3");
}

#[test]
fn test_unchanged_content_not_reread() {
    let mut fx = Fixture::new();
    fx.directory.write("a.glsl", "a1");
    fx.content.load::<Shader>("a.glsl").unwrap();

    fx.clock.advance(Duration::from_secs(5));
    let summary = fx.content.update_content();

    assert!(summary.swept);
    assert_eq!(summary.swapped, 0);
    assert_eq!(fx.shader_reads.get(), 1);
}

#[test]
fn test_unregistered_type_names_requested_type() {
    #[derive(Debug)]
    struct Unregistered;
    impl Content for Unregistered {}

    let mut fx = Fixture::new();
    fx.directory.write("thing.bin", "");

    let err = fx.content.load::<Unregistered>("thing.bin").unwrap_err();
    match err.root_cause() {
        ContentError::NoReader { type_name } => assert_eq!(*type_name, std::any::type_name::<Unregistered>()),
        other => panic!("Expected NoReader, got {other:?}"),
    }
    assert!(err.to_string().contains("thing.bin"));
}

#[test]
fn test_missing_file_is_not_found() {
    let mut fx = Fixture::new();
    let err = fx.content.load::<Shader>("missing.glsl").unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_unload_disposes_everything_once() {
    let mut fx = Fixture::new();
    fx.directory.write("vbo.bin", "");

    let loaded = fx.content.load::<Buffer>("vbo.bin").unwrap();
    let streamed = fx.content.load_from_stream::<Buffer>(&mut std::io::empty()).unwrap();
    let added = fx.content.add(Rc::new(std::cell::RefCell::new(Buffer::default())));
    assert_eq!(fx.content.tracked_disposables(), 3);
    assert_eq!(fx.content.cached_count(), 1);

    fx.content.unload();
    fx.content.unload();

    for buffer in [&loaded, &streamed, &added] {
        assert_eq!(buffer.borrow().releases, 1);
    }
    assert_eq!(fx.content.cached_count(), 0);

    let reloaded = fx.content.load::<Buffer>("vbo.bin").unwrap();
    assert!(!Rc::ptr_eq(&loaded, &reloaded));
    assert_eq!(fx.buffer_reads.get(), 3);
}

#[test]
fn test_text_scenario() {
    let mut fx = Fixture::new();
    fx.directory.write("greeting.txt", "hello");

    let greeting = fx.content.load::<Text>("greeting.txt").unwrap();
    assert_eq!(greeting.borrow().value, "hello");

    fx.edit("greeting.txt", "goodbye");
    fx.content.update_content();

    assert_eq!(greeting.borrow().value, "goodbye");
}
