//! Content viewer
//!
//! Watches a content root and prints text and shader files every time they
//! are hot swapped.
//!
//! ```text
//! content_viewer [--config content.toml] [--root DIR] FILE...
//! ```
//!
//! `.glsl`, `.vert`, `.frag` and `.comp` files are loaded as assembled shader
//! sources (includes expanded); everything else as plain text.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;
use content_engine::prelude::*;
use thiserror::Error;

const SHADER_EXTENSIONS: [&str; 4] = ["glsl", "vert", "frag", "comp"];

#[derive(Error, Debug)]
enum ViewerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Content(#[from] ContentError),
}

/// Prints text and shader files each time they are hot swapped
#[derive(Parser, Debug)]
#[command(name = "content_viewer")]
struct Args {
    /// Content configuration file (.toml or .ron)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Content root directory, overriding the configuration
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Files to watch, relative to the content root
    #[arg(value_name = "FILE", required = true)]
    files: Vec<String>,
}

enum Watched {
    Text(String, ContentRef<Text>),
    Shader(String, ContentRef<ShaderSource>),
}

impl Watched {
    fn load(content: &mut ContentManager, path: String) -> Result<Self, ContentError> {
        let is_shader = path
            .rsplit_once('.')
            .is_some_and(|(_, ext)| SHADER_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));

        if is_shader {
            let shader = content.load::<ShaderSource>(&path)?;
            Ok(Self::Shader(path, shader))
        } else {
            let text = content.load::<Text>(&path)?;
            Ok(Self::Text(path, text))
        }
    }

    fn print(&self) {
        match self {
            Self::Text(path, text) => println!("--- {}\n{}", path, text.borrow().value),
            Self::Shader(path, shader) => {
                let shader = shader.borrow();
                println!("--- {} ({} includes)\n{}", path, shader.includes.len(), shader.code);
            }
        }
    }
}

fn run(args: Args) -> Result<(), ViewerError> {
    let mut config = match &args.config {
        Some(path) => ContentConfig::load_from_file(path)?,
        None => ContentConfig::default(),
    };
    if let Some(root) = args.root {
        config = config.with_root_directory(root);
    }

    let mut content = ContentManager::from_config(&config)?;
    let watched = args
        .files
        .into_iter()
        .map(|path| Watched::load(&mut content, path))
        .collect::<Result<Vec<_>, _>>()?;

    for item in &watched {
        item.print();
    }

    log::info!(
        "Watching {} file(s) under {} every {}ms",
        watched.len(),
        config.root_directory.display(),
        config.poll_interval_ms
    );

    loop {
        let summary = content.update_content();
        if summary.swapped > 0 {
            for item in &watched {
                item.print();
            }
        }
        if summary.failed > 0 {
            log::warn!("{} file(s) failed to reload; showing last good content", summary.failed);
        }
        thread::sleep(Duration::from_millis(250));
    }
}

fn main() {
    let args = Args::parse();
    content_engine::foundation::logging::init_with_default_filter("info");

    if let Err(e) = run(args) {
        log::error!("{}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
