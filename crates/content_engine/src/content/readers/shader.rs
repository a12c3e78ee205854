//! Shader source assembly
//!
//! A shader source is GLSL-like text where a line of the form
//! `#include "path"` (or `#include <path>`) is replaced with the contents of
//! that file. Include paths are relative to the content root. Includes are
//! loaded through the provider one by one, nested ones included, so every
//! file that went into the assembled code is part of the shader's dependency
//! set. [`ShaderInclude`] is not hot swappable and is therefore never cached:
//! editing an include makes the next sweep re-read every shader that used it.

use std::io::Read;

use super::text::read_utf8;
use crate::content::error::ContentError;
use crate::content::key::Content;
use crate::content::path::normalize;
use crate::content::provider::ContentProvider;
use crate::content::reader::{ContentReader, InPlaceReader};

/// Assembled shader code
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderSource {
    /// Code with every include expanded
    pub code: String,
    /// Normalized paths of expanded includes, in first-use order
    pub includes: Vec<String>,
}

impl Content for ShaderSource {}

/// Raw, unexpanded include file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderInclude {
    /// File contents
    pub code: String,
}

impl Content for ShaderInclude {}

/// Reads [`ShaderInclude`] files verbatim
#[derive(Debug, Clone, Copy, Default)]
pub struct ShaderIncludeReader;

impl ContentReader<ShaderInclude> for ShaderIncludeReader {
    fn read(&self, stream: &mut dyn Read, _provider: &mut dyn ContentProvider) -> Result<ShaderInclude, ContentError> {
        Ok(ShaderInclude {
            code: read_utf8(stream)?,
        })
    }
}

/// Reads [`ShaderSource`], expanding includes; re-reads in place
#[derive(Debug, Clone, Copy, Default)]
pub struct ShaderSourceReader;

impl ShaderSourceReader {
    fn assemble(&self, stream: &mut dyn Read, provider: &mut dyn ContentProvider) -> Result<ShaderSource, ContentError> {
        let source = read_utf8(stream)?;
        let mut assembled = ShaderSource::default();
        let mut stack = Vec::new();
        expand(&source, provider, &mut stack, &mut assembled)?;
        Ok(assembled)
    }
}

impl ContentReader<ShaderSource> for ShaderSourceReader {
    fn read(&self, stream: &mut dyn Read, provider: &mut dyn ContentProvider) -> Result<ShaderSource, ContentError> {
        self.assemble(stream, provider)
    }

    fn in_place(&self) -> Option<&dyn InPlaceReader<ShaderSource>> {
        Some(self)
    }
}

impl InPlaceReader<ShaderSource> for ShaderSourceReader {
    fn read_into(
        &self,
        existing: &mut ShaderSource,
        stream: &mut dyn Read,
        provider: &mut dyn ContentProvider,
    ) -> Result<(), ContentError> {
        *existing = self.assemble(stream, provider)?;
        Ok(())
    }
}

/// Path named by an include directive, `None` for ordinary lines
fn parse_include(line: &str) -> Option<Result<&str, &'static str>> {
    let rest = line.trim().strip_prefix("#include")?;
    let rest = rest.trim();

    let path = rest
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .or_else(|| rest.strip_prefix('<').and_then(|r| r.strip_suffix('>')));

    Some(match path {
        Some(path) if !path.trim().is_empty() => Ok(path.trim()),
        Some(_) => Err("empty #include path"),
        None => Err("malformed #include directive"),
    })
}

fn expand(
    source: &str,
    provider: &mut dyn ContentProvider,
    stack: &mut Vec<String>,
    assembled: &mut ShaderSource,
) -> Result<(), ContentError> {
    for (line_num, line) in source.lines().enumerate() {
        let path = match parse_include(line) {
            None => {
                assembled.code.push_str(line);
                assembled.code.push('\n');
                continue;
            }
            Some(Err(message)) => {
                return Err(ContentError::invalid_data(format!("Line {}: {}", line_num + 1, message)));
            }
            Some(Ok(path)) => path,
        };

        let normalized = normalize(path);
        if stack.contains(&normalized) {
            return Err(ContentError::invalid_data(format!(
                "Line {}: include cycle through '{}'",
                line_num + 1,
                path
            )));
        }

        let include = provider.load::<ShaderInclude>(path)?;
        let code = include.borrow().code.clone();
        if !assembled.includes.contains(&normalized) {
            assembled.includes.push(normalized.clone());
        }

        stack.push(normalized);
        expand(&code, provider, stack, assembled)?;
        stack.pop();
    }
    Ok(())
}
