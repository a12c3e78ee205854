//! Normalized content paths
//!
//! Content is addressed by relative paths that authors spell inconsistently
//! (`Textures\Rock.PNG` vs `textures/rock.png`). Cache lookups must treat
//! those as the same key, while file I/O still needs the spelling the author
//! used so case-sensitive file systems resolve it.

use std::fmt;
use std::hash::{Hash, Hasher};

/// Normalize a content path: forward slashes, no leading/trailing slashes,
/// lower case
pub fn normalize(path: &str) -> String {
    slash_normalize(path).to_lowercase()
}

fn slash_normalize(path: &str) -> String {
    path.replace('\\', "/").trim_matches('/').to_string()
}

/// Case-insensitive, slash-normalized content path
///
/// Equality and hashing only look at the normalized form. The slash-normalized
/// original spelling is kept for opening the file.
#[derive(Clone)]
pub struct NormalizedPath {
    normalized: String,
    source: String,
}

impl NormalizedPath {
    /// Wrap a relative content path
    pub fn new(path: &str) -> Self {
        let source = slash_normalize(path);
        Self {
            normalized: source.to_lowercase(),
            source,
        }
    }

    /// Normalized form used for comparisons
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// Original spelling with slashes normalized, used for I/O
    pub fn source_path(&self) -> &str {
        &self.source
    }
}

impl PartialEq for NormalizedPath {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for NormalizedPath {}

impl Hash for NormalizedPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

impl fmt::Debug for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.normalized)
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl From<&str> for NormalizedPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(path: &NormalizedPath) -> u64 {
        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in ["A/B.png", "\\Shaders\\Lit.GLSL\\", "plain", "/a//b/", ""] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "normalize not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_slash_and_case_variants_collide() {
        assert_eq!(normalize("A/B.png"), normalize("a\\b.PNG"));

        let a = NormalizedPath::new("Foo/Bar.png");
        let b = NormalizedPath::new("foo\\bar.PNG");
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_source_spelling_preserved() {
        let path = NormalizedPath::new("\\Textures\\Rock.PNG");
        assert_eq!(path.as_str(), "textures/rock.png");
        assert_eq!(path.source_path(), "Textures/Rock.PNG");
    }
}
