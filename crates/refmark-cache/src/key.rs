//! Cache key and etag computation.

use std::fs;
use std::path::Path;
use std::time::UNIX_EPOCH;

use sha2::{Digest, Sha256};

/// Content address of a bibliography source.
///
/// Two sources share a key only if they have the same path and are read in
/// the same format. The key does not cover file contents; that is the job of
/// the etag (see [`modification_signature`]).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    hash: String,
}

impl CacheKey {
    /// Compute the key for `path` read as `format`.
    ///
    /// SHA-256 of `"{format}:{path}"`, hex-encoded.
    #[must_use]
    pub fn new(path: &Path, format: &str) -> Self {
        let content = format!("{format}:{}", path.display());
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        Self {
            hash: hex::encode(hasher.finalize()),
        }
    }

    /// Hex-encoded hash, usable as a file name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.hash
    }
}

/// Modification signature of a file: `"{mtime_nanos}:{len}"`.
///
/// Returns `None` if the file cannot be stat'ed, in which case callers should
/// bypass the cache.
#[must_use]
pub fn modification_signature(path: &Path) -> Option<String> {
    let metadata = fs::metadata(path).ok()?;
    let mtime = metadata
        .modified()
        .ok()?
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos());
    Some(format!("{mtime}:{}", metadata.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_key_is_stable() {
        let a = CacheKey::new(Path::new("content/refs.bib"), "biblatex");
        let b = CacheKey::new(Path::new("content/refs.bib"), "biblatex");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_key_format_matters() {
        let biblatex = CacheKey::new(Path::new("refs.bib"), "biblatex");
        let bibtex = CacheKey::new(Path::new("refs.bib"), "bibtex");
        assert_ne!(biblatex, bibtex);
    }

    #[test]
    fn test_key_path_matters() {
        let a = CacheKey::new(Path::new("a/refs.bib"), "biblatex");
        let b = CacheKey::new(Path::new("b/refs.bib"), "biblatex");
        assert_ne!(a, b);
    }

    #[test]
    fn test_signature_tracks_length() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("refs.bib");

        fs::write(&path, "@book{a,}").unwrap();
        let before = modification_signature(&path).unwrap();
        fs::write(&path, "@book{a, title={Longer}}").unwrap();
        let after = modification_signature(&path).unwrap();

        assert_ne!(before, after);
    }

    #[test]
    fn test_signature_missing_file() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(modification_signature(&tmp.path().join("nope.bib")), None);
    }
}
