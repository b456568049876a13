//! Bibliography cache for refmark.
//!
//! Converting a bibtex source through an external tool is the slowest step of
//! citation processing, and the same bibliography is usually shared by many
//! documents. This crate caches the normalized (CSL-JSON) bytes of a
//! bibliography so the conversion runs once per source revision.
//!
//! - [`CacheKey`]: content address of a bibliography source (path + format)
//! - [`BibliographyCache`]: key-value store with etag-based invalidation
//!
//! The etag is the source file's modification signature (see
//! [`modification_signature`]), so editing the bibliography invalidates its
//! entry without any explicit bookkeeping.
//!
//! # Implementations
//!
//! - [`NullCache`]: no-op (always misses)
//! - [`MemoryCache`]: per-run snapshot store, each entry populated at most once
//! - [`FileCache`]: persistent store with version validation
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use refmark_cache::{BibliographyCache, CacheKey, MemoryCache};
//!
//! let cache = MemoryCache::new();
//! let key = CacheKey::new(Path::new("refs.bib"), "biblatex");
//!
//! let first = cache.get_or_populate(&key, "sig-1", &mut || Some(b"[]".to_vec()));
//! // Already populated for this etag: the closure does not run again.
//! let second = cache.get_or_populate(&key, "sig-1", &mut || Some(b"{}".to_vec()));
//! assert_eq!(first, second);
//! ```

mod file;
mod key;
mod memory;

use std::sync::Arc;

pub use file::FileCache;
pub use key::{CacheKey, modification_signature};
pub use memory::MemoryCache;

/// Store for normalized bibliography bytes.
///
/// A hit requires both the key and the etag to match. Implementations must
/// treat every failure as a miss: the cache is an optimization and callers
/// never depend on it for correctness.
pub trait BibliographyCache: Send + Sync {
    /// Retrieve a cached value stored under `key` with the same `etag`.
    fn get(&self, key: &CacheKey, etag: &str) -> Option<Arc<[u8]>>;

    /// Store a value, replacing any entry for `key` regardless of its etag.
    fn set(&self, key: &CacheKey, etag: &str, value: &[u8]);

    /// Return the cached value, or run `populate` and store its result.
    ///
    /// `populate` returning `None` means the value could not be produced;
    /// nothing is stored and `None` is returned.
    fn get_or_populate(
        &self,
        key: &CacheKey,
        etag: &str,
        populate: &mut dyn FnMut() -> Option<Vec<u8>>,
    ) -> Option<Arc<[u8]>> {
        if let Some(hit) = self.get(key, etag) {
            tracing::debug!(key = key.as_str(), "bibliography cache hit");
            return Some(hit);
        }
        let value = populate()?;
        self.set(key, etag, &value);
        Some(Arc::from(value))
    }
}

/// No-op [`BibliographyCache`] used when caching is disabled.
pub struct NullCache;

impl BibliographyCache for NullCache {
    fn get(&self, _key: &CacheKey, _etag: &str) -> Option<Arc<[u8]>> {
        None
    }

    fn set(&self, _key: &CacheKey, _etag: &str, _value: &[u8]) {}
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn test_null_cache_always_misses() {
        let cache = NullCache;
        let key = CacheKey::new(Path::new("refs.bib"), "biblatex");

        cache.set(&key, "sig", b"[]");
        assert_eq!(cache.get(&key, "sig"), None);
    }

    #[test]
    fn test_null_cache_populates_every_time() {
        let cache = NullCache;
        let key = CacheKey::new(Path::new("refs.bib"), "biblatex");
        let mut calls = 0;

        for _ in 0..3 {
            let value = cache.get_or_populate(&key, "sig", &mut || {
                calls += 1;
                Some(b"[]".to_vec())
            });
            assert_eq!(value.as_deref(), Some(&b"[]"[..]));
        }
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_failed_population_stores_nothing() {
        let cache = MemoryCache::new();
        let key = CacheKey::new(Path::new("refs.bib"), "biblatex");

        assert_eq!(cache.get_or_populate(&key, "sig", &mut || None), None);
        assert_eq!(cache.get(&key, "sig"), None);
    }
}
