//! File-based cache implementation.
//!
//! [`FileCache`] stores one file per bibliography under
//! `{root}/bibliographies/{key}`. Each file carries a binary etag header
//! followed by the normalized bytes:
//!
//! ```text
//! [etag_len: u32 LE][etag bytes][data bytes]
//! ```
//!
//! On read only the header is read first; the body is read on a hit.
//!
//! Concurrent callers populating the same key are serialized, so a cold
//! cache still converts each bibliography once per run.
//!
//! On construction, [`FileCache`] validates a `VERSION` file in the cache root.
//! If the version mismatches or is missing, the directory is wiped and
//! recreated so entries written by an older build are never reused.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{BibliographyCache, CacheKey};

const BUCKET: &str = "bibliographies";

/// Distinguishes temp files of concurrent writers.
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Persistent [`BibliographyCache`] rooted at a directory on disk.
pub struct FileCache {
    dir: PathBuf,
    populating: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
}

impl FileCache {
    /// Open the cache at `root`, wiping it if `version` does not match.
    ///
    /// Errors during validation are logged but never fatal.
    #[must_use]
    pub fn new(root: &Path, version: &str) -> Self {
        validate_version(root, version);
        Self {
            dir: root.join(BUCKET),
            populating: Mutex::new(HashMap::new()),
        }
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.as_str())
    }

    fn key_lock(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        let mut locks = self
            .populating
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key.clone()).or_default())
    }
}

impl BibliographyCache for FileCache {
    fn get(&self, key: &CacheKey, etag: &str) -> Option<Arc<[u8]>> {
        let mut file = File::open(self.entry_path(key)).ok()?;

        let mut len_buf = [0u8; 4];
        file.read_exact(&mut len_buf).ok()?;
        let etag_len = u32::from_le_bytes(len_buf) as usize;

        let mut stored_etag = vec![0u8; etag_len];
        file.read_exact(&mut stored_etag).ok()?;
        if stored_etag != etag.as_bytes() {
            return None;
        }

        let mut data = Vec::new();
        file.read_to_end(&mut data).ok()?;
        Some(Arc::from(data))
    }

    fn set(&self, key: &CacheKey, etag: &str, value: &[u8]) {
        if let Err(e) = fs::create_dir_all(&self.dir) {
            tracing::warn!("failed to create bibliography cache directory: {e}");
            return;
        }

        let etag_bytes = etag.as_bytes();
        let Ok(etag_len) = u32::try_from(etag_bytes.len()) else {
            return;
        };
        let mut buf = Vec::with_capacity(4 + etag_bytes.len() + value.len());
        buf.extend_from_slice(&etag_len.to_le_bytes());
        buf.extend_from_slice(etag_bytes);
        buf.extend_from_slice(value);

        // Write to a sibling and rename so readers never see a torn entry.
        let path = self.entry_path(key);
        let tmp = path.with_extension(format!(
            "{}.{}.tmp",
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        if fs::write(&tmp, &buf).is_ok() && fs::rename(&tmp, &path).is_err() {
            let _ = fs::remove_file(&tmp);
        }
    }

    fn get_or_populate(
        &self,
        key: &CacheKey,
        etag: &str,
        populate: &mut dyn FnMut() -> Option<Vec<u8>>,
    ) -> Option<Arc<[u8]>> {
        let lock = self.key_lock(key);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        // A caller that waited on the lock finds the entry its peer wrote.
        if let Some(hit) = self.get(key, etag) {
            tracing::debug!(key = key.as_str(), "bibliography cache hit");
            return Some(hit);
        }
        let value = populate()?;
        self.set(key, etag, &value);
        Some(Arc::from(value))
    }
}

/// Validate the cache version, wiping the directory on mismatch.
fn validate_version(root: &Path, version: &str) {
    let version_file = root.join("VERSION");

    match fs::read_to_string(&version_file) {
        Ok(stored) if stored == version => {
            tracing::debug!("bibliography cache version matches: {version}");
            return;
        }
        Ok(stored) => {
            tracing::info!(
                "bibliography cache version mismatch (stored={stored}, current={version}), wiping cache"
            );
        }
        Err(_) => {
            tracing::info!("no bibliography cache VERSION file found, initializing cache");
        }
    }

    if root.exists()
        && let Err(e) = fs::remove_dir_all(root)
    {
        tracing::warn!("failed to remove bibliography cache directory: {e}");
    }
    if let Err(e) = fs::create_dir_all(root) {
        tracing::warn!("failed to create bibliography cache directory: {e}");
        return;
    }
    if let Err(e) = fs::write(&version_file, version) {
        tracing::warn!("failed to write bibliography cache VERSION file: {e}");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    use super::*;
    use tempfile::TempDir;

    fn key(name: &str) -> CacheKey {
        CacheKey::new(Path::new(name), "biblatex")
    }

    #[test]
    fn test_set_and_get() {
        let tmp = TempDir::new().unwrap();
        let cache = FileCache::new(&tmp.path().join("cache"), "v1");

        cache.set(&key("refs.bib"), "sig", br#"[{"id":"a"}]"#);
        assert_eq!(
            cache.get(&key("refs.bib"), "sig").as_deref(),
            Some(&br#"[{"id":"a"}]"#[..])
        );
    }

    #[test]
    fn test_etag_mismatch_misses() {
        let tmp = TempDir::new().unwrap();
        let cache = FileCache::new(&tmp.path().join("cache"), "v1");

        cache.set(&key("refs.bib"), "sig-1", b"[]");
        assert_eq!(cache.get(&key("refs.bib"), "sig-2"), None);
    }

    #[test]
    fn test_missing_entry_misses() {
        let tmp = TempDir::new().unwrap();
        let cache = FileCache::new(&tmp.path().join("cache"), "v1");

        assert_eq!(cache.get(&key("refs.bib"), "sig"), None);
    }

    #[test]
    fn test_overwrite_replaces_etag() {
        let tmp = TempDir::new().unwrap();
        let cache = FileCache::new(&tmp.path().join("cache"), "v1");

        cache.set(&key("refs.bib"), "sig-1", b"first");
        cache.set(&key("refs.bib"), "sig-2", b"second");

        assert_eq!(cache.get(&key("refs.bib"), "sig-1"), None);
        assert_eq!(
            cache.get(&key("refs.bib"), "sig-2").as_deref(),
            Some(&b"second"[..])
        );
    }

    #[test]
    fn test_entries_survive_reopen_with_same_version() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("cache");

        FileCache::new(&root, "v1").set(&key("refs.bib"), "sig", b"kept");
        let reopened = FileCache::new(&root, "v1");

        assert_eq!(
            reopened.get(&key("refs.bib"), "sig").as_deref(),
            Some(&b"kept"[..])
        );
    }

    #[test]
    fn test_version_mismatch_wipes_entries() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("cache");

        FileCache::new(&root, "v1").set(&key("refs.bib"), "sig", b"stale");
        let upgraded = FileCache::new(&root, "v2");

        assert_eq!(upgraded.get(&key("refs.bib"), "sig"), None);
        assert_eq!(fs::read_to_string(root.join("VERSION")).unwrap(), "v2");
    }

    #[test]
    fn test_get_or_populate_persists() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("cache");

        let cache = FileCache::new(&root, "v1");
        cache.get_or_populate(&key("refs.bib"), "sig", &mut || Some(b"[]".to_vec()));

        let mut called = false;
        let reopened = FileCache::new(&root, "v1");
        let value = reopened.get_or_populate(&key("refs.bib"), "sig", &mut || {
            called = true;
            None
        });

        assert!(!called);
        assert_eq!(value.as_deref(), Some(&b"[]"[..]));
    }

    #[test]
    fn test_concurrent_cold_population_runs_once() {
        let tmp = TempDir::new().unwrap();
        let cache = Arc::new(FileCache::new(&tmp.path().join("cache"), "v1"));
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                thread::spawn(move || {
                    cache.get_or_populate(&key("refs.bib"), "sig", &mut || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(std::time::Duration::from_millis(20));
                        Some(b"[]".to_vec())
                    })
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().as_deref(), Some(&b"[]"[..]));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
