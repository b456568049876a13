//! Resolve, read and normalize a document's bibliography.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use refmark_cache::{BibliographyCache, CacheKey, NullCache, modification_signature};

use super::{Bibliography, BibliographyFormat, ConversionError, Converter};
use crate::document::Document;
use crate::error::ReferenceError;

/// Loads the bibliography a document refers to.
///
/// Non-native sources go through the injected [`Converter`]; the converted
/// bytes are memoized in a [`BibliographyCache`] keyed by source path and
/// format, with the file's modification signature as etag.
pub struct BibliographyLoader {
    converter: Arc<dyn Converter>,
    cache: Arc<dyn BibliographyCache>,
    source_dir: Option<PathBuf>,
}

impl BibliographyLoader {
    /// Create a loader with no cache and no fallback directory.
    pub fn new(converter: Arc<dyn Converter>) -> Self {
        Self {
            converter,
            cache: Arc::new(NullCache),
            source_dir: None,
        }
    }

    /// Memoize conversions in `cache`.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn BibliographyCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Directory searched after the document's own directory.
    #[must_use]
    pub fn with_source_dir(mut self, source_dir: impl Into<PathBuf>) -> Self {
        self.source_dir = Some(source_dir.into());
        self
    }

    /// Load the bibliography referenced by `document`.
    ///
    /// Returns `Ok(None)` when the document does not reference one.
    pub fn load(&self, document: &Document) -> Result<Option<Bibliography>, ReferenceError> {
        let metadata = document.metadata();
        let Some(reference) = metadata.bibliography.as_deref() else {
            return Ok(None);
        };

        let path = self.resolve_path(document.path(), reference)?;
        let format = match metadata.bibliography_format.as_deref() {
            Some(name) => BibliographyFormat::parse(name).ok_or_else(|| {
                ReferenceError::UnknownBibliographyFormat {
                    path: path.clone(),
                    extension: name.to_owned(),
                }
            })?,
            None => BibliographyFormat::guess_path(&path).ok_or_else(|| {
                ReferenceError::UnknownBibliographyFormat {
                    extension: path
                        .extension()
                        .map(|ext| ext.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    path: path.clone(),
                }
            })?,
        };

        tracing::debug!(path = %path.display(), %format, "loading bibliography");
        let bytes = self.normalized_bytes(&path, format)?;
        Bibliography::from_csl_json(&bytes)
            .map(Some)
            .map_err(|source| ReferenceError::BibliographyParseError { path, source })
    }

    /// First existing candidate among the document dir and the source dir.
    fn resolve_path(
        &self,
        document_path: &Path,
        reference: &str,
    ) -> Result<PathBuf, ReferenceError> {
        let reference = Path::new(reference);
        let mut candidates = Vec::with_capacity(2);
        if reference.is_absolute() {
            candidates.push(reference.to_path_buf());
        } else {
            let document_dir = document_path.parent().unwrap_or_else(|| Path::new(""));
            candidates.push(document_dir.join(reference));
            if let Some(source_dir) = &self.source_dir {
                candidates.push(source_dir.join(reference));
            }
        }

        match candidates.iter().find(|candidate| candidate.is_file()) {
            Some(found) => Ok(found.clone()),
            None => Err(ReferenceError::MissingBibliographySource {
                path: candidates.swap_remove(0),
            }),
        }
    }

    /// CSL-JSON bytes for the source, converting (through the cache) if needed.
    fn normalized_bytes(
        &self,
        path: &Path,
        format: BibliographyFormat,
    ) -> Result<Arc<[u8]>, ReferenceError> {
        if !format.needs_conversion() {
            return read(path).map(Arc::from);
        }

        let Some(etag) = modification_signature(path) else {
            return self.convert(path, format).map(Arc::from);
        };
        let key = CacheKey::new(path, format.as_str());

        let mut failure = None;
        let cached = self.cache.get_or_populate(&key, &etag, &mut || {
            match self.convert(path, format) {
                Ok(bytes) => Some(bytes),
                Err(err) => {
                    failure = Some(err);
                    None
                }
            }
        });

        match (cached, failure) {
            (Some(bytes), _) => Ok(bytes),
            (None, Some(err)) => Err(err),
            (None, None) => self.convert(path, format).map(Arc::from),
        }
    }

    fn convert(&self, path: &Path, format: BibliographyFormat) -> Result<Vec<u8>, ReferenceError> {
        let raw = read(path)?;
        let failed = |reason| ReferenceError::BibliographyConversionFailed {
            from: format,
            to: BibliographyFormat::NATIVE,
            reason,
        };

        let output = self
            .converter
            .convert(format, BibliographyFormat::NATIVE, &raw)
            .map_err(failed)?;
        if output.iter().all(u8::is_ascii_whitespace) {
            return Err(failed(ConversionError::EmptyOutput));
        }
        tracing::info!(path = %path.display(), %format, "converted bibliography");
        Ok(output)
    }
}

fn read(path: &Path) -> Result<Vec<u8>, ReferenceError> {
    fs::read(path).map_err(|source| ReferenceError::BibliographyRead {
        path: path.to_path_buf(),
        source,
    })
}
