//! Shared command setup: engine construction and document discovery.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use refmark_cache::{BibliographyCache, FileCache, MemoryCache};
use refmark_config::Config;
use refmark_core::{
    BibliographyLoader, Document, DocumentOutcome, PandocConverter, ProcessedDocument,
    ReferenceSettings, ReferencesProcessor, UnchangedReason,
};

use crate::error::CliError;
use crate::output::Output;

/// Cache format version; bump when the cached bytes change meaning.
const CACHE_VERSION: &str = concat!("refmark-", env!("CARGO_PKG_VERSION"));

/// Build the engine from configuration.
///
/// Fails if a configured style name is unknown.
pub(crate) fn build_processor(config: &Config) -> Result<ReferencesProcessor, CliError> {
    // Shared so a run-fatal error stops conversions still in flight.
    let cancelled = Arc::new(AtomicBool::new(false));
    let converter = Arc::new(
        PandocConverter::new(config.converter.program.clone(), config.converter.timeout())
            .with_cancellation(Arc::clone(&cancelled)),
    );

    let cache: Arc<dyn BibliographyCache> = if config.cache.enabled {
        Arc::new(FileCache::new(
            &config.docs_resolved.cache_dir(),
            CACHE_VERSION,
        ))
    } else {
        Arc::new(MemoryCache::new())
    };

    let loader = BibliographyLoader::new(converter)
        .with_cache(cache)
        .with_source_dir(&config.docs_resolved.source_dir);

    let settings = ReferenceSettings {
        citestyle: config.references.citestyle.clone(),
        bibstyle: config.references.bibstyle.clone(),
        heading: config.references.heading.clone(),
    };
    Ok(ReferencesProcessor::new(&settings, loader)?.with_cancellation(cancelled))
}

/// Find and read every document matching the include patterns.
///
/// Files under `exclude` (the output directory) are skipped. Documents with
/// unreadable front matter are processed without metadata.
pub(crate) fn discover_documents(
    config: &Config,
    exclude: Option<&Path>,
) -> Result<Vec<Document>, CliError> {
    let source_dir = &config.docs_resolved.source_dir;
    let mut paths = BTreeSet::new();

    for pattern in &config.docs_resolved.include {
        let full = source_dir.join(pattern);
        for entry in glob::glob(&full.to_string_lossy())? {
            match entry {
                Ok(path) if path.is_file() => {
                    if exclude.is_some_and(|dir| path.starts_with(dir)) {
                        continue;
                    }
                    paths.insert(path);
                }
                Ok(_) => {}
                Err(err) => tracing::warn!("skipping unreadable path: {err}"),
            }
        }
    }

    paths
        .into_iter()
        .map(|path| {
            let text = fs::read_to_string(&path).map_err(|source| CliError::File {
                path: path.clone(),
                source,
            })?;
            Ok(match Document::parse(&path, text.clone()) {
                Ok(document) => document,
                Err(err) => {
                    tracing::warn!("{err}, ignoring its metadata");
                    Document::new(path, text)
                }
            })
        })
        .collect()
}

/// Path of `path` relative to the source directory, for display and output.
pub(crate) fn relative_path<'a>(config: &Config, path: &'a Path) -> &'a Path {
    path.strip_prefix(&config.docs_resolved.source_dir)
        .unwrap_or(path)
}

/// Print one line per document that needs attention.
pub(crate) fn report_problems(config: &Config, processed: &[ProcessedDocument], output: &Output) {
    for document in processed {
        let path = relative_path(config, document.path()).display();
        match document.outcome() {
            DocumentOutcome::Failed(err) => output.error(&format!("{path}: {err}")),
            DocumentOutcome::Unchanged(UnchangedReason::BibliographyUnavailable(err)) => {
                output.warning(&format!("{path}: {}", err.describe()));
            }
            _ => {}
        }
    }
}

/// Destination of a processed document inside `output_dir`.
pub(crate) fn output_path(config: &Config, output_dir: &Path, path: &Path) -> PathBuf {
    let relative = relative_path(config, path);
    if relative.is_absolute() {
        // Outside the source dir: keep only the file name.
        output_dir.join(relative.file_name().unwrap_or(relative.as_os_str()))
    } else {
        output_dir.join(relative)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use refmark_config::CliSettings;
    use tempfile::TempDir;

    use super::*;

    fn config_for(dir: &Path) -> Config {
        fs::write(dir.join("refmark.toml"), "[docs]\nsource_dir = \"content\"\n").unwrap();
        Config::load(
            Some(&dir.join("refmark.toml")),
            Some(&CliSettings::default()),
        )
        .unwrap()
    }

    #[test]
    fn test_discover_documents_sorted_and_filtered() {
        let tmp = TempDir::new().unwrap();
        let content = tmp.path().join("content");
        fs::create_dir_all(content.join("posts")).unwrap();
        fs::create_dir_all(content.join("out")).unwrap();
        fs::write(content.join("b.md"), "B").unwrap();
        fs::write(content.join("posts/a.md"), "A").unwrap();
        fs::write(content.join("notes.txt"), "ignored").unwrap();
        fs::write(content.join("out/stale.md"), "old").unwrap();
        let config = config_for(tmp.path());

        let documents = discover_documents(&config, Some(&content.join("out"))).unwrap();
        let names: Vec<String> = documents
            .iter()
            .map(|d| relative_path(&config, d.path()).display().to_string())
            .collect();

        assert_eq!(names, vec!["b.md", "posts/a.md"]);
    }

    #[test]
    fn test_bad_front_matter_keeps_text() {
        let tmp = TempDir::new().unwrap();
        let content = tmp.path().join("content");
        fs::create_dir_all(&content).unwrap();
        fs::write(content.join("a.md"), "---\n[broken\n---\nBody").unwrap();
        let config = config_for(tmp.path());

        let documents = discover_documents(&config, None).unwrap();

        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].body(), "---\n[broken\n---\nBody");
    }

    #[test]
    fn test_output_path_mirrors_source_tree() {
        let tmp = TempDir::new().unwrap();
        let config = config_for(tmp.path());
        let source = config.docs_resolved.source_dir.join("posts/a.md");

        assert_eq!(
            output_path(&config, Path::new("/out"), &source),
            PathBuf::from("/out/posts/a.md")
        );
    }

    #[test]
    fn test_unknown_style_fails_setup() {
        let tmp = TempDir::new().unwrap();
        let mut config = config_for(tmp.path());
        config.references.citestyle = "fancy".to_owned();
        config.cache.enabled = false;

        assert!(matches!(
            build_processor(&config),
            Err(CliError::References(_))
        ));
    }
}
