//! Per-document citation pipeline and the parallel batch runner.
//!
//! For each document: load the bibliography, scan the body, number the
//! cited keys, render labels and the listing, then splice. Every stage sees
//! the full output of the previous one, and the body is only rewritten once
//! every label rendered; any failure returns the document untouched.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::bibliography::BibliographyLoader;
use crate::document::Document;
use crate::error::ReferenceError;
use crate::index::ReferenceIndex;
use crate::patcher::Patch;
use crate::scanner::scan;
use crate::style::{ReferenceSettings, ReferenceStyle};

/// Why a document was left as it was.
#[derive(Debug)]
pub enum UnchangedReason {
    /// The document does not reference a bibliography.
    NoBibliography,
    /// The body contains no citation markers.
    NoCitations,
    /// The referenced bibliography could not be loaded.
    BibliographyUnavailable(ReferenceError),
}

/// Result of processing one document.
#[derive(Debug)]
pub enum DocumentOutcome {
    /// Markers were replaced and a listing appended.
    Resolved {
        /// Number of markers replaced.
        citations: usize,
        /// Number of listed entries.
        references: usize,
    },
    /// Nothing to do, or the bibliography was unavailable.
    Unchanged(UnchangedReason),
    /// A citation could not be resolved; the text is untouched.
    Failed(ReferenceError),
}

/// A document after processing.
#[derive(Debug)]
pub struct ProcessedDocument {
    path: PathBuf,
    text: String,
    outcome: DocumentOutcome,
}

impl ProcessedDocument {
    fn untouched(document: Document, outcome: DocumentOutcome) -> Self {
        let path = document.path().to_path_buf();
        Self {
            path,
            text: document.into_text(),
            outcome,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full text, including front matter.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }

    #[must_use]
    pub fn outcome(&self) -> &DocumentOutcome {
        &self.outcome
    }

    /// Whether the text differs from the input.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        matches!(self.outcome, DocumentOutcome::Resolved { .. })
    }
}

/// Outcome counts of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub resolved: usize,
    /// No bibliography or no markers.
    pub unchanged: usize,
    /// Bibliography could not be loaded.
    pub unavailable: usize,
    /// Unresolvable citations.
    pub failed: usize,
    /// Markers replaced across all documents.
    pub citations: usize,
}

impl RunSummary {
    #[must_use]
    pub fn from_documents(documents: &[ProcessedDocument]) -> Self {
        let mut summary = Self::default();
        for document in documents {
            match document.outcome() {
                DocumentOutcome::Resolved { citations, .. } => {
                    summary.resolved += 1;
                    summary.citations += citations;
                }
                DocumentOutcome::Unchanged(UnchangedReason::BibliographyUnavailable(_)) => {
                    summary.unavailable += 1;
                }
                DocumentOutcome::Unchanged(_) => summary.unchanged += 1,
                DocumentOutcome::Failed(_) => summary.failed += 1,
            }
        }
        summary
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Resolves citations in documents.
pub struct ReferencesProcessor {
    style: ReferenceStyle,
    loader: BibliographyLoader,
    cancelled: Arc<AtomicBool>,
}

impl ReferencesProcessor {
    /// Resolve the configured styles and bind the loader.
    ///
    /// Fails with [`ReferenceError::UnknownLabelStyle`] if a style name is
    /// not registered.
    pub fn new(
        settings: &ReferenceSettings,
        loader: BibliographyLoader,
    ) -> Result<Self, ReferenceError> {
        Ok(Self {
            style: ReferenceStyle::from_settings(settings)?,
            loader,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Share a cancellation flag with the converter.
    ///
    /// [`process_all`](Self::process_all) sets the flag on the first
    /// run-fatal error so conversions still running for other documents
    /// are stopped.
    #[must_use]
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = flag;
        self
    }

    /// Run-wide style.
    #[must_use]
    pub fn style(&self) -> &ReferenceStyle {
        &self.style
    }

    /// Process one document.
    ///
    /// `Err` is reserved for run-fatal errors; document-level problems are
    /// reported in the returned [`DocumentOutcome`].
    pub fn process(&self, document: Document) -> Result<ProcessedDocument, ReferenceError> {
        let metadata = document.metadata();
        let style = self
            .style
            .with_overrides(metadata.citestyle.as_deref(), metadata.bibstyle.as_deref())?;

        let bibliography = match self.loader.load(&document) {
            Ok(Some(bibliography)) => bibliography,
            Ok(None) => {
                tracing::debug!(path = %document.path().display(), "no bibliography");
                return Ok(ProcessedDocument::untouched(
                    document,
                    DocumentOutcome::Unchanged(UnchangedReason::NoBibliography),
                ));
            }
            Err(err) => {
                tracing::warn!(
                    path = %document.path().display(),
                    "bibliography unavailable, leaving citations unresolved: {}",
                    err.describe()
                );
                return Ok(ProcessedDocument::untouched(
                    document,
                    DocumentOutcome::Unchanged(UnchangedReason::BibliographyUnavailable(err)),
                ));
            }
        };

        let occurrences = scan(document.body());
        if occurrences.is_empty() {
            tracing::info!(path = %document.path().display(), "no citations found");
            return Ok(ProcessedDocument::untouched(
                document,
                DocumentOutcome::Unchanged(UnchangedReason::NoCitations),
            ));
        }

        let index = ReferenceIndex::build(&occurrences);
        let formatted = style.render_bibliography(&bibliography, &index);

        let mut patch = Patch::with_capacity(occurrences.len());
        for occurrence in &occurrences {
            match style.inline_label(occurrence.citekeys(), &formatted) {
                Ok(label) => patch.replace(occurrence.span(), label),
                Err(err) => {
                    tracing::error!(path = %document.path().display(), "{err}");
                    return Ok(ProcessedDocument::untouched(
                        document,
                        DocumentOutcome::Failed(err),
                    ));
                }
            }
        }
        patch.append(formatted.to_html());

        let (path, mut text, body) = document.into_parts();
        text.push_str(&patch.apply(body));
        tracing::debug!(
            path = %path.display(),
            citations = occurrences.len(),
            references = formatted.len(),
            "resolved citations"
        );

        Ok(ProcessedDocument {
            path,
            text,
            outcome: DocumentOutcome::Resolved {
                citations: occurrences.len(),
                references: formatted.len(),
            },
        })
    }

    /// Process documents in parallel, preserving input order.
    ///
    /// Stops at the first run-fatal error and raises the cancellation flag.
    pub fn process_all(
        &self,
        documents: Vec<Document>,
    ) -> Result<Vec<ProcessedDocument>, ReferenceError> {
        documents
            .into_par_iter()
            .map(|document| {
                self.process(document).inspect_err(|err| {
                    tracing::error!("aborting run: {err}");
                    self.cancelled.store(true, Ordering::Relaxed);
                })
            })
            .collect()
    }
}
