//! Citation resolution engine.
//!
//! Replaces citation markers such as `[@smith99, @doe01]` in document text
//! with rendered labels and appends a reference listing built from the
//! document's bibliography.
//!
//! # Pipeline
//!
//! ```text
//! Document ──► BibliographyLoader ──► Bibliography
//!    │                                     │
//!    └─► scan ──► ReferenceIndex ──► ReferenceStyle ──► Patch ──► text
//! ```
//!
//! - [`BibliographyLoader`]: resolves, reads and normalizes the bibliography,
//!   converting non-CSL-JSON sources through a [`Converter`]
//! - [`scan`]: finds [`CitationOccurrence`]s in the body
//! - [`ReferenceIndex`]: numbers citekeys by first appearance
//! - [`ReferenceStyle`]: renders inline labels and the listing
//! - [`Patch`]: splices labels into the body, highest offset first
//!
//! [`ReferencesProcessor`] runs the pipeline per document and over a batch
//! in parallel.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use refmark_core::{
//!     BibliographyLoader, ConversionError, Document, FnConverter, ReferenceSettings,
//!     ReferencesProcessor,
//! };
//!
//! let converter = Arc::new(FnConverter::new(|_, _, _: &[u8]| {
//!     Err(ConversionError::Failed("not needed".to_owned()))
//! }));
//! let processor = ReferencesProcessor::new(
//!     &ReferenceSettings::default(),
//!     BibliographyLoader::new(converter),
//! )
//! .unwrap();
//!
//! // Without a bibliography the document passes through untouched.
//! let processed = processor.process(Document::new("post.md", "See [@a].")).unwrap();
//! assert_eq!(processed.text(), "See [@a].");
//! ```

mod bibliography;
mod document;
mod error;
mod index;
mod patcher;
mod processor;
mod scanner;
mod style;

pub use bibliography::{
    Bibliography, BibliographyFormat, BibliographyLoader, ConversionError, Converter,
    DateVariable, FnConverter, Name, PandocConverter, Reference, StringOrNumber,
};
pub use document::{Document, DocumentMetadata, FrontMatterError};
pub use error::{ErrorScope, ReferenceError, StyleKind};
pub use index::ReferenceIndex;
pub use patcher::Patch;
pub use processor::{
    DocumentOutcome, ProcessedDocument, ReferencesProcessor, RunSummary, UnchangedReason,
};
pub use scanner::{CitationOccurrence, scan};
pub use style::{
    FormattedBibliography, FormattedEntry, LabelStyle, ListingStyle, ReferenceSettings,
    ReferenceStyle,
};
