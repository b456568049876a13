//! Error taxonomy for citation processing.
//!
//! Every error knows whether it is confined to one document or fatal to the
//! whole run; see [`ReferenceError::scope`].

use std::fmt;
use std::path::PathBuf;

use crate::bibliography::{BibliographyFormat, ConversionError};

/// Which registry a style name was looked up in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StyleKind {
    /// Inline label style (`citestyle`).
    Citation,
    /// Listing style (`bibstyle`).
    Bibliography,
}

impl fmt::Display for StyleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Citation => f.write_str("citation"),
            Self::Bibliography => f.write_str("bibliography"),
        }
    }
}

/// How far an error reaches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorScope {
    /// Only the document being processed is affected.
    Document,
    /// The run cannot continue.
    Run,
}

/// Error raised while resolving citations.
#[derive(Debug, thiserror::Error)]
pub enum ReferenceError {
    /// The referenced bibliography file does not exist.
    #[error("bibliography source not found: {}", path.display())]
    MissingBibliographySource {
        /// Resolved path that was looked up.
        path: PathBuf,
    },

    /// Neither an override nor the file extension names a known format.
    #[error("unknown bibliography format '{extension}' for {}", path.display())]
    UnknownBibliographyFormat {
        /// Bibliography path.
        path: PathBuf,
        /// Offending extension or override string.
        extension: String,
    },

    /// The bibliography could not be read from disk.
    #[error("failed to read bibliography {}", path.display())]
    BibliographyRead {
        /// Bibliography path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The external converter did not produce usable output.
    #[error("failed to convert bibliography from {from} to {to}")]
    BibliographyConversionFailed {
        /// Source format.
        from: BibliographyFormat,
        /// Target format.
        to: BibliographyFormat,
        /// What went wrong.
        #[source]
        reason: ConversionError,
    },

    /// Normalized bibliography data is not valid CSL-JSON.
    #[error("failed to parse bibliography {}", path.display())]
    BibliographyParseError {
        /// Bibliography path.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A citation refers to a key the bibliography does not define.
    #[error("citekey '{citekey}' not found in bibliography")]
    CitekeyNotFound {
        /// The missing key, without the leading `@`.
        citekey: String,
    },

    /// A configured style name is not registered.
    #[error("unknown {kind} style '{name}' (available: {})", available.join(", "))]
    UnknownLabelStyle {
        /// Registry the name was looked up in.
        kind: StyleKind,
        /// The configured name.
        name: String,
        /// Registered names.
        available: &'static [&'static str],
    },
}

impl ReferenceError {
    /// Propagation class of this error.
    #[must_use]
    pub fn scope(&self) -> ErrorScope {
        match self {
            Self::UnknownLabelStyle { .. } => ErrorScope::Run,
            _ => ErrorScope::Document,
        }
    }

    /// Message followed by every source, separated by `: `.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }

    /// Whether this error leaves the document's bibliography unavailable.
    ///
    /// Such documents keep their raw markers; they are not counted as
    /// authoring failures.
    #[must_use]
    pub fn is_bibliography_problem(&self) -> bool {
        matches!(
            self,
            Self::MissingBibliographySource { .. }
                | Self::UnknownBibliographyFormat { .. }
                | Self::BibliographyRead { .. }
                | Self::BibliographyConversionFailed { .. }
                | Self::BibliographyParseError { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_style_is_run_fatal() {
        let err = ReferenceError::UnknownLabelStyle {
            kind: StyleKind::Citation,
            name: "fancy".to_owned(),
            available: &["numeric", "author-year"],
        };
        assert_eq!(err.scope(), ErrorScope::Run);
        assert_eq!(
            err.to_string(),
            "unknown citation style 'fancy' (available: numeric, author-year)"
        );
    }

    #[test]
    fn test_missing_citekey_is_document_scoped() {
        let err = ReferenceError::CitekeyNotFound {
            citekey: "ghost".to_owned(),
        };
        assert_eq!(err.scope(), ErrorScope::Document);
        assert!(!err.is_bibliography_problem());
    }

    #[test]
    fn test_describe_includes_sources() {
        let err = ReferenceError::BibliographyConversionFailed {
            from: BibliographyFormat::Biblatex,
            to: BibliographyFormat::CslJson,
            reason: ConversionError::EmptyOutput,
        };
        assert_eq!(
            err.describe(),
            "failed to convert bibliography from biblatex to csljson: converter produced no output"
        );
    }

    #[test]
    fn test_missing_source_is_bibliography_problem() {
        let err = ReferenceError::MissingBibliographySource {
            path: PathBuf::from("refs.bib"),
        };
        assert_eq!(err.scope(), ErrorScope::Document);
        assert!(err.is_bibliography_problem());
        assert_eq!(err.to_string(), "bibliography source not found: refs.bib");
    }
}
