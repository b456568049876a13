//! Bibliography serialization formats.

use std::fmt;
use std::path::Path;

/// Serialization format of a bibliography source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BibliographyFormat {
    /// biblatex `.bib` syntax.
    Biblatex,
    /// Classic BibTeX `.bib` syntax.
    Bibtex,
    /// CSL-JSON, the native interchange format.
    CslJson,
}

impl BibliographyFormat {
    /// Format parsed without conversion.
    pub const NATIVE: Self = Self::CslJson;

    /// Parse an explicit format name (case-insensitive).
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "biblatex" => Some(Self::Biblatex),
            "bibtex" => Some(Self::Bibtex),
            "csljson" | "csl-json" | "csl_json" => Some(Self::CslJson),
            _ => None,
        }
    }

    /// Infer the format from a file extension.
    ///
    /// A leading dot is tolerated. `.bib` is read as biblatex, which is a
    /// superset of BibTeX for conversion purposes.
    #[must_use]
    pub fn guess(extension: &str) -> Option<Self> {
        let extension = extension.strip_prefix('.').unwrap_or(extension);
        match extension.to_ascii_lowercase().as_str() {
            "bib" => Some(Self::Biblatex),
            "json" => Some(Self::CslJson),
            _ => None,
        }
    }

    /// Infer the format from a path's extension.
    #[must_use]
    pub fn guess_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::guess)
    }

    /// Name understood by the converter.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Biblatex => "biblatex",
            Self::Bibtex => "bibtex",
            Self::CslJson => "csljson",
        }
    }

    /// Whether sources in this format need conversion before parsing.
    #[must_use]
    pub fn needs_conversion(self) -> bool {
        self != Self::NATIVE
    }
}

impl fmt::Display for BibliographyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
