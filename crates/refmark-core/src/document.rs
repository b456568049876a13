//! Document adapter boundary.
//!
//! A [`Document`] is a path plus text, optionally starting with a YAML front
//! matter block that carries citation metadata:
//!
//! ```text
//! ---
//! title: Notes
//! bibliography: refs.bib
//! bibliography_format: bibtex
//! citestyle: author-year
//! ---
//! Body with [@smith99] markers.
//! ```
//!
//! Front matter is kept verbatim; only the body is ever rewritten.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Citation metadata of one document.
///
/// Unknown front matter keys are ignored. The Pelican header names
/// `Bibliography` and `BibliographyFormat` are accepted as aliases.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DocumentMetadata {
    /// Bibliography source, relative to the document or the source dir.
    #[serde(alias = "Bibliography")]
    pub bibliography: Option<String>,

    /// Explicit format overriding the extension.
    #[serde(alias = "BibliographyFormat", alias = "bibliographyformat")]
    pub bibliography_format: Option<String>,

    /// Inline label style for this document only.
    pub citestyle: Option<String>,

    /// Listing style for this document only.
    pub bibstyle: Option<String>,
}

/// Error reading document front matter.
#[derive(Debug, thiserror::Error)]
#[error("invalid front matter in {}", path.display())]
pub struct FrontMatterError {
    path: PathBuf,
    #[source]
    source: serde_yaml::Error,
}

/// A document handed to the engine.
#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    metadata: DocumentMetadata,
    front_matter: String,
    body: String,
}

impl Document {
    /// Create a document without front matter.
    pub fn new(path: impl Into<PathBuf>, body: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            metadata: DocumentMetadata::default(),
            front_matter: String::new(),
            body: body.into(),
        }
    }

    /// Replace the document's metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: DocumentMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Split `text` into front matter and body and read the metadata.
    pub fn parse(path: impl Into<PathBuf>, text: String) -> Result<Self, FrontMatterError> {
        let path = path.into();
        let Some((yaml, body_start)) = split_front_matter(&text) else {
            return Ok(Self::new(path, text));
        };

        let metadata = if yaml.trim().is_empty() {
            DocumentMetadata::default()
        } else {
            match serde_yaml::from_str(yaml) {
                Ok(metadata) => metadata,
                Err(source) => return Err(FrontMatterError { path, source }),
            }
        };

        let mut front_matter = text;
        let body = front_matter.split_off(body_start);
        Ok(Self {
            path,
            metadata,
            front_matter,
            body,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }

    /// Text after the front matter.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Split into the path, the verbatim front matter and the body.
    #[must_use]
    pub fn into_parts(self) -> (PathBuf, String, String) {
        (self.path, self.front_matter, self.body)
    }

    /// Reassemble the full text.
    #[must_use]
    pub fn into_text(self) -> String {
        let mut text = self.front_matter;
        text.push_str(&self.body);
        text
    }
}

/// Locate a leading `---` block.
///
/// Returns the YAML source and the byte offset where the body starts. The
/// block is closed by a `---` or `...` line.
fn split_front_matter(text: &str) -> Option<(&str, usize)> {
    let rest = text.strip_prefix("---")?;
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))?;
    let yaml_start = text.len() - rest.len();

    let mut offset = yaml_start;
    for line in rest.split_inclusive('\n') {
        let content = line.trim_end_matches(['\r', '\n']);
        if content == "---" || content == "..." {
            return Some((&text[yaml_start..offset], offset + line.len()));
        }
        offset += line.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_front_matter() {
        let text = "---\ntitle: Notes\nbibliography: refs.bib\ncitestyle: author-year\n---\nBody [@a].\n";
        let document = Document::parse("notes.md", text.to_owned()).unwrap();

        assert_eq!(
            document.metadata(),
            &DocumentMetadata {
                bibliography: Some("refs.bib".to_owned()),
                citestyle: Some("author-year".to_owned()),
                ..DocumentMetadata::default()
            }
        );
        assert_eq!(document.body(), "Body [@a].\n");
        assert_eq!(document.into_text(), text);
    }

    #[test]
    fn test_pelican_aliases() {
        let text = "---\nBibliography: refs.json\nBibliographyFormat: csljson\n---\n";
        let document = Document::parse("a.md", text.to_owned()).unwrap();

        assert_eq!(document.metadata().bibliography.as_deref(), Some("refs.json"));
        assert_eq!(
            document.metadata().bibliography_format.as_deref(),
            Some("csljson")
        );
        assert_eq!(document.body(), "");
    }

    #[test]
    fn test_no_front_matter() {
        let document = Document::parse("a.md", "Just text [@a].".to_owned()).unwrap();
        assert_eq!(document.metadata(), &DocumentMetadata::default());
        assert_eq!(document.body(), "Just text [@a].");
    }

    #[test]
    fn test_unclosed_block_is_body() {
        let text = "---\nnot front matter\n";
        let document = Document::parse("a.md", text.to_owned()).unwrap();
        assert_eq!(document.body(), text);
    }

    #[test]
    fn test_crlf_and_dots_terminator() {
        let text = "---\r\nbibliography: refs.bib\r\n...\r\nBody";
        let document = Document::parse("a.md", text.to_owned()).unwrap();
        assert_eq!(document.metadata().bibliography.as_deref(), Some("refs.bib"));
        assert_eq!(document.body(), "Body");
    }

    #[test]
    fn test_empty_block() {
        let document = Document::parse("a.md", "---\n---\nBody".to_owned()).unwrap();
        assert_eq!(document.metadata(), &DocumentMetadata::default());
        assert_eq!(document.body(), "Body");
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        let err = Document::parse("a.md", "---\nbibliography: [unclosed\n---\n".to_owned())
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid front matter in a.md");
    }

    #[test]
    fn test_into_parts() {
        let document = Document::parse("a.md", "---\nx: 1\n---\nBody".to_owned()).unwrap();
        let (path, front_matter, body) = document.into_parts();
        assert_eq!(path, PathBuf::from("a.md"));
        assert_eq!(front_matter, "---\nx: 1\n---\n");
        assert_eq!(body, "Body");
    }
}
