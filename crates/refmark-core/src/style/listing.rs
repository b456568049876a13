//! Formatted reference listing.

use std::collections::HashMap;
use std::fmt::Write;

use super::html::escape;
use crate::error::ReferenceError;

/// One rendered listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedEntry {
    citekey: String,
    position: usize,
    label: String,
    body: String,
}

impl FormattedEntry {
    #[must_use]
    pub fn citekey(&self) -> &str {
        &self.citekey
    }

    /// 1-based position in the listing.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Anchor id targeted by inline links: `reference<position>`.
    #[must_use]
    pub fn anchor(&self) -> String {
        format!("reference{}", self.position)
    }

    /// Listing label as plain text.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Entry body as an HTML fragment.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }
}

/// Cited entries of one document in listing order.
#[derive(Debug, Clone, Default)]
pub struct FormattedBibliography {
    entries: Vec<FormattedEntry>,
    positions: HashMap<String, usize>,
    heading: String,
}

impl FormattedBibliography {
    /// Assemble from `(citekey, label, body)` triples in listing order.
    pub(crate) fn new(
        rendered: impl IntoIterator<Item = (String, String, String)>,
        heading: &str,
    ) -> Self {
        let mut bibliography = Self {
            heading: heading.to_owned(),
            ..Self::default()
        };
        for (citekey, label, body) in rendered {
            let position = bibliography.entries.len() + 1;
            bibliography.positions.insert(citekey.clone(), position);
            bibliography.entries.push(FormattedEntry {
                citekey,
                position,
                label,
                body,
            });
        }
        bibliography
    }

    /// Entry for `citekey`, if it is listed.
    #[must_use]
    pub fn get(&self, citekey: &str) -> Option<&FormattedEntry> {
        self.positions
            .get(citekey)
            .and_then(|&position| self.entries.get(position - 1))
    }

    /// Entry for `citekey`, or [`ReferenceError::CitekeyNotFound`].
    pub fn lookup(&self, citekey: &str) -> Result<&FormattedEntry, ReferenceError> {
        self.get(citekey)
            .ok_or_else(|| ReferenceError::CitekeyNotFound {
                citekey: citekey.to_owned(),
            })
    }

    #[must_use]
    pub fn entries(&self) -> &[FormattedEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the listing as an HTML fragment.
    ///
    /// Empty when nothing is listed.
    #[must_use]
    pub fn to_html(&self) -> String {
        if self.entries.is_empty() {
            return String::new();
        }

        let mut html = String::from("<section class=\"references\">\n");
        if !self.heading.is_empty() {
            let _ = writeln!(html, "<h2>{}</h2>", escape(&self.heading));
        }
        html.push_str("<ol class=\"references-list\">\n");
        for entry in &self.entries {
            let _ = writeln!(
                html,
                "<li id=\"{}\"><span class=\"reference-label\">{}</span> {}</li>",
                entry.anchor(),
                escape(&entry.label),
                entry.body
            );
        }
        html.push_str("</ol>\n</section>");
        html
    }
}
