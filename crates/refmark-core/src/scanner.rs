//! Citation marker scanning.
//!
//! A marker is a bracketed list of `@`-prefixed citekeys:
//!
//! ```text
//! [@smith99]
//! [@smith99, @doe01]
//! [ @smith99 ,@doe01 ]
//! ```
//!
//! Citekeys consist of word characters only. Anything else inside the
//! brackets (punctuation, nested brackets, a key without `@`) means the
//! bracket is not a marker and is left alone.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

static MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\s*@\w+(?:\s*,\s*@\w+)*\s*\]").unwrap());

/// One citation marker found in a text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CitationOccurrence {
    start: usize,
    end: usize,
    citekeys: Vec<String>,
}

impl CitationOccurrence {
    /// Byte offset of the opening bracket.
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Byte offset just past the closing bracket.
    #[must_use]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Byte range of the whole marker.
    #[must_use]
    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Cited keys in marker order, without `@`.
    #[must_use]
    pub fn citekeys(&self) -> &[String] {
        &self.citekeys
    }
}

/// Find every citation marker in `text`, in document order.
///
/// Occurrences never overlap and have strictly increasing offsets.
#[must_use]
pub fn scan(text: &str) -> Vec<CitationOccurrence> {
    MARKER
        .find_iter(text)
        .map(|marker| {
            let inner = &marker.as_str()[1..marker.as_str().len() - 1];
            let citekeys = inner
                .split(',')
                .map(|key| key.trim().trim_start_matches('@').to_owned())
                .collect();
            CitationOccurrence {
                start: marker.start(),
                end: marker.end(),
                citekeys,
            }
        })
        .collect()
}
