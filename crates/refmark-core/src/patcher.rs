//! Offset-based text splicing.
//!
//! Splices are collected first and applied in one go, highest offset first,
//! so every pending span still points at the original bytes when its turn
//! comes.

use std::ops::Range;

/// Pending edits to one document body.
///
/// # Example
///
/// ```
/// use refmark_core::Patch;
///
/// let text = "See [@a] and [@b].".to_owned();
/// let mut patch = Patch::new();
/// patch.replace(4..8, "[1]");
/// patch.replace(13..17, "[2]");
/// patch.append("<ol></ol>");
///
/// assert_eq!(patch.apply(text), "See [1] and [2].\n\n<ol></ol>\n");
/// ```
#[derive(Debug, Default)]
pub struct Patch {
    splices: Vec<(Range<usize>, String)>,
    appendix: Option<String>,
}

impl Patch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            splices: Vec::with_capacity(capacity),
            appendix: None,
        }
    }

    /// Replace the bytes in `span` with `label`.
    pub fn replace(&mut self, span: Range<usize>, label: impl Into<String>) {
        self.splices.push((span, label.into()));
    }

    /// Append `fragment` after the text, separated by a blank line.
    pub fn append(&mut self, fragment: impl Into<String>) {
        self.appendix = Some(fragment.into());
    }

    /// Apply all edits.
    ///
    /// Spans are expected to be disjoint and on character boundaries, as
    /// the scanner produces them. A span violating that is skipped with a
    /// warning rather than corrupting the text.
    #[must_use]
    pub fn apply(mut self, mut text: String) -> String {
        self.splices.sort_by(|a, b| b.0.start.cmp(&a.0.start));

        let mut limit = text.len();
        for (span, label) in self.splices {
            let valid = span.start <= span.end
                && span.end <= limit
                && text.is_char_boundary(span.start)
                && text.is_char_boundary(span.end);
            if !valid {
                tracing::warn!(?span, "skipping invalid or overlapping splice");
                continue;
            }
            text.replace_range(span.clone(), &label);
            limit = span.start;
        }

        if let Some(fragment) = self.appendix {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push('\n');
            text.push_str(&fragment);
            text.push('\n');
        }
        text
    }

    /// Number of pending edits; an appended fragment counts as one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.splices.len() + usize::from(self.appendix.is_some())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.splices.is_empty() && self.appendix.is_none()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::scanner::scan;

    #[test]
    fn test_empty_patch_is_identity() {
        assert_eq!(Patch::new().apply("unchanged".to_owned()), "unchanged");
    }

    #[test]
    fn test_len_and_is_empty_agree() {
        let mut patch = Patch::new();
        assert_eq!(patch.len(), 0);
        assert!(patch.is_empty());

        patch.append("<ol></ol>");
        assert_eq!(patch.len(), 1);
        assert!(!patch.is_empty());

        patch.replace(0..4, "[1]");
        assert_eq!(patch.len(), 2);
    }

    #[test]
    fn test_order_of_registration_does_not_matter() {
        let text = "A [@a] B [@b] C";
        let mut forward = Patch::new();
        forward.replace(2..6, "<x>");
        forward.replace(9..13, "<yy>");
        let mut backward = Patch::new();
        backward.replace(9..13, "<yy>");
        backward.replace(2..6, "<x>");

        assert_eq!(forward.apply(text.to_owned()), "A <x> B <yy> C");
        assert_eq!(backward.apply(text.to_owned()), "A <x> B <yy> C");
    }

    #[test]
    fn test_length_accounts_for_every_splice() {
        let text = "[@a] one [@b, @c] two [@a] three [@d]".to_owned();
        let occurrences = scan(&text);
        let labels = ["<sup>1</sup>", "x", "", "[4]"];

        let mut patch = Patch::new();
        for (occurrence, label) in occurrences.iter().zip(labels) {
            patch.replace(occurrence.span(), label);
        }
        let marker_len: usize = occurrences.iter().map(|o| o.end() - o.start()).sum();
        let label_len: usize = labels.iter().map(|l| l.len()).sum();
        let expected = text.len() - marker_len + label_len;

        assert_eq!(patch.apply(text).len(), expected);
    }

    #[test]
    fn test_adjacent_spans() {
        let mut patch = Patch::new();
        patch.replace(0..4, "1");
        patch.replace(4..8, "2");
        assert_eq!(patch.apply("[@a][@b]".to_owned()), "12");
    }

    #[test]
    fn test_append_after_trailing_newline() {
        let mut patch = Patch::new();
        patch.append("<section></section>");
        assert_eq!(
            patch.apply("Body\n".to_owned()),
            "Body\n\n<section></section>\n"
        );
    }

    #[test]
    fn test_overlapping_span_is_skipped() {
        let mut patch = Patch::new();
        patch.replace(0..6, "X");
        patch.replace(4..8, "Y");
        assert_eq!(patch.apply("abcdefgh".to_owned()), "abcdY");
    }

    #[test]
    fn test_out_of_bounds_span_is_skipped() {
        let mut patch = Patch::new();
        patch.replace(2..50, "X");
        assert_eq!(patch.apply("short".to_owned()), "short");
    }

    #[test]
    fn test_non_char_boundary_is_skipped() {
        let mut patch = Patch::new();
        patch.replace(1..2, "X");
        assert_eq!(patch.apply("ü".to_owned()), "ü");
    }
}
