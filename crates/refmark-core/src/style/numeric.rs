//! Numeric-bracket labels: `[1]` in the listing, `<sup>[1, 2]</sup>` inline.

use std::fmt::Write;

use super::FormattedBibliography;
use crate::error::ReferenceError;

/// Listing labels for `count` entries: `[1]`, `[2]`, ...
pub(super) fn labels(count: usize) -> Vec<String> {
    (1..=count).map(|n| format!("[{n}]")).collect()
}

/// One link per citekey, joined by commas inside a single bracket pair.
pub(super) fn inline_label(
    citekeys: &[String],
    bibliography: &FormattedBibliography,
) -> Result<String, ReferenceError> {
    let mut links = String::new();
    for (i, citekey) in citekeys.iter().enumerate() {
        let entry = bibliography.lookup(citekey)?;
        if i > 0 {
            links.push_str(", ");
        }
        let number = entry.label().trim_start_matches('[').trim_end_matches(']');
        let _ = write!(links, "<a href=\"#{}\">{number}</a>", entry.anchor());
    }
    Ok(format!("<sup>[{links}]</sup>"))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(labels(3), vec!["[1]", "[2]", "[3]"]);
        assert!(labels(0).is_empty());
    }
}
