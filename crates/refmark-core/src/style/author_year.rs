//! Author-year labels: `Smith 1999` in the listing, `(Smith 1999; Doe 2001)`
//! inline.
//!
//! Entries that would share a label get letter suffixes in listing order
//! (`Smith 1999a`, `Smith 1999b`).

use std::collections::HashMap;
use std::fmt::Write;

use super::FormattedBibliography;
use super::html::escape;
use crate::bibliography::{Name, Reference};
use crate::error::ReferenceError;

/// Listing labels for `entries` in listing order.
pub(super) fn labels(entries: &[&Reference]) -> Vec<String> {
    let base: Vec<String> = entries.iter().map(|reference| base_label(reference)).collect();

    let mut totals: HashMap<&str, usize> = HashMap::new();
    for label in &base {
        *totals.entry(label.as_str()).or_default() += 1;
    }

    let mut seen: HashMap<&str, usize> = HashMap::new();
    base.iter()
        .map(|label| {
            if totals[label.as_str()] < 2 {
                return label.clone();
            }
            let nth = seen.entry(label.as_str()).or_default();
            let suffixed = format!("{label}{}", suffix(*nth));
            *nth += 1;
            suffixed
        })
        .collect()
}

fn base_label(reference: &Reference) -> String {
    let year = reference
        .year()
        .map_or_else(|| "n.d.".to_owned(), |year| year.to_string());
    format!("{} {year}", short_names(reference))
}

/// `Smith`, `Smith & Doe` or `Smith et al.`; falls back to the title, then
/// the citekey.
fn short_names(reference: &Reference) -> String {
    let names: Vec<String> = reference
        .creators()
        .iter()
        .filter_map(Name::short_name)
        .collect();
    match names.as_slice() {
        [] => reference
            .title
            .clone()
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| reference.id.clone()),
        [one] => one.clone(),
        [first, second] => format!("{first} & {second}"),
        [first, ..] => format!("{first} et al."),
    }
}

fn suffix(n: usize) -> String {
    ('a'..='z')
        .nth(n)
        .map_or_else(|| format!("-{}", n + 1), String::from)
}

/// One link per citekey, separated by semicolons inside parentheses.
pub(super) fn inline_label(
    citekeys: &[String],
    bibliography: &FormattedBibliography,
) -> Result<String, ReferenceError> {
    let mut links = String::new();
    for (i, citekey) in citekeys.iter().enumerate() {
        let entry = bibliography.lookup(citekey)?;
        if i > 0 {
            links.push_str("; ");
        }
        let _ = write!(
            links,
            "<a href=\"#{}\">{}</a>",
            entry.anchor(),
            escape(entry.label())
        );
    }
    Ok(format!("({links})"))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn reference(json: &str) -> Reference {
        serde_json::from_str(json).unwrap()
    }

    fn authored(id: &str, families: &[&str], year: u32) -> Reference {
        let author: Vec<_> = families
            .iter()
            .map(|family| serde_json::json!({ "family": family }))
            .collect();
        serde_json::from_value(serde_json::json!({
            "id": id,
            "author": author,
            "issued": { "date-parts": [[year]] },
        }))
        .unwrap()
    }

    #[test]
    fn test_name_counts() {
        let one = authored("a", &["Smith"], 1999);
        let two = authored("b", &["Smith", "Doe"], 1999);
        let three = authored("c", &["Smith", "Doe", "Roe"], 1999);

        assert_eq!(base_label(&one), "Smith 1999");
        assert_eq!(base_label(&two), "Smith & Doe 1999");
        assert_eq!(base_label(&three), "Smith et al. 1999");
    }

    #[test]
    fn test_fallbacks() {
        assert_eq!(base_label(&reference(r#"{"id": "key1"}"#)), "key1 n.d.");
        assert_eq!(
            base_label(&reference(r#"{"id": "k", "title": "Anonymous Tract"}"#)),
            "Anonymous Tract n.d."
        );
        assert_eq!(
            base_label(&reference(
                r#"{"id": "k", "editor": [{"literal": "ACM"}], "issued": {"raw": "2010"}}"#
            )),
            "ACM 2010"
        );
    }

    #[test]
    fn test_disambiguation_suffixes() {
        let a = authored("a", &["Smith"], 1999);
        let b = authored("b", &["Doe"], 2001);
        let c = authored("c", &["Smith"], 1999);

        assert_eq!(
            labels(&[&a, &b, &c]),
            vec!["Smith 1999a", "Doe 2001", "Smith 1999b"]
        );
    }

    #[test]
    fn test_suffix_overflow() {
        assert_eq!(suffix(0), "a");
        assert_eq!(suffix(25), "z");
        assert_eq!(suffix(26), "-27");
    }
}
