//! Bibliography loading and the normalized entry set.

mod convert;
mod format;
mod loader;
mod reference;

use std::collections::HashMap;

pub use convert::{ConversionError, Converter, FnConverter, PandocConverter};
pub use format::BibliographyFormat;
pub use loader::BibliographyLoader;
pub use reference::{DateVariable, Name, Reference, StringOrNumber};

/// Entries of one bibliography in source order, indexed by citekey.
#[derive(Debug, Default, Clone)]
pub struct Bibliography {
    entries: Vec<Reference>,
    by_key: HashMap<String, usize>,
}

impl Bibliography {
    /// Parse a CSL-JSON array.
    ///
    /// When two entries share an id the later one replaces the earlier one
    /// in place.
    pub fn from_csl_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let references: Vec<Reference> = serde_json::from_slice(bytes)?;
        Ok(Self::from_references(references))
    }

    /// Build from already-parsed references.
    #[must_use]
    pub fn from_references(references: impl IntoIterator<Item = Reference>) -> Self {
        let mut bibliography = Self::default();
        for reference in references {
            bibliography.insert(reference);
        }
        bibliography
    }

    fn insert(&mut self, reference: Reference) {
        if let Some(&slot) = self.by_key.get(&reference.id) {
            tracing::warn!(
                citekey = %reference.id,
                "duplicate bibliography entry, keeping the later one"
            );
            self.entries[slot] = reference;
        } else {
            self.by_key.insert(reference.id.clone(), self.entries.len());
            self.entries.push(reference);
        }
    }

    /// Entry for `citekey`.
    #[must_use]
    pub fn get(&self, citekey: &str) -> Option<&Reference> {
        self.by_key.get(citekey).map(|&slot| &self.entries[slot])
    }

    #[must_use]
    pub fn contains(&self, citekey: &str) -> bool {
        self.by_key.contains_key(citekey)
    }

    /// Entries in source order.
    #[must_use]
    pub fn entries(&self) -> &[Reference] {
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_array() {
        let bibliography = Bibliography::from_csl_json(
            br#"[{"id": "smith99", "title": "A"}, {"id": "doe01", "title": "B"}]"#,
        )
        .unwrap();

        assert_eq!(bibliography.len(), 2);
        assert_eq!(bibliography.entries()[0].id, "smith99");
        assert_eq!(bibliography.get("doe01").unwrap().title.as_deref(), Some("B"));
        assert!(!bibliography.contains("ghost"));
    }

    #[test]
    fn test_duplicate_id_later_wins_in_place() {
        let bibliography = Bibliography::from_csl_json(
            br#"[{"id": "a", "title": "old"}, {"id": "b"}, {"id": "a", "title": "new"}]"#,
        )
        .unwrap();

        assert_eq!(bibliography.len(), 2);
        assert_eq!(bibliography.entries()[0].title.as_deref(), Some("new"));
        assert_eq!(bibliography.entries()[1].id, "b");
    }

    #[test]
    fn test_rejects_non_array() {
        assert!(Bibliography::from_csl_json(br#"{"id": "a"}"#).is_err());
        assert!(Bibliography::from_csl_json(b"not json").is_err());
    }

    #[test]
    fn test_empty_array() {
        assert!(Bibliography::from_csl_json(b"[]").unwrap().is_empty());
    }
}
