//! First-appearance reference numbering.

use std::collections::HashMap;

use crate::scanner::CitationOccurrence;

/// Citekeys of one document numbered by first appearance.
///
/// Number 1 goes to the first key of the first occurrence; a key cited
/// again keeps its number. Keys missing from the bibliography are numbered
/// too; resolving them is the label style's concern.
#[derive(Debug, Default, Clone)]
pub struct ReferenceIndex {
    order: Vec<String>,
    numbers: HashMap<String, usize>,
}

impl ReferenceIndex {
    /// Number the citekeys of `occurrences` in scan order.
    #[must_use]
    pub fn build(occurrences: &[CitationOccurrence]) -> Self {
        let mut index = Self::default();
        for citekey in occurrences.iter().flat_map(CitationOccurrence::citekeys) {
            if !index.numbers.contains_key(citekey) {
                index.order.push(citekey.clone());
                index.numbers.insert(citekey.clone(), index.order.len());
            }
        }
        index
    }

    /// 1-based number of `citekey`.
    #[must_use]
    pub fn number(&self, citekey: &str) -> Option<usize> {
        self.numbers.get(citekey).copied()
    }

    /// Citekeys in first-appearance order.
    pub fn citekeys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// `(number, citekey)` pairs in first-appearance order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.citekeys().enumerate().map(|(i, key)| (i + 1, key))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::scanner::scan;

    #[test]
    fn test_first_seen_numbering() {
        let index = ReferenceIndex::build(&scan("[@b] [@a, @b] [@c] [@a]"));

        assert_eq!(index.number("b"), Some(1));
        assert_eq!(index.number("a"), Some(2));
        assert_eq!(index.number("c"), Some(3));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_iteration_preserves_insertion_order() {
        let index = ReferenceIndex::build(&scan("[@z, @y] [@x] [@y]"));

        assert_eq!(index.iter().collect::<Vec<_>>(), vec![(1, "z"), (2, "y"), (3, "x")]);
    }

    #[test]
    fn test_repeat_within_one_marker() {
        let index = ReferenceIndex::build(&scan("[@a, @a, @b]"));
        assert_eq!(index.citekeys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_unknown_key() {
        let index = ReferenceIndex::build(&scan("[@a]"));
        assert_eq!(index.number("ghost"), None);
    }

    #[test]
    fn test_empty() {
        let index = ReferenceIndex::build(&[]);
        assert!(index.is_empty());
        assert_eq!(index.iter().count(), 0);
    }
}
