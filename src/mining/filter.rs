//! Exclusion keywords and exact-title deduplication.

use std::collections::HashSet;

/// Publication types and populations excluded from the dataset
pub const EXCLUSION_TERMS: [&str; 9] = [
    "review",
    "systematic review",
    "revisión sistemática",
    "meta-analysis",
    "meta análisis",
    "niño",
    "child",
    "children",
    "adolescente",
];

/// True when `text` contains any exclusion term, ignoring case
#[must_use]
pub fn excluir_palabras(text: &str) -> bool {
    let lowered = text.to_lowercase();
    EXCLUSION_TERMS.iter().any(|term| lowered.contains(term))
}

/// Keep the first item for each distinct key, preserving order
pub fn dedup_by_title<T, F>(items: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(key(item).to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusion_is_case_insensitive() {
        assert!(excluir_palabras("A Systematic Review of eradication"));
        assert!(excluir_palabras("resistance in CHILDREN"));
        assert!(excluir_palabras("estudio en niño con gastritis"));
        assert!(!excluir_palabras("clarithromycin resistance in adults"));
    }

    #[test]
    fn test_dedup_keeps_first() {
        let items = vec![("a", 1), ("b", 2), ("a", 3), ("", 4), ("", 5)];
        let kept = dedup_by_title(items, |item| item.0);
        assert_eq!(kept, vec![("a", 1), ("b", 2), ("", 4)]);
    }
}
