//! Text normalization applied before filtering and extraction.

/// Collapse every whitespace run to one space and trim, keeping case
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize free text for matching: collapsed whitespace, trimmed, lowercase.
///
/// Idempotent: `limpiar(&limpiar(x)) == limpiar(x)`.
#[must_use]
pub fn limpiar(text: &str) -> String {
    collapse_whitespace(text).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limpiar() {
        assert_eq!(limpiar("  Helicobacter\tPYLORI \n\n in Perú "), "helicobacter pylori in perú");
        assert_eq!(limpiar(""), "");
        assert_eq!(limpiar(" \t\n"), "");
    }

    #[test]
    fn test_collapse_keeps_case() {
        assert_eq!(collapse_whitespace("Hospital in\n  Bogotá,  Colombia"), "Hospital in Bogotá, Colombia");
    }
}
