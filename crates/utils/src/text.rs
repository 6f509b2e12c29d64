//! Helpers for case-insensitive LIKE search.

/// Escape `%`, `_` and the escape character itself for a SQL LIKE pattern.
pub fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Lowercased `%term%` pattern for substring search, LIKE-escaped.
pub fn contains_pattern(term: &str) -> String {
    format!("%{}%", escape_like(&term.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_máy"), "50\\%\\_máy");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_contains_pattern() {
        assert_eq!(contains_pattern("Máy In"), "%máy in%");
        assert_eq!(contains_pattern("a_b"), "%a\\_b%");
    }
}
