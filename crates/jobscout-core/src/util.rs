/// Collapse runs of whitespace into single spaces and trim both ends.
///
/// Example: `"  Senior   Rust\tEngineer "` → `"Senior Rust Engineer"`
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case-folded, whitespace-collapsed form used for comparisons.
pub fn fold(s: &str) -> String {
    collapse_whitespace(s).to_lowercase()
}

/// Normalize an optional free-text field: collapse whitespace and map
/// empty results to `None`.
pub fn clean_opt(s: Option<&str>) -> Option<String> {
    s.map(collapse_whitespace).filter(|v| !v.is_empty())
}

/// Split free text into lower-cased search tokens.
pub fn tokens(s: &str) -> Vec<String> {
    s.split(|c: char| !c.is_alphanumeric() && c != '+' && c != '#')
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(
            collapse_whitespace("  Senior   Rust\tEngineer \n"),
            "Senior Rust Engineer"
        );
        assert_eq!(collapse_whitespace("   "), "");
    }

    #[test]
    fn test_fold_is_case_insensitive() {
        assert_eq!(fold("ACME  Corp"), fold("acme corp"));
    }

    #[test]
    fn test_clean_opt_drops_blank() {
        assert_eq!(clean_opt(Some("   ")), None);
        assert_eq!(clean_opt(Some(" Berlin ")), Some("Berlin".to_string()));
        assert_eq!(clean_opt(None), None);
    }

    #[test]
    fn test_tokens_keep_language_names() {
        assert_eq!(tokens("C++ / C# developer"), vec!["c++", "c#", "developer"]);
    }
}
