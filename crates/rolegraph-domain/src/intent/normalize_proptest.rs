//! Property-based tests for name normalization.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::intent::{normalize_permission_name, normalize_role_name};

    /// Strategy to generate multi-word names with irregular spacing
    fn spaced_words_strategy() -> impl Strategy<Value = String> {
        prop::collection::vec(("[a-zA-Z]{1,8}", "[ \t]{1,3}"), 1..5).prop_map(|parts| {
            parts
                .into_iter()
                .map(|(word, gap)| format!("{word}{gap}"))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn test_permission_name_has_no_whitespace(name in spaced_words_strategy()) {
            let normalized = normalize_permission_name(&name);
            prop_assert!(!normalized.chars().any(char::is_whitespace), "got: {}", normalized);
            prop_assert!(!normalized.starts_with('_') && !normalized.ends_with('_'));
        }

        #[test]
        fn test_permission_name_is_lowercase(name in spaced_words_strategy()) {
            let normalized = normalize_permission_name(&name);
            prop_assert_eq!(normalized.to_lowercase(), normalized.clone());
        }

        #[test]
        fn test_permission_name_is_idempotent(name in "[a-zA-Z_ \\t]{0,40}") {
            let once = normalize_permission_name(&name);
            prop_assert_eq!(normalize_permission_name(&once), once);
        }

        #[test]
        fn test_permission_name_keeps_word_count(name in spaced_words_strategy()) {
            let words = name.split_whitespace().count();
            let normalized = normalize_permission_name(&name);
            prop_assert_eq!(normalized.split('_').count(), words);
        }

        #[test]
        fn test_role_name_is_idempotent(name in "[a-z][a-z ]{0,20}") {
            let once = normalize_role_name(&name);
            prop_assert_eq!(normalize_role_name(&once), once);
        }

        #[test]
        fn test_role_name_capitalizes_and_keeps_tail(first in "[a-z]", tail in "[a-zA-Z ]{0,20}") {
            let name = format!("{first}{tail}");
            let normalized = normalize_role_name(&name);
            prop_assert_eq!(normalized, format!("{}{}", first.to_uppercase(), tail.trim_end()));
        }
    }
}
