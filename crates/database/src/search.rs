//! Full-text query construction for the FTS5 indexes.

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// English stop words ignored by full-text search and keyword extraction.
pub const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do",
    "does", "did", "will", "would", "could", "should", "may", "might", "must", "can", "this",
    "that", "these", "those", "i", "you", "he", "she", "it", "we", "they", "what", "which",
    "who", "when", "where", "why", "how", "all", "each", "every", "both", "few", "more", "most",
    "other", "some", "such", "no", "not", "only", "own", "same", "so", "than", "too", "very",
    "just", "my", "your",
];

static STOP_WORD_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| STOP_WORDS.iter().copied().collect());

const MAX_QUERY_TERMS: usize = 32;

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORD_SET.contains(word)
}

/// Build an FTS5 `MATCH` expression from free text.
///
/// Tokens are the alphanumeric runs of the lowercased input, minus stop
/// words. Each token is quoted so FTS5 operators in user input stay inert,
/// and tokens are OR-joined. Returns `None` when nothing searchable remains.
pub fn fts_query(input: &str) -> Option<String> {
    let mut seen = HashSet::new();
    let terms: Vec<String> = input
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty() && !is_stop_word(token))
        .filter(|token| seen.insert(token.to_string()))
        .take(MAX_QUERY_TERMS)
        .map(|token| format!("\"{token}\""))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

/// Escape `%`, `_` and `\` for use inside a `LIKE ... ESCAPE '\'` pattern.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_or_joined_quoted_terms() {
        assert_eq!(
            fts_query("How do I reset my Password?").as_deref(),
            Some("\"reset\" OR \"password\"")
        );
    }

    #[test]
    fn neutralises_fts_syntax() {
        assert_eq!(
            fts_query("refund NEAR(\"shipping\") -policy*").as_deref(),
            Some("\"refund\" OR \"near\" OR \"shipping\" OR \"policy\"")
        );
    }

    #[test]
    fn empty_or_stop_word_only_input_yields_none() {
        assert_eq!(fts_query(""), None);
        assert_eq!(fts_query("?!  ..."), None);
        assert_eq!(fts_query("what is the"), None);
    }

    #[test]
    fn duplicate_terms_collapse() {
        assert_eq!(fts_query("billing Billing BILLING").as_deref(), Some("\"billing\""));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
