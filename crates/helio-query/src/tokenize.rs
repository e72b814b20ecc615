//! Input tokenization.
//!
//! Splits a basic phrase on whitespace while keeping quoted substrings
//! (with an optional `~N` proximity suffix) intact, then glues boolean
//! keywords onto their neighbors so an operator never stands alone.

use std::sync::LazyLock;

use regex::Regex;

/// A quoted phrase with optional proximity suffix, or a bare word.
static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""[^"]*"~[0-9]+|"[^"]*"|[^ ]+"#).expect("static pattern is valid")
});

/// Tokenizes user input on spaces and quotes.
///
/// A token equal to `AND`, `OR`, or `NOT` is merged into the previous
/// token together with the following one, so `a AND b` yields the single
/// token `a AND b` rather than three. A leading operator with nothing
/// before it is dropped.
pub fn tokenize_input(input: &str) -> Vec<String> {
    let words: Vec<&str> = TOKEN.find_iter(input).map(|m| m.as_str()).collect();

    let mut tokens: Vec<String> = Vec::with_capacity(words.len());
    let mut i = 0;
    while i < words.len() {
        let word = words[i];
        if matches!(word, "AND" | "OR" | "NOT") {
            if let Some(last) = tokens.last_mut() {
                last.push(' ');
                last.push_str(word);
                if let Some(next) = words.get(i + 1) {
                    last.push(' ');
                    last.push_str(next);
                    i += 1;
                }
            }
        } else {
            tokens.push(word.to_string());
        }
        i += 1;
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input() {
        assert!(tokenize_input("").is_empty());
        assert!(tokenize_input("   ").is_empty());
    }

    #[test]
    fn plain_words() {
        assert_eq!(tokenize_input("dogs cats"), vec!["dogs", "cats"]);
    }

    #[test]
    fn quoted_phrase_stays_whole() {
        assert_eq!(
            tokenize_input("\"error handling\" rust"),
            vec!["\"error handling\"", "rust"]
        );
    }

    #[test]
    fn proximity_suffix_stays_attached() {
        assert_eq!(tokenize_input("\"a b\"~2 c"), vec!["\"a b\"~2", "c"]);
    }

    #[test]
    fn boolean_glues_neighbors() {
        assert_eq!(tokenize_input("a AND b"), vec!["a AND b"]);
        assert_eq!(tokenize_input("a OR b c"), vec!["a OR b", "c"]);
        assert_eq!(tokenize_input("a NOT b"), vec!["a NOT b"]);
    }

    #[test]
    fn chained_booleans_collapse() {
        assert_eq!(tokenize_input("a AND b AND c"), vec!["a AND b AND c"]);
    }

    #[test]
    fn lowercase_operators_are_words() {
        assert_eq!(tokenize_input("a and b"), vec!["a", "and", "b"]);
    }

    #[test]
    fn leading_operator_is_dropped() {
        assert_eq!(tokenize_input("AND dogs"), vec!["dogs"]);
    }

    #[test]
    fn trailing_operator_merges_alone() {
        assert_eq!(tokenize_input("dogs AND"), vec!["dogs AND"]);
    }
}
