//! Munge value derivation.
//!
//! A munge is a named transformation of the raw search phrase. Compilation
//! consults the resulting map by name: the built-in `onephrase`, `and`,
//! and `or` slots are always present, and a handler's custom munges are
//! layered on top.

use std::collections::HashMap;

use helio_spec::MungeOp;

/// Map from munge name to the derived query fragment.
pub type MungeValues = HashMap<String, String>;

/// Builds the munge values for a phrase.
///
/// For basic phrases, `tokens` carries the tokenized input: `onephrase`
/// re-joins the tokens quoted (with any interior quotes removed), while
/// `and`/`or` join them with the respective operator.
///
/// For advanced phrases, pass `None`: every built-in slot receives the
/// phrase unmodified, except `onephrase`, which is quoted only when the
/// phrase contains neither an existing quote nor a boolean NOT (quoting
/// either would change its meaning).
///
/// Custom munges each start from the raw phrase; their operation lists are
/// applied in order for basic phrases and skipped for advanced ones.
pub fn munge_values(
    phrase: &str,
    custom: &[(String, Vec<MungeOp>)],
    tokens: Option<&[String]>,
) -> MungeValues {
    let mut values = MungeValues::new();

    match tokens {
        Some(tokens) => {
            let joined = tokens.join(" ").replace('"', "");
            values.insert("onephrase".to_string(), format!("\"{joined}\""));
            values.insert("and".to_string(), tokens.join(" AND "));
            values.insert("or".to_string(), tokens.join(" OR "));
        }
        None => {
            let onephrase = if phrase.contains('"') || phrase.contains(" NOT ") {
                phrase.to_string()
            } else {
                format!("\"{phrase}\"")
            };
            values.insert("onephrase".to_string(), onephrase);
            values.insert("and".to_string(), phrase.to_string());
            values.insert("or".to_string(), phrase.to_string());
        }
    }

    for (name, ops) in custom {
        let mut value = phrase.to_string();
        if tokens.is_some() {
            for op in ops {
                value = op.apply(&value);
            }
        }
        values.insert(name.clone(), value);
    }

    values
}

#[cfg(test)]
mod tests {
    use helio_spec::MungeOp;

    use super::*;
    use crate::tokenize_input;

    fn basic(phrase: &str, custom: &[(String, Vec<MungeOp>)]) -> MungeValues {
        let tokens = tokenize_input(phrase);
        munge_values(phrase, custom, Some(&tokens))
    }

    #[test]
    fn basic_builtins() {
        let values = basic("dogs cats", &[]);
        assert_eq!(values["onephrase"], "\"dogs cats\"");
        assert_eq!(values["and"], "dogs AND cats");
        assert_eq!(values["or"], "dogs OR cats");
    }

    #[test]
    fn basic_onephrase_strips_interior_quotes() {
        let values = basic("\"exact phrase\" extra", &[]);
        assert_eq!(values["onephrase"], "\"exact phrase extra\"");
    }

    #[test]
    fn advanced_passthrough() {
        let values = munge_values("(a OR b)", &[], None);
        assert_eq!(values["onephrase"], "\"(a OR b)\"");
        assert_eq!(values["and"], "(a OR b)");
        assert_eq!(values["or"], "(a OR b)");
    }

    #[test]
    fn advanced_onephrase_skips_quoting_with_not() {
        let values = munge_values("dogs NOT cats", &[], None);
        assert_eq!(values["onephrase"], "dogs NOT cats");
    }

    #[test]
    fn advanced_onephrase_skips_quoting_with_quote() {
        let values = munge_values("\"dogs\" cats", &[], None);
        assert_eq!(values["onephrase"], "\"dogs\" cats");
    }

    #[test]
    fn custom_munge_applies_in_order() {
        let custom = vec![(
            "exact".to_string(),
            vec![MungeOp::Uppercase, MungeOp::Append("*".to_string())],
        )];
        let values = basic("qa76 .5", &custom);
        assert_eq!(values["exact"], "QA76 .5*");
    }

    #[test]
    fn custom_munge_skipped_for_advanced() {
        let custom = vec![("exact".to_string(), vec![MungeOp::Uppercase])];
        let values = munge_values("qa76*", &custom, None);
        assert_eq!(values["exact"], "qa76*");
    }
}
