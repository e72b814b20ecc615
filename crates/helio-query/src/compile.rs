//! Query compilation.
//!
//! Turns a handler name and a phrase into a backend query string: either a
//! dismax delegation sub-query or an explicit weighted boolean expression
//! produced by walking the handler's query-field tree. Advanced phrases go
//! through an adapter that defers field-qualified input unchanged and adds
//! boost enrichment from the handler's dismax parameters.

use std::collections::HashSet;
use std::sync::LazyLock;

use helio_spec::{FieldNode, SearchSpec, SpecSet};
use regex::Regex;

use crate::munge::{MungeValues, munge_values};
use crate::normalize::{MATCH_ALL, Normalizer};
use crate::tokenize_input;

/// Colons that are not part of a `field:value` pair (surrounded by
/// whitespace on at least one side).
static STRAY_COLON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(:\s+|\s+:)").expect("static pattern is valid"));

/// Compiles phrases against a set of handler specifications.
#[derive(Debug, Clone)]
pub struct QueryBuilder<'a> {
    /// Handler specifications consulted for every compilation.
    specs: &'a SpecSet,
    /// Normalization rules shared with the caller.
    normalizer: Normalizer,
    /// Fields excluded from the tree walk by active shard configuration.
    stripped_fields: HashSet<String>,
}

impl<'a> QueryBuilder<'a> {
    /// Creates a builder over the given specifications.
    pub fn new(specs: &'a SpecSet, normalizer: Normalizer) -> Self {
        Self {
            specs,
            normalizer,
            stripped_fields: HashSet::new(),
        }
    }

    /// Excludes the given fields from compiled expressions.
    ///
    /// Used when active shards are configured to strip fields that only
    /// some shards carry.
    pub fn with_stripped_fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        self.stripped_fields = fields.into_iter().collect();
        self
    }

    /// The normalizer this builder compiles with.
    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Compiles a basic (tokenizable) phrase for a handler.
    ///
    /// A handler with dismax fields delegates to a dismax sub-query;
    /// otherwise the handler's query-field tree is expanded into a
    /// weighted boolean expression. A handler with no specification is
    /// passed through as a literal field search.
    pub fn basic(&self, handler: &str, phrase: &str) -> String {
        self.component(handler, phrase, true)
    }

    /// Compiles a phrase already known to use advanced syntax.
    ///
    /// Wraps [`QueryBuilder::advanced_inner`] with boost enrichment built
    /// from the handler's `bq`/`bf` dismax parameters.
    pub fn advanced(&self, handler: &str, phrase: &str) -> String {
        let inner = self.advanced_inner(handler, phrase);

        let mut boosts: Vec<String> = Vec::new();
        if let Some(spec) = self.specs.get(handler) {
            for (name, value) in &spec.dismax_params {
                match name.as_str() {
                    "bq" => boosts.push(value.clone()),
                    "bf" => {
                        // A bf parameter may hold several space-separated
                        // function^boost fragments; each becomes its own
                        // _val_ clause.
                        for part in value.split_whitespace() {
                            boosts.push(val_clause(part));
                        }
                    }
                    _ => {}
                }
            }
        }

        if boosts.is_empty() {
            inner
        } else {
            format!("({inner}) AND ({MATCH_ALL} OR {})", boosts.join(" OR "))
        }
    }

    /// Builds the inner portion of an advanced query, without boost
    /// enrichment.
    ///
    /// The separate entry point exists because highlighting wants the
    /// inner query only: boosts added around it would pollute highlight
    /// matches.
    pub fn advanced_inner(&self, handler: &str, phrase: &str) -> String {
        // A bare match-all against a handler with a filter query searches
        // the filter instead, so "everything" stays scoped to the handler.
        if phrase.trim() == MATCH_ALL
            && let Some(spec) = self.specs.get(handler)
            && let Some(filter) = &spec.filter_query
        {
            return filter.clone();
        }

        // Strip colons that cannot be field qualifiers.
        let phrase = STRAY_COLON.replace_all(phrase, " ");

        // A phrase that still carries a field qualifier cannot be mapped
        // onto other fields; defer it unchanged.
        if phrase.contains(':') {
            return phrase.into_owned();
        }

        // An empty phrase means "any value in the handler's fields".
        if phrase.is_empty() {
            return self.component(handler, "[* TO *]", false);
        }

        // A trailing question mark is ambiguous: wildcard or literal?
        // Search both readings.
        let phrase = if let Some(stripped) = phrase.strip_suffix('?') {
            format!("({phrase}) OR ({stripped})")
        } else {
            phrase.into_owned()
        };

        self.component(handler, &phrase, false)
    }

    /// Shared compilation path for basic and advanced phrases.
    fn component(&self, handler: &str, phrase: &str, basic: bool) -> String {
        let Some(spec) = self.specs.get(handler) else {
            // Unknown handler: treat the name as a literal index field.
            return format!("{handler}:({phrase})");
        };

        if basic && spec.has_dismax() {
            let base = dismax_subquery(spec, phrase);
            return match &spec.filter_query {
                Some(filter) => format!("({base}) AND ({filter})"),
                None => base,
            };
        }

        let tokens = basic.then(|| tokenize_input(phrase));
        let values = munge_values(phrase, &spec.custom_munge, tokens.as_deref());
        let base = self.apply_tree(&spec.query_fields, &values, "OR");

        match &spec.filter_query {
            Some(filter) => format!("({base}) AND ({filter})"),
            None => format!("({base})"),
        }
    }

    /// Recursively expands a query-field tree against the munge values.
    fn apply_tree(&self, nodes: &[FieldNode], values: &MungeValues, join: &str) -> String {
        let mut clauses: Vec<String> = Vec::new();

        for node in nodes {
            match node {
                FieldNode::Group {
                    join: inner_join,
                    weight,
                    children,
                } => {
                    let inner = self.apply_tree(children, values, inner_join);
                    clauses.push(with_boost(format!("({inner})"), *weight));
                }
                FieldNode::Leaf { field, specs } => {
                    if self.stripped_fields.contains(field) {
                        continue;
                    }
                    for spec in specs {
                        let value = values.get(&spec.munge).map_or("", String::as_str);
                        clauses.push(with_boost(format!("{field}:({value})"), spec.weight));
                    }
                }
            }
        }

        clauses.join(&format!(" {join} "))
    }
}

/// Builds the `_query_` dismax delegation string for a spec and phrase.
///
/// Repeated dismax parameter names each contribute their own fragment in
/// declaration order.
fn dismax_subquery(spec: &SearchSpec, phrase: &str) -> String {
    let qf = spec.dismax_fields.join(" ");
    let params: String = spec
        .dismax_params
        .iter()
        .map(|(name, value)| format!(" {name}='{}'", escape_single_quotes(value)))
        .collect();
    format!("_query_:\"{{!dismax qf=\"{qf}\"{params}}}{phrase}\"")
}

/// Converts one `function^boost` fragment into a `_val_` clause.
fn val_clause(part: &str) -> String {
    match part.split_once('^') {
        Some((function, boost)) => {
            format!("_val_:\"{}\"^{boost}", escape_double_quotes(function))
        }
        None => format!("_val_:\"{}\"", escape_double_quotes(part)),
    }
}

/// Appends a `^weight` boost when the weight is positive.
///
/// Null, zero, and negative weights never boost.
fn with_boost(clause: String, weight: Option<i64>) -> String {
    match weight {
        Some(weight) if weight > 0 => format!("{clause}^{weight}"),
        _ => clause,
    }
}

/// Escapes single quotes for embedding in a `name='value'` fragment.
fn escape_single_quotes(value: &str) -> String {
    value.replace('\'', "\\'")
}

/// Escapes double quotes for embedding in a `_val_:"..."` clause.
fn escape_double_quotes(value: &str) -> String {
    value.replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use helio_spec::{SpecSet, parse_spec_str, resolve_spec};

    use super::*;

    fn spec_set(yaml: &str) -> SpecSet {
        let raw = parse_spec_str(yaml, Path::new("test.yaml")).unwrap();
        SpecSet::new(
            raw.into_iter()
                .map(|(handler, spec)| {
                    let resolved = resolve_spec(&handler, spec).unwrap();
                    (handler, resolved)
                })
                .collect(),
        )
    }

    fn builder(specs: &SpecSet) -> QueryBuilder<'_> {
        QueryBuilder::new(specs, Normalizer::default())
    }

    const TITLE_SPEC: &str = r#"
Title:
  query_fields:
    - field: title
      specs: [[and, 500]]
"#;

    #[test]
    fn unknown_handler_is_literal_field() {
        let specs = spec_set("{}");
        assert_eq!(builder(&specs).basic("isbn", "12345"), "isbn:(12345)");
    }

    #[test]
    fn single_leaf_with_weight() {
        let specs = spec_set(TITLE_SPEC);
        assert_eq!(
            builder(&specs).basic("Title", "dogs cats"),
            "(title:(dogs AND cats)^500)"
        );
    }

    #[test]
    fn multiple_munges_join_with_or() {
        let specs = spec_set(
            r#"
Title:
  query_fields:
    - field: title
      specs: [[onephrase, 500], [and, 100]]
"#,
        );
        assert_eq!(
            builder(&specs).basic("Title", "dogs cats"),
            "(title:(\"dogs cats\")^500 OR title:(dogs AND cats)^100)"
        );
    }

    #[test]
    fn zero_and_null_weights_do_not_boost() {
        let specs = spec_set(
            r#"
Title:
  query_fields:
    - field: title
      specs: [[and, 0], [or, null]]
"#,
        );
        assert_eq!(
            builder(&specs).basic("Title", "dogs cats"),
            "(title:(dogs AND cats) OR title:(dogs OR cats))"
        );
    }

    #[test]
    fn group_compiles_parenthesized() {
        let specs = spec_set(
            r#"
AllFields:
  query_fields:
    - join: AND
      weight: 100
      fields:
        - field: title
          specs: [[and, null]]
        - field: author
          specs: [[and, null]]
    - field: allfields
      specs: [[or, null]]
"#,
        );
        assert_eq!(
            builder(&specs).basic("AllFields", "dogs cats"),
            "((title:(dogs AND cats) AND author:(dogs AND cats))^100 OR allfields:(dogs OR cats))"
        );
    }

    #[test]
    fn filter_query_is_anded() {
        let specs = spec_set(
            r#"
Book:
  filter_query: "format:Book"
  query_fields:
    - field: title
      specs: [[and, null]]
"#,
        );
        assert_eq!(
            builder(&specs).basic("Book", "dogs"),
            "(title:(dogs)) AND (format:Book)"
        );
    }

    #[test]
    fn dismax_delegation() {
        let specs = spec_set(
            r#"
Author:
  dismax_fields: [title, author]
"#,
        );
        assert_eq!(
            builder(&specs).basic("Author", "dogs"),
            "_query_:\"{!dismax qf=\"title author\"}dogs\""
        );
    }

    #[test]
    fn dismax_params_repeat_in_order() {
        let specs = spec_set(
            r#"
Author:
  dismax_fields: [author]
  dismax_params:
    - [bq, "a:b^5"]
    - [bq, "c:d'e"]
"#,
        );
        assert_eq!(
            builder(&specs).basic("Author", "smith"),
            "_query_:\"{!dismax qf=\"author\" bq='a:b^5' bq='c:d\\'e'}smith\""
        );
    }

    #[test]
    fn stripped_fields_are_skipped() {
        let specs = spec_set(
            r#"
AllFields:
  query_fields:
    - field: title
      specs: [[and, null]]
    - field: era
      specs: [[and, null]]
"#,
        );
        let builder = builder(&specs).with_stripped_fields(vec!["era".to_string()]);
        assert_eq!(builder.basic("AllFields", "dogs"), "(title:(dogs))");
    }

    #[test]
    fn advanced_field_qualified_passes_through() {
        let specs = spec_set(TITLE_SPEC);
        assert_eq!(
            builder(&specs).advanced("Title", "year:[1990 TO 2000]"),
            "year:[1990 TO 2000]"
        );
    }

    #[test]
    fn advanced_stray_colons_are_stripped() {
        let specs = spec_set(TITLE_SPEC);
        // ": " is a stray colon; the remainder compiles as usual.
        assert_eq!(
            builder(&specs).advanced_inner("Title", "dogs : cats"),
            "(title:(dogs  cats))"
        );
    }

    #[test]
    fn advanced_match_all_uses_filter_query() {
        let specs = spec_set(
            r#"
Book:
  filter_query: "format:Book"
  query_fields:
    - field: title
      specs: [[and, null]]
"#,
        );
        assert_eq!(builder(&specs).advanced_inner("Book", "*:*"), "format:Book");
    }

    #[test]
    fn advanced_match_all_without_filter_passes_through() {
        let specs = spec_set(TITLE_SPEC);
        assert_eq!(builder(&specs).advanced_inner("Title", "*:*"), "*:*");
    }

    #[test]
    fn advanced_trailing_question_mark_searches_both() {
        let specs = spec_set(TITLE_SPEC);
        assert_eq!(
            builder(&specs).advanced_inner("Title", "dog?"),
            "(title:((dog?) OR (dog)))"
        );
    }

    #[test]
    fn advanced_skips_custom_munge_ops() {
        let specs = spec_set(
            r#"
CallNumber:
  query_fields:
    - field: callnumber
      specs: [[exact, null]]
  custom_munge:
    exact:
      - [uppercase]
"#,
        );
        assert_eq!(
            builder(&specs).advanced_inner("CallNumber", "qa76*"),
            "(callnumber:(qa76*))"
        );
    }

    #[test]
    fn advanced_boost_enrichment() {
        let specs = spec_set(
            r#"
Title:
  query_fields:
    - field: title
      specs: [[and, null]]
  dismax_params:
    - [bq, "format:Book^50"]
    - [bf, "ord(date)^10 div(a,b)"]
"#,
        );
        assert_eq!(
            builder(&specs).advanced("Title", "dogs*"),
            "((title:(dogs*))) AND (*:* OR format:Book^50 OR _val_:\"ord(date)\"^10 OR _val_:\"div(a,b)\")"
        );
    }
}
