//! Search request model.
//!
//! A request is a list of clauses and named groups: a clause pairs an
//! optional handler with a raw phrase, and a group combines clauses under
//! one boolean operator. Groups mirror the shape of a handler's
//! query-field tree and compile the same way, to parenthesized
//! sub-expressions; NOT groups become a trailing exclusion clause.

use crate::compile::QueryBuilder;
use crate::normalize::MATCH_ALL;

/// Boolean operator joining clauses within a group, or groups with each
/// other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOp {
    /// All parts must match.
    And,
    /// Any part may match.
    Or,
    /// No part may match (groups only; compiles to an exclusion).
    Not,
}

impl JoinOp {
    /// The operator keyword as it appears in a query string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
        }
    }
}

/// One search clause: a phrase interpreted by an optional handler.
#[derive(Debug, Clone)]
pub struct Clause {
    /// Handler interpreting the phrase; `None` submits the sanitized
    /// phrase as-is.
    pub handler: Option<String>,
    /// Raw user phrase.
    pub phrase: String,
}

impl Clause {
    /// Creates a clause against a named handler.
    pub fn new(handler: impl Into<String>, phrase: impl Into<String>) -> Self {
        Self {
            handler: Some(handler.into()),
            phrase: phrase.into(),
        }
    }

    /// Creates a handler-less clause submitted verbatim after sanitization.
    pub fn bare(phrase: impl Into<String>) -> Self {
        Self {
            handler: None,
            phrase: phrase.into(),
        }
    }
}

/// One element of a search request.
#[derive(Debug, Clone)]
pub enum RequestPart {
    /// A single clause.
    Clause(Clause),
    /// A named group of clauses combined with one operator.
    Group {
        /// Operator joining the clauses; [`JoinOp::Not`] negates the
        /// whole group.
        op: JoinOp,
        /// Member clauses.
        clauses: Vec<Clause>,
    },
}

impl QueryBuilder<'_> {
    /// Compiles a full request into a single query string.
    ///
    /// `join` combines sibling groups. Clauses outside any group are
    /// concatenated in order. NOT groups are collected separately and
    /// appended as one `NOT ((...) OR (...))` exclusion. An empty request
    /// compiles to the match-all query.
    pub fn build(&self, parts: &[RequestPart], join: JoinOp) -> String {
        let mut query = String::new();
        let mut groups: Vec<String> = Vec::new();
        let mut excludes: Vec<String> = Vec::new();

        for part in parts {
            match part {
                RequestPart::Clause(clause) => {
                    query.push_str(&self.clause_query(clause));
                }
                RequestPart::Group { op, clauses } => {
                    let compiled: Vec<String> =
                        clauses.iter().map(|c| self.clause_query(c)).collect();
                    if *op == JoinOp::Not {
                        excludes.push(compiled.join(" OR "));
                    } else {
                        groups.push(compiled.join(&format!(" {} ", op.as_str())));
                    }
                }
            }
        }

        if !groups.is_empty() {
            query = format!("({})", groups.join(&format!(") {} (", join.as_str())));
        }
        if !excludes.is_empty() {
            query.push_str(&format!(" NOT (({}))", excludes.join(") OR (")));
        }

        if query.is_empty() {
            MATCH_ALL.to_string()
        } else {
            query
        }
    }

    /// Sanitizes and compiles one clause.
    fn clause_query(&self, clause: &Clause) -> String {
        let phrase = self.normalizer().validate_input(&clause.phrase);
        if phrase.is_empty() {
            return String::new();
        }
        let phrase = self.normalizer().canonicalize_case(&phrase);

        match &clause.handler {
            Some(handler) => {
                if self.normalizer().is_advanced(&phrase) {
                    self.advanced(handler, &phrase)
                } else {
                    self.basic(handler, &phrase)
                }
            }
            None => phrase,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use helio_spec::{SpecSet, parse_spec_str, resolve_spec};

    use super::*;
    use crate::normalize::Normalizer;

    fn spec_set() -> SpecSet {
        let raw = parse_spec_str(
            r#"
Title:
  query_fields:
    - field: title
      specs: [[and, null]]
Author:
  query_fields:
    - field: author
      specs: [[and, null]]
"#,
            Path::new("test.yaml"),
        )
        .unwrap();
        SpecSet::new(
            raw.into_iter()
                .map(|(handler, spec)| {
                    let resolved = resolve_spec(&handler, spec).unwrap();
                    (handler, resolved)
                })
                .collect(),
        )
    }

    #[test]
    fn empty_request_is_match_all() {
        let specs = spec_set();
        let builder = QueryBuilder::new(&specs, Normalizer::default());
        assert_eq!(builder.build(&[], JoinOp::And), "*:*");
    }

    #[test]
    fn single_clause() {
        let specs = spec_set();
        let builder = QueryBuilder::new(&specs, Normalizer::default());
        let parts = [RequestPart::Clause(Clause::new("Title", "dogs"))];
        assert_eq!(builder.build(&parts, JoinOp::And), "(title:(dogs))");
    }

    #[test]
    fn bare_clause_passes_through() {
        let specs = spec_set();
        let builder = QueryBuilder::new(&specs, Normalizer::default());
        let parts = [RequestPart::Clause(Clause::bare("dogs"))];
        assert_eq!(builder.build(&parts, JoinOp::And), "dogs");
    }

    #[test]
    fn blank_clause_is_match_all() {
        let specs = spec_set();
        let builder = QueryBuilder::new(&specs, Normalizer::default());
        let parts = [RequestPart::Clause(Clause::bare("*:*"))];
        assert_eq!(builder.build(&parts, JoinOp::And), "*:*");
    }

    #[test]
    fn groups_join_with_request_operator() {
        let specs = spec_set();
        let builder = QueryBuilder::new(&specs, Normalizer::default());
        let parts = [
            RequestPart::Group {
                op: JoinOp::Or,
                clauses: vec![Clause::new("Title", "dogs"), Clause::new("Title", "cats")],
            },
            RequestPart::Group {
                op: JoinOp::And,
                clauses: vec![Clause::new("Author", "smith")],
            },
        ];
        assert_eq!(
            builder.build(&parts, JoinOp::And),
            "((title:(dogs)) OR (title:(cats))) AND ((author:(smith)))"
        );
    }

    #[test]
    fn not_group_becomes_exclusion() {
        let specs = spec_set();
        let builder = QueryBuilder::new(&specs, Normalizer::default());
        let parts = [
            RequestPart::Group {
                op: JoinOp::And,
                clauses: vec![Clause::new("Title", "dogs")],
            },
            RequestPart::Group {
                op: JoinOp::Not,
                clauses: vec![Clause::new("Title", "cats"), Clause::new("Title", "mice")],
            },
        ];
        assert_eq!(
            builder.build(&parts, JoinOp::And),
            "((title:(dogs))) NOT (((title:(cats)) OR (title:(mice))))"
        );
    }

    #[test]
    fn advanced_clause_dispatches_to_adapter() {
        let specs = spec_set();
        let builder = QueryBuilder::new(&specs, Normalizer::default());
        let parts = [RequestPart::Clause(Clause::new("Title", "year:1990"))];
        assert_eq!(builder.build(&parts, JoinOp::And), "year:1990");
    }

    #[test]
    fn case_insensitive_booleans_are_uppercased() {
        let specs = spec_set();
        let builder = QueryBuilder::new(&specs, Normalizer::new(false, true));
        let parts = [RequestPart::Clause(Clause::new("Title", "dogs and cats"))];
        // Lowercase "and" is recognized, uppercased, and the phrase then
        // compiles through the advanced adapter.
        assert_eq!(builder.build(&parts, JoinOp::And), "(title:(dogs AND cats))");
    }
}
