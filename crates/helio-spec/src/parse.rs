//! Specification file parsing.
//!
//! Parses handler specification YAML into intermediate `Raw*` structures
//! that mirror the file schema, then resolves them into typed [`SearchSpec`]
//! values (compiling munge regexes along the way).

use std::collections::HashMap;
use std::{fs, path::Path};

use regex::Regex;
use serde::Deserialize;

use crate::{FieldNode, MungeOp, MungeSpec, SearchSpec, SpecError};

/// Raw per-handler specification as parsed directly from YAML.
///
/// All fields are optional; a handler may declare any subset.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSpec {
    /// Fields (with optional `^boost` suffixes) for dismax delegation.
    pub dismax_fields: Option<Vec<String>>,
    /// Ordered `[name, value]` dismax parameter pairs; names may repeat.
    pub dismax_params: Option<Vec<(String, String)>>,
    /// Weighted field tree used for explicit boolean compilation.
    pub query_fields: Option<Vec<RawFieldNode>>,
    /// Custom munge definitions: name to ordered operation tuples.
    pub custom_munge: Option<HashMap<String, Vec<Vec<String>>>>,
    /// Filter query AND-ed onto every compiled query for the handler.
    pub filter_query: Option<String>,
}

/// One node of the raw query-field tree.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawFieldNode {
    /// A parenthesized sub-group with its own join operator.
    Group(RawGroup),
    /// A single field with its `[munge, weight]` specs.
    Leaf(RawLeaf),
}

/// Raw leaf node: one searchable field.
#[derive(Debug, Clone, Deserialize)]
pub struct RawLeaf {
    /// Index field name.
    pub field: String,
    /// Ordered `[munge, weight]` pairs; a null weight suppresses boosting.
    pub specs: Vec<(String, Option<i64>)>,
}

/// Raw group node: children combined with one operator.
#[derive(Debug, Clone, Deserialize)]
pub struct RawGroup {
    /// Join operator for the children (e.g. `OR`, `AND`).
    pub join: String,
    /// Optional boost applied to the whole parenthesized group.
    #[serde(default)]
    pub weight: Option<i64>,
    /// Child nodes.
    pub fields: Vec<RawFieldNode>,
}

/// Parses a specification file from disk into raw handler entries.
pub fn parse_spec_file(path: &Path) -> Result<HashMap<String, RawSpec>, SpecError> {
    let contents = fs::read_to_string(path).map_err(|source| SpecError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    parse_spec_str(&contents, path)
}

/// Parses specification content from a YAML string.
///
/// The `path` parameter is used for error reporting.
pub fn parse_spec_str(contents: &str, path: &Path) -> Result<HashMap<String, RawSpec>, SpecError> {
    serde_yaml::from_str(contents).map_err(|source| SpecError::ParseYaml {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves a raw handler entry into a typed [`SearchSpec`].
///
/// Munge operation tuples are validated and their regexes compiled here, so
/// a bad pattern fails at load time rather than at query time.
pub fn resolve_spec(handler: &str, raw: RawSpec) -> Result<SearchSpec, SpecError> {
    let mut custom_munge = Vec::new();
    if let Some(munges) = raw.custom_munge {
        // Sort by name for a deterministic evaluation order; the names are
        // independent slots, so order does not affect results.
        let mut munges: Vec<_> = munges.into_iter().collect();
        munges.sort_by(|a, b| a.0.cmp(&b.0));
        for (name, ops) in munges {
            let ops = ops
                .into_iter()
                .map(|op| resolve_munge_op(handler, &name, op))
                .collect::<Result<Vec<_>, SpecError>>()?;
            custom_munge.push((name, ops));
        }
    }

    Ok(SearchSpec {
        dismax_fields: raw.dismax_fields.unwrap_or_default(),
        dismax_params: raw.dismax_params.unwrap_or_default(),
        query_fields: raw
            .query_fields
            .unwrap_or_default()
            .into_iter()
            .map(resolve_field_node)
            .collect(),
        custom_munge,
        filter_query: raw.filter_query,
    })
}

/// Converts a raw tree node into the resolved form.
fn resolve_field_node(raw: RawFieldNode) -> FieldNode {
    match raw {
        RawFieldNode::Leaf(leaf) => FieldNode::Leaf {
            field: leaf.field,
            specs: leaf
                .specs
                .into_iter()
                .map(|(munge, weight)| MungeSpec { munge, weight })
                .collect(),
        },
        RawFieldNode::Group(group) => FieldNode::Group {
            join: group.join,
            weight: group.weight,
            children: group.fields.into_iter().map(resolve_field_node).collect(),
        },
    }
}

/// Converts one operation tuple into a [`MungeOp`].
fn resolve_munge_op(handler: &str, munge: &str, op: Vec<String>) -> Result<MungeOp, SpecError> {
    let resolved = match (op.first().map(String::as_str), op.len()) {
        (Some("append"), 2) => Some(MungeOp::Append(op[1].clone())),
        (Some("lowercase"), 1) => Some(MungeOp::Lowercase),
        (Some("uppercase"), 1) => Some(MungeOp::Uppercase),
        (Some("regex_replace"), 3) => {
            let pattern = Regex::new(&op[1]).map_err(|source| SpecError::InvalidPattern {
                handler: handler.to_string(),
                munge: munge.to_string(),
                pattern: op[1].clone(),
                source,
            })?;
            Some(MungeOp::RegexReplace {
                pattern,
                replacement: op[2].clone(),
            })
        }
        _ => None,
    };

    resolved.ok_or_else(|| SpecError::InvalidMunge {
        handler: handler.to_string(),
        munge: munge.to_string(),
        op,
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn parse(contents: &str) -> HashMap<String, RawSpec> {
        parse_spec_str(contents, Path::new("test.yaml")).unwrap()
    }

    #[test]
    fn empty_file() {
        let specs = parse("{}");
        assert!(specs.is_empty());
    }

    #[test]
    fn minimal_handler() {
        let specs = parse(
            r#"
Title:
  query_fields:
    - field: title
      specs: [[onephrase, 500], [and, 100]]
"#,
        );
        let raw = specs.get("Title").unwrap();
        let nodes = raw.query_fields.as_ref().unwrap();
        assert_eq!(nodes.len(), 1);
        match &nodes[0] {
            RawFieldNode::Leaf(leaf) => {
                assert_eq!(leaf.field, "title");
                assert_eq!(leaf.specs[0], ("onephrase".into(), Some(500)));
                assert_eq!(leaf.specs[1], ("and".into(), Some(100)));
            }
            RawFieldNode::Group(_) => panic!("expected leaf"),
        }
    }

    #[test]
    fn null_weight() {
        let specs = parse(
            r#"
Title:
  query_fields:
    - field: title
      specs: [[onephrase, null]]
"#,
        );
        let raw = specs.get("Title").unwrap();
        match &raw.query_fields.as_ref().unwrap()[0] {
            RawFieldNode::Leaf(leaf) => assert_eq!(leaf.specs[0], ("onephrase".into(), None)),
            RawFieldNode::Group(_) => panic!("expected leaf"),
        }
    }

    #[test]
    fn nested_group() {
        let specs = parse(
            r#"
AllFields:
  query_fields:
    - join: OR
      weight: 100
      fields:
        - field: title
          specs: [[onephrase, 500]]
        - field: author
          specs: [[and, 300]]
    - field: allfields
      specs: [[or, null]]
"#,
        );
        let raw = specs.get("AllFields").unwrap();
        let nodes = raw.query_fields.as_ref().unwrap();
        match &nodes[0] {
            RawFieldNode::Group(group) => {
                assert_eq!(group.join, "OR");
                assert_eq!(group.weight, Some(100));
                assert_eq!(group.fields.len(), 2);
            }
            RawFieldNode::Leaf(_) => panic!("expected group"),
        }
        assert!(matches!(&nodes[1], RawFieldNode::Leaf(_)));
    }

    #[test]
    fn dismax_settings() {
        let specs = parse(
            r#"
Author:
  dismax_fields: [author^100, author2]
  dismax_params:
    - [bq, "format:Book^50"]
    - [bq, "format:Journal^20"]
    - [bf, "ord(publishDate)^10"]
"#,
        );
        let raw = specs.get("Author").unwrap();
        assert_eq!(
            raw.dismax_fields.as_ref().unwrap(),
            &vec!["author^100".to_string(), "author2".to_string()]
        );
        // Repeated names must be preserved in declaration order.
        let params = raw.dismax_params.as_ref().unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(params[0].0, "bq");
        assert_eq!(params[1].0, "bq");
        assert_eq!(params[2].0, "bf");
    }

    #[test]
    fn resolve_custom_munge() {
        let specs = parse(
            r#"
CallNumber:
  query_fields:
    - field: callnumber
      specs: [[callnumber_exact, 1000]]
  custom_munge:
    callnumber_exact:
      - [uppercase]
      - [regex_replace, '^\s+', '']
      - [append, '*']
"#,
        );
        let spec = resolve_spec("CallNumber", specs.get("CallNumber").unwrap().clone()).unwrap();
        let (name, ops) = &spec.custom_munge[0];
        assert_eq!(name, "callnumber_exact");
        assert_eq!(ops.len(), 3);
        assert!(matches!(ops[0], MungeOp::Uppercase));
        assert!(matches!(ops[1], MungeOp::RegexReplace { .. }));
        assert!(matches!(ops[2], MungeOp::Append(ref s) if s == "*"));
    }

    #[test]
    fn resolve_bad_pattern() {
        let raw = parse(
            r#"
Bad:
  custom_munge:
    broken:
      - [regex_replace, '(', '']
"#,
        );
        let err = resolve_spec("Bad", raw.get("Bad").unwrap().clone()).unwrap_err();
        assert!(matches!(err, SpecError::InvalidPattern { .. }));
    }

    #[test]
    fn resolve_unknown_op() {
        let raw = parse(
            r#"
Bad:
  custom_munge:
    broken:
      - [reverse]
"#,
        );
        let err = resolve_spec("Bad", raw.get("Bad").unwrap().clone()).unwrap_err();
        assert!(matches!(err, SpecError::InvalidMunge { .. }));
    }

    #[test]
    fn filter_query() {
        let specs = parse(
            r#"
Book:
  filter_query: "format:Book"
  query_fields:
    - field: title
      specs: [[onephrase, null]]
"#,
        );
        let spec = resolve_spec("Book", specs.get("Book").unwrap().clone()).unwrap();
        assert_eq!(spec.filter_query.as_deref(), Some("format:Book"));
    }

    #[test]
    fn invalid_yaml() {
        let result = parse_spec_str("{ not yaml: [", Path::new("test.yaml"));
        assert!(matches!(result, Err(SpecError::ParseYaml { .. })));
    }
}
