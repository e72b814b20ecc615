//! Search handler specifications for helio.
//!
//! A *handler* is a named search configuration: the set of index fields it
//! searches, their weights, optional dismax delegation settings, custom
//! phrase transformations ("munges"), and an optional filter query. Handler
//! specifications live in a YAML file, optionally overlaid by a `_local`
//! override file, and are cached in-process keyed by a fingerprint of the
//! source files.
//!
//! # Example
//!
//! ```no_run
//! use helio_spec::SpecRegistry;
//!
//! let registry = SpecRegistry::new("conf/searchspecs.yaml");
//! let specs = registry.load()?;
//! if let Some(spec) = specs.get("Title") {
//!     println!("Title searches {} field nodes", spec.query_fields.len());
//! }
//! # Ok::<(), helio_spec::SpecError>(())
//! ```

#![warn(missing_docs)]

mod error;
mod parse;
mod registry;

pub use error::SpecError;
pub use parse::{
    RawFieldNode, RawGroup, RawLeaf, RawSpec, parse_spec_file, parse_spec_str, resolve_spec,
};
use regex::Regex;
pub use registry::{SpecRegistry, SpecSet};

/// A resolved handler specification.
///
/// Immutable once loaded; shared behind the [`SpecSet`] returned by
/// [`SpecRegistry::load`].
#[derive(Debug, Clone, Default)]
pub struct SearchSpec {
    /// Fields (with optional `^boost` suffixes) searched via dismax
    /// delegation. Empty when the handler compiles explicit boolean
    /// expressions instead.
    pub dismax_fields: Vec<String>,
    /// Ordered dismax parameter pairs. Names may repeat; repeats are
    /// preserved, never deduplicated.
    pub dismax_params: Vec<(String, String)>,
    /// Weighted field tree walked during explicit boolean compilation.
    pub query_fields: Vec<FieldNode>,
    /// Custom munges, each an ordered operation list applied to the raw
    /// phrase.
    pub custom_munge: Vec<(String, Vec<MungeOp>)>,
    /// Filter query AND-ed onto every compiled query for this handler.
    pub filter_query: Option<String>,
}

impl SearchSpec {
    /// True if this handler delegates basic searches to dismax.
    pub fn has_dismax(&self) -> bool {
        !self.dismax_fields.is_empty()
    }
}

/// One node of a handler's query-field tree.
#[derive(Debug, Clone)]
pub enum FieldNode {
    /// A single field emitting one clause per munge spec.
    Leaf {
        /// Index field name.
        field: String,
        /// Ordered munge/weight pairs.
        specs: Vec<MungeSpec>,
    },
    /// A parenthesized sub-expression with its own join operator.
    Group {
        /// Operator joining the children (e.g. `OR`, `AND`).
        join: String,
        /// Optional boost applied to the parenthesized group.
        weight: Option<i64>,
        /// Child nodes, compiled recursively.
        children: Vec<FieldNode>,
    },
}

/// A munge name paired with an optional boost weight.
///
/// A weight of `None`, zero, or a negative value never appends a boost
/// suffix; any weight greater than zero always does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MungeSpec {
    /// Name of the munge slot supplying the clause value.
    pub munge: String,
    /// Optional `^weight` boost.
    pub weight: Option<i64>,
}

/// One step of a custom munge transformation.
///
/// The operation set is closed and known at compile time; evaluation is an
/// explicit match rather than any name-based dispatch.
#[derive(Debug, Clone)]
pub enum MungeOp {
    /// Appends a literal suffix.
    Append(String),
    /// Lowercases the whole value.
    Lowercase,
    /// Uppercases the whole value.
    Uppercase,
    /// Replaces every match of a pattern.
    RegexReplace {
        /// Compiled pattern (validated at spec load time).
        pattern: Regex,
        /// Replacement text, `$n` group references allowed.
        replacement: String,
    },
}

impl MungeOp {
    /// Applies this operation to a value.
    pub fn apply(&self, value: &str) -> String {
        match self {
            Self::Append(suffix) => format!("{value}{suffix}"),
            Self::Lowercase => value.to_lowercase(),
            Self::Uppercase => value.to_uppercase(),
            Self::RegexReplace {
                pattern,
                replacement,
            } => pattern.replace_all(value, replacement.as_str()).into_owned(),
        }
    }
}
