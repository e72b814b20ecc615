//! Query normalization and compilation for helio.
//!
//! This crate turns user search input into backend query strings. The
//! pipeline is: sanitize the raw phrase ([`Normalizer::validate_input`]),
//! classify it as basic or advanced ([`Normalizer::is_advanced`]), then
//! compile it against a handler specification ([`QueryBuilder`]) — either
//! as a dismax delegation or as an explicit weighted boolean expression.
//! Multi-clause requests with grouping and exclusion are modeled by
//! [`RequestPart`] and compiled by [`QueryBuilder::build`].

#![warn(missing_docs)]

mod compile;
mod munge;
mod normalize;
mod request;
mod tokenize;

pub use compile::QueryBuilder;
pub use munge::{MungeValues, munge_values};
pub use normalize::{MATCH_ALL, Normalizer, capitalize_booleans, capitalize_ranges};
pub use request::{Clause, JoinOp, RequestPart};
pub use tokenize::tokenize_input;
