//! Facet-field stripping for sharded configurations.
//!
//! When multiple shards serve one logical index, some facet fields exist
//! only on a subset of shards; requesting them in a distributed query
//! fails. The filter accumulates the union of strip lists for the active
//! shards and removes those fields from facet requests. With no shards
//! active, nothing is ever stripped.

use std::collections::HashSet;

/// Removes facet fields the active shard set cannot serve.
#[derive(Debug, Clone, Default)]
pub struct ShardFilter {
    /// Union of fields stripped by any active shard.
    stripped: HashSet<String>,
}

impl ShardFilter {
    /// Builds a filter from the active shard names and the per-shard
    /// strip table.
    pub fn new<'a, I>(active_shards: I, strip_table: &[(String, Vec<String>)]) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let active: HashSet<&str> = active_shards.into_iter().collect();
        let mut stripped = HashSet::new();
        if !active.is_empty() {
            for (shard, fields) in strip_table {
                if active.contains(shard.as_str()) {
                    stripped.extend(fields.iter().cloned());
                }
            }
        }
        Self { stripped }
    }

    /// True if the active shards cannot serve this field.
    pub fn is_stripped(&self, field: &str) -> bool {
        self.stripped.contains(field)
    }

    /// Filters a requested facet-field list, preserving order.
    pub fn filter_facet_fields(&self, requested: Vec<String>) -> Vec<String> {
        if self.stripped.is_empty() {
            return requested;
        }
        requested
            .into_iter()
            .filter(|field| !self.stripped.contains(field))
            .collect()
    }

    /// The stripped fields, for sharing with the query compiler.
    pub fn stripped_fields(&self) -> impl Iterator<Item = &str> {
        self.stripped.iter().map(String::as_str)
    }
}
