//! Backend connection configuration.
//!
//! All configuration is explicit and owned by the [`BackendConfig`] handed
//! to [`Connection::new`](crate::Connection::new); there is no ambient
//! global state. Shards are a name/URL table; the strip table maps a shard
//! name to the facet fields that shard does not carry.

use std::time::Duration;

/// Configuration for a backend connection.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the backend server, without the core path.
    pub base_url: String,
    /// Index core appended to the base URL.
    pub core: String,
    /// Active shards as (name, address) pairs, in configuration order.
    /// Empty when sharding is disabled.
    pub shards: Vec<(String, String)>,
    /// Per-shard facet fields to strip, as (shard name, fields) pairs.
    pub strip_fields: Vec<(String, Vec<String>)>,
    /// Require boolean operators to be uppercase (`true`), or recognize
    /// and uppercase them case-insensitively (`false`).
    pub case_sensitive_booleans: bool,
    /// Require range syntax to be uppercase (`true`), or canonicalize it
    /// case-insensitively (`false`).
    pub case_sensitive_ranges: bool,
    /// Collect highlighting data on searches.
    pub highlight: bool,
    /// Bound on each HTTP request.
    pub timeout: Duration,
    /// Additional attempts after a transport failure. Backend-reported
    /// errors are never retried.
    pub retries: u32,
}

impl BackendConfig {
    /// Creates a configuration for the given server and core with
    /// sharding disabled and default behavior flags.
    pub fn new(base_url: impl Into<String>, core: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            core: core.into(),
            shards: Vec::new(),
            strip_fields: Vec::new(),
            case_sensitive_booleans: true,
            case_sensitive_ranges: true,
            highlight: false,
            timeout: Duration::from_secs(30),
            retries: 0,
        }
    }

    /// Sets the active shards.
    pub fn with_shards(mut self, shards: Vec<(String, String)>) -> Self {
        self.shards = shards;
        self
    }

    /// Sets the per-shard facet strip table.
    pub fn with_strip_fields(mut self, strip: Vec<(String, Vec<String>)>) -> Self {
        self.strip_fields = strip;
        self
    }

    /// Enables highlighting collection.
    pub fn with_highlight(mut self, highlight: bool) -> Self {
        self.highlight = highlight;
        self
    }

    /// Sets the boolean/range case-sensitivity flags.
    pub fn with_case_sensitivity(mut self, booleans: bool, ranges: bool) -> Self {
        self.case_sensitive_booleans = booleans;
        self.case_sensitive_ranges = ranges;
        self
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the transport retry budget.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Full URL of the core this configuration addresses.
    pub fn core_url(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.core)
    }
}
