//! Ordered request parameter list.
//!
//! Backend request parameters are ordered and repeatable: the same name
//! may appear several times (`fq`, `facet.field`, repeated dismax params)
//! and each occurrence is sent separately. A plain pair list models this
//! directly; encoding is left to the HTTP client.

/// An ordered list of (name, value) request parameters.
#[derive(Debug, Clone, Default)]
pub struct ParamList {
    pairs: Vec<(String, String)>,
}

impl ParamList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one parameter.
    pub fn push(&mut self, name: impl Into<String>, value: impl ToString) {
        self.pairs.push((name.into(), value.to_string()));
    }

    /// Appends one occurrence per value under the same name.
    pub fn push_all<I, V>(&mut self, name: &str, values: I)
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        for value in values {
            self.pairs.push((name.to_string(), value.to_string()));
        }
    }

    /// Removes every occurrence of a parameter, returning the values in
    /// order.
    pub fn remove_all(&mut self, name: &str) -> Vec<String> {
        let mut removed = Vec::new();
        self.pairs.retain(|(n, v)| {
            if n == name {
                removed.push(v.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    /// All pairs in insertion order, for the HTTP client to encode.
    pub fn as_pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// True if no parameters are present.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
