//! Backend connection facade.
//!
//! [`Connection`] ties the pieces together: it loads handler
//! specifications through the registry, compiles queries, assembles
//! request parameters, and dispatches through the executor. Every public
//! operation is one synchronous HTTP round trip.

use helio_query::{Normalizer, QueryBuilder};
use helio_spec::SpecRegistry;
use serde_json::Value;

use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::executor::{HttpMethod, RequestExecutor};
use crate::params::ParamList;
use crate::process::reshape_terms;
use crate::sort::normalize_sort;
use crate::xml::{COMMIT, OPTIMIZE, delete_xml, save_xml};

/// Characters removed from suggestion and cleanup input before it is
/// embedded in a query.
const ILLEGAL_CHARS: [char; 7] = ['!', ':', ';', '[', ']', '{', '}'];

/// Opening highlight delimiter, replaced by the presentation layer.
const HILITE_START: &str = "{{{{START_HILITE}}}}";

/// Closing highlight delimiter.
const HILITE_END: &str = "{{{{END_HILITE}}}}";

/// Facet parameters for a search.
#[derive(Debug, Clone, Default)]
pub struct FacetOptions {
    /// Fields to facet on.
    pub fields: Vec<String>,
    /// Maximum values per field.
    pub limit: Option<i64>,
    /// Restrict values to this prefix.
    pub prefix: Option<String>,
    /// Value ordering (`count` or `index`).
    pub sort: Option<String>,
    /// Offset into the value list.
    pub offset: Option<u64>,
    /// Additional facet parameters passed through unchanged.
    pub extras: Vec<(String, String)>,
}

/// Options for a [`Connection::search`] call.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// The query string, either raw user input or a pre-compiled
    /// expression.
    pub query: String,
    /// Handler interpreting the query; `None` submits it as-is.
    pub handler: Option<String>,
    /// Filter queries, each sent as its own `fq` parameter.
    pub filters: Vec<String>,
    /// First result offset.
    pub start: u64,
    /// Result page size.
    pub limit: u64,
    /// Facet parameters.
    pub facets: Option<FacetOptions>,
    /// Phrase to spell-check alongside the search.
    pub spellcheck_query: Option<String>,
    /// Spellcheck dictionary name.
    pub spellcheck_dictionary: Option<String>,
    /// Sort option, normalized before submission.
    pub sort: Option<String>,
    /// Field list to return; defaults to `*,score`.
    pub fields: Option<String>,
    /// HTTP method for the select request.
    pub method: HttpMethod,
    /// Report backend syntax errors as an empty result with an `error`
    /// key instead of failing.
    pub soft_errors: bool,
}

impl SearchOptions {
    /// Creates options for a query with all defaults.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            handler: None,
            filters: Vec::new(),
            start: 0,
            limit: 20,
            facets: None,
            spellcheck_query: None,
            spellcheck_dictionary: None,
            sort: None,
            fields: None,
            method: HttpMethod::Post,
            soft_errors: false,
        }
    }

    /// Sets the handler.
    pub fn with_handler(mut self, handler: impl Into<String>) -> Self {
        self.handler = Some(handler.into());
        self
    }

    /// Sets the filter queries.
    pub fn with_filters(mut self, filters: Vec<String>) -> Self {
        self.filters = filters;
        self
    }

    /// Sets the result window.
    pub fn with_range(mut self, start: u64, limit: u64) -> Self {
        self.start = start;
        self.limit = limit;
        self
    }

    /// Sets the facet parameters.
    pub fn with_facets(mut self, facets: FacetOptions) -> Self {
        self.facets = Some(facets);
        self
    }

    /// Sets the sort option.
    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Sets the returned field list.
    pub fn with_fields(mut self, fields: impl Into<String>) -> Self {
        self.fields = Some(fields.into());
        self
    }

    /// Enables spellchecking for a phrase.
    pub fn with_spellcheck(mut self, phrase: impl Into<String>) -> Self {
        self.spellcheck_query = Some(phrase.into());
        self
    }

    /// Sets the HTTP method.
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Enables soft error reporting.
    pub fn with_soft_errors(mut self, soft: bool) -> Self {
        self.soft_errors = soft;
        self
    }
}

/// A connection to one search backend core.
#[derive(Debug)]
pub struct Connection {
    /// Behavior flags consulted during option assembly.
    config: BackendConfig,
    /// Handler specification source.
    registry: SpecRegistry,
    /// Request dispatch.
    executor: RequestExecutor,
    /// Normalization rules derived from the configuration.
    normalizer: Normalizer,
}

impl Connection {
    /// Creates a connection.
    ///
    /// Construction is side-effect free; call [`Connection::ping`] to
    /// verify the backend is reachable.
    pub fn new(config: BackendConfig, registry: SpecRegistry) -> Result<Self, BackendError> {
        let executor = RequestExecutor::new(&config)?;
        let normalizer = Normalizer::new(
            config.case_sensitive_booleans,
            config.case_sensitive_ranges,
        );
        Ok(Self {
            config,
            registry,
            executor,
            normalizer,
        })
    }

    /// The normalizer this connection compiles with.
    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Checks that the backend core is online.
    pub fn ping(&self) -> Result<(), BackendError> {
        self.executor.ping()
    }

    /// Runs a search.
    ///
    /// Basic queries against a dismax handler delegate at the top level:
    /// the handler's fields become `qf`, the dismax query type is
    /// selected, custom dismax parameters are repeated in declaration
    /// order, and the handler's filter query joins the caller's filters.
    /// Other handler queries are compiled into explicit expressions;
    /// advanced queries additionally get their case canonicalized and,
    /// when highlighting is on, an `hl.q` carrying the boost-free inner
    /// query.
    pub fn search(&self, options: &SearchOptions) -> Result<Value, BackendError> {
        let specs = self.registry.load()?;
        let builder = QueryBuilder::new(&specs, self.normalizer).with_stripped_fields(
            self.executor
                .shard_filter()
                .stripped_fields()
                .map(str::to_string),
        );

        let mut params = ParamList::new();
        let mut filters = options.filters.clone();
        let mut query = options.query.clone();

        params.push("rows", options.limit);
        params.push("start", options.start);

        if let Some(sort) = &options.sort {
            params.push("sort", normalize_sort(sort));
        }

        if !self.normalizer.is_advanced(&query) {
            let spec = options
                .handler
                .as_deref()
                .and_then(|handler| specs.get(handler));
            if let Some(spec) = spec.filter(|s| s.has_dismax()) {
                params.push("qf", spec.dismax_fields.join(" "));
                params.push("qt", "dismax");
                for (name, value) in &spec.dismax_params {
                    params.push(name, value);
                }
                if let Some(filter) = &spec.filter_query {
                    filters.push(filter.clone());
                }
            } else if let Some(handler) = &options.handler {
                query = builder.basic(handler, &query);
            }
        } else {
            query = self.normalizer.canonicalize_case(&query);
            if let Some(handler) = &options.handler {
                // Boosts added around the inner query are noise for
                // highlighting, so hl.q carries the inner query only.
                if self.config.highlight {
                    params.push("hl.q", builder.advanced_inner(handler, &query));
                }
                query = builder.advanced(handler, &query);
            }
        }
        params.push("q", query);

        params.push("fl", options.fields.as_deref().unwrap_or("*,score"));

        if let Some(facets) = &options.facets
            && !facets.fields.is_empty()
        {
            params.push("facet", "true");
            params.push("facet.mincount", 1);
            if let Some(limit) = facets.limit {
                params.push("facet.limit", limit);
            }
            params.push_all("facet.field", &facets.fields);
            if let Some(prefix) = &facets.prefix {
                params.push("facet.prefix", prefix);
            }
            if let Some(sort) = &facets.sort {
                params.push("facet.sort", sort);
            }
            if let Some(offset) = facets.offset {
                params.push("facet.offset", offset);
            }
            for (name, value) in &facets.extras {
                params.push(name, value);
            }
        }

        params.push_all("fq", &filters);

        if let Some(spell) = &options.spellcheck_query {
            params.push("spellcheck", "true");
            params.push("spellcheck.q", spell);
            if let Some(dictionary) = &options.spellcheck_dictionary {
                params.push("spellcheck.dictionary", dictionary);
            }
        }

        if self.config.highlight {
            params.push("hl", "true");
            params.push("hl.fl", "*");
            params.push("hl.simple.pre", HILITE_START);
            params.push("hl.simple.post", HILITE_END);
        }

        self.executor.select(options.method, params, options.soft_errors)
    }

    /// Fetches a single record by id.
    pub fn get_record(&self, id: &str) -> Result<Option<Value>, BackendError> {
        let mut params = ParamList::new();
        params.push("q", id_query(id));
        let result = self.executor.select(HttpMethod::Get, params, false)?;
        Ok(result
            .pointer("/response/docs/0")
            .cloned()
            .filter(|doc| !doc.is_null()))
    }

    /// Fetches records similar to the given one, via the
    /// more-like-this handler.
    pub fn more_like_this(
        &self,
        id: &str,
        extras: &[(String, String)],
    ) -> Result<Value, BackendError> {
        let mut params = ParamList::new();
        for (name, value) in extras {
            params.push(name, value);
        }
        params.push("q", id_query(id));
        params.push("qt", "morelikethis");
        self.executor.select(HttpMethod::Get, params, false)
    }

    /// Fetches autocomplete suggestions: facet values of `field` whose
    /// terms extend the given phrase.
    ///
    /// Returns the facet value list for the field, as (value, count)
    /// pairs in backend order. An empty phrase returns no suggestions.
    pub fn get_suggestions(
        &self,
        phrase: &str,
        field: &str,
        limit: u64,
    ) -> Result<Option<Value>, BackendError> {
        let phrase = strip_illegal(phrase);
        if phrase.is_empty() {
            return Ok(None);
        }

        let options = SearchOptions::new(format!("{field}:({phrase}*)"))
            .with_range(0, limit)
            .with_facets(FacetOptions {
                fields: vec![field.to_string()],
                limit: Some(limit as i64),
                ..FacetOptions::default()
            });
        let result = self.search(&options)?;
        Ok(result
            .pointer(&format!("/facet_counts/facet_fields/{field}"))
            .cloned())
    }

    /// Asks the backend for spelling suggestions on a phrase.
    pub fn check_spelling(&self, phrase: &str) -> Result<Value, BackendError> {
        let mut params = ParamList::new();
        params.push("q", phrase);
        params.push("rows", 0);
        params.push("spellcheck", "true");
        self.executor.select(HttpMethod::Get, params, false)
    }

    /// Saves one record. Fields are (name, values) pairs; empty values
    /// are skipped and multi-valued fields repeat.
    pub fn save(&self, fields: &[(String, Vec<String>)]) -> Result<(), BackendError> {
        self.executor.update(&save_xml(fields))
    }

    /// Deletes one record by id.
    pub fn delete_record(&self, id: &str) -> Result<(), BackendError> {
        self.delete_records(&[id.to_string()])
    }

    /// Deletes a list of records by id.
    pub fn delete_records(&self, ids: &[String]) -> Result<(), BackendError> {
        self.executor.update(&delete_xml(ids))
    }

    /// Commits pending index changes.
    pub fn commit(&self) -> Result<(), BackendError> {
        self.executor.update(COMMIT)
    }

    /// Optimizes the index.
    pub fn optimize(&self) -> Result<(), BackendError> {
        self.executor.update(OPTIMIZE)
    }

    /// Enumerates indexed terms of a field, starting after `start`.
    ///
    /// The response's `terms` section is reshaped from flat alternating
    /// term/count arrays into ordered term-to-count maps.
    pub fn get_terms(
        &self,
        field: &str,
        start: &str,
        limit: i64,
        soft_errors: bool,
    ) -> Result<Value, BackendError> {
        let mut params = ParamList::new();
        params.push("terms", "true");
        params.push("terms.fl", field);
        params.push("terms.lower.incl", "false");
        params.push("terms.lower", start);
        params.push("terms.limit", limit);
        params.push("terms.sort", "index");

        let mut result = self.executor.read("term", params, soft_errors)?;
        reshape_terms(&mut result);
        Ok(result)
    }

    /// Reads a page from an alphabetic browse index.
    pub fn alphabetic_browse(
        &self,
        source: &str,
        from: &str,
        page: u64,
        page_size: u64,
        soft_errors: bool,
    ) -> Result<Value, BackendError> {
        let mut params = ParamList::new();
        params.push("from", from);
        params.push("json.nl", "arrarr");
        params.push("offset", page * page_size);
        params.push("rows", page_size);
        params.push("source", source);
        self.executor.read("browse", params, soft_errors)
    }
}

/// Builds an exact-id lookup query, escaping embedded quotes.
fn id_query(id: &str) -> String {
    format!("id:\"{}\"", id.replace('"', "\\\""))
}

/// Removes characters that would be misparsed as query syntax.
fn strip_illegal(input: &str) -> String {
    input
        .chars()
        .filter(|c| !ILLEGAL_CHARS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}
