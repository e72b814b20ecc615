//! HTTP request execution.
//!
//! One executor owns the HTTP client, the resolved shard set, and the
//! facet filter. Select requests always ask for JSON with array-pair
//! named lists; a `shards=` parameter is appended when more than one
//! shard is active, so the backend performs the distributed fan-out.
//! Transport failures on read requests are retried up to the configured
//! budget; backend-reported errors never are.

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::params::ParamList;
use crate::process::{extract_title, process_select_body};
use crate::shards::ShardFilter;

/// HTTP method for a select request.
///
/// POST keeps very long compiled queries out of URL length limits; GET is
/// used for small lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// Parameters in the query string.
    Get,
    /// Parameters as a form body.
    Post,
}

/// Executes requests against one backend core.
#[derive(Debug)]
pub struct RequestExecutor {
    /// Shared blocking HTTP client, carrying the request timeout.
    client: reqwest::blocking::Client,
    /// Full URL of the core.
    core_url: String,
    /// Addresses of the active shards, in configuration order.
    shard_urls: Vec<String>,
    /// Facet filter derived from the active shards.
    filter: ShardFilter,
    /// Additional attempts after a transport failure.
    retries: u32,
}

impl RequestExecutor {
    /// Builds an executor from a backend configuration.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| BackendError::Transport { source })?;
        let filter = ShardFilter::new(
            config.shards.iter().map(|(name, _)| name.as_str()),
            &config.strip_fields,
        );
        Ok(Self {
            client,
            core_url: config.core_url(),
            shard_urls: config.shards.iter().map(|(_, url)| url.clone()).collect(),
            filter,
            retries: config.retries,
        })
    }

    /// The facet filter for the active shard set.
    pub fn shard_filter(&self) -> &ShardFilter {
        &self.filter
    }

    /// Issues a select request and post-processes the response.
    pub fn select(
        &self,
        method: HttpMethod,
        mut params: ParamList,
        soft_errors: bool,
    ) -> Result<Value, BackendError> {
        params.push("wt", "json");
        params.push("json.nl", "arrarr");

        // Strip facet fields the active shards cannot serve; if nothing
        // survives, the parameter is dropped entirely.
        let requested = params.remove_all("facet.field");
        if !requested.is_empty() {
            let kept = self.filter.filter_facet_fields(requested);
            params.push_all("facet.field", kept);
        }

        if self.shard_urls.len() > 1 {
            params.push("shards", self.shard_urls.join(","));
        }

        let url = format!("{}/select/", self.core_url);
        debug!(%url, params = ?params.as_pairs(), "select");

        let response = self.send_with_retry(|| match method {
            HttpMethod::Get => self.client.get(&url).query(params.as_pairs()),
            HttpMethod::Post => self.client.post(&url).form(params.as_pairs()),
        })?;
        let body = response
            .text()
            .map_err(|source| BackendError::Transport { source })?;
        process_select_body(&body, soft_errors)
    }

    /// Issues a GET against an auxiliary read endpoint (`term`, `browse`).
    pub fn read(
        &self,
        endpoint: &str,
        mut params: ParamList,
        soft_errors: bool,
    ) -> Result<Value, BackendError> {
        params.push("wt", "json");
        let url = format!("{}/{endpoint}", self.core_url);
        debug!(%url, params = ?params.as_pairs(), "read");

        let response = self.send_with_retry(|| self.client.get(&url).query(params.as_pairs()))?;
        let body = response
            .text()
            .map_err(|source| BackendError::Transport { source })?;
        process_select_body(&body, soft_errors)
    }

    /// Posts an XML command document to the update endpoint.
    ///
    /// Updates are not retried: a timed-out add or delete may have been
    /// applied, so replaying it is the caller's decision.
    pub fn update(&self, xml: &str) -> Result<(), BackendError> {
        let url = format!("{}/update/", self.core_url);
        debug!(%url, body = xml, "update");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "text/xml; charset=utf-8")
            .body(xml.to_string())
            .send()
            .map_err(|source| BackendError::Transport { source })?;

        let status = response.status().as_u16();
        if status == 400 || status == 500 {
            let body = response
                .text()
                .map_err(|source| BackendError::Transport { source })?;
            let message = extract_title(&body).unwrap_or(body);
            return Err(BackendError::UnexpectedResponse { message });
        }
        Ok(())
    }

    /// Checks that the backend core is online.
    pub fn ping(&self) -> Result<(), BackendError> {
        let url = format!("{}/admin/ping", self.core_url);
        let response = self.send_with_retry(|| self.client.get(&url))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(BackendError::Backend {
                message: format!("index is offline: ping returned {status}"),
            })
        }
    }

    /// Sends a request, retrying transport failures up to the budget.
    fn send_with_retry(
        &self,
        build: impl Fn() -> reqwest::blocking::RequestBuilder,
    ) -> Result<reqwest::blocking::Response, BackendError> {
        let mut attempt = 0;
        loop {
            match build().send() {
                Ok(response) => return Ok(response),
                Err(source) if attempt < self.retries => {
                    attempt += 1;
                    warn!(attempt, error = %source, "transport failure, retrying");
                }
                Err(source) => return Err(BackendError::Transport { source }),
            }
        }
    }
}
