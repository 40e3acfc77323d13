//! XSearch query construction and execution.

use std::sync::Arc;

use tracing::warn;
use url::Url;

use crate::config::{Configuration, keys};
use crate::error::{Error, Result};
use crate::proxy::ProxyRegistry;
use crate::rest::transport::{Transport, build_url, service_base_url};

use super::RecordParser;
use super::response::SruResponse;

/// Path prefix of the XSearch web-service endpoint.
pub const XSEARCH_ENDPOINT: &str = "Stacks-XSearch";

/// Parameters for one XSearch call. `query` is required; the rest are
/// optional refinements.
#[derive(Debug, Clone)]
pub struct XSearchQuery {
    /// The CQL-style search expression.
    pub query: String,
    /// Maximum records to return; `None` or zero leaves the service default.
    pub limit: Option<u32>,
    /// Search as this user instead of the configured username.
    pub username: Option<String>,
    /// Include unpublished objects in the result set.
    pub show_unpublished: bool,
}

impl XSearchQuery {
    /// Creates a query with only the search expression set.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: None,
            username: None,
            show_unpublished: false,
        }
    }
}

/// A request context against the XSearch endpoint.
#[derive(Debug)]
pub struct XSearchRequest {
    config: Arc<Configuration>,
    registry: Arc<ProxyRegistry>,
    base: Url,
    transport: Transport,
    last_request_url: Option<Url>,
}

impl XSearchRequest {
    /// Creates a request context for the configured hostname.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the hostname is unset or not
    /// scheme-qualified.
    pub fn new(config: Arc<Configuration>, registry: Arc<ProxyRegistry>) -> Result<Self> {
        let base = service_base_url(&config)?;
        let transport = Transport::new(&config, Arc::clone(&registry), None)?;
        Ok(Self {
            config,
            registry,
            base,
            transport,
            last_request_url: None,
        })
    }

    /// Executes a search and decodes the SRW response with `parser`.
    ///
    /// Non-2xx/3xx responses decode as empty: the service does not return
    /// SRW XML for errors. A declared-versus-returned record-count
    /// mismatch is reported to the debug log sink, never surfaced.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the query expression is
    /// empty, and [`Error::Service`] on malformed SRW XML.
    pub async fn query(
        &mut self,
        query: &XSearchQuery,
        parser: &dyn RecordParser,
    ) -> Result<SruResponse> {
        if query.query.is_empty() {
            return Err(Error::configuration("missing query parameter"));
        }

        let username = query
            .username
            .clone()
            .or_else(|| self.config.get(keys::USERNAME).map(str::to_string));
        let limit_value = query.limit.filter(|limit| *limit != 0).map(|limit| limit.to_string());

        let mut params: Vec<(&str, &str)> = vec![
            ("version", "1.1"),
            ("operation", "searchRetrieve"),
            ("recordSchema", parser.record_schema()),
        ];
        if let Some(username) = username.as_deref() {
            params.push(("username", username));
        }
        params.push(("query", &query.query));
        if let Some(limit) = limit_value.as_deref() {
            params.push(("maximumRecords", limit));
        }
        if query.show_unpublished {
            params.push(("showUnpublished", "true"));
        }

        let url = build_url(&self.base, XSEARCH_ENDPOINT, "", &params)?;
        self.last_request_url = Some(url.clone());

        let password = self.config.get(keys::PASSWORD).map(str::to_string);
        let basic_auth_user = self.config.get(keys::USERNAME).map(str::to_string);
        let raw = match self
            .transport
            .get(&url, basic_auth_user.as_deref(), password.as_deref())
            .await
        {
            Ok(raw) => raw,
            Err(Error::Transport(transport_error)) => {
                warn!(url = %url, error = %transport_error, "XSearch transport failure");
                return Ok(SruResponse::empty());
            }
            Err(other) => return Err(other),
        };

        let body = if raw.is_ok_window() {
            String::from_utf8_lossy(&raw.body).into_owned()
        } else {
            String::new()
        };
        let response = SruResponse::parse(&body, parser)?;

        if response.total_records() != response.records().len() {
            self.registry.debug_log(&format!(
                "total records ({total}) do not match response count ({returned}) for {url}",
                total = response.total_records(),
                returned = response.records().len()
            ))?;
        }

        Ok(response)
    }

    /// The URL of the most recent request, for diagnostics.
    #[must_use]
    pub fn last_request_url(&self) -> Option<&str> {
        self.last_request_url.as_ref().map(Url::as_str)
    }
}
