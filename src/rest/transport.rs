//! Shared HTTP plumbing for the REST and XSearch request types.
//!
//! This module centralizes client construction (timeouts, optional cookie
//! jar), URL building with query-pair encoding, and the debug-proxy
//! logging every service call performs.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::config::{
    Configuration, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS, keys,
};
use crate::error::{Error, Result};
use crate::proxy::ProxyRegistry;

/// Bytes of a non-OK response body forwarded to the debug screen sink.
const ERROR_BODY_EXCERPT_BYTES: usize = 1000;

/// Validates the configured hostname and returns it as a base URL.
///
/// # Errors
///
/// Returns [`Error::Configuration`] when no hostname is configured or when
/// it is not scheme-qualified with `http://` or `https://`.
pub(crate) fn service_base_url(config: &Configuration) -> Result<Url> {
    let hostname = config
        .get(keys::HOSTNAME)
        .ok_or_else(|| Error::configuration("hostname not configured"))?;
    let url = Url::parse(hostname).map_err(|parse_error| {
        Error::configuration(format!("hostname '{hostname}' is not a valid URL: {parse_error}"))
    })?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(Error::configuration(format!(
            "hostname '{hostname}' must be scheme-qualified with http:// or https://"
        )));
    }
    Ok(url)
}

/// Builds a service URL from base, endpoint, method and query parameters.
///
/// `method` may be empty (the XSearch endpoint takes no method path).
/// Parameters are appended in order; duplicate names are allowed and
/// encode as repeated pairs.
pub(crate) fn build_url(
    base: &Url,
    endpoint: &str,
    method: &str,
    params: &[(&str, &str)],
) -> Result<Url> {
    let mut raw = base.as_str().trim_end_matches('/').to_string();
    raw.push('/');
    raw.push_str(endpoint);
    if !method.is_empty() {
        raw.push('/');
        raw.push_str(method);
    }
    let mut url = Url::parse(&raw)
        .map_err(|parse_error| Error::service(format!("cannot build request URL: {parse_error}")))?;
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params);
    }
    Ok(url)
}

/// A raw service response: status, content type and undecoded body.
///
/// The status code never reaches response decoding; it is consumed here
/// for diagnostics only.
#[derive(Debug)]
pub(crate) struct RawResponse {
    pub(crate) status: StatusCode,
    pub(crate) content_type: Option<String>,
    pub(crate) body: Vec<u8>,
}

impl RawResponse {
    pub(crate) fn is_ok_window(&self) -> bool {
        // The service treats 2xx and 3xx as success.
        (200..=399).contains(&self.status.as_u16())
    }
}

/// HTTP executor shared by the REST and XSearch request types.
#[derive(Debug, Clone)]
pub(crate) struct Transport {
    client: Client,
    registry: Arc<ProxyRegistry>,
}

impl Transport {
    /// Builds a transport with the configured timeouts and an optional
    /// cookie jar (admin sessions persist cookies across the retry
    /// protocol's attempts).
    pub(crate) fn new(
        config: &Configuration,
        registry: Arc<ProxyRegistry>,
        cookie_jar: Option<Arc<Jar>>,
    ) -> Result<Self> {
        let connect_timeout =
            config.timeout_or(keys::CONNECT_TIMEOUT_SECS, DEFAULT_CONNECT_TIMEOUT_SECS);
        let read_timeout = config.timeout_or(keys::TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS);

        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout))
            .timeout(Duration::from_secs(read_timeout));
        if let Some(jar) = cookie_jar {
            builder = builder.cookie_provider(jar);
        }
        let client = builder.build()?;

        Ok(Self { client, registry })
    }

    /// Executes a GET against `url`, applying basic auth when both
    /// credentials are present.
    ///
    /// The request line and response headers go to the debug `log` sink;
    /// a non-2xx/3xx status additionally sends a body excerpt to the
    /// debug `screen` sink. The body is returned undecoded regardless of
    /// status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] when the HTTP call itself fails, and
    /// [`Error::Configuration`] when a debug sink is unregistered in
    /// strict mode.
    pub(crate) async fn get(
        &self,
        url: &Url,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<RawResponse> {
        self.registry.debug_log(&format!("GET {url}"))?;
        debug!(url = %url, "Issuing service request");

        let mut request = self.client.get(url.clone());
        if let (Some(user), Some(pass)) = (username, password) {
            request = request.basic_auth(user, Some(pass));
        }

        let response = request.send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let mut header_lines = format!("HTTP {status}");
        for (name, value) in response.headers() {
            header_lines.push('\n');
            header_lines.push_str(name.as_str());
            header_lines.push_str(": ");
            header_lines.push_str(value.to_str().unwrap_or("<binary>"));
        }
        self.registry.debug_log(&header_lines)?;

        let body = response.bytes().await?.to_vec();
        let raw = RawResponse {
            status,
            content_type,
            body,
        };

        if !raw.is_ok_window() {
            let excerpt_len = raw.body.len().min(ERROR_BODY_EXCERPT_BYTES);
            let excerpt = String::from_utf8_lossy(&raw.body[..excerpt_len]);
            let user = username.unwrap_or("<anonymous>");
            warn!(status = %raw.status, url = %url, "Service request returned non-OK status");
            self.registry.debug_screen(&format!(
                "request to {url} by user {user} received status code {status}\n{excerpt}",
                status = raw.status.as_u16()
            ))?;
        }

        Ok(raw)
    }
}
