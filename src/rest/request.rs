//! Authenticated REST request protocol.
//!
//! [`RestRequest`] is a per-call context: each concurrent caller builds its
//! own instance, so the admin credential swap never races with another
//! request's credentials. The admin path carries its own cookie jar so the
//! session established by the authentication handshake survives the retry.

use std::sync::Arc;

use reqwest::cookie::Jar;
use tracing::{debug, warn};
use url::Url;

use crate::config::{Configuration, keys};
use crate::error::{Error, Result};
use crate::proxy::ProxyRegistry;

use super::response::RestResponse;
use super::transport::{Transport, build_url, service_base_url};

/// Path prefix of the REST web-service endpoint.
pub const REST_ENDPOINT: &str = "Stacks-REST";

/// Method used to establish an admin session after an unauthorized
/// response.
const AUTH_HANDSHAKE_METHOD: &str = "Test/authentication";

/// A request context against the REST endpoint.
///
/// Every response is decoded through [`RestResponse`]; the HTTP status
/// code never reaches the decode layer. Admin-scoped calls run the
/// unauthorized → authenticate → single-retry protocol.
#[derive(Debug)]
pub struct RestRequest {
    config: Arc<Configuration>,
    registry: Arc<ProxyRegistry>,
    base: Url,
    transport: Transport,
    admin_jar: Arc<Jar>,
    admin_transport: Option<Transport>,
    last_request_url: Option<Url>,
}

impl RestRequest {
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
            admin_jar: Arc::new(Jar::default()),
            admin_transport: None,
            last_request_url: None,
        })
    }

    /// Issues a user-scoped GET against `method`.
    ///
    /// `output=json` is always prepended to the parameters. Basic auth is
    /// applied when both username and password are configured. Transport
    /// and decode failures are normalized into a [`RestResponse`] carrying
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when a required debug sink is
    /// unregistered in strict mode.
    pub async fn get(&mut self, method: &str, params: &[(&str, &str)]) -> Result<RestResponse> {
        let username = self.config.get(keys::USERNAME).map(str::to_string);
        let password = self.config.get(keys::PASSWORD).map(str::to_string);
        let transport = self.transport.clone();
        self.execute(&transport, method, params, username.as_deref(), password.as_deref())
            .await
    }

    /// Issues an admin-scoped GET against `method`.
    ///
    /// Protocol: if the decoded response signals unauthorized, the
    /// response is discarded, one authentication handshake is issued to
    /// re-establish the admin session, and the original call is re-issued
    /// exactly once. A failing handshake is fatal with no further retry.
    /// Credentials are call-local, so the non-admin context is untouched
    /// on every path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when admin credentials are not
    /// configured, and [`Error::Service`] when the authentication
    /// handshake itself fails.
    pub async fn admin_get(
        &mut self,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<RestResponse> {
        let first = self.admin_get_once(method, params).await?;
        if !first.is_unauthorized() {
            return Ok(first);
        }

        debug!(method, "Admin request unauthorized; re-establishing session");
        let handshake = self.admin_get_once(AUTH_HANDSHAKE_METHOD, &[]).await?;
        if let Some(error) = handshake.error() {
            return Err(Error::service(format!(
                "admin authentication failed: {error}"
            )));
        }

        self.admin_get_once(method, params).await
    }

    /// The URL of the most recent request, for diagnostics.
    #[must_use]
    pub fn last_request_url(&self) -> Option<&str> {
        self.last_request_url.as_ref().map(Url::as_str)
    }

    async fn admin_get_once(
        &mut self,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<RestResponse> {
        let admin_username = self
            .config
            .get(keys::ADMIN_USERNAME)
            .map(str::to_string)
            .ok_or_else(|| Error::configuration("admin login credentials not configured"))?;
        let admin_password = self
            .config
            .get(keys::ADMIN_PASSWORD)
            .map(str::to_string)
            .ok_or_else(|| Error::configuration("admin login credentials not configured"))?;

        if self.admin_transport.is_none() {
            self.admin_transport = Some(Transport::new(
                &self.config,
                Arc::clone(&self.registry),
                Some(Arc::clone(&self.admin_jar)),
            )?);
        }
        let transport = match self.admin_transport.as_ref() {
            Some(transport) => transport.clone(),
            None => return Err(Error::configuration("admin transport unavailable")),
        };

        self.execute(
            &transport,
            method,
            params,
            Some(&admin_username),
            Some(&admin_password),
        )
        .await
    }

    async fn execute(
        &mut self,
        transport: &Transport,
        method: &str,
        params: &[(&str, &str)],
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<RestResponse> {
        // JSON is cheaper to decode than the service's XML default.
        let mut merged: Vec<(&str, &str)> = vec![("output", "json")];
        merged.extend_from_slice(params);

        let url = build_url(&self.base, REST_ENDPOINT, method, &merged)?;
        self.last_request_url = Some(url.clone());

        let raw = match transport.get(&url, username, password).await {
            Ok(raw) => raw,
            Err(Error::Transport(transport_error)) => {
                warn!(url = %url, error = %transport_error, "REST transport failure");
                return Ok(RestResponse::failed(format!(
                    "transport failure: {transport_error}"
                )));
            }
            Err(other) => return Err(other),
        };

        match RestResponse::parse(&raw.body) {
            Ok(response) => Ok(response),
            Err(decode_error) => {
                warn!(
                    url = %url,
                    content_type = raw.content_type.as_deref().unwrap_or("unknown"),
                    error = %decode_error,
                    "Failed to decode REST response"
                );
                Ok(RestResponse::failed(decode_error.to_string()))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn registry() -> Arc<ProxyRegistry> {
        let registry = ProxyRegistry::new();
        registry.set_tolerant(true);
        Arc::new(registry)
    }

    #[test]
    fn test_new_requires_hostname() {
        let config = Arc::new(Configuration::new());
        let err = RestRequest::new(config, registry()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_new_rejects_schemeless_hostname() {
        let mut config = Configuration::new();
        config.set(keys::HOSTNAME, "library.example.org");
        let err = RestRequest::new(Arc::new(config), registry()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_admin_get_requires_admin_credentials() {
        let mut config = Configuration::new();
        config.set(keys::HOSTNAME, "https://library.example.org");
        let mut request = RestRequest::new(Arc::new(config), registry()).unwrap();
        let err = request.admin_get("Taxonomy", &[]).await.unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("admin login credentials"));
    }
}
