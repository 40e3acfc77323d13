//! JSON envelope decoding for REST responses.

use serde_json::Value;

use crate::error::{Error, Result};

/// The envelope wrapper key every REST response must carry.
pub const ENVELOPE_KEY: &str = "stacks-ws";

/// Marker inside an exception message flagging a request that needs admin
/// authorization. The service signals this through the message text rather
/// than a status code.
const ADMIN_ACCESS_DENIED_MARKER: &str = "You need to have admin access";

/// A decoded REST response: data, error and unauthorized flag.
///
/// Decoding normalizes three cases: a well-formed envelope (possibly
/// carrying a service exception), an invalid body, and a transport
/// failure. The latter two become responses with an error set so the
/// request layer has a single shape to hand back.
#[derive(Debug, Clone, Default)]
pub struct RestResponse {
    data: Option<Value>,
    error: Option<String>,
    unauthorized: bool,
}

impl RestResponse {
    /// Decodes raw body bytes into a response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Service`] when the body is not JSON or the
    /// expected envelope wrapper is absent.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|decode_error| Error::service(format!("response is not valid JSON: {decode_error}")))?;
        let data = value
            .get(ENVELOPE_KEY)
            .and_then(|envelope| envelope.get("response"))
            .cloned()
            .ok_or_else(|| Error::service("response envelope missing"))?;

        let mut error = None;
        let mut unauthorized = false;
        if let Some(exception) = data.get("exception") {
            let message = exception
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unspecified service exception")
                .to_string();
            unauthorized = message.contains(ADMIN_ACCESS_DENIED_MARKER);
            error = Some(message);
        }

        Ok(Self {
            data: Some(data),
            error,
            unauthorized,
        })
    }

    /// A response representing a failed transport or decode, carrying only
    /// an error message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(message.into()),
            unauthorized: false,
        }
    }

    /// The envelope's `response` member, when decoding succeeded.
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// The service exception message, or the transport/decode failure text.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// True when the service refused the request for lack of admin
    /// authorization; drives the admin retry protocol.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.unauthorized
    }
}
