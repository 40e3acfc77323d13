//! Error types shared across the client.

use thiserror::Error;

/// Errors surfaced by the client SDK.
///
/// "Not found" is never an error anywhere in this crate: lookups that find
/// nothing return `Ok(None)`. Cache-write failures degrade to the runtime
/// fallback cache and are likewise never surfaced.
#[derive(Debug, Error)]
pub enum Error {
    /// The host application's configuration is missing or invalid
    /// (hostname, admin credentials, proxy registration).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The remote service returned something the client cannot work with
    /// (malformed envelope, failed admin authentication handshake).
    #[error("service error: {0}")]
    Service(String),

    /// Transport-level HTTP failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The taxonomy tree response contained a node that is neither a
    /// sibling list nor an attributed object. Fatal for that parse.
    #[error("invalid taxon data: {0}")]
    InvalidTaxonData(String),
}

impl Error {
    /// Creates a `Configuration` error from any displayable message.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a `Service` error from any displayable message.
    #[must_use]
    pub fn service(message: impl Into<String>) -> Self {
        Self::Service(message.into())
    }

    /// Returns true for errors caused by host configuration rather than
    /// the remote service.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
