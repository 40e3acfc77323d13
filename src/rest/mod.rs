//! Authenticated request protocol and JSON envelope decoding for the
//! REST web service.
//!
//! - [`RestRequest`] - per-call request context with user and admin paths
//! - [`RestResponse`] - decoded data/error/unauthorized triple
//!
//! The admin path implements the unauthorized → authenticate → single
//! retry recovery protocol; see [`RestRequest::admin_get`].

mod request;
mod response;
pub(crate) mod transport;

pub use request::{REST_ENDPOINT, RestRequest};
pub use response::{ENVELOPE_KEY, RestResponse};
