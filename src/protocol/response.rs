//! Response definitions
//!
//! Represents responses handed back to the transport.

use bytes::Bytes;

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Status {
    Ok = 200,
    NotModified = 304,
    BadRequest = 400,
    NotFound = 404,
    TooManyRequests = 429,
    ServerError = 500,
}

impl Status {
    /// Numeric code understood by HTTP-like transports
    pub fn code(self) -> u16 {
        self as u16
    }
}

/// Validator and freshness directives attached to a cacheable response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHeaders {
    /// Quoted strong entity tag, e.g. `"9f86d0..."`
    pub etag: String,

    /// Rendered `Cache-Control` value, e.g. `public, max-age=30`
    pub cache_control: String,
}

/// A response to send to the client
#[derive(Debug, Clone)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Serialized body; empty for NOT_MODIFIED
    pub body: Bytes,

    /// Present on cacheable responses
    pub cache: Option<CacheHeaders>,
}

impl Response {
    /// Create an OK response with a body
    pub fn ok(body: impl Into<Bytes>, cache: Option<CacheHeaders>) -> Self {
        Self {
            status: Status::Ok,
            body: body.into(),
            cache,
        }
    }

    /// Create a NOT_MODIFIED response (no body, headers repeated)
    pub fn not_modified(cache: CacheHeaders) -> Self {
        Self {
            status: Status::NotModified,
            body: Bytes::new(),
            cache: Some(cache),
        }
    }

    /// Create an error response carrying a short message
    pub fn error(status: Status, message: &str) -> Self {
        Self {
            status,
            body: Bytes::copy_from_slice(message.as_bytes()),
            cache: None,
        }
    }

    pub fn is_not_modified(&self) -> bool {
        self.status == Status::NotModified
    }
}

impl From<&crate::StoreError> for Response {
    fn from(err: &crate::StoreError) -> Self {
        Self::error(err.status(), &err.to_string())
    }
}
