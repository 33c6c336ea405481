//! Protocol Module
//!
//! Transport-neutral response shapes handed to the HTTP/RPC collaborator.
//!
//! The core never speaks a wire protocol itself. It returns a [`Response`]
//! (status + body + cache headers) or a [`crate::StoreError`] whose
//! [`crate::StoreError::status`] tells the transport which signal to send.
//!
//! ### Status Codes
//! - 200: OK
//! - 304: NOT_MODIFIED (validator matched, empty body)
//! - 400: BAD_REQUEST (decode/validation failure)
//! - 404: NOT_FOUND
//! - 429: TOO_MANY_REQUESTS (admission refused, retriable)
//! - 500: SERVER_ERROR (I/O failure, store left consistent)

mod response;

pub use response::{CacheHeaders, Response, Status};
