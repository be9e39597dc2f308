//! # axum-range-request
//!
//! HTTP range requests as [`axum`][1] middleware.
//!
//! Handlers return complete responses. The middleware reads the request's
//! `Range` header and, when it applies, turns the handler's `200` into a
//! `206 Partial Content`, a `multipart/byteranges` body or a
//! `416 Range Not Satisfiable` ([RFC 9110 §14][2]). Every response gets an
//! `Accept-Ranges` header unless the handler set one.
//!
//! Range units are pluggable through the [`RangeUnit`] trait. The `bytes`
//! unit is provided by [`BytesRange`].
//!
//! ```
//! use axum::Router;
//! use axum::routing::get;
//!
//! use axum_range_request::RangeRequest;
//!
//! #[tokio::main]
//! async fn main() {
//!     let _app = Router::<()>::new()
//!         .route("/", get(|| async { "abcdefghijklmnopqrstuvwxyz" }))
//!         .layer(RangeRequest::new().layer());
//!
//!     // GET / with `Range: bytes=5-9` now answers
//!     // 206 Partial Content, `Content-Range: bytes 5-9/26`, body `fghij`
//! }
//! ```
//!
//! The whole response body is buffered before a partial response is built,
//! so the middleware suits bounded, in-memory representations.
//!
//! [1]: https://docs.rs/axum
//! [2]: https://www.rfc-editor.org/rfc/rfc9110#section-14

mod accept_ranges;
mod bytes_range;
mod content_range;
mod error;
mod middleware;
mod multipart;
mod range;
mod specifier;
mod transform;

pub use accept_ranges::{is_token, AcceptRanges};
pub use bytes_range::{is_satisfiable, to_inclusive_range, BytesRange, ComputeBoundary};
pub use content_range::{ContentRange, InclusiveRange, RangeResp};
pub use error::{RangeError, SyntaxError, ValidationError};
pub use middleware::{accept_ranges, content_range, range_request, RangeRequest};
pub use multipart::{digest_sha1, extract_boundary, MultipartByteranges};
pub use range::{Matched, Partial, RangeContext, RangeUnit, RangeUnits};
pub use specifier::{RangeSpec, RangesSpecifier, Specifier};
pub use transform::{
    shallow_merge_headers, with_accept_ranges, with_content_range, BodyConsumed,
    RangeNotSatisfiable, RequestHead,
};

/// The `bytes` range unit.
pub const BYTES: &str = "bytes";

/// The `Accept-Ranges` token announcing no range support.
pub const NONE: &str = "none";
