use axum::http::header::InvalidHeaderValue;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Malformed header text. Always recovered by the range transform, never
/// surfaced to the HTTP client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("invalid <Range> syntax: {0:?}")]
    Range(String),
    #[error("invalid <Accept-Ranges> syntax: {0:?}")]
    AcceptRanges(String),
    #[error("invalid <range-unit> syntax: {0:?}")]
    RangeUnit(String),
    #[error("invalid <Content-Range> syntax: {0:?}")]
    ContentRange(String),
}

/// A value destined for a response header breaks the header grammar.
///
/// This is an integration error made by whoever built the value, so it is
/// propagated rather than swallowed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("<range-unit> is not a token: {0:?}")]
    RangeUnit(String),
    #[error("<first-pos> {first_pos} is greater than <last-pos> {last_pos}")]
    InvertedRange { first_pos: u64, last_pos: u64 },
}

/// Failure while transforming a response.
#[derive(Debug, Error)]
pub enum RangeError {
    #[error("failed to buffer response body: {0}")]
    Body(#[from] axum::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("computed header value is invalid: {0}")]
    HeaderValue(#[from] InvalidHeaderValue),
}

impl IntoResponse for RangeError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}
