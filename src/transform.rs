//! Turns a complete origin response into a partial one.
//!
//! [`with_content_range`] decides, from the request and the response the
//! handler produced, whether a range request is answered with `206`,
//! `multipart/byteranges`, `416` or the untouched response.

use axum::body::{to_bytes, Body};
use axum::http::header::{
    ACCEPT_RANGES, CONTENT_ENCODING, CONTENT_LANGUAGE, CONTENT_LENGTH, CONTENT_LOCATION,
    CONTENT_RANGE, CONTENT_TYPE, IF_RANGE, RANGE,
};
use axum::http::{HeaderMap, HeaderName, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum_extra::headers::HeaderMapExt;
use bytes::Bytes;

use crate::accept_ranges::AcceptRanges;
use crate::content_range::ContentRange;
use crate::error::{RangeError, ValidationError};
use crate::range::{Matched, Partial, RangeContext, RangeUnits};
use crate::specifier::RangesSpecifier;
use crate::NONE;

/// Headers describing the selected representation, dropped from a 416.
const REPRESENTATION_HEADERS: [HeaderName; 5] = [
    CONTENT_TYPE,
    CONTENT_ENCODING,
    CONTENT_LANGUAGE,
    CONTENT_LOCATION,
    CONTENT_LENGTH,
];

/// The parts of a request that decide range handling. Captured before the
/// request is handed to the inner service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: Method,
    /// Raw `Range` value. A value that is not visible ASCII counts as absent.
    pub range: Option<String>,
    pub if_range: bool,
}

impl RequestHead {
    pub fn from_request<B>(request: &Request<B>) -> Self {
        let headers = request.headers();
        RequestHead {
            method: request.method().clone(),
            range: headers
                .get(RANGE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string),
            if_range: headers.contains_key(IF_RANGE),
        }
    }
}

/// Response extension marking a body that has already been read or handed
/// off. Such responses are never range-transformed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BodyConsumed;

/// A `416 Range Not Satisfiable` response.
///
/// Carries the headers of the response it replaces, minus representation
/// headers, plus a `Content-Range` of the form `<unit> */<complete-length>`.
#[derive(Debug, Clone)]
pub struct RangeNotSatisfiable {
    pub content_range: ContentRange,
    pub headers: HeaderMap,
}

impl RangeNotSatisfiable {
    pub fn new(content_range: ContentRange) -> Self {
        RangeNotSatisfiable { content_range, headers: HeaderMap::new() }
    }

    /// Keeps the non-representation headers of `headers`.
    pub fn with_headers(mut self, mut headers: HeaderMap) -> Self {
        for name in &REPRESENTATION_HEADERS {
            headers.remove(name);
        }
        self.headers = headers;
        self
    }

    pub fn try_into_response(self) -> Result<Response, ValidationError> {
        let mut headers = self.headers;
        if !headers.contains_key(CONTENT_RANGE) {
            headers.insert(CONTENT_RANGE, self.content_range.to_header_value()?);
        }

        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::RANGE_NOT_SATISFIABLE;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

impl IntoResponse for RangeNotSatisfiable {
    fn into_response(self) -> Response {
        match self.try_into_response() {
            Ok(response) => response,
            Err(err) => RangeError::from(err).into_response(),
        }
    }
}

/// Copies `right` over `left`. Every header name present in `right`
/// replaces all of its values in `left`.
pub fn shallow_merge_headers(mut left: HeaderMap, right: HeaderMap) -> HeaderMap {
    let mut current: Option<HeaderName> = None;
    for (name, value) in right {
        match name {
            Some(name) => {
                left.insert(name.clone(), value);
                current = Some(name);
            }
            None => {
                if let Some(name) = &current {
                    left.append(name, value);
                }
            }
        }
    }
    left
}

/// Sets `Accept-Ranges` unless the response already has one.
pub fn with_accept_ranges(mut response: Response, accept_ranges: &AcceptRanges) -> Response {
    if !response.headers().contains_key(ACCEPT_RANGES) {
        response.headers_mut().typed_insert(accept_ranges.clone());
    }
    response
}

/// Applies a range request to a complete response.
///
/// The response is returned unchanged when range handling does not apply:
/// the method is not `GET`, there is no `Range` or there is an `If-Range`,
/// the status is not `200`, the response already has a `Content-Range`,
/// advertises `Accept-Ranges: none`, is marked [`BodyConsumed`], has no
/// `Content-Type`, or the `Range` value does not parse.
///
/// Otherwise the body is buffered. An unknown unit, an unsupported kind of
/// range-spec or a set with nothing satisfiable gives `416`. The rest is up
/// to the matched [`RangeUnit`](crate::RangeUnit); its headers override the
/// origin's in the `206` response.
pub async fn with_content_range(
    head: &RequestHead,
    response: Response,
    units: &RangeUnits,
) -> Result<Response, RangeError> {
    if head.method != Method::GET {
        tracing::debug!(method = %head.method, "range handling is only defined for GET");
        return Ok(response);
    }
    let Some(range) = head.range.as_deref() else {
        return Ok(response);
    };
    if head.if_range {
        tracing::debug!("If-Range present, serving full representation");
        return Ok(response);
    }
    if response.status() != StatusCode::OK {
        tracing::debug!(status = %response.status(), "not a 200 response");
        return Ok(response);
    }

    let headers = response.headers();
    if headers.contains_key(CONTENT_RANGE) {
        tracing::debug!("response already has Content-Range");
        return Ok(response);
    }
    // only a bare `none`; a list that merely includes it still allows ranges
    let accepts_none = headers
        .get(ACCEPT_RANGES)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim() == NONE);
    if accepts_none {
        tracing::debug!("response advertises Accept-Ranges: none");
        return Ok(response);
    }
    if response.extensions().get::<BodyConsumed>().is_some() {
        tracing::debug!("response body already consumed");
        return Ok(response);
    }
    let Some(content_type) = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
    else {
        tracing::debug!("response has no Content-Type");
        return Ok(response);
    };

    let specifier: RangesSpecifier = match range.parse() {
        Ok(specifier) => specifier,
        Err(err) => {
            tracing::debug!(%err, "ignoring malformed Range");
            return Ok(response);
        }
    };

    let (mut parts, body) = response.into_parts();
    let content: Bytes = to_bytes(body, usize::MAX).await?;
    let complete_length = content.len() as u64;

    let not_satisfiable = |content_range: ContentRange, headers: HeaderMap| {
        RangeNotSatisfiable::new(content_range)
            .with_headers(headers)
            .try_into_response()
            .map_err(RangeError::from)
    };

    let unit = match units.find(&specifier) {
        Matched::Unit(unit) => unit,
        Matched::UnknownUnit => {
            tracing::debug!(range_unit = %specifier.range_unit, known = ?units, "unknown range unit");
            let content_range = ContentRange::unsatisfied(specifier.range_unit.as_str(), complete_length);
            return not_satisfiable(content_range, parts.headers);
        }
        Matched::UnsupportedSpecifier(unit) => {
            tracing::debug!(range_unit = unit.unit(), "range-spec kind not supported by unit");
            let content_range = ContentRange::unsatisfied(unit.unit(), complete_length);
            return not_satisfiable(content_range, parts.headers);
        }
    };

    let range_set: Vec<_> = specifier
        .range_set
        .into_iter()
        .filter(|range_spec| unit.is_satisfiable(range_spec, complete_length))
        .collect();

    if range_set.is_empty() {
        tracing::debug!(range, complete_length, "no satisfiable range");
        let content_range = ContentRange::unsatisfied(unit.unit(), complete_length);
        return not_satisfiable(content_range, parts.headers);
    }

    let partial = unit.partial(RangeContext {
        range_unit: &specifier.range_unit,
        range_set: &range_set,
        content: &content,
        content_type: &content_type,
    })?;

    match partial {
        Partial::Content { content, headers } => {
            tracing::debug!(range, ranges = range_set.len(), len = content.len(), "partial content");
            parts.status = StatusCode::PARTIAL_CONTENT;
            parts.headers.remove(CONTENT_LENGTH);
            parts.headers = shallow_merge_headers(parts.headers, headers);
            Ok(Response::from_parts(parts, Body::from(content)))
        }
        Partial::NotSatisfiable(content_range) => {
            tracing::debug!(range, complete_length, "range unit rejected the range set");
            not_satisfiable(content_range, parts.headers)
        }
    }
}
