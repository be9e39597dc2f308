//! axum middleware wiring for range requests.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::accept_ranges::{is_token, AcceptRanges};
use crate::bytes_range::BytesRange;
use crate::range::{RangeUnit, RangeUnits};
use crate::transform::{with_accept_ranges, with_content_range, RequestHead};

/// Range request support for an axum router.
///
/// Holds the registered range units and the `Accept-Ranges` value to
/// advertise. Built once, then cloned into every request.
///
/// ```
/// use axum::{routing::get, Router};
/// use axum_range_request::RangeRequest;
///
/// let app: Router = Router::new()
///     .route("/", get(|| async { "abcdefghijklmnopqrstuvwxyz" }))
///     .layer(RangeRequest::new().layer());
/// ```
#[derive(Debug, Clone)]
pub struct RangeRequest {
    units: RangeUnits,
    accept_ranges: AcceptRanges,
}

impl RangeRequest {
    /// Supports `bytes` ranges only.
    pub fn new() -> Self {
        RangeRequest::with_ranges([Arc::new(BytesRange::new()) as Arc<dyn RangeUnit>])
    }

    /// Supports the given units. On a name clash the first one registered
    /// wins. `Accept-Ranges` lists every unit name once, or `none` when
    /// there are no units.
    pub fn with_ranges<I>(ranges: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn RangeUnit>>,
    {
        let units = RangeUnits::new(ranges);

        let names = units.names().filter(|name| {
            let valid = is_token(name);
            if !valid {
                tracing::warn!(range_unit = name, "range unit name is not a token, not advertised");
            }
            valid
        });
        let accept_ranges = AcceptRanges::from_units(names).unwrap_or_else(|_| AcceptRanges::none());

        RangeRequest { units, accept_ranges }
    }

    /// Advertises `accept_ranges` instead of the registered unit names.
    pub fn accept_ranges(mut self, accept_ranges: AcceptRanges) -> Self {
        self.accept_ranges = accept_ranges;
        self
    }

    pub fn units(&self) -> &RangeUnits {
        &self.units
    }

    pub fn advertised(&self) -> &AcceptRanges {
        &self.accept_ranges
    }

    /// [`range_request`] as a layer for [`Router::layer`](axum::Router::layer).
    pub fn layer(
        &self,
    ) -> impl tower::Layer<
        axum::routing::Route,
        Service = impl tower::Service<
            Request,
            Response = Response,
            Error = Infallible,
            Future = impl Send + 'static,
        > + Clone
                      + Send
                      + Sync
                      + 'static,
    > + Clone {
        axum::middleware::from_fn_with_state(self.clone(), range_request)
    }

    async fn handle(&self, request: Request, next: Next) -> Response {
        let head = RequestHead::from_request(&request);
        let response = next.run(request).await;

        let response = with_accept_ranges(response, &self.accept_ranges);
        respond(with_content_range(&head, response, &self.units).await)
    }
}

impl Default for RangeRequest {
    fn default() -> Self {
        RangeRequest::new()
    }
}

/// Adds `Accept-Ranges` and answers range requests.
///
/// Use with [`axum::middleware::from_fn_with_state`] and a [`RangeRequest`],
/// or through [`RangeRequest::layer`].
pub async fn range_request(State(state): State<RangeRequest>, request: Request, next: Next) -> Response {
    state.handle(request, next).await
}

/// Answers range requests without touching `Accept-Ranges`.
pub async fn content_range(State(units): State<RangeUnits>, request: Request, next: Next) -> Response {
    let head = RequestHead::from_request(&request);
    let response = next.run(request).await;
    respond(with_content_range(&head, response, &units).await)
}

/// Adds `Accept-Ranges` to responses that lack it.
pub async fn accept_ranges(
    State(accept_ranges): State<AcceptRanges>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    with_accept_ranges(response, &accept_ranges)
}

fn respond(result: Result<Response, crate::RangeError>) -> Response {
    match result {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(%err, "range request failed");
            err.into_response()
        }
    }
}
