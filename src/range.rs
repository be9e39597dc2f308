use std::fmt;
use std::sync::Arc;

use axum::http::HeaderMap;
use bytes::Bytes;

use crate::content_range::ContentRange;
use crate::error::RangeError;
use crate::specifier::{RangeSpec, RangesSpecifier, Specifier};

/// A range unit implementation, such as [`BytesRange`](crate::BytesRange).
///
/// Units are built once when the middleware is set up and shared read-only
/// by every request.
pub trait RangeUnit: Send + Sync {
    /// The `<range-unit>` token this implementation answers to.
    fn unit(&self) -> &str;

    /// Which kinds of range-spec this unit understands. A request containing
    /// any other kind is answered with 416.
    fn specifiers(&self) -> &[Specifier];

    /// Whether `range_spec` selects anything from a representation of
    /// `complete_length` units.
    fn is_satisfiable(&self, range_spec: &RangeSpec, complete_length: u64) -> bool;

    /// Builds the partial representation. `context.range_set` only holds
    /// satisfiable range-specs, in request order.
    fn partial(&self, context: RangeContext<'_>) -> Result<Partial, RangeError>;
}

/// Everything a [`RangeUnit`] needs to build a partial response.
#[derive(Debug, Clone, Copy)]
pub struct RangeContext<'a> {
    pub range_unit: &'a str,
    pub range_set: &'a [RangeSpec],
    /// The full, buffered representation.
    pub content: &'a Bytes,
    pub content_type: &'a str,
}

/// Outcome of [`RangeUnit::partial`].
#[derive(Debug)]
pub enum Partial {
    /// 206 body plus the headers that override the origin's.
    Content { content: Bytes, headers: HeaderMap },
    /// 416, with the `Content-Range` to send.
    NotSatisfiable(ContentRange),
}

/// Ordered collection of [`RangeUnit`]s. Cheap to clone.
#[derive(Clone)]
pub struct RangeUnits(Arc<[Arc<dyn RangeUnit>]>);

/// Result of looking a [`RangesSpecifier`] up in [`RangeUnits`].
pub enum Matched<'a> {
    Unit(&'a dyn RangeUnit),
    /// No registered unit has this name.
    UnknownUnit,
    /// The unit is known but a range-spec kind is not accepted by it.
    UnsupportedSpecifier(&'a dyn RangeUnit),
}

impl RangeUnits {
    pub fn new<I>(units: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn RangeUnit>>,
    {
        RangeUnits(units.into_iter().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<dyn RangeUnit>> {
        self.0.iter()
    }

    /// Unit names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|unit| unit.unit())
    }

    /// First unit whose name equals the requested unit, then checks every
    /// range-spec kind against it.
    pub fn find(&self, specifier: &RangesSpecifier) -> Matched<'_> {
        let Some(unit) = self.0.iter().find(|unit| unit.unit() == specifier.range_unit) else {
            return Matched::UnknownUnit;
        };
        let unit: &dyn RangeUnit = unit.as_ref();

        let supported = specifier
            .range_set
            .iter()
            .all(|range_spec| unit.specifiers().contains(&range_spec.specifier()));

        if supported {
            Matched::Unit(unit)
        } else {
            Matched::UnsupportedSpecifier(unit)
        }
    }
}

impl Default for RangeUnits {
    fn default() -> Self {
        RangeUnits(Arc::from(Vec::new()))
    }
}

impl fmt::Debug for RangeUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl fmt::Debug for Matched<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matched::Unit(unit) => f.debug_tuple("Unit").field(&unit.unit()).finish(),
            Matched::UnknownUnit => f.write_str("UnknownUnit"),
            Matched::UnsupportedSpecifier(unit) => {
                f.debug_tuple("UnsupportedSpecifier").field(&unit.unit()).finish()
            }
        }
    }
}

impl FromIterator<Arc<dyn RangeUnit>> for RangeUnits {
    fn from_iter<T: IntoIterator<Item = Arc<dyn RangeUnit>>>(iter: T) -> Self {
        RangeUnits::new(iter)
    }
}
