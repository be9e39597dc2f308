use std::fmt;
use std::sync::Arc;

use axum::http::header::{CONTENT_RANGE, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue};

use crate::content_range::{ContentRange, InclusiveRange};
use crate::error::RangeError;
use crate::multipart::{digest_sha1, MultipartByteranges};
use crate::range::{Partial, RangeContext, RangeUnit};
use crate::specifier::{RangeSpec, Specifier};
use crate::BYTES;

/// Computes the multipart boundary from the full body.
pub type ComputeBoundary = Arc<dyn Fn(&[u8]) -> String + Send + Sync>;

/// The `bytes` range unit (RFC 9110 §14.1.2).
///
/// A single satisfiable range is answered with the slice itself and a
/// `Content-Range` header. Two or more produce a `multipart/byteranges`
/// body whose boundary is, by default, the hex SHA-1 digest of the content.
///
/// ```
/// use axum_range_request::BytesRange;
///
/// // a fixed boundary keeps multipart output stable
/// let bytes = BytesRange::with_boundary(|_| "BOUNDARY".to_string());
/// ```
#[derive(Clone)]
pub struct BytesRange {
    boundary: ComputeBoundary,
}

impl BytesRange {
    pub fn new() -> Self {
        BytesRange::with_boundary(digest_sha1)
    }

    /// Uses `boundary` instead of the SHA-1 digest.
    pub fn with_boundary<F>(boundary: F) -> Self
    where
        F: Fn(&[u8]) -> String + Send + Sync + 'static,
    {
        BytesRange { boundary: Arc::new(boundary) }
    }
}

impl Default for BytesRange {
    fn default() -> Self {
        BytesRange::new()
    }
}

impl fmt::Debug for BytesRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BytesRange").finish_non_exhaustive()
    }
}

impl RangeUnit for BytesRange {
    fn unit(&self) -> &str {
        BYTES
    }

    fn specifiers(&self) -> &[Specifier] {
        &[Specifier::IntRange, Specifier::SuffixRange]
    }

    fn is_satisfiable(&self, range_spec: &RangeSpec, complete_length: u64) -> bool {
        is_satisfiable(range_spec, complete_length)
    }

    fn partial(&self, context: RangeContext<'_>) -> Result<Partial, RangeError> {
        let content = context.content;
        let complete_length = content.len() as u64;

        let ranges: Vec<InclusiveRange> = context
            .range_set
            .iter()
            .filter(|range_spec| is_satisfiable(range_spec, complete_length))
            .filter_map(|range_spec| to_inclusive_range(range_spec, complete_length))
            .collect();

        match ranges.as_slice() {
            [] => Ok(Partial::NotSatisfiable(ContentRange::unsatisfied(context.range_unit, complete_length))),
            [range] => {
                let content_range = ContentRange::satisfied(context.range_unit, *range, complete_length);

                let mut headers = HeaderMap::new();
                headers.insert(CONTENT_RANGE, content_range.to_header_value()?);

                tracing::debug!(
                    first_pos = range.first_pos,
                    last_pos = range.last_pos,
                    complete_length,
                    "single range"
                );
                Ok(Partial::Content {
                    content: content.slice(range.span(content.len())),
                    headers,
                })
            }
            ranges => {
                let boundary = (self.boundary)(&content[..]);
                let multipart = MultipartByteranges {
                    content,
                    content_type: context.content_type,
                    ranges,
                    range_unit: context.range_unit,
                    boundary: &boundary,
                };

                let mut headers = HeaderMap::new();
                headers.insert(
                    CONTENT_TYPE,
                    HeaderValue::from_str(&format!("multipart/byteranges; boundary={boundary}"))?,
                );

                tracing::debug!(parts = ranges.len(), complete_length, %boundary, "multipart byteranges");
                Ok(Partial::Content {
                    content: multipart.encode()?,
                    headers,
                })
            }
        }
    }
}

/// An int range is satisfiable when it starts inside a non-empty body, a
/// suffix range when it asks for at least one byte.
pub fn is_satisfiable(range_spec: &RangeSpec, complete_length: u64) -> bool {
    match *range_spec {
        RangeSpec::Int { first_pos, .. } => complete_length > 0 && first_pos < complete_length,
        RangeSpec::Suffix { suffix_length } => suffix_length > 0,
        RangeSpec::Other(_) => false,
    }
}

/// Resolves a range-spec against a body of `complete_length` bytes.
///
/// A missing or too large `last-pos` is replaced by the last byte, a suffix
/// longer than the body covers all of it. Against an empty body every range
/// resolves to `0-0`. Other ranges have no byte offsets and yield `None`.
pub fn to_inclusive_range(range_spec: &RangeSpec, complete_length: u64) -> Option<InclusiveRange> {
    let last_byte = complete_length.saturating_sub(1);

    match *range_spec {
        RangeSpec::Int { first_pos, last_pos } => {
            let last_pos = match last_pos {
                Some(last_pos) if last_pos < complete_length => last_pos,
                _ => last_byte,
            };
            Some(InclusiveRange { first_pos, last_pos })
        }
        RangeSpec::Suffix { suffix_length } => Some(InclusiveRange {
            first_pos: complete_length.saturating_sub(suffix_length),
            last_pos: last_byte,
        }),
        RangeSpec::Other(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches::assert_matches;
    use bytes::Bytes;
    use proptest::prelude::*;

    use super::*;

    fn int(first_pos: u64, last_pos: u64) -> RangeSpec {
        RangeSpec::Int { first_pos, last_pos: Some(last_pos) }
    }

    fn suffix(suffix_length: u64) -> RangeSpec {
        RangeSpec::Suffix { suffix_length }
    }

    fn partial(bytes: &BytesRange, range_set: &[RangeSpec], content: &'static str) -> Partial {
        let content = Bytes::from_static(content.as_bytes());
        bytes.partial(RangeContext {
            range_unit: BYTES,
            range_set,
            content: &content,
            content_type: "text/test",
        }).unwrap()
    }

    /// A boundary function that counts how often it runs.
    fn counting_boundary() -> (BytesRange, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let bytes = BytesRange::with_boundary(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            "BOUNDARY".to_string()
        });
        (bytes, calls)
    }

    #[test]
    fn test_int_range_to_inclusive_range() {
        let tests = [
            (int(0, 0), 0, (0, 0)),
            (int(0, 0), 1, (0, 0)),
            (int(0, 1), 1, (0, 0)),
            (int(0, 0), 10, (0, 0)),
            (int(0, 1), 10, (0, 1)),
            (int(0, 100), 10, (0, 9)),
            (int(4, 6), 10, (4, 6)),
            (RangeSpec::Int { first_pos: 4, last_pos: None }, 10, (4, 9)),
            (RangeSpec::Int { first_pos: 0, last_pos: None }, 0, (0, 0)),
        ];

        for (range_spec, complete_length, (first_pos, last_pos)) in tests {
            assert_eq!(
                Some(InclusiveRange { first_pos, last_pos }),
                to_inclusive_range(&range_spec, complete_length),
                "{range_spec} of {complete_length}",
            );
        }
    }

    #[test]
    fn test_suffix_range_to_inclusive_range() {
        let tests = [
            (1, 0, (0, 0)),
            (0, 0, (0, 0)),
            (1, 1, (0, 0)),
            (1, 2, (1, 1)),
            (1, 3, (2, 2)),
            (2, 3, (1, 2)),
            (3, 3, (0, 2)),
            (100, 7, (0, 6)),
        ];

        for (suffix_length, complete_length, (first_pos, last_pos)) in tests {
            assert_eq!(
                Some(InclusiveRange { first_pos, last_pos }),
                to_inclusive_range(&suffix(suffix_length), complete_length),
                "-{suffix_length} of {complete_length}",
            );
        }
    }

    #[test]
    fn test_other_range_has_no_offsets() {
        assert_eq!(None, to_inclusive_range(&RangeSpec::Other("x".to_string()), 10));
        assert!(!is_satisfiable(&RangeSpec::Other("x".to_string()), 10));
    }

    #[test]
    fn test_is_satisfiable() {
        assert!(is_satisfiable(&int(0, 0), 1));
        assert!(is_satisfiable(&int(0, 1), 1));
        assert!(is_satisfiable(&int(9, 100), 10));

        assert!(!is_satisfiable(&int(0, 0), 0));
        assert!(!is_satisfiable(&int(1, 1), 0));
        // first-pos equal to the length is one past the last byte
        assert!(!is_satisfiable(&int(10, 20), 10));

        assert!(is_satisfiable(&suffix(1), 0));
        assert!(is_satisfiable(&suffix(1), 1));
        assert!(is_satisfiable(&suffix(100), 0));
        assert!(is_satisfiable(&suffix(100), 1));

        assert!(!is_satisfiable(&suffix(0), 0));
        assert!(!is_satisfiable(&suffix(0), 1));
    }

    #[test]
    fn test_partial_single_range() {
        let (bytes, calls) = counting_boundary();

        let partial = partial(&bytes, &[int(3, 5)], "abcdefghij");
        assert_matches!(partial, Partial::Content { content, headers } => {
            assert_eq!("def", content);
            assert_eq!("bytes 3-5/10", headers[CONTENT_RANGE]);
            assert!(headers.get(CONTENT_TYPE).is_none());
        });
        assert_eq!(0, calls.load(Ordering::SeqCst));
    }

    #[test]
    fn test_partial_suffix_covering_everything() {
        let partial = partial(&BytesRange::new(), &[suffix(100)], "abcdefg");
        assert_matches!(partial, Partial::Content { content, headers } => {
            assert_eq!("abcdefg", content);
            assert_eq!("bytes 0-6/7", headers[CONTENT_RANGE]);
        });
    }

    #[test]
    fn test_partial_multiple_ranges() {
        let (bytes, calls) = counting_boundary();

        let partial = partial(&bytes, &[suffix(100), int(0, 1)], "abcdefg");
        assert_matches!(partial, Partial::Content { content, headers } => {
            assert_eq!("multipart/byteranges; boundary=BOUNDARY", headers[CONTENT_TYPE]);
            assert!(headers.get(CONTENT_RANGE).is_none());
            assert_eq!(
                "--BOUNDARY\nContent-Type: text/test\nContent-Range: bytes 0-6/7\n\nabcdefg\n\
                 --BOUNDARY\nContent-Type: text/test\nContent-Range: bytes 0-1/7\n\nab\n\
                 --BOUNDARY--",
                content,
            );
        });
        assert_eq!(1, calls.load(Ordering::SeqCst));
    }

    #[test]
    fn test_partial_default_boundary_is_sha1() {
        let partial = partial(&BytesRange::new(), &[int(0, 0), suffix(1)], "abcdefg");
        assert_matches!(partial, Partial::Content { headers, .. } => {
            assert_eq!(
                "multipart/byteranges; boundary=2fb5e13419fc89246865e7a324f476ec624e8740",
                headers[CONTENT_TYPE],
            );
        });
    }

    #[test]
    fn test_partial_not_satisfiable() {
        let (bytes, calls) = counting_boundary();

        assert_matches!(
            partial(&bytes, &[int(4, 10), suffix(0)], "abcd"),
            Partial::NotSatisfiable(content_range) => {
                assert_eq!(Ok("bytes */4".to_string()), content_range.stringify());
            }
        );
        assert_matches!(
            partial(&bytes, &[int(0, 4)], ""),
            Partial::NotSatisfiable(content_range) => {
                assert_eq!(Ok("bytes */0".to_string()), content_range.stringify());
            }
        );
        assert_eq!(0, calls.load(Ordering::SeqCst));
    }

    #[test]
    fn test_partial_invalid_boundary() {
        let bytes = BytesRange::with_boundary(|_| "line\nbreak".to_string());
        let content = Bytes::from_static(b"abcdefg");
        let result = bytes.partial(RangeContext {
            range_unit: BYTES,
            range_set: &[int(0, 0), int(2, 3)],
            content: &content,
            content_type: "text/test",
        });
        assert_matches!(result, Err(RangeError::HeaderValue(_)));
    }

    proptest! {
        #[test]
        fn int_range_resolves_inside_body(
            complete_length in 0u64..10_000,
            first in any::<u64>(),
            last in proptest::option::of(any::<u64>()),
        ) {
            prop_assume!(complete_length > 0);
            let first_pos = first % complete_length;
            let last_pos = last.map(|last| first_pos.saturating_add(last % 20_000));
            let range_spec = RangeSpec::Int { first_pos, last_pos };

            prop_assert!(is_satisfiable(&range_spec, complete_length));
            let range = to_inclusive_range(&range_spec, complete_length).unwrap();
            prop_assert!(range.first_pos <= range.last_pos);
            prop_assert!(range.last_pos <= complete_length - 1);
            prop_assert_eq!(first_pos, range.first_pos);
        }

        #[test]
        fn suffix_range_resolves_to_tail(complete_length in 0u64..10_000, suffix_length in 0u64..20_000) {
            let range = to_inclusive_range(&suffix(suffix_length), complete_length).unwrap();

            prop_assert_eq!(complete_length.saturating_sub(suffix_length), range.first_pos);
            prop_assert_eq!(complete_length.saturating_sub(1), range.last_pos);
            prop_assert_eq!(suffix_length > 0, is_satisfiable(&suffix(suffix_length), complete_length));
        }
    }
}
