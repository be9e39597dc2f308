use bytes::{BufMut, Bytes, BytesMut};
use sha1::{Digest, Sha1};

use crate::content_range::{ContentRange, InclusiveRange};
use crate::error::ValidationError;

/// Input for a `multipart/byteranges` body.
#[derive(Debug, Clone)]
pub struct MultipartByteranges<'a> {
    pub content: &'a [u8],
    pub content_type: &'a str,
    /// Every range must lie within `content`.
    pub ranges: &'a [InclusiveRange],
    pub range_unit: &'a str,
    pub boundary: &'a str,
}

impl MultipartByteranges<'_> {
    /// Writes every range as its own part, in order:
    ///
    /// ```text
    /// --<boundary>
    /// Content-Type: <content_type>
    /// Content-Range: <unit> <first>-<last>/<length>
    ///
    /// <bytes>
    /// --<boundary>--
    /// ```
    ///
    /// Lines are separated by a single `\n` and nothing follows the closing
    /// delimiter.
    pub fn encode(&self) -> Result<Bytes, ValidationError> {
        let complete_length = self.content.len() as u64;
        let delimiter = format!("--{}", self.boundary);

        let mut buffer = BytesMut::with_capacity(self.encoded_len_hint(delimiter.len()));

        for range in self.ranges {
            let content_range = ContentRange::satisfied(self.range_unit, *range, complete_length)
                .stringify()?;

            buffer.put_slice(delimiter.as_bytes());
            buffer.put_u8(b'\n');
            buffer.put_slice(b"Content-Type: ");
            buffer.put_slice(self.content_type.as_bytes());
            buffer.put_u8(b'\n');
            buffer.put_slice(b"Content-Range: ");
            buffer.put_slice(content_range.as_bytes());
            buffer.put_u8(b'\n');
            buffer.put_u8(b'\n');
            buffer.put_slice(&self.content[range.span(self.content.len())]);
            buffer.put_u8(b'\n');
        }

        buffer.put_slice(delimiter.as_bytes());
        buffer.put_slice(b"--");

        Ok(buffer.freeze())
    }

    fn encoded_len_hint(&self, delimiter_len: usize) -> usize {
        let headers = 64 + self.content_type.len() + self.range_unit.len();
        let parts: usize = self.ranges
            .iter()
            .map(|range| delimiter_len + headers + (range.len() as usize).min(self.content.len()))
            .sum();
        parts + delimiter_len + 2
    }
}

/// Default boundary: hex encoded SHA-1 digest of the whole body.
pub fn digest_sha1(content: &[u8]) -> String {
    hex::encode(Sha1::digest(content))
}

/// Reads the `boundary` parameter of a `multipart/byteranges` content type.
///
/// ```
/// use axum_range_request::extract_boundary;
///
/// assert_eq!(
///     extract_boundary("multipart/byteranges; boundary=THIS_STRING_SEPARATES").as_deref(),
///     Some("THIS_STRING_SEPARATES"),
/// );
/// assert_eq!(extract_boundary("text/plain"), None);
/// ```
pub fn extract_boundary(content_type: &str) -> Option<String> {
    let mime: mime::Mime = content_type.parse().ok()?;
    if mime.type_() != mime::MULTIPART || mime.subtype() != "byteranges" {
        return None;
    }
    mime.get_param(mime::BOUNDARY).map(|boundary| boundary.to_string())
}
