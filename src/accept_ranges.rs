use std::fmt;
use std::str::FromStr;

use axum::http::{HeaderName, HeaderValue};
use axum::http::header::ACCEPT_RANGES;
use axum_extra::headers::{self, Header};

use crate::error::SyntaxError;
use crate::NONE;

/// `Accept-Ranges` header, an ordered list of range units.
///
/// Always holds at least one token. Built either by parsing a header value
/// or with [`AcceptRanges::from_units`], which removes duplicates.
///
/// ```
/// use axum_range_request::AcceptRanges;
///
/// let accept_ranges: AcceptRanges = " bytes, pages ".parse().unwrap();
/// assert_eq!(accept_ranges.to_string(), "bytes, pages");
/// assert!(AcceptRanges::has_token("bytes, none", "none"));
/// assert!(!AcceptRanges::has_token("bytes,", "bytes"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptRanges(Vec<String>);

impl AcceptRanges {
    /// Advertises the given units in order, dropping duplicates.
    /// No units at all advertises `none`.
    ///
    /// Fails if any unit is not a token.
    pub fn from_units<I, S>(units: I) -> Result<Self, SyntaxError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tokens: Vec<String> = Vec::new();
        for unit in units {
            let unit = unit.as_ref();
            if !is_token(unit) {
                return Err(SyntaxError::RangeUnit(unit.to_string()));
            }
            if !tokens.iter().any(|token| token == unit) {
                tokens.push(unit.to_string());
            }
        }

        if tokens.is_empty() {
            tokens.push(NONE.to_string());
        }

        Ok(AcceptRanges(tokens))
    }

    /// `Accept-Ranges: none`
    pub fn none() -> Self {
        AcceptRanges(vec![NONE.to_string()])
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens().any(|t| t == token)
    }

    /// Whether `input` is a well formed `Accept-Ranges` value listing
    /// `token`. Malformed input yields `false`.
    pub fn has_token(input: &str, token: &str) -> bool {
        input
            .parse::<AcceptRanges>()
            .map(|accept_ranges| accept_ranges.contains(token))
            .unwrap_or(false)
    }
}

impl FromStr for AcceptRanges {
    type Err = SyntaxError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(SyntaxError::AcceptRanges(input.to_string()));
        }

        trimmed
            .split(',')
            .map(str::trim)
            .map(|token| {
                if is_token(token) {
                    Ok(token.to_string())
                } else {
                    Err(SyntaxError::RangeUnit(token.to_string()))
                }
            })
            .collect::<Result<Vec<_>, _>>()
            .map(AcceptRanges)
    }
}

impl fmt::Display for AcceptRanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}

impl Header for AcceptRanges {
    fn name() -> &'static HeaderName {
        &ACCEPT_RANGES
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let mut tokens = Vec::new();
        for value in values {
            let value = value.to_str().map_err(|_| headers::Error::invalid())?;
            let AcceptRanges(parsed) = value.parse().map_err(|_| headers::Error::invalid())?;
            tokens.extend(parsed);
        }

        if tokens.is_empty() {
            return Err(headers::Error::invalid());
        }
        Ok(AcceptRanges(tokens))
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        // tokens are visible ASCII, so this cannot fail
        if let Ok(value) = HeaderValue::from_str(&self.to_string()) {
            values.extend(std::iter::once(value));
        }
    }
}

/// `token = 1*tchar` (RFC 9110 §5.6.2)
pub fn is_token(input: &str) -> bool {
    !input.is_empty() && input.bytes().all(is_tchar)
}

fn is_tchar(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}
