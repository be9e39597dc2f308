//! `Range` request header parsing.
//!
//! ```text
//! ranges-specifier = range-unit "=" range-set
//! range-set        = 1#range-spec
//! range-spec       = int-range / suffix-range / other-range
//! ```
//!
//! See [RFC 9110 §14.1.1](https://www.rfc-editor.org/rfc/rfc9110#section-14.1.1).

use std::fmt;
use std::str::FromStr;

use crate::accept_ranges::is_token;
use crate::error::SyntaxError;

/// One element of a `<range-set>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeSpec {
    /// `first-pos "-" [ last-pos ]`. A missing `last_pos` means "to the end".
    Int { first_pos: u64, last_pos: Option<u64> },
    /// `"-" suffix-length`, the last `suffix_length` bytes.
    Suffix { suffix_length: u64 },
    /// Anything else, kept verbatim.
    Other(String),
}

/// Structural kind of a [`RangeSpec`], used by range units to declare what
/// they accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Specifier {
    IntRange,
    SuffixRange,
    OtherRange,
}

impl RangeSpec {
    pub fn specifier(&self) -> Specifier {
        match self {
            RangeSpec::Int { .. } => Specifier::IntRange,
            RangeSpec::Suffix { .. } => Specifier::SuffixRange,
            RangeSpec::Other(_) => Specifier::OtherRange,
        }
    }

    fn parse(input: &str) -> RangeSpec {
        let Some((first, last)) = input.split_once('-') else {
            return RangeSpec::Other(input.to_string());
        };

        if first.is_empty() {
            return match parse_digits(last) {
                Some(suffix_length) => RangeSpec::Suffix { suffix_length },
                None => RangeSpec::Other(input.to_string()),
            };
        }

        let Some(first_pos) = parse_digits(first) else {
            return RangeSpec::Other(input.to_string());
        };

        if last.is_empty() {
            return RangeSpec::Int { first_pos, last_pos: None };
        }

        match parse_digits(last) {
            // a byte-range-spec whose last-pos is less than its first-pos is
            // invalid (RFC 9110 §14.1.2)
            Some(last_pos) if last_pos >= first_pos => RangeSpec::Int {
                first_pos,
                last_pos: Some(last_pos),
            },
            _ => RangeSpec::Other(input.to_string()),
        }
    }
}

impl fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeSpec::Int { first_pos, last_pos: Some(last_pos) } => write!(f, "{first_pos}-{last_pos}"),
            RangeSpec::Int { first_pos, last_pos: None } => write!(f, "{first_pos}-"),
            RangeSpec::Suffix { suffix_length } => write!(f, "-{suffix_length}"),
            RangeSpec::Other(other) => f.write_str(other),
        }
    }
}

/// A parsed `Range` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangesSpecifier {
    pub range_unit: String,
    /// Never empty, in request order.
    pub range_set: Vec<RangeSpec>,
}

impl FromStr for RangesSpecifier {
    type Err = SyntaxError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let err = || SyntaxError::Range(input.to_string());

        let (range_unit, range_set) = input.split_once('=').ok_or_else(err)?;

        if !is_token(range_unit) {
            return Err(err());
        }

        // other-range-set = 1*VCHAR, plus the OWS allowed around list commas
        let well_formed = range_set
            .bytes()
            .all(|b| b.is_ascii_graphic() || b == b' ' || b == b'\t');
        if !well_formed {
            return Err(err());
        }

        // empty list elements are allowed and ignored (RFC 9110 §5.6.1)
        let range_set: Vec<RangeSpec> = range_set
            .split(',')
            .map(|spec| spec.trim_matches(|c| c == ' ' || c == '\t'))
            .filter(|spec| !spec.is_empty())
            .map(RangeSpec::parse)
            .collect();

        if range_set.is_empty() {
            return Err(err());
        }

        Ok(RangesSpecifier {
            range_unit: range_unit.to_string(),
            range_set,
        })
    }
}

fn parse_digits(input: &str) -> Option<u64> {
    if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    input.parse().ok()
}
