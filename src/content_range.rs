//! `Content-Range` response header.
//!
//! ```text
//! Content-Range     = range-unit SP ( range-resp / unsatisfied-range )
//! range-resp        = incl-range "/" ( complete-length / "*" )
//! unsatisfied-range = "*/" complete-length
//! ```

use std::ops::Range;
use std::str::FromStr;

use axum::http::HeaderValue;

use crate::accept_ranges::is_token;
use crate::error::{SyntaxError, ValidationError};

/// A resolved `first-pos "-" last-pos` pair, both ends included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InclusiveRange {
    pub first_pos: u64,
    pub last_pos: u64,
}

impl InclusiveRange {
    pub fn new(first_pos: u64, last_pos: u64) -> Self {
        InclusiveRange { first_pos, last_pos }
    }

    /// Number of bytes covered.
    pub fn len(&self) -> u64 {
        self.last_pos.saturating_sub(self.first_pos).saturating_add(1)
    }

    /// Half-open index range into a buffer of `len` bytes, clamped to it.
    /// The `0-0` range of an empty buffer is empty.
    pub(crate) fn span(&self, len: usize) -> Range<usize> {
        let start = usize::try_from(self.first_pos).unwrap_or(usize::MAX).min(len);
        let end = usize::try_from(self.last_pos)
            .ok()
            .and_then(|last| last.checked_add(1))
            .unwrap_or(usize::MAX)
            .min(len);
        start..end.max(start)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeResp {
    Satisfied {
        range: InclusiveRange,
        /// `None` serializes as `*`.
        complete_length: Option<u64>,
    },
    Unsatisfied { complete_length: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRange {
    pub range_unit: String,
    pub range: RangeResp,
}

impl ContentRange {
    /// `<unit> <first>-<last>/<complete_length>`
    pub fn satisfied(range_unit: impl Into<String>, range: InclusiveRange, complete_length: u64) -> Self {
        ContentRange {
            range_unit: range_unit.into(),
            range: RangeResp::Satisfied { range, complete_length: Some(complete_length) },
        }
    }

    /// `<unit> */<complete_length>`
    pub fn unsatisfied(range_unit: impl Into<String>, complete_length: u64) -> Self {
        ContentRange {
            range_unit: range_unit.into(),
            range: RangeResp::Unsatisfied { complete_length },
        }
    }

    /// Serializes into the header value text.
    ///
    /// Fails if the unit is not a token or the range is inverted.
    pub fn stringify(&self) -> Result<String, ValidationError> {
        if !is_token(&self.range_unit) {
            return Err(ValidationError::RangeUnit(self.range_unit.clone()));
        }

        let unit = &self.range_unit;
        match self.range {
            RangeResp::Satisfied { range: InclusiveRange { first_pos, last_pos }, complete_length } => {
                if first_pos > last_pos {
                    return Err(ValidationError::InvertedRange { first_pos, last_pos });
                }
                match complete_length {
                    Some(complete_length) => Ok(format!("{unit} {first_pos}-{last_pos}/{complete_length}")),
                    None => Ok(format!("{unit} {first_pos}-{last_pos}/*")),
                }
            }
            RangeResp::Unsatisfied { complete_length } => Ok(format!("{unit} */{complete_length}")),
        }
    }

    pub fn to_header_value(&self) -> Result<HeaderValue, ValidationError> {
        let value = self.stringify()?;
        // stringify only emits a token, digits and separators
        HeaderValue::from_str(&value).map_err(|_| ValidationError::RangeUnit(self.range_unit.clone()))
    }
}

impl FromStr for ContentRange {
    type Err = SyntaxError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let err = || SyntaxError::ContentRange(input.to_string());

        let (range_unit, resp) = input.split_once(' ').ok_or_else(err)?;
        if !is_token(range_unit) {
            return Err(err());
        }

        let (range, complete_length) = resp.split_once('/').ok_or_else(err)?;

        let range = if range == "*" {
            RangeResp::Unsatisfied {
                complete_length: parse_digits(complete_length).ok_or_else(err)?,
            }
        } else {
            let (first_pos, last_pos) = range.split_once('-').ok_or_else(err)?;
            let range = InclusiveRange {
                first_pos: parse_digits(first_pos).ok_or_else(err)?,
                last_pos: parse_digits(last_pos).ok_or_else(err)?,
            };
            let complete_length = match complete_length {
                "*" => None,
                length => Some(parse_digits(length).ok_or_else(err)?),
            };
            RangeResp::Satisfied { range, complete_length }
        };

        Ok(ContentRange { range_unit: range_unit.to_string(), range })
    }
}

fn parse_digits(input: &str) -> Option<u64> {
    if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    input.parse().ok()
}
