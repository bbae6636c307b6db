//! C1: compound duration strings (`1h30m`, `500ms`) with canonical rendering.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Serialize, Serializer};

use crate::error::{ChronexError, Span};

/// A non-negative time span, stored with millisecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration {
    millis: u64,
}

const MS_PER_SECOND: u64 = 1000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

impl Duration {
    pub const ZERO: Duration = Duration { millis: 0 };

    pub fn from_millis(millis: u64) -> Self {
        Self { millis }
    }

    pub fn as_millis(self) -> u64 {
        self.millis
    }

    pub fn to_jiff_span(self) -> jiff::Span {
        jiff::Span::new().milliseconds(self.millis as i64)
    }

    pub fn is_zero(self) -> bool {
        self.millis == 0
    }

    /// Parse a compound duration: one or more `<digits><unit>` pairs, where
    /// `unit` is one of `ms`, `s`, `m`, `h`, `d`. No separators, no
    /// whitespace, no sign. `m` is disambiguated from `ms` by a two-byte
    /// lookahead.
    pub fn parse(input: &str) -> Result<Self, ChronexError> {
        if input.is_empty() {
            return Err(ChronexError::eval("empty duration"));
        }
        let bytes = input.as_bytes();
        let mut pos = 0usize;
        let mut total: u64 = 0;
        let mut saw_component = false;

        while pos < bytes.len() {
            let digit_start = pos;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            if pos == digit_start {
                return Err(ChronexError::eval(format!(
                    "expected digits at position {pos} in duration '{input}'"
                )));
            }
            let value: u64 = input[digit_start..pos]
                .parse()
                .map_err(|_| ChronexError::eval(format!("invalid number in duration '{input}'")))?;

            let unit_start = pos;
            // `ms` must be tried before `m` or `s` alone.
            let (unit_len, ms_per_unit): (usize, u64) =
                if input[unit_start..].starts_with("ms") {
                    (2, 1)
                } else if input[unit_start..].starts_with('s') {
                    (1, MS_PER_SECOND)
                } else if input[unit_start..].starts_with('m') {
                    (1, MS_PER_MINUTE)
                } else if input[unit_start..].starts_with('h') {
                    (1, MS_PER_HOUR)
                } else if input[unit_start..].starts_with('d') {
                    (1, MS_PER_DAY)
                } else {
                    return Err(ChronexError::eval(format!(
                        "unknown duration unit at position {unit_start} in '{input}'"
                    )));
                };
            pos = unit_start + unit_len;

            let component = value
                .checked_mul(ms_per_unit)
                .ok_or_else(|| ChronexError::eval(format!("duration overflow in '{input}'")))?;
            total = total
                .checked_add(component)
                .ok_or_else(|| ChronexError::eval(format!("duration overflow in '{input}'")))?;
            saw_component = true;
        }

        if !saw_component {
            return Err(ChronexError::eval(format!("empty duration '{input}'")));
        }

        Ok(Self { millis: total })
    }

    /// Parse within a larger expression string, producing a span-carrying
    /// parse error on failure instead of an eval error.
    pub fn parse_spanned(input: &str, span: Span, full_input: &str) -> Result<Self, ChronexError> {
        Self::parse(input).map_err(|_| {
            ChronexError::parse(
                "E013",
                format!("malformed duration '{input}'"),
                span,
                full_input,
            )
        })
    }
}

#[cfg(feature = "serde")]
impl Serialize for Duration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.millis == 0 {
            return write!(f, "0ms");
        }
        let mut remaining = self.millis;
        let days = remaining / MS_PER_DAY;
        remaining %= MS_PER_DAY;
        let hours = remaining / MS_PER_HOUR;
        remaining %= MS_PER_HOUR;
        let minutes = remaining / MS_PER_MINUTE;
        remaining %= MS_PER_MINUTE;
        let seconds = remaining / MS_PER_SECOND;
        let millis = remaining % MS_PER_SECOND;

        if days > 0 {
            write!(f, "{days}d")?;
        }
        if hours > 0 {
            write!(f, "{hours}h")?;
        }
        if minutes > 0 {
            write!(f, "{minutes}m")?;
        }
        if seconds > 0 {
            write!(f, "{seconds}s")?;
        }
        if millis > 0 {
            write!(f, "{millis}ms")?;
        }
        Ok(())
    }
}
