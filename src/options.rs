//! C7: the `{k:v,...}` options clause — jitter, stagger, window, from,
//! until, max, and tag.

use std::fmt;

use jiff::tz::TimeZone;
use jiff::{Timestamp, Zoned};
#[cfg(feature = "serde")]
use serde::{Serialize, Serializer};

use crate::duration::Duration;
use crate::error::{ChronexError, Span};

/// A `from`/`until` bound, which may have been written as a bare calendar
/// date or as a full timestamp with an explicit offset. Kept as written so
/// canonical rendering can reproduce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionDate {
    DateOnly(jiff::civil::Date),
    Absolute(Timestamp),
}

#[cfg(feature = "serde")]
impl Serialize for OptionDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parsed `{options}` clause. Every field defaults to "unset".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Options {
    pub jitter: Option<Duration>,
    pub stagger: Option<Duration>,
    pub window: Option<Duration>,
    pub from: Option<OptionDate>,
    pub until: Option<OptionDate>,
    pub max: Option<u64>,
    pub tags: Option<Vec<String>>,
}

/// Parse the raw text between `{` and `}` (or an empty clause). Duplicate
/// keys overwrite earlier ones; duration and bound options are checked for
/// strict positivity and ordering here so that `Expression::parse`'s
/// strict mode fails fast on the first violation.
pub fn parse(raw: &str, span: Span, full_input: &str) -> Result<Options, ChronexError> {
    let mut opts = Options::default();
    if raw.trim().is_empty() {
        return Ok(opts);
    }

    for pair in raw.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once(':').ok_or_else(|| {
            ChronexError::parse(
                "E016",
                format!("option '{pair}' is missing a ':'"),
                span,
                full_input,
            )
        })?;
        let key = key.trim();
        let value = value.trim();

        match key {
            "jitter" => {
                let d = parse_option_duration(value, span, full_input)?;
                if d.is_zero() {
                    return Err(ChronexError::parse(
                        "E016",
                        "jitter must be a positive duration",
                        span,
                        full_input,
                    ));
                }
                opts.jitter = Some(d);
            }
            "stagger" => {
                let d = parse_option_duration(value, span, full_input)?;
                if d.is_zero() {
                    return Err(ChronexError::parse(
                        "E024",
                        "stagger must be a positive duration",
                        span,
                        full_input,
                    ));
                }
                opts.stagger = Some(d);
            }
            "window" => {
                let d = parse_option_duration(value, span, full_input)?;
                if d.is_zero() {
                    return Err(ChronexError::parse(
                        "E023",
                        "window must be a positive duration",
                        span,
                        full_input,
                    ));
                }
                opts.window = Some(d);
            }
            "from" => opts.from = Some(parse_option_date(value, span, full_input)?),
            "until" => opts.until = Some(parse_option_date(value, span, full_input)?),
            "max" => {
                let n: i64 = value.parse().map_err(|_| {
                    ChronexError::parse(
                        "E016",
                        format!("invalid max value '{value}'"),
                        span,
                        full_input,
                    )
                })?;
                if n <= 0 {
                    return Err(ChronexError::parse(
                        "E021",
                        "max must be a positive integer",
                        span,
                        full_input,
                    ));
                }
                opts.max = Some(n as u64);
            }
            "tag" => {
                opts.tags = Some(value.split('+').map(str::to_string).collect());
            }
            _ => {
                return Err(ChronexError::parse(
                    "E015",
                    format!("unknown option key '{key}'"),
                    span,
                    full_input,
                ))
            }
        }
    }

    Ok(opts)
}

fn parse_option_duration(value: &str, span: Span, full_input: &str) -> Result<Duration, ChronexError> {
    Duration::parse(value).map_err(|_| {
        ChronexError::parse(
            "E016",
            format!("malformed duration option value '{value}'"),
            span,
            full_input,
        )
    })
}

fn parse_option_date(value: &str, span: Span, full_input: &str) -> Result<OptionDate, ChronexError> {
    if let Ok(ts) = value.parse::<Timestamp>() {
        return Ok(OptionDate::Absolute(ts));
    }
    if let Ok(date) = value.parse::<jiff::civil::Date>() {
        return Ok(OptionDate::DateOnly(date));
    }
    Err(ChronexError::parse(
        "E016",
        format!("malformed date/time option value '{value}'"),
        span,
        full_input,
    ))
}

impl fmt::Display for OptionDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionDate::DateOnly(d) => write!(f, "{d}"),
            OptionDate::Absolute(ts) => write!(f, "{ts}"),
        }
    }
}

/// Canonical rendering of the `{k:v,...}` clause, keys sorted
/// alphabetically. Renders to the empty string when every option is unset.
impl fmt::Display for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(from) = &self.from {
            parts.push(format!("from:{from}"));
        }
        if let Some(jitter) = &self.jitter {
            parts.push(format!("jitter:{jitter}"));
        }
        if let Some(max) = &self.max {
            parts.push(format!("max:{max}"));
        }
        if let Some(stagger) = &self.stagger {
            parts.push(format!("stagger:{stagger}"));
        }
        if let Some(tags) = &self.tags {
            parts.push(format!("tag:{}", tags.join("+")));
        }
        if let Some(until) = &self.until {
            parts.push(format!("until:{until}"));
        }
        if let Some(window) = &self.window {
            parts.push(format!("window:{window}"));
        }
        write!(f, "{}", parts.join(","))
    }
}

/// Resolve an `OptionDate` to an absolute instant in `tz`. Date-only
/// `from` resolves to local midnight; date-only `until` resolves to the
/// last millisecond of that local day.
pub fn resolve_option_date(
    date: &OptionDate,
    tz: &TimeZone,
    end_of_day: bool,
) -> Result<Zoned, ChronexError> {
    match date {
        OptionDate::Absolute(ts) => Ok(ts.to_zoned(tz.clone())),
        OptionDate::DateOnly(d) => {
            let time = if end_of_day {
                jiff::civil::Time::new(23, 59, 59, 999_000_000)
                    .map_err(|e| ChronexError::eval(format!("invalid end-of-day time: {e}")))?
            } else {
                jiff::civil::Time::midnight()
            };
            d.to_datetime(time)
                .to_zoned(tz.clone())
                .map_err(|e| ChronexError::eval(format!("cannot resolve local date bound: {e}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span::new(0, 0)
    }

    #[test]
    fn parses_every_key() {
        let o = parse("jitter:5s,stagger:1m,window:10s,max:3,tag:a+b", span(), "").unwrap();
        assert_eq!(o.jitter.unwrap().as_millis(), 5_000);
        assert_eq!(o.stagger.unwrap().as_millis(), 60_000);
        assert_eq!(o.window.unwrap().as_millis(), 10_000);
        assert_eq!(o.max, Some(3));
        assert_eq!(o.tags.unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn empty_clause_is_all_defaults() {
        assert_eq!(parse("", span(), "").unwrap(), Options::default());
    }

    #[test]
    fn duplicate_key_last_wins() {
        let o = parse("max:3,max:7", span(), "").unwrap();
        assert_eq!(o.max, Some(7));
    }

    #[test]
    fn rejects_unknown_key() {
        assert!(parse("bogus:1", span(), "").is_err());
    }

    #[test]
    fn rejects_nonpositive_max() {
        assert!(parse("max:0", span(), "").is_err());
        assert!(parse("max:-1", span(), "").is_err());
    }

    #[test]
    fn rejects_zero_duration_options() {
        assert!(parse("jitter:0ms", span(), "").is_err());
        assert!(parse("stagger:0ms", span(), "").is_err());
        assert!(parse("window:0ms", span(), "").is_err());
    }

    #[test]
    fn parses_date_only_and_absolute_bounds() {
        let o = parse("from:2026-01-01,until:2026-06-30T23:59:59+02:00", span(), "").unwrap();
        assert!(matches!(o.from, Some(OptionDate::DateOnly(_))));
        assert!(matches!(o.until, Some(OptionDate::Absolute(_))));
    }
}
