//! C5: `@every` fixed and random-range intervals, and `@once` one-shot
//! schedules.

use std::fmt;

use jiff::{Span as JiffSpan, Timestamp, Zoned};
use rand::Rng;

use crate::duration::Duration;
use crate::error::ChronexError;

/// A fixed interval (`1h`) or a random range sampled anew on each fire
/// (`1h-2h`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalSchedule {
    pub min: Duration,
    pub max: Option<Duration>,
}

impl IntervalSchedule {
    /// Parse the text following `@every `: either `<duration>` or
    /// `<duration>-<duration>`.
    pub fn parse(text: &str) -> Result<Self, ChronexError> {
        match text.split_once('-') {
            Some((lo, hi)) => {
                let min = Duration::parse(lo)
                    .map_err(|_| ChronexError::eval(format!("malformed @every min duration '{lo}'")))?;
                let max = Duration::parse(hi)
                    .map_err(|_| ChronexError::eval(format!("malformed @every max duration '{hi}'")))?;
                if min.is_zero() {
                    return Err(ChronexError::eval("@every min duration must be positive"));
                }
                if min >= max {
                    return Err(ChronexError::eval("@every range min must be less than max"));
                }
                Ok(Self { min, max: Some(max) })
            }
            None => {
                let min = Duration::parse(text)
                    .map_err(|_| ChronexError::eval(format!("malformed @every duration '{text}'")))?;
                if min.is_zero() {
                    return Err(ChronexError::eval("@every duration must be positive"));
                }
                Ok(Self { min, max: None })
            }
        }
    }

    pub fn is_range(&self) -> bool {
        self.max.is_some()
    }

    /// Sample the next fire instant after `from`. A fixed interval always
    /// adds `min`; a range samples uniformly in `[min, max)` on every call.
    pub fn next_after(&self, from: &Zoned) -> Result<Zoned, ChronexError> {
        let millis = match self.max {
            None => self.min.as_millis(),
            Some(max) => {
                let lo = self.min.as_millis();
                let hi = max.as_millis();
                if lo >= hi {
                    lo
                } else {
                    rand::rng().random_range(lo..hi)
                }
            }
        };
        from.checked_add(JiffSpan::new().milliseconds(millis as i64))
            .map_err(|e| ChronexError::eval(format!("date overflow: {e}")))
    }
}

impl fmt::Display for IntervalSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@every {}", self.min)?;
        if let Some(max) = self.max {
            write!(f, "-{max}")?;
        }
        Ok(())
    }
}

/// A one-shot schedule, fixed to a single absolute instant at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnceSchedule {
    pub fire_at: Timestamp,
    pub was_relative: bool,
    pub relative_duration: Option<Duration>,
}

impl OnceSchedule {
    /// Parse an absolute `@once <timestamp>` body (must carry an explicit
    /// UTC offset).
    pub fn parse_absolute(text: &str) -> Result<Self, ChronexError> {
        let ts: Timestamp = text
            .parse()
            .map_err(|_| ChronexError::eval(format!("malformed @once datetime '{text}'")))?;
        Ok(Self {
            fire_at: ts,
            was_relative: false,
            relative_duration: None,
        })
    }

    /// Parse a relative `@once +<duration>` body, resolved against
    /// `reference` (the instant supplied to `Expression::parse`).
    pub fn parse_relative(text: &str, reference: Timestamp) -> Result<Self, ChronexError> {
        let dur = Duration::parse(text)
            .map_err(|_| ChronexError::eval(format!("malformed @once relative duration '+{text}'")))?;
        if dur.is_zero() {
            return Err(ChronexError::eval("@once relative duration must be positive"));
        }
        let fire_at = reference
            .checked_add(dur.to_jiff_span())
            .map_err(|e| ChronexError::eval(format!("date overflow: {e}")))?;
        Ok(Self {
            fire_at,
            was_relative: true,
            relative_duration: Some(dur),
        })
    }

    /// The fire instant if it is still strictly in the future of `from`,
    /// `None` once it has already passed.
    pub fn next_after(&self, from: &Timestamp) -> Option<Timestamp> {
        if self.fire_at > *from {
            Some(self.fire_at)
        } else {
            None
        }
    }
}

impl fmt::Display for OnceSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@once {}", self.fire_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zoned_utc(y: i16, mo: i8, d: i8, h: i8) -> Zoned {
        jiff::civil::Date::new(y, mo, d)
            .unwrap()
            .to_datetime(jiff::civil::Time::new(h, 0, 0, 0).unwrap())
            .to_zoned(jiff::tz::TimeZone::UTC)
            .unwrap()
    }

    #[test]
    fn fixed_interval_advances_by_exact_amount() {
        let iv = IntervalSchedule::parse("1h").unwrap();
        let from = zoned_utc(2026, 1, 1, 0);
        let next = iv.next_after(&from).unwrap();
        assert_eq!(next, zoned_utc(2026, 1, 1, 1));
    }

    #[test]
    fn range_interval_samples_within_bounds() {
        let iv = IntervalSchedule::parse("1h-2h").unwrap();
        let from = zoned_utc(2026, 1, 1, 0);
        for _ in 0..50 {
            let next = iv.next_after(&from).unwrap();
            let delta_ms = (next.timestamp().as_millisecond() - from.timestamp().as_millisecond()) as u64;
            assert!(delta_ms >= 3_600_000 && delta_ms < 7_200_000);
        }
    }

    #[test]
    fn rejects_zero_and_inverted_range() {
        assert!(IntervalSchedule::parse("0s").is_err());
        assert!(IntervalSchedule::parse("2h-1h").is_err());
    }

    #[test]
    fn once_absolute_fires_once() {
        let once = OnceSchedule::parse_absolute("2026-06-01T00:00:00Z").unwrap();
        let before = "2026-05-01T00:00:00Z".parse::<Timestamp>().unwrap();
        let after = "2026-07-01T00:00:00Z".parse::<Timestamp>().unwrap();
        assert!(once.next_after(&before).is_some());
        assert!(once.next_after(&after).is_none());
    }

    #[test]
    fn once_relative_resolves_against_reference() {
        let reference = "2026-01-01T00:00:00Z".parse::<Timestamp>().unwrap();
        let once = OnceSchedule::parse_relative("30m", reference).unwrap();
        assert_eq!(once.fire_at, "2026-01-01T00:30:00Z".parse::<Timestamp>().unwrap());
        assert!(once.was_relative);
    }
}
