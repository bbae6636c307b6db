//! C4: six cron fields plus optional DOM/DOW specials, with `matches` and
//! `next_after` evaluated in naive local time (no timezone attached yet —
//! see [`crate::expression`] for the timezone-aware orchestrator).

use std::fmt;

use jiff::civil::{Date, DateTime, Time};

use crate::error::ChronexError;
use crate::field::{CronField, FieldKind};
use crate::special::{jiff_weekday_number, SpecialEntry};

/// How many years beyond the search start `next_after` will scan before
/// concluding there is no future occurrence.
const MAX_YEARS_AHEAD: i16 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    pub second: CronField,
    pub minute: CronField,
    pub hour: CronField,
    pub dom: CronField,
    pub month: CronField,
    pub dow: CronField,
    pub has_seconds: bool,
    pub dom_special: Option<SpecialEntry>,
    pub dow_special: Option<SpecialEntry>,
}

impl CronSchedule {
    /// Whole-expression match: all numeric fields plus the DOM/DOW joint
    /// predicate (Vixie-Cron OR semantics).
    pub fn matches(&self, dt: DateTime) -> bool {
        self.second.matches(dt.time().second() as i64)
            && self.minute.matches(dt.time().minute() as i64)
            && self.hour.matches(dt.time().hour() as i64)
            && self.month.matches(dt.date().month() as i64)
            && self.day_matches(dt.date())
    }

    fn day_matches(&self, date: Date) -> bool {
        let dom_matches = match &self.dom_special {
            Some(special) => special.matches(date),
            None => self.dom.matches(date.day() as i64),
        };
        let dow_matches = match &self.dow_special {
            Some(special) => special.matches(date),
            None => self.dow.matches(jiff_weekday_number(date.weekday()) as i64),
        };
        let dom_wild = self.dom_special.is_none() && self.dom.is_wildcard();
        let dow_wild = self.dow_special.is_none() && self.dow.is_wildcard();

        match (dom_wild, dow_wild) {
            (true, true) => true,
            (true, false) => dow_matches,
            (false, true) => dom_matches,
            (false, false) => dom_matches || dow_matches,
        }
    }

    /// Earliest instant strictly after `from` that matches, or `None` if no
    /// such instant exists within the search bound.
    pub fn next_after(&self, from: DateTime) -> Result<Option<DateTime>, ChronexError> {
        let max_year = from.date().year() + MAX_YEARS_AHEAD;
        let mut candidate = add_one_second(from)?;

        loop {
            if candidate.date().year() > max_year {
                return Ok(None);
            }

            if !self.month.matches(candidate.date().month() as i64) {
                candidate = advance_to_next_month(candidate, &self.month)?;
                continue;
            }

            if !self.day_matches(candidate.date()) {
                candidate = advance_to_next_day(candidate)?;
                continue;
            }

            if !self.hour.matches(candidate.time().hour() as i64) {
                candidate = match next_value(&self.hour, candidate.time().hour() as i64, 0, 23) {
                    Some(h) => set_time(candidate, h as i8, 0, 0),
                    None => advance_to_next_day(candidate)?,
                };
                continue;
            }

            if !self.minute.matches(candidate.time().minute() as i64) {
                candidate = match next_value(&self.minute, candidate.time().minute() as i64, 0, 59)
                {
                    Some(m) => set_minute_second(candidate, m as i8, 0),
                    None => advance_to_next_hour(candidate)?,
                };
                continue;
            }

            if !self.second.matches(candidate.time().second() as i64) {
                candidate = match next_value(&self.second, candidate.time().second() as i64, 0, 59)
                {
                    Some(s) => set_second(candidate, s as i8),
                    None => advance_to_next_minute(candidate)?,
                };
                continue;
            }

            return Ok(Some(candidate));
        }
    }
}

fn next_value(field: &CronField, start: i64, lo: i64, hi: i64) -> Option<i64> {
    (start.max(lo)..=hi).find(|v| field.matches(*v))
}

fn add_one_second(dt: DateTime) -> Result<DateTime, ChronexError> {
    let added = dt
        .checked_add(jiff::Span::new().seconds(1))
        .map_err(|e| ChronexError::eval(format!("date overflow: {e}")))?;
    // Truncate to whole-second resolution: the search must never land on a
    // candidate carrying a fractional second, since `matches`/`next_value`
    // only ever compare whole seconds.
    Ok(set_second(added, added.time().second()))
}

fn midnight() -> Time {
    Time::new(0, 0, 0, 0).unwrap()
}

fn set_time(dt: DateTime, hour: i8, minute: i8, second: i8) -> DateTime {
    dt.date().to_datetime(Time::new(hour, minute, second, 0).unwrap())
}

fn set_minute_second(dt: DateTime, minute: i8, second: i8) -> DateTime {
    dt.date().to_datetime(
        Time::new(dt.time().hour(), minute, second, 0).unwrap(),
    )
}

fn set_second(dt: DateTime, second: i8) -> DateTime {
    dt.date().to_datetime(
        Time::new(dt.time().hour(), dt.time().minute(), second, 0).unwrap(),
    )
}

fn advance_to_next_day(dt: DateTime) -> Result<DateTime, ChronexError> {
    let next_date = dt
        .date()
        .tomorrow()
        .map_err(|e| ChronexError::eval(format!("date overflow: {e}")))?;
    Ok(next_date.to_datetime(midnight()))
}

fn advance_to_next_hour(dt: DateTime) -> Result<DateTime, ChronexError> {
    if dt.time().hour() < 23 {
        Ok(set_time(dt, dt.time().hour() + 1, 0, 0))
    } else {
        advance_to_next_day(dt)
    }
}

fn advance_to_next_minute(dt: DateTime) -> Result<DateTime, ChronexError> {
    if dt.time().minute() < 59 {
        Ok(set_minute_second(dt, dt.time().minute() + 1, 0))
    } else {
        advance_to_next_hour(dt)
    }
}

fn advance_to_next_month(dt: DateTime, month_field: &CronField) -> Result<DateTime, ChronexError> {
    let current_month = dt.date().month();
    match next_value(month_field, current_month as i64 + 1, 1, 12) {
        Some(m) => {
            let date = Date::new(dt.date().year(), m as i8, 1)
                .map_err(|e| ChronexError::eval(format!("date overflow: {e}")))?;
            Ok(date.to_datetime(midnight()))
        }
        None => {
            let next_year = dt
                .date()
                .year()
                .checked_add(1)
                .ok_or_else(|| ChronexError::eval("year overflow"))?;
            let m = next_value(month_field, 1, 1, 12)
                .ok_or_else(|| ChronexError::eval("month field matches nothing"))?;
            let date = Date::new(next_year, m as i8, 1)
                .map_err(|e| ChronexError::eval(format!("date overflow: {e}")))?;
            Ok(date.to_datetime(midnight()))
        }
    }
}

pub(crate) fn implicit_second_field() -> CronField {
    CronField::singleton(FieldKind::Second, 0)
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(6);
        if self.has_seconds {
            parts.push(self.second.to_string());
        }
        parts.push(self.minute.to_string());
        parts.push(self.hour.to_string());
        parts.push(match &self.dom_special {
            Some(special) => special.to_string(),
            None => self.dom.to_string(),
        });
        parts.push(self.month.to_string());
        parts.push(match &self.dow_special {
            Some(special) => special.to_string(),
            None => self.dow.to_string(),
        });
        write!(f, "{}", parts.join(" "))
    }
}
