//! C3: date-aware DOM/DOW specials (`L`, `LW`, `L-N`, `NW`, `DOW#N`, `DOWL`).

use std::fmt;

use jiff::civil::{Date, Weekday};

use crate::error::ChronexError;

/// A DOM or DOW special entry. Unlike [`crate::field::CronField`] these are
/// matched against a concrete calendar date, not a bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialEntry {
    /// `L` on DOM: the last day of the month.
    LastDay,
    /// `LW` on DOM: the nearest weekday to the last day, staying in-month.
    LastWeekday,
    /// `L-N` on DOM: N days before the last day of the month.
    LastDayOffset(u8),
    /// `NW` on DOM: the nearest weekday to day N, staying in-month.
    NearestWeekday(u8),
    /// `DOWL` on DOW: the last occurrence of `dow` in the month.
    LastDowOfMonth(u8),
    /// `DOW#N` on DOW: the Nth occurrence of `dow` in the month.
    NthDowOfMonth(u8, u8),
}

fn days_in_month(year: i16, month: i8) -> i8 {
    let next_month_first = if month == 12 {
        Date::new(year + 1, 1, 1).unwrap()
    } else {
        Date::new(year, month + 1, 1).unwrap()
    };
    next_month_first.yesterday().unwrap().day()
}

pub(crate) fn jiff_weekday_number(wd: Weekday) -> u8 {
    // 0 = Sunday .. 6 = Saturday, matching the DOW field domain.
    match wd {
        Weekday::Sunday => 0,
        Weekday::Monday => 1,
        Weekday::Tuesday => 2,
        Weekday::Wednesday => 3,
        Weekday::Thursday => 4,
        Weekday::Friday => 5,
        Weekday::Saturday => 6,
    }
}

fn is_weekday(date: Date) -> bool {
    !matches!(date.weekday(), Weekday::Saturday | Weekday::Sunday)
}

impl SpecialEntry {
    pub fn parse_dom(text: &str) -> Result<Self, ChronexError> {
        if text == "L" {
            return Ok(Self::LastDay);
        }
        if text == "LW" {
            return Ok(Self::LastWeekday);
        }
        if let Some(rest) = text.strip_prefix("L-") {
            let n: u8 = rest
                .parse()
                .map_err(|_| ChronexError::eval(format!("invalid L-N offset in '{text}'")))?;
            return Ok(Self::LastDayOffset(n));
        }
        if let Some(digits) = text.strip_suffix('W') {
            let day: u8 = digits
                .parse()
                .map_err(|_| ChronexError::eval(format!("invalid nearest-weekday spec '{text}'")))?;
            if !(1..=31).contains(&day) {
                return Err(ChronexError::eval(format!(
                    "nearest-weekday day out of range in '{text}'"
                )));
            }
            return Ok(Self::NearestWeekday(day));
        }
        Err(ChronexError::eval(format!("not a DOM special: '{text}'")))
    }

    pub fn parse_dow(text: &str) -> Result<Self, ChronexError> {
        if let Some(base) = text.strip_suffix('L') {
            let dow = parse_dow_value(base)?;
            return Ok(Self::LastDowOfMonth(dow));
        }
        if let Some((base, n)) = text.split_once('#') {
            let dow = parse_dow_value(base)?;
            let n: u8 = n
                .parse()
                .map_err(|_| ChronexError::eval(format!("invalid nth spec in '{text}'")))?;
            if !(1..=5).contains(&n) {
                return Err(ChronexError::eval(format!(
                    "nth occurrence out of range [1,5] in '{text}'"
                )));
            }
            return Ok(Self::NthDowOfMonth(dow, n));
        }
        Err(ChronexError::eval(format!("not a DOW special: '{text}'")))
    }

    pub fn is_dom_special_syntax(text: &str) -> bool {
        text.starts_with('L')
            || (text.ends_with('W') && text[..text.len() - 1].chars().all(|c| c.is_ascii_digit()))
    }

    pub fn is_dow_special_syntax(text: &str) -> bool {
        text.contains('#') || (text.ends_with('L') && !text.chars().all(|c| c.is_ascii_digit()))
    }

    /// Matched against a concrete calendar date.
    pub fn matches(&self, date: Date) -> bool {
        let year = date.year();
        let month = date.month();
        let day = date.day() as u8;
        let last = days_in_month(year, month) as u8;

        match *self {
            SpecialEntry::LastDay => day == last,
            SpecialEntry::LastWeekday => {
                let mut d = Date::new(year, month, last as i8).unwrap();
                loop {
                    if is_weekday(d) {
                        return d == date;
                    }
                    d = d.yesterday().unwrap();
                }
            }
            SpecialEntry::LastDayOffset(n) => day as i16 == last as i16 - n as i16,
            SpecialEntry::NearestWeekday(target) => {
                let d_prime = target.min(last);
                let base = Date::new(year, month, d_prime as i8).unwrap();
                let resolved = match base.weekday() {
                    Weekday::Saturday => {
                        let friday = base.yesterday().unwrap();
                        if friday.month() == month {
                            friday
                        } else {
                            let monday = base.tomorrow().unwrap().tomorrow().unwrap();
                            monday
                        }
                    }
                    Weekday::Sunday => {
                        let monday = base.tomorrow().unwrap();
                        if monday.month() == month {
                            monday
                        } else {
                            let friday = base.yesterday().unwrap().yesterday().unwrap();
                            friday
                        }
                    }
                    _ => base,
                };
                resolved == date
            }
            SpecialEntry::LastDowOfMonth(dow) => {
                jiff_weekday_number(date.weekday()) == dow && day as i16 + 7 > last as i16
            }
            SpecialEntry::NthDowOfMonth(dow, n) => {
                jiff_weekday_number(date.weekday()) == dow && (day - 1) / 7 + 1 == n
            }
        }
    }
}

impl fmt::Display for SpecialEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecialEntry::LastDay => write!(f, "L"),
            SpecialEntry::LastWeekday => write!(f, "LW"),
            SpecialEntry::LastDayOffset(n) => write!(f, "L-{n}"),
            SpecialEntry::NearestWeekday(d) => write!(f, "{d}W"),
            SpecialEntry::LastDowOfMonth(dow) => write!(f, "{dow}L"),
            SpecialEntry::NthDowOfMonth(dow, n) => write!(f, "{dow}#{n}"),
        }
    }
}

fn parse_dow_value(token: &str) -> Result<u8, ChronexError> {
    let upper = token.to_ascii_uppercase();
    let raw: i64 = match upper.as_str() {
        "SUN" => 0,
        "MON" => 1,
        "TUE" => 2,
        "WED" => 3,
        "THU" => 4,
        "FRI" => 5,
        "SAT" => 6,
        _ => token
            .parse()
            .map_err(|_| ChronexError::eval(format!("invalid weekday '{token}'")))?,
    };
    let value = if raw == 7 { 0 } else { raw };
    if !(0..=6).contains(&value) {
        return Err(ChronexError::eval(format!("weekday out of range: '{token}'")));
    }
    Ok(value as u8)
}
