//! C2: one cron field — a comma-separated list of value/range/step entries,
//! tested for membership against a concrete numeric value.

use std::fmt;

use crate::error::ChronexError;

/// Which positional field this is, fixing its numeric domain and the name
/// table (if any) used to resolve symbolic values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Second,
    Minute,
    Hour,
    DayOfMonth,
    Month,
    DayOfWeek,
}

impl FieldKind {
    pub fn domain(self) -> (i64, i64) {
        match self {
            FieldKind::Second => (0, 59),
            FieldKind::Minute => (0, 59),
            FieldKind::Hour => (0, 23),
            FieldKind::DayOfMonth => (1, 31),
            FieldKind::Month => (1, 12),
            FieldKind::DayOfWeek => (0, 6),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Second => "second",
            FieldKind::Minute => "minute",
            FieldKind::Hour => "hour",
            FieldKind::DayOfMonth => "dom",
            FieldKind::Month => "month",
            FieldKind::DayOfWeek => "dow",
        }
    }

    fn resolve_name(self, word: &str) -> Option<i64> {
        match self {
            FieldKind::Month => match word.to_ascii_uppercase().as_str() {
                "JAN" => Some(1),
                "FEB" => Some(2),
                "MAR" => Some(3),
                "APR" => Some(4),
                "MAY" => Some(5),
                "JUN" => Some(6),
                "JUL" => Some(7),
                "AUG" => Some(8),
                "SEP" => Some(9),
                "OCT" => Some(10),
                "NOV" => Some(11),
                "DEC" => Some(12),
                _ => None,
            },
            FieldKind::DayOfWeek => match word.to_ascii_uppercase().as_str() {
                "SUN" => Some(0),
                "MON" => Some(1),
                "TUE" => Some(2),
                "WED" => Some(3),
                "THU" => Some(4),
                "FRI" => Some(5),
                "SAT" => Some(6),
                _ => None,
            },
            _ => None,
        }
    }
}

/// One entry of a cron field's comma-separated list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CronFieldEntry {
    Wildcard,
    WildcardStep(i64),
    Value(i64),
    Range(i64, i64),
    RangeStep(i64, i64, i64),
}

/// A parsed cron field: its domain plus the list of entries that make it up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronField {
    pub kind: FieldKind,
    pub entries: Vec<CronFieldEntry>,
}

impl CronField {
    /// Field equivalent to a bare `*`.
    pub fn wildcard(kind: FieldKind) -> Self {
        Self {
            kind,
            entries: vec![CronFieldEntry::Wildcard],
        }
    }

    /// Field equivalent to a single fixed value (used for the implicit
    /// `second` field on 5-field expressions).
    pub fn singleton(kind: FieldKind, value: i64) -> Self {
        Self {
            kind,
            entries: vec![CronFieldEntry::Value(value)],
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(
            self.entries.as_slice(),
            [CronFieldEntry::Wildcard]
        )
    }

    /// Parse one field's text (no commas split yet).
    pub fn parse(kind: FieldKind, text: &str) -> Result<Self, ChronexError> {
        if text.is_empty() {
            return Err(ChronexError::eval(format!("empty {kind:?} field")));
        }
        let (lo_domain, hi_domain) = kind.domain();
        let mut entries = Vec::new();

        for part in text.split(',') {
            if part.is_empty() {
                return Err(ChronexError::eval(format!("empty list item in '{text}'")));
            }
            entries.push(Self::parse_part(kind, part, lo_domain, hi_domain)?);
        }

        Ok(Self { kind, entries })
    }

    fn parse_part(
        kind: FieldKind,
        part: &str,
        lo_domain: i64,
        hi_domain: i64,
    ) -> Result<CronFieldEntry, ChronexError> {
        // Split off an optional "/N" step suffix.
        let (base, step) = match part.split_once('/') {
            Some((base, step_str)) => {
                let step: i64 = step_str
                    .parse()
                    .map_err(|_| ChronexError::eval(format!("invalid step in '{part}'")))?;
                if step < 1 {
                    return Err(ChronexError::eval(format!("step must be >= 1 in '{part}'")));
                }
                (base, Some(step))
            }
            None => (part, None),
        };

        if base == "*" {
            return Ok(match step {
                Some(s) => CronFieldEntry::WildcardStep(s),
                None => CronFieldEntry::Wildcard,
            });
        }

        if let Some((lo_str, hi_str)) = base.split_once('-') {
            let lo = Self::resolve_value(kind, lo_str, lo_domain, hi_domain)?;
            let hi = Self::resolve_value(kind, hi_str, lo_domain, hi_domain)?;
            return Ok(match step {
                Some(s) => CronFieldEntry::RangeStep(lo, hi, s),
                None => CronFieldEntry::Range(lo, hi),
            });
        }

        let value = Self::resolve_value(kind, base, lo_domain, hi_domain)?;
        match step {
            // Bare `v/N` with no explicit upper bound spans to the domain max.
            Some(s) => Ok(CronFieldEntry::RangeStep(value, hi_domain, s)),
            None => Ok(CronFieldEntry::Value(value)),
        }
    }

    fn resolve_value(
        kind: FieldKind,
        token: &str,
        lo_domain: i64,
        hi_domain: i64,
    ) -> Result<i64, ChronexError> {
        let raw: i64 = if let Some(n) = kind.resolve_name(token) {
            n
        } else {
            token
                .parse()
                .map_err(|_| ChronexError::eval(format!("invalid value '{token}'")))?
        };

        // DOW: 7 normalizes to 0 (Sunday) before range validation.
        let value = if kind == FieldKind::DayOfWeek && raw == 7 {
            0
        } else {
            raw
        };

        if value < lo_domain || value > hi_domain {
            return Err(ChronexError::eval(format!(
                "value {value} out of range [{lo_domain}, {hi_domain}]"
            )));
        }
        Ok(value)
    }

    /// Whether `value` (already name-resolved, DOW 7→0 normalized) matches
    /// any entry of this field.
    pub fn matches(&self, value: i64) -> bool {
        let (lo_domain, hi_domain) = self.kind.domain();
        self.entries
            .iter()
            .any(|e| entry_matches(*e, value, lo_domain, hi_domain))
    }
}

fn entry_matches(entry: CronFieldEntry, value: i64, lo_domain: i64, hi_domain: i64) -> bool {
    match entry {
        CronFieldEntry::Wildcard => true,
        CronFieldEntry::WildcardStep(step) => (value - lo_domain) % step == 0,
        CronFieldEntry::Value(v) => v == value,
        CronFieldEntry::Range(lo, hi) => in_range_wrapping(value, lo, hi, lo_domain, hi_domain),
        CronFieldEntry::RangeStep(lo, hi, step) => {
            if !in_range_wrapping(value, lo, hi, lo_domain, hi_domain) {
                return false;
            }
            let domain_len = hi_domain - lo_domain + 1;
            let offset = if lo <= hi {
                value - lo
            } else {
                // linearize the wrapped range into [0, wrapped_length)
                if value >= lo {
                    value - lo
                } else {
                    value - lo + domain_len
                }
            };
            offset % step == 0
        }
    }
}

impl fmt::Display for CronFieldEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CronFieldEntry::Wildcard => write!(f, "*"),
            CronFieldEntry::WildcardStep(step) => write!(f, "*/{step}"),
            CronFieldEntry::Value(v) => write!(f, "{v}"),
            CronFieldEntry::Range(lo, hi) => write!(f, "{lo}-{hi}"),
            CronFieldEntry::RangeStep(lo, hi, step) => write!(f, "{lo}-{hi}/{step}"),
        }
    }
}

impl fmt::Display for CronField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}

fn in_range_wrapping(value: i64, lo: i64, hi: i64, lo_domain: i64, hi_domain: i64) -> bool {
    let _ = (lo_domain, hi_domain);
    if lo <= hi {
        value >= lo && value <= hi
    } else {
        value >= lo || value <= hi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matches_everything() {
        let f = CronField::parse(FieldKind::Hour, "*").unwrap();
        assert!(f.matches(0));
        assert!(f.matches(23));
    }

    #[test]
    fn value_list() {
        let f = CronField::parse(FieldKind::Minute, "5,15,45").unwrap();
        assert!(f.matches(5));
        assert!(f.matches(15));
        assert!(!f.matches(6));
    }

    #[test]
    fn step_wildcard() {
        let f = CronField::parse(FieldKind::Minute, "*/5").unwrap();
        assert!(f.matches(0));
        assert!(f.matches(5));
        assert!(!f.matches(7));
    }

    #[test]
    fn range() {
        let f = CronField::parse(FieldKind::Hour, "9-17").unwrap();
        assert!(f.matches(9));
        assert!(f.matches(17));
        assert!(!f.matches(8));
    }

    #[test]
    fn reversed_range_wraps() {
        let f = CronField::parse(FieldKind::Hour, "23-1").unwrap();
        assert!(f.matches(23));
        assert!(f.matches(0));
        assert!(f.matches(1));
        assert!(!f.matches(12));
    }

    #[test]
    fn reversed_dow_range_wraps() {
        // FRI-MON matches Fri(5),Sat(6),Sun(0),Mon(1)
        let f = CronField::parse(FieldKind::DayOfWeek, "FRI-MON").unwrap();
        assert!(f.matches(5));
        assert!(f.matches(6));
        assert!(f.matches(0));
        assert!(f.matches(1));
        assert!(!f.matches(3));
    }

    #[test]
    fn month_names_case_insensitive() {
        let f = CronField::parse(FieldKind::Month, "jan,Dec").unwrap();
        assert!(f.matches(1));
        assert!(f.matches(12));
    }

    #[test]
    fn dow_seven_normalizes_to_sunday() {
        let f = CronField::parse(FieldKind::DayOfWeek, "7").unwrap();
        assert!(f.matches(0));
    }

    #[test]
    fn bare_value_with_step_spans_to_domain_max() {
        let f = CronField::parse(FieldKind::Minute, "10/20").unwrap();
        assert!(f.matches(10));
        assert!(f.matches(30));
        assert!(f.matches(50));
        assert!(!f.matches(20));
    }

    #[test]
    fn rejects_out_of_range_value() {
        assert!(CronField::parse(FieldKind::Hour, "24").is_err());
    }

    #[test]
    fn rejects_nonpositive_step() {
        assert!(CronField::parse(FieldKind::Minute, "*/0").is_err());
    }

    #[test]
    fn rejects_empty() {
        assert!(CronField::parse(FieldKind::Minute, "").is_err());
    }
}
