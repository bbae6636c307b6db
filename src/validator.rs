//! C9: runs the grammar in a mode that collects every rule violation as a
//! coded [`Diagnostic`] instead of bailing on the first one.

use jiff::tz::TimeZone;

use crate::duration::Duration;
use crate::error::Diagnostic;
use crate::field::{CronField, FieldKind};
use crate::interval::IntervalSchedule;
use crate::interval::OnceSchedule;
use crate::options::OptionDate;
use crate::special::SpecialEntry;
use crate::tokenizer::{self, BodyKind};

/// The outcome of validating an expression string: every error and warning
/// collected, rather than just the first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a raw expression string, collecting every diagnostic rather
/// than stopping at the first rule violation.
pub fn validate(input: &str) -> ValidationResult {
    let mut result = ValidationResult::default();

    let tokenized = match tokenizer::tokenize(input) {
        Ok(t) => t,
        Err(e) => {
            result.errors.push(Diagnostic::new(
                e.code().unwrap_or("E010"),
                e.to_string(),
            ));
            return result;
        }
    };

    let mut tz: Option<TimeZone> = None;
    if let Some(name) = &tokenized.timezone {
        match TimeZone::get(name) {
            Ok(z) => tz = Some(z),
            Err(_) => {
                result.errors.push(
                    Diagnostic::new("E011", format!("unknown timezone '{name}'"))
                        .with_field("timezone")
                        .with_value(name.clone()),
                );
            }
        }
    }
    let tz = tz.unwrap_or(TimeZone::UTC);

    let body = tokenized.body.trim();
    let body_kind = tokenizer::classify_body(body);
    let mut interval_min: Option<Duration> = None;

    match body_kind {
        BodyKind::Cron => validate_cron_body(body, &mut result),
        BodyKind::Alias => {
            if tokenizer::expand_alias(body, crate::error::Span::new(0, 0), body).is_err() {
                result.errors.push(
                    Diagnostic::new("E010", format!("unknown alias '{body}'")).with_field("body"),
                );
            }
        }
        BodyKind::Interval => {
            let text = body.strip_prefix("@every").unwrap_or(body).trim();
            match validate_interval_body(text, &mut result) {
                Some(min) => interval_min = Some(min),
                None => {}
            }
        }
        BodyKind::Once => {
            let text = body.strip_prefix("@once").unwrap_or(body).trim();
            validate_once_body(text, &mut result);
        }
    }

    validate_options(
        tokenized.options_raw.as_deref().unwrap_or(""),
        &tz,
        interval_min,
        &mut result,
    );

    result
}

fn validate_cron_body(body: &str, result: &mut ValidationResult) {
    let tokens: Vec<&str> = body.split_whitespace().collect();
    let (second_text, minute_text, hour_text, dom_text, month_text, dow_text) =
        match tokens.as_slice() {
            [mi, h, dom, mo, dw] => (None, *mi, *h, *dom, *mo, *dw),
            [s, mi, h, dom, mo, dw] => (Some(*s), *mi, *h, *dom, *mo, *dw),
            _ => {
                result.errors.push(Diagnostic::new(
                    "E010",
                    format!(
                        "expected 5 or 6 whitespace-separated fields, found {}",
                        tokens.len()
                    ),
                ));
                return;
            }
        };

    if let Some(second_text) = second_text {
        validate_field(FieldKind::Second, second_text, "E001", result);
    }
    validate_field(FieldKind::Minute, minute_text, "E002", result);
    validate_field(FieldKind::Hour, hour_text, "E003", result);
    validate_field(FieldKind::Month, month_text, "E005", result);

    if SpecialEntry::is_dom_special_syntax(dom_text) {
        if SpecialEntry::parse_dom(dom_text).is_err() {
            result.errors.push(
                Diagnostic::new("E004", format!("invalid dom special '{dom_text}'"))
                    .with_field("dom")
                    .with_value(dom_text),
            );
        }
    } else {
        validate_field(FieldKind::DayOfMonth, dom_text, "E004", result);
    }

    if SpecialEntry::is_dow_special_syntax(dow_text) {
        if SpecialEntry::parse_dow(dow_text).is_err() {
            result.errors.push(
                Diagnostic::new("E006", format!("invalid dow special '{dow_text}'"))
                    .with_field("dow")
                    .with_value(dow_text),
            );
        }
    } else {
        validate_field(FieldKind::DayOfWeek, dow_text, "E006", result);
    }
}

/// Validate one comma-separated field, reporting a step-positivity
/// violation as `E007` (distinct from the field's own out-of-range code).
fn validate_field(kind: FieldKind, text: &str, out_of_range_code: &'static str, result: &mut ValidationResult) {
    for part in text.split(',') {
        if let Some((_, step_str)) = part.split_once('/') {
            if let Ok(step) = step_str.parse::<i64>() {
                if step < 1 {
                    result.errors.push(
                        Diagnostic::new("E007", format!("step must be >= 1 in '{part}'"))
                            .with_field(kind.name())
                            .with_value(part.to_string()),
                    );
                    continue;
                }
            }
        }
    }
    if CronField::parse(kind, text).is_err() {
        result.errors.push(
            Diagnostic::new(out_of_range_code, format!("invalid {} field '{text}'", kind.name()))
                .with_field(kind.name())
                .with_value(text.to_string()),
        );
    }
}

fn validate_interval_body(text: &str, result: &mut ValidationResult) -> Option<Duration> {
    match text.split_once('-') {
        Some((lo, hi)) => {
            let min = Duration::parse(lo).ok();
            let max = Duration::parse(hi).ok();
            if min.is_none() || max.is_none() {
                result.errors.push(Diagnostic::new(
                    "E013",
                    format!("malformed @every duration in '{text}'"),
                ));
                return None;
            }
            let (min, max) = (min.unwrap(), max.unwrap());
            if min >= max {
                result.errors.push(Diagnostic::new(
                    "E014",
                    format!("@every range min must be less than max in '{text}'"),
                ));
            }
            Some(min)
        }
        None => match Duration::parse(text) {
            Ok(d) if !d.is_zero() => Some(d),
            _ => {
                result.errors.push(Diagnostic::new(
                    "E013",
                    format!("malformed @every duration '{text}'"),
                ));
                None
            }
        },
    }
}

fn validate_once_body(text: &str, result: &mut ValidationResult) {
    if let Some(rel) = text.strip_prefix('+') {
        match Duration::parse(rel) {
            Ok(d) if d.is_zero() => {
                result.errors.push(Diagnostic::new(
                    "E017",
                    "relative @once duration must be positive",
                ));
            }
            Err(_) => {
                result.errors.push(Diagnostic::new(
                    "E017",
                    format!("malformed relative @once duration '+{rel}'"),
                ));
            }
            _ => {}
        }
    } else if OnceSchedule::parse_absolute(text).is_err() {
        result.errors.push(Diagnostic::new(
            "E012",
            format!("malformed @once datetime '{text}'"),
        ));
    }
}

fn validate_options(
    raw: &str,
    tz: &TimeZone,
    interval_min: Option<Duration>,
    result: &mut ValidationResult,
) {
    if raw.trim().is_empty() {
        return;
    }

    let mut jitter: Option<Duration> = None;
    let mut stagger: Option<Duration> = None;
    let mut from: Option<OptionDate> = None;
    let mut until: Option<OptionDate> = None;
    let mut seen_tags: std::collections::HashSet<String> = std::collections::HashSet::new();

    for pair in raw.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let Some((key, value)) = pair.split_once(':') else {
            result.errors.push(Diagnostic::new(
                "E016",
                format!("option '{pair}' is missing a ':'"),
            ));
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        match key {
            "jitter" => match Duration::parse(value) {
                Ok(d) if !d.is_zero() => jitter = Some(d),
                _ => result.errors.push(
                    Diagnostic::new("E016", format!("invalid jitter value '{value}'"))
                        .with_field("jitter"),
                ),
            },
            "stagger" => match Duration::parse(value) {
                Ok(d) if !d.is_zero() => stagger = Some(d),
                _ => result.errors.push(
                    Diagnostic::new("E024", format!("stagger must be a positive duration, got '{value}'"))
                        .with_field("stagger"),
                ),
            },
            "window" => {
                if !matches!(Duration::parse(value), Ok(d) if !d.is_zero()) {
                    result.errors.push(
                        Diagnostic::new("E023", format!("window must be a positive duration, got '{value}'"))
                            .with_field("window"),
                    );
                }
            }
            "from" => match parse_option_date(value) {
                Some(d) => from = Some(d),
                None => result.errors.push(
                    Diagnostic::new("E016", format!("invalid from value '{value}'")).with_field("from"),
                ),
            },
            "until" => match parse_option_date(value) {
                Some(d) => until = Some(d),
                None => result.errors.push(
                    Diagnostic::new("E016", format!("invalid until value '{value}'")).with_field("until"),
                ),
            },
            "max" => match value.parse::<i64>() {
                Ok(n) if n > 0 => {}
                _ => result.errors.push(
                    Diagnostic::new("E021", "max must be a positive integer").with_field("max"),
                ),
            },
            "tag" => {
                for tag in value.split('+') {
                    if !seen_tags.insert(tag.to_string()) {
                        result.warnings.push(
                            Diagnostic::new("W001", format!("duplicate tag '{tag}'")).with_field("tag"),
                        );
                    }
                }
            }
            _ => result.errors.push(Diagnostic::new(
                "E015",
                format!("unknown option key '{key}'"),
            )),
        }
    }

    if let (Some(from), Some(until)) = (&from, &until) {
        if let (Ok(from_z), Ok(until_z)) = (
            crate::options::resolve_option_date(from, tz, false),
            crate::options::resolve_option_date(until, tz, true),
        ) {
            if from_z.timestamp() >= until_z.timestamp() {
                result.errors.push(Diagnostic::new("E020", "'from' must be strictly before 'until'"));
            }
        }
    }

    // E022/E025 only computed for @every, the only kind with a knowable
    // minimum interval.
    if let Some(min) = interval_min {
        let min_ms = min.as_millis().max(1);
        if let Some(jitter) = jitter {
            if jitter.as_millis() * 2 > min_ms {
                result.warnings.push(Diagnostic::new(
                    "E022",
                    "jitter exceeds 50% of the schedule's minimum interval",
                ));
            }
        }
        if let Some(stagger) = stagger {
            if stagger.as_millis() > min_ms {
                result.warnings.push(Diagnostic::new(
                    "E025",
                    "stagger exceeds the schedule's minimum interval",
                ));
            }
        }
    }
}

fn parse_option_date(value: &str) -> Option<OptionDate> {
    if let Ok(ts) = value.parse::<jiff::Timestamp>() {
        return Some(OptionDate::Absolute(ts));
    }
    if let Ok(date) = value.parse::<jiff::civil::Date>() {
        return Some(OptionDate::DateOnly(date));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_expression_has_no_diagnostics() {
        let r = validate("*/5 * * * *");
        assert!(r.is_valid());
        assert!(r.warnings.is_empty());
    }

    #[test]
    fn reports_out_of_range_hour() {
        let r = validate("0 99 * * *");
        assert!(!r.is_valid());
        assert!(r.errors.iter().any(|d| d.code == "E003"));
    }

    #[test]
    fn reports_multiple_field_errors_at_once() {
        let r = validate("99 99 * * *");
        assert!(r.errors.iter().any(|d| d.code == "E002"));
        assert!(r.errors.iter().any(|d| d.code == "E003"));
    }

    #[test]
    fn reports_nonpositive_step() {
        let r = validate("*/0 * * * *");
        assert!(r.errors.iter().any(|d| d.code == "E007"));
    }

    #[test]
    fn reports_unknown_alias() {
        let r = validate("@fortnightly");
        assert!(r.errors.iter().any(|d| d.code == "E010"));
    }

    #[test]
    fn reports_unknown_timezone() {
        let r = validate("TZ=Not/AZone 0 0 * * *");
        assert!(r.errors.iter().any(|d| d.code == "E011"));
    }

    #[test]
    fn reports_bad_once_datetime() {
        let r = validate("@once not-a-date");
        assert!(r.errors.iter().any(|d| d.code == "E012"));
    }

    #[test]
    fn reports_every_range_inverted() {
        let r = validate("@every 2h-1h");
        assert!(r.errors.iter().any(|d| d.code == "E014"));
    }

    #[test]
    fn reports_unknown_option_key() {
        let r = validate("0 0 * * * {bogus:1}");
        assert!(r.errors.iter().any(|d| d.code == "E015"));
    }

    #[test]
    fn reports_duplicate_tag_warning() {
        let r = validate("0 0 * * * {tag:a+a}");
        assert!(r.is_valid());
        assert!(r.warnings.iter().any(|d| d.code == "W001"));
    }

    #[test]
    fn reports_from_after_until() {
        let r = validate("0 0 * * * {from:2026-06-01,until:2026-01-01}");
        assert!(r.errors.iter().any(|d| d.code == "E020"));
    }

    #[test]
    fn reports_jitter_exceeding_half_interval() {
        let r = validate("@every 1m {jitter:1m}");
        assert!(r.warnings.iter().any(|d| d.code == "E022"));
    }

    #[test]
    fn reports_stagger_exceeding_interval() {
        let r = validate("@every 1m {stagger:2m}");
        assert!(r.warnings.iter().any(|d| d.code == "E025"));
    }
}
