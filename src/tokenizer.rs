//! C6: splits a raw expression string into its `TZ=` prefix, schedule body,
//! and `{options}` clause, and classifies the body (plain cron, alias,
//! `@every`, or `@once`) so [`crate::expression`] knows which sub-parser to
//! hand it to.

use crate::cron_schedule::{implicit_second_field, CronSchedule};
use crate::error::{ChronexError, Span};
use crate::field::{CronField, FieldKind};
use crate::special::SpecialEntry;

/// Result of splitting a raw expression string into its three sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tokenized {
    pub timezone: Option<String>,
    pub body: String,
    pub options_raw: Option<String>,
}

/// What kind of schedule body a tokenized expression carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Cron,
    Alias,
    Interval,
    Once,
}

/// Classify an already-trimmed body string. Does not validate it.
pub fn classify_body(body: &str) -> BodyKind {
    let trimmed = body.trim();
    if trimmed == "@every" || trimmed.starts_with("@every ") {
        BodyKind::Interval
    } else if trimmed == "@once" || trimmed.starts_with("@once ") {
        BodyKind::Once
    } else if trimmed.starts_with('@') {
        BodyKind::Alias
    } else {
        BodyKind::Cron
    }
}

/// Split `TZ=<zone> <body> {<options>}` into its parts. `TZ=` and the
/// options clause are both optional.
pub fn tokenize(input: &str) -> Result<Tokenized, ChronexError> {
    let trimmed = input.trim();

    let (timezone, rest) = if let Some(after) = trimmed.strip_prefix("TZ=") {
        match after.find(char::is_whitespace) {
            Some(idx) => (Some(after[..idx].to_string()), after[idx..].trim_start()),
            None => (Some(after.to_string()), ""),
        }
    } else {
        (None, trimmed)
    };

    let (body, options_raw) = split_options(rest, input)?;

    Ok(Tokenized {
        timezone,
        body: body.trim().to_string(),
        options_raw,
    })
}

/// Locate the last `}` and its nearest preceding `{`, returning the body
/// text before it and the raw options text between the braces.
fn split_options<'a>(
    rest: &'a str,
    full_input: &str,
) -> Result<(&'a str, Option<String>), ChronexError> {
    match rest.rfind('}') {
        None => {
            if rest.contains('{') {
                return Err(ChronexError::lex(
                    "unmatched '{' in options clause",
                    Span::new(0, full_input.len()),
                    full_input,
                ));
            }
            Ok((rest, None))
        }
        Some(close) => {
            let open = rest[..close].rfind('{').ok_or_else(|| {
                ChronexError::lex(
                    "unmatched '}' in options clause",
                    Span::new(close, close + 1),
                    full_input,
                )
            })?;
            let trailing = rest[close + 1..].trim();
            if !trailing.is_empty() {
                return Err(ChronexError::lex(
                    format!("unexpected trailing text after options: '{trailing}'"),
                    Span::new(close + 1, full_input.len()),
                    full_input,
                ));
            }
            Ok((&rest[..open], Some(rest[open + 1..close].to_string())))
        }
    }
}

/// Expand a schedule alias into its canonical name and equivalent 5-field
/// cron text.
pub fn expand_alias(
    name: &str,
    span: Span,
    full_input: &str,
) -> Result<(&'static str, &'static str), ChronexError> {
    match name.to_ascii_lowercase().as_str() {
        "@yearly" | "@annually" => Ok(("@yearly", "0 0 1 1 *")),
        "@monthly" => Ok(("@monthly", "0 0 1 * *")),
        "@weekly" => Ok(("@weekly", "0 0 * * 0")),
        "@daily" | "@midnight" => Ok(("@daily", "0 0 * * *")),
        "@hourly" => Ok(("@hourly", "0 * * * *")),
        _ => Err(ChronexError::parse(
            "E010",
            format!("unknown alias '{name}'"),
            span,
            full_input,
        )),
    }
}

/// Parse a 5- or 6-field cron body into a [`CronSchedule`], using the whole
/// body as the diagnostic span.
pub fn parse_cron_body(body: &str) -> Result<CronSchedule, ChronexError> {
    parse_cron_body_spanned(body, Span::new(0, body.len()), body)
}

/// Parse a 5- or 6-field cron body within a larger expression, attributing
/// any failure to `span` in `full_input`.
pub fn parse_cron_body_spanned(
    body: &str,
    span: Span,
    full_input: &str,
) -> Result<CronSchedule, ChronexError> {
    let tokens: Vec<&str> = body.split_whitespace().collect();
    let (has_seconds, second_text, minute_text, hour_text, dom_text, month_text, dow_text) =
        match tokens.as_slice() {
            [mi, h, dom, mo, dw] => (false, "0", *mi, *h, *dom, *mo, *dw),
            [s, mi, h, dom, mo, dw] => (true, *s, *mi, *h, *dom, *mo, *dw),
            _ => {
                return Err(ChronexError::parse(
                    "E010",
                    format!("expected 5 or 6 whitespace-separated fields, found {}", tokens.len()),
                    span,
                    full_input,
                ))
            }
        };

    let second = if has_seconds {
        CronField::parse(FieldKind::Second, second_text)
            .map_err(|_| field_err("E001", "second", second_text, span, full_input))?
    } else {
        implicit_second_field()
    };
    let minute = CronField::parse(FieldKind::Minute, minute_text)
        .map_err(|_| field_err("E002", "minute", minute_text, span, full_input))?;
    let hour = CronField::parse(FieldKind::Hour, hour_text)
        .map_err(|_| field_err("E003", "hour", hour_text, span, full_input))?;
    let month = CronField::parse(FieldKind::Month, month_text)
        .map_err(|_| field_err("E005", "month", month_text, span, full_input))?;

    let (dom, dom_special) = if SpecialEntry::is_dom_special_syntax(dom_text) {
        let special = SpecialEntry::parse_dom(dom_text)
            .map_err(|_| field_err("E004", "dom", dom_text, span, full_input))?;
        (CronField::wildcard(FieldKind::DayOfMonth), Some(special))
    } else {
        let field = CronField::parse(FieldKind::DayOfMonth, dom_text)
            .map_err(|_| field_err("E004", "dom", dom_text, span, full_input))?;
        (field, None)
    };

    let (dow, dow_special) = if SpecialEntry::is_dow_special_syntax(dow_text) {
        let special = SpecialEntry::parse_dow(dow_text)
            .map_err(|_| field_err("E006", "dow", dow_text, span, full_input))?;
        (CronField::wildcard(FieldKind::DayOfWeek), Some(special))
    } else {
        let field = CronField::parse(FieldKind::DayOfWeek, dow_text)
            .map_err(|_| field_err("E006", "dow", dow_text, span, full_input))?;
        (field, None)
    };

    Ok(CronSchedule {
        second,
        minute,
        hour,
        dom,
        month,
        dow,
        has_seconds,
        dom_special,
        dow_special,
    })
}

fn field_err(
    code: &'static str,
    field: &'static str,
    value: &str,
    span: Span,
    full_input: &str,
) -> ChronexError {
    ChronexError::parse(code, format!("invalid {field} field '{value}'"), span, full_input)
}
