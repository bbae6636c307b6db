//! C8: the top-level parsed object. Ties the tokenizer, the alias table,
//! the cron/interval/once sub-parsers and the options clause together into
//! one immutable, timezone-aware schedule, and orchestrates
//! [`Expression::next_occurrence`].

use std::fmt;
use std::str::FromStr;

use jiff::tz::TimeZone;
use jiff::{Span as JiffSpan, Timestamp, Zoned};

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::cron_schedule::CronSchedule;
use crate::duration::Duration;
use crate::error::{ChronexError, Span};
use crate::interval::{IntervalSchedule, OnceSchedule};
use crate::options::{self, OptionDate, Options};
use crate::tokenizer::{self, BodyKind};

/// Which grammar production produced this expression. `Alias` keeps the
/// canonical alias spelling (`@daily`, not `@midnight`) so `Display` can
/// reproduce it instead of the expanded cron text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpressionKind {
    Cron,
    Alias(&'static str),
    Interval,
    Once,
}

/// A fully parsed, immutable schedule. Constructed only via
/// [`Expression::parse`]/[`Expression::parse_at`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    original: String,
    kind: ExpressionKind,
    timezone: Option<String>,
    cron: Option<CronSchedule>,
    interval: Option<IntervalSchedule>,
    once: Option<OnceSchedule>,
    options: Options,
}

impl Expression {
    /// Parse an expression string, resolving any relative `@once` against
    /// the current wall-clock instant.
    pub fn parse(input: &str) -> Result<Self, ChronexError> {
        Self::parse_at(input, Timestamp::now())
    }

    /// Parse an expression string, resolving any relative `@once` against
    /// the supplied `reference` instant instead of "now". Useful for
    /// deterministic tests.
    pub fn parse_at(input: &str, reference: Timestamp) -> Result<Self, ChronexError> {
        let full_span = Span::new(0, input.len());
        let tokenized = tokenizer::tokenize(input)?;

        let timezone = match &tokenized.timezone {
            Some(name) => {
                TimeZone::get(name).map_err(|e| {
                    ChronexError::parse(
                        "E011",
                        format!("unknown timezone '{name}': {e}"),
                        full_span,
                        input,
                    )
                })?;
                Some(name.clone())
            }
            None => None,
        };

        let body = tokenized.body.trim();
        let (kind, cron, interval, once) = match tokenizer::classify_body(body) {
            BodyKind::Cron => {
                let schedule = tokenizer::parse_cron_body_spanned(body, full_span, input)?;
                (ExpressionKind::Cron, Some(schedule), None, None)
            }
            BodyKind::Alias => {
                let (canonical_name, cron_text) =
                    tokenizer::expand_alias(body, full_span, input)?;
                let schedule = tokenizer::parse_cron_body_spanned(cron_text, full_span, input)?;
                (ExpressionKind::Alias(canonical_name), Some(schedule), None, None)
            }
            BodyKind::Interval => {
                let text = body
                    .strip_prefix("@every")
                    .unwrap_or(body)
                    .trim();
                let schedule = IntervalSchedule::parse(text).map_err(|_| {
                    let code = interval_error_code(text);
                    ChronexError::parse(
                        code,
                        format!("malformed @every body '{text}'"),
                        full_span,
                        input,
                    )
                })?;
                (ExpressionKind::Interval, None, Some(schedule), None)
            }
            BodyKind::Once => {
                let text = body.strip_prefix("@once").unwrap_or(body).trim();
                let schedule = if let Some(rel) = text.strip_prefix('+') {
                    OnceSchedule::parse_relative(rel, reference).map_err(|_| {
                        ChronexError::parse(
                            "E017",
                            format!("malformed or non-positive relative @once '+{rel}'"),
                            full_span,
                            input,
                        )
                    })?
                } else {
                    OnceSchedule::parse_absolute(text).map_err(|_| {
                        ChronexError::parse(
                            "E012",
                            format!("malformed @once datetime '{text}'"),
                            full_span,
                            input,
                        )
                    })?
                };
                (ExpressionKind::Once, None, None, Some(schedule))
            }
        };

        let options = options::parse(
            tokenized.options_raw.as_deref().unwrap_or(""),
            full_span,
            input,
        )?;

        let expr = Self {
            original: input.to_string(),
            kind,
            timezone,
            cron,
            interval,
            once,
            options,
        };

        if let (Some(from), Some(until)) = (&expr.options.from, &expr.options.until) {
            let tz = expr.resolved_timezone()?;
            let from_z = options::resolve_option_date(from, &tz, false)?;
            let until_z = options::resolve_option_date(until, &tz, true)?;
            if from_z.timestamp() >= until_z.timestamp() {
                return Err(ChronexError::parse(
                    "E020",
                    "'from' must be strictly before 'until'",
                    full_span,
                    input,
                ));
            }
        }

        Ok(expr)
    }

    pub fn kind(&self) -> &ExpressionKind {
        &self.kind
    }

    pub fn timezone(&self) -> Option<&str> {
        self.timezone.as_deref()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn cron_schedule(&self) -> Option<&CronSchedule> {
        self.cron.as_ref()
    }

    pub fn interval_schedule(&self) -> Option<&IntervalSchedule> {
        self.interval.as_ref()
    }

    pub fn once_schedule(&self) -> Option<&OnceSchedule> {
        self.once.as_ref()
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    fn resolved_timezone(&self) -> Result<TimeZone, ChronexError> {
        match &self.timezone {
            Some(name) => TimeZone::get(name)
                .map_err(|e| ChronexError::eval(format!("invalid timezone '{name}': {e}"))),
            None => Ok(TimeZone::UTC),
        }
    }

    /// Whether `instant` is itself a firing instant of this schedule.
    /// Meaningful for `Cron`/`Alias`; for `Once` it's exact-instant
    /// equality; for `Interval` there is no fixed grid, so this always
    /// returns `false`.
    pub fn matches(&self, instant: &Zoned) -> Result<bool, ChronexError> {
        match self.kind {
            ExpressionKind::Cron | ExpressionKind::Alias(_) => {
                let tz = self.resolved_timezone()?;
                let local = instant.with_time_zone(tz).datetime();
                Ok(self.cron.as_ref().expect("cron kind carries a schedule").matches(local))
            }
            ExpressionKind::Once => {
                let once = self.once.as_ref().expect("once kind carries a schedule");
                Ok(once.fire_at == instant.timestamp())
            }
            ExpressionKind::Interval => Ok(false),
        }
    }

    /// The timezone-aware orchestrator. Returns the earliest instant
    /// strictly after `from` at which this expression fires, honoring
    /// `options.from`/`options.until`, or `None` if there is no such
    /// instant.
    pub fn next_occurrence(&self, from: &Zoned) -> Result<Option<Zoned>, ChronexError> {
        let tz = self.resolved_timezone()?;

        if let Some(until) = &self.options.until {
            let until_z = options::resolve_option_date(until, &tz, true)?;
            if from.timestamp() >= until_z.timestamp() {
                return Ok(None);
            }
        }

        match self.kind {
            ExpressionKind::Cron | ExpressionKind::Alias(_) => {
                let schedule = self.cron.as_ref().expect("cron kind carries a schedule");

                let mut search_from = from.clone();
                if let Some(opt_from) = &self.options.from {
                    let opt_from_z = options::resolve_option_date(opt_from, &tz, false)?;
                    if from.timestamp() < opt_from_z.timestamp() {
                        search_from = opt_from_z
                            .checked_add(JiffSpan::new().seconds(-1))
                            .map_err(|e| ChronexError::eval(format!("date overflow: {e}")))?;
                    }
                }

                let local = search_from.with_time_zone(tz.clone()).datetime();
                let next_local = schedule.next_after(local)?;
                let Some(next_local) = next_local else {
                    return Ok(None);
                };
                let zoned = next_local
                    .to_zoned(tz.clone())
                    .map_err(|e| ChronexError::eval(format!("cannot resolve local time: {e}")))?;

                if let Some(until) = &self.options.until {
                    let until_z = options::resolve_option_date(until, &tz, true)?;
                    if zoned.timestamp() > until_z.timestamp() {
                        return Ok(None);
                    }
                }
                Ok(Some(zoned))
            }
            ExpressionKind::Interval => {
                let interval = self.interval.as_ref().expect("interval kind carries a schedule");

                let mut base = from.clone();
                if let Some(opt_from) = &self.options.from {
                    let opt_from_z = options::resolve_option_date(opt_from, &tz, false)?;
                    if from.timestamp() < opt_from_z.timestamp() {
                        base = opt_from_z;
                    }
                }

                let next = interval.next_after(&base)?;
                if let Some(until) = &self.options.until {
                    let until_z = options::resolve_option_date(until, &tz, true)?;
                    if next.timestamp() > until_z.timestamp() {
                        return Ok(None);
                    }
                }
                Ok(Some(next))
            }
            ExpressionKind::Once => {
                let once = self.once.as_ref().expect("once kind carries a schedule");
                let Some(fire_at) = once.next_after(&from.timestamp()) else {
                    return Ok(None);
                };
                if let Some(opt_from) = &self.options.from {
                    let opt_from_z = options::resolve_option_date(opt_from, &tz, false)?;
                    if fire_at < opt_from_z.timestamp() {
                        return Ok(None);
                    }
                }
                Ok(Some(fire_at.to_zoned(tz.clone())))
            }
        }
    }

    /// A lazy, possibly-infinite iterator of occurrences strictly after
    /// `from`. Bounded internally by `options.max` (default 1000) — see
    /// [`Expression::enumerate`] for a vector with an additional caller cap.
    pub fn occurrences<'a>(&'a self, from: &Zoned) -> Occurrences<'a> {
        let cap = self.options.max.map(|m| m as usize).unwrap_or(1000);
        Occurrences {
            expr: self,
            cursor: from.clone(),
            remaining: cap,
            done: false,
        }
    }

    /// Collect up to `count` future occurrences, bounded by
    /// `min(count, options.max ?? 1000)`.
    pub fn enumerate(&self, from: &Zoned, count: usize) -> Result<Vec<Zoned>, ChronexError> {
        let cap = self.options.max.map(|m| m as usize).unwrap_or(1000).min(count);
        self.occurrences(from).take(cap).collect()
    }
}

/// Lazy iterator returned by [`Expression::occurrences`].
pub struct Occurrences<'a> {
    expr: &'a Expression,
    cursor: Zoned,
    remaining: usize,
    done: bool,
}

impl<'a> Iterator for Occurrences<'a> {
    type Item = Result<Zoned, ChronexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.remaining == 0 {
            return None;
        }
        match self.expr.next_occurrence(&self.cursor) {
            Ok(Some(z)) => {
                self.cursor = z.clone();
                self.remaining -= 1;
                Some(Ok(z))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Picks the diagnostic code for a failed `@every` body: E013 for a
/// malformed duration (on either side of a range), E014 only when both
/// sides parse but the range is ordered min >= max.
fn interval_error_code(text: &str) -> &'static str {
    match text.split_once('-') {
        Some((lo, hi)) => match (Duration::parse(lo), Duration::parse(hi)) {
            (Ok(min), Ok(max)) if min < max => "E013",
            (Ok(_), Ok(_)) => "E014",
            _ => "E013",
        },
        None => "E013",
    }
}

impl FromStr for Expression {
    type Err = ChronexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tz) = &self.timezone {
            write!(f, "TZ={tz} ")?;
        }
        match &self.kind {
            ExpressionKind::Cron => write!(f, "{}", self.cron.as_ref().unwrap())?,
            ExpressionKind::Alias(name) => write!(f, "{name}")?,
            ExpressionKind::Interval => write!(f, "{}", self.interval.as_ref().unwrap())?,
            ExpressionKind::Once => write!(f, "{}", self.once.as_ref().unwrap())?,
        }
        let rendered_options = self.options.to_string();
        if !rendered_options.is_empty() {
            write!(f, " {{{rendered_options}}}")?;
        }
        Ok(())
    }
}

/// Produces a structured inspection object (kind, fields, options) rather
/// than the compact expression string. Intentionally asymmetric with
/// [`Deserialize`], which expects the original string — see the teacher
/// crate's own `Schedule` serde for the same design: structured JSON is for
/// debugging, not a round-trippable wire format.
#[cfg(feature = "serde")]
impl Serialize for Expression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("original", &self.original)?;
        if let Some(tz) = &self.timezone {
            map.serialize_entry("timezone", tz)?;
        }
        match &self.kind {
            ExpressionKind::Cron => {
                map.serialize_entry("kind", "cron")?;
                map.serialize_entry("cron", &self.cron.as_ref().unwrap().to_string())?;
            }
            ExpressionKind::Alias(name) => {
                map.serialize_entry("kind", "alias")?;
                map.serialize_entry("alias", name)?;
                map.serialize_entry("cron", &self.cron.as_ref().unwrap().to_string())?;
            }
            ExpressionKind::Interval => {
                map.serialize_entry("kind", "interval")?;
                let iv = self.interval.as_ref().unwrap();
                map.serialize_entry("min", &iv.min.to_string())?;
                if let Some(max) = iv.max {
                    map.serialize_entry("max", &max.to_string())?;
                }
            }
            ExpressionKind::Once => {
                map.serialize_entry("kind", "once")?;
                let once = self.once.as_ref().unwrap();
                map.serialize_entry("fire_at", &once.fire_at.to_string())?;
                map.serialize_entry("was_relative", &once.was_relative)?;
            }
        }
        map.serialize_entry("options", &self.options)?;
        map.end()
    }
}

/// Expects the original expression string (e.g. `"0 9 * * * {tag:backups}"`),
/// **not** the structured JSON produced by `Serialize`.
#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Expression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Expression::parse(&s).map_err(serde::de::Error::custom)
    }
}
