//! Chronex — a cron-expression superset (cron, aliases, intervals,
//! one-shots) with a concurrent, tick-driven trigger engine.
//!
//! The crate is organized leaves-first, each module building on the ones
//! above it:
//!
//! - [`duration`] — compound duration strings (`1h30m`).
//! - [`field`] — one cron field (value/range/step/wildcard).
//! - [`special`] — date-aware DOM/DOW specials (`L`, `W`, `#`).
//! - [`cron_schedule`] — six cron fields composed, `matches`/`next_after`.
//! - [`interval`] — `@every` and `@once` schedules.
//! - [`tokenizer`] — splits `TZ=`/body/`{options}` and classifies the body.
//! - [`options`] — the `{k:v,...}` options clause.
//! - [`expression`] — [`Expression`], the top-level parsed object.
//! - [`validator`] — whole-expression diagnostic collection.
//! - [`scheduler`] — the concurrent trigger registry and tick loop.
//!
//! # Examples
//!
//! ```
//! use chronex::Expression;
//!
//! let expr: Expression = "TZ=UTC 0 9 * * MON-FRI".parse().unwrap();
//! let now: jiff::Zoned = "2026-01-05T08:00:00+00:00[UTC]".parse().unwrap();
//! let next = expr.next_occurrence(&now).unwrap().unwrap();
//! assert_eq!(next.to_string(), "2026-01-05T09:00:00+00:00[UTC]");
//! ```

pub mod cron_schedule;
pub mod duration;
pub mod error;
pub mod expression;
pub mod field;
pub mod interval;
pub mod options;
pub mod scheduler;
pub mod special;
pub mod tokenizer;
pub mod validator;

pub use duration::Duration;
pub use error::{ChronexError, Diagnostic, Span};
pub use expression::{Expression, ExpressionKind, Occurrences};
pub use options::{OptionDate, Options};
pub use scheduler::{
    handler_fn, Clock, FakeClock, Handler, HandlerOutcome, Scheduler, SchedulerConfig,
    SchedulerError, SchedulerEvent, SkipReason, SystemClock, TriggerContext, TriggerDefinition,
    TriggerSnapshot,
};
pub use validator::{validate, ValidationResult};
