//! Configuration-time and lifecycle errors for the [`super::Scheduler`].
//!
//! Parse/validation failures in the expression grammar stay as
//! [`crate::error::ChronexError`]; this enum covers the operational errors
//! raised by `register`/`unregister`/`start` themselves.

use thiserror::Error;

use crate::error::ChronexError;

/// Errors returned by [`super::Scheduler`] operations. Never surfaced
/// through events — these are reported synchronously to the caller of
/// `register`/`start`/etc. as fatal operation results.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SchedulerError {
    /// A trigger with this id is already registered.
    #[error("trigger '{0}' is already registered")]
    DuplicateTrigger(String),

    /// `register`/`unregister`/`set_enabled` referenced an id that isn't present.
    #[error("trigger '{0}' is not registered")]
    NotFound(String),

    /// The expression string failed to parse, or evaluating it failed.
    #[error("invalid trigger expression: {0}")]
    InvalidExpression(#[from] ChronexError),

    /// `register`/`start` was called after [`super::Scheduler::dispose`].
    #[error("scheduler has been disposed")]
    Disposed,

    /// A tick observed cancellation and unwound early; registrations
    /// already evaluated this tick keep their updated state, later ones
    /// are simply not evaluated.
    #[error("tick cancelled")]
    TickCancelled,

    /// Date/time arithmetic overflowed while computing an effective fire
    /// instant (stagger/jitter offset, or a window deadline).
    #[error("time arithmetic overflow: {0}")]
    TimeOverflow(String),
}
