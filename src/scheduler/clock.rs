//! The scheduler takes a clock dependency that exposes "now" and a
//! timed-delay primitive, enabling fully deterministic tests by injecting a
//! manually-advanced fake clock. [`SystemClock`] is the production
//! implementation; [`FakeClock`] is the injection point used by
//! `tests/scheduler_tick.rs`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration as StdDuration;

use jiff::Zoned;

/// A source of "now" plus a suspension primitive, so the tick loop's
/// cadence can be driven by either real time or a test's manual clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> Zoned;

    /// Suspend for `duration` on this clock. The system clock sleeps for
    /// real; a fake clock may resolve immediately — see [`FakeClock`].
    fn sleep(&self, duration: StdDuration) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

/// Wall-clock time via `tokio::time`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Zoned {
        Zoned::now()
    }

    fn sleep(&self, duration: StdDuration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// A manually-advanced clock for deterministic scheduler tests. `sleep`
/// resolves immediately — tests drive the cadence themselves by calling
/// `Scheduler::tick` directly rather than relying on the hosted tick loop's
/// real-time delay.
#[derive(Debug)]
pub struct FakeClock {
    now: Mutex<Zoned>,
}

impl FakeClock {
    pub fn new(start: Zoned) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, instant: Zoned) {
        *self.now.lock().unwrap() = instant;
    }

    pub fn advance(&self, span: jiff::Span) {
        let mut guard = self.now.lock().unwrap();
        *guard = guard
            .checked_add(span)
            .expect("fake clock advance must not overflow");
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Zoned {
        self.now.lock().unwrap().clone()
    }

    fn sleep(&self, _duration: StdDuration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(std::future::ready(()))
    }
}
