//! C10: a concurrent trigger registry, tick loop, and lifecycle, built on
//! `dashmap` + `tokio`: an atomic started-guard around a spawned tick-loop
//! task, a `thiserror`-derived error enum, and a concurrent map registry
//! instead of a single global lock.

pub mod clock;
pub mod error;

use std::collections::HashMap;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration as StdDuration;

use dashmap::DashMap;
use jiff::{Span as JiffSpan, Zoned};
use tokio::sync::{broadcast, watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use clock::{Clock, FakeClock, SystemClock};
pub use error::SchedulerError;

use crate::expression::Expression;

const STOPPED: u8 = 0;
const RUNNING: u8 = 1;

/// External record for a trigger, as registered via [`Scheduler::register`].
/// `expression` is the raw Chronex expression string — Chronex does not
/// interpret `metadata` keys itself; they're opaque to the scheduler.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TriggerDefinition {
    pub id: String,
    pub expression: String,
    #[cfg_attr(feature = "serde", serde(default = "default_enabled"))]
    pub enabled: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub metadata: HashMap<String, String>,
}

#[cfg(feature = "serde")]
fn default_enabled() -> bool {
    true
}

impl TriggerDefinition {
    pub fn new(id: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            expression: expression.into(),
            enabled: true,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// What a handler invocation's future resolves to. Cancellation is the
/// only control flow that unwinds a tick early, so rather than a second
/// `Err` channel, the handler reports it as a value the scheduler inspects.
pub enum HandlerOutcome {
    Completed,
    Failed(Box<dyn std::error::Error + Send + Sync>),
    Cancelled,
}

/// Passed to every handler invocation: the trigger id, both the nominal
/// scheduled instant and the actual tick instant, the 1-based fire count,
/// the full parsed expression (queryable for future occurrences or
/// options), and the trigger's metadata map.
#[derive(Debug, Clone)]
pub struct TriggerContext {
    pub id: String,
    pub scheduled: Zoned,
    pub actual: Zoned,
    pub fire_count: u64,
    pub expression: Arc<Expression>,
    pub metadata: HashMap<String, String>,
}

type HandlerFuture = Pin<Box<dyn Future<Output = HandlerOutcome> + Send>>;

/// A registered handler, erased behind `Arc<dyn Fn>` so callers can register
/// closures or function pointers interchangeably.
pub type Handler = Arc<dyn Fn(TriggerContext, watch::Receiver<bool>) -> HandlerFuture + Send + Sync>;

/// Wrap an `async fn(TriggerContext, watch::Receiver<bool>) -> HandlerOutcome`
/// closure into a [`Handler`] without the caller having to box the future
/// by hand.
pub fn handler_fn<F, Fut>(f: F) -> Handler
where
    F: Fn(TriggerContext, watch::Receiver<bool>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerOutcome> + Send + 'static,
{
    Arc::new(move |ctx, cancel| Box::pin(f(ctx, cancel)) as HandlerFuture)
}

/// Why a due trigger was skipped instead of fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    WindowExceeded,
    MaxReached,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disabled => "disabled",
            Self::WindowExceeded => "window exceeded",
            Self::MaxReached => "max reached",
        };
        f.write_str(s)
    }
}

/// Lifecycle fan-out events. Each trigger's `Firing` precedes its handler
/// invocation; `Completed`/`Failed` follows it.
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    Firing(TriggerContext),
    Completed(TriggerContext),
    Failed {
        context: TriggerContext,
        error: Arc<dyn std::error::Error + Send + Sync>,
    },
    Skipped {
        id: String,
        reason: SkipReason,
    },
}

/// Tick cadence and event-channel sizing. Handler dispatch within a tick is
/// sequential, so `max_concurrent_handlers` is fixed at 1 and reserved for
/// a future fan-out mode rather than consulted today.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub tick_interval: StdDuration,
    pub event_channel_capacity: usize,
    pub max_concurrent_handlers: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: StdDuration::from_secs(1),
            event_channel_capacity: 256,
            max_concurrent_handlers: 1,
        }
    }
}

/// A read-only snapshot of one registration, returned by
/// [`Scheduler::get_triggers`].
#[derive(Debug, Clone)]
pub struct TriggerSnapshot {
    pub id: String,
    pub expression: String,
    pub enabled: bool,
    pub next_fire: Option<Zoned>,
    pub last_fired: Option<Zoned>,
    pub fire_count: u64,
    pub metadata: HashMap<String, String>,
}

struct RegistrationState {
    next_fire: Option<Zoned>,
    last_fired: Option<Zoned>,
}

struct TriggerRegistration {
    id: String,
    expression: Arc<Expression>,
    handler: Handler,
    enabled: AtomicBool,
    fire_count: AtomicU64,
    state: AsyncMutex<RegistrationState>,
    metadata: HashMap<String, String>,
    span: tracing::Span,
}

struct Inner {
    registry: DashMap<String, Arc<TriggerRegistration>>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    events: broadcast::Sender<SchedulerEvent>,
    started: AtomicU8,
    disposed: AtomicBool,
    cancel_tx: watch::Sender<bool>,
    cancel_rx: watch::Receiver<bool>,
    loop_handle: StdMutex<Option<JoinHandle<()>>>,
}

/// A tick-driven trigger registry. Cheaply `Clone` (an `Arc` around shared
/// state), so handing a handle to the spawned tick loop and to callers is
/// the same operation.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Construct with an injected [`Clock`], the seam that makes scheduler
    /// tests deterministic.
    pub fn with_clock(config: SchedulerConfig, clock: Arc<dyn Clock>) -> Self {
        let (events, _) = broadcast::channel(config.event_channel_capacity);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                registry: DashMap::new(),
                clock,
                config,
                events,
                started: AtomicU8::new(STOPPED),
                disposed: AtomicBool::new(false),
                cancel_tx,
                cancel_rx,
                loop_handle: StdMutex::new(None),
            }),
        }
    }

    /// Subscribe to the lifecycle event fan-out. Each subscriber gets its
    /// own `broadcast::Receiver`; a slow or dropped subscriber never blocks
    /// another.
    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.inner.events.subscribe()
    }

    /// Register a new trigger. Fails if `id` is already registered, the
    /// scheduler is disposed, or the expression fails to parse/evaluate.
    /// Validator warnings (e.g. a duplicate tag) are logged via
    /// `tracing::warn!`, not returned — they don't block registration.
    pub fn register(&self, def: TriggerDefinition, handler: Handler) -> Result<(), SchedulerError> {
        if self.inner.disposed.load(Ordering::SeqCst) {
            return Err(SchedulerError::Disposed);
        }
        if self.inner.registry.contains_key(&def.id) {
            return Err(SchedulerError::DuplicateTrigger(def.id));
        }

        let expression = Expression::parse(&def.expression)?;

        let validation = crate::validator::validate(&def.expression);
        for warning in &validation.warnings {
            tracing::warn!(
                trigger = %def.id,
                code = warning.code,
                message = %warning.message,
                "trigger expression warning"
            );
        }

        let span = tracing::info_span!("trigger", id = %def.id);
        let now = self.inner.clock.now();
        let next_fire = expression.next_occurrence(&now)?;

        let registration = Arc::new(TriggerRegistration {
            id: def.id.clone(),
            expression: Arc::new(expression),
            handler,
            enabled: AtomicBool::new(def.enabled),
            fire_count: AtomicU64::new(0),
            state: AsyncMutex::new(RegistrationState {
                next_fire,
                last_fired: None,
            }),
            metadata: def.metadata,
            span,
        });

        self.inner.registry.insert(def.id, registration);
        Ok(())
    }

    /// Remove a trigger. Returns `false` if `id` wasn't registered.
    pub fn unregister(&self, id: &str) -> bool {
        self.inner.registry.remove(id).is_some()
    }

    /// Enable or disable a trigger in place.
    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<(), SchedulerError> {
        let registration = self
            .inner
            .registry
            .get(id)
            .ok_or_else(|| SchedulerError::NotFound(id.to_string()))?;
        registration.enabled.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    /// A snapshot of every registered trigger: later mutations aren't
    /// reflected in an already-returned `Vec`.
    pub async fn get_triggers(&self) -> Vec<TriggerSnapshot> {
        let mut out = Vec::with_capacity(self.inner.registry.len());
        for entry in self.inner.registry.iter() {
            let reg = entry.value();
            let state = reg.state.lock().await;
            out.push(TriggerSnapshot {
                id: reg.id.clone(),
                expression: reg.expression.to_string(),
                enabled: reg.enabled.load(Ordering::SeqCst),
                next_fire: state.next_fire.clone(),
                last_fired: state.last_fired.clone(),
                fire_count: reg.fire_count.load(Ordering::SeqCst),
                metadata: reg.metadata.clone(),
            });
        }
        out
    }

    /// One evaluation pass over every registration.
    /// Returns `Err(SchedulerError::TickCancelled)` the moment a handler
    /// reports [`HandlerOutcome::Cancelled`] — the only control flow that
    /// aborts a tick early; registrations already evaluated keep their
    /// updated state, later ones are simply not visited this tick.
    pub async fn tick(&self, now: Zoned) -> Result<(), SchedulerError> {
        let ids: Vec<String> = self
            .inner
            .registry
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        for id in ids {
            let Some(registration) = self.inner.registry.get(&id).map(|entry| entry.value().clone()) else {
                continue;
            };
            self.evaluate_one(&registration, &now).await?;
        }
        Ok(())
    }

    fn emit(&self, event: SchedulerEvent) {
        let _ = self.inner.events.send(event);
    }

    async fn evaluate_one(
        &self,
        registration: &Arc<TriggerRegistration>,
        now: &Zoned,
    ) -> Result<(), SchedulerError> {
        let scheduled = {
            let state = registration.state.lock().await;
            match &state.next_fire {
                Some(z) => z.clone(),
                None => return Ok(()),
            }
        };

        if !registration.enabled.load(Ordering::SeqCst) {
            if now.timestamp() >= scheduled.timestamp() {
                self.emit(SchedulerEvent::Skipped {
                    id: registration.id.clone(),
                    reason: SkipReason::Disabled,
                });
            }
            return Ok(());
        }

        let options = registration.expression.options();

        let stagger_ms = options.stagger.map(|d| d.as_millis()).unwrap_or(0);
        let stagger_offset_ms = if stagger_ms > 0 {
            stagger_hash(&registration.id) % stagger_ms
        } else {
            0
        };

        let jitter_ms = options.jitter.map(|d| d.as_millis()).unwrap_or(0);
        let jitter_delay_ms = if jitter_ms > 0 {
            rand::rng().random_range(0..jitter_ms)
        } else {
            0
        };

        let effective_fire = scheduled
            .checked_add(JiffSpan::new().milliseconds((stagger_offset_ms + jitter_delay_ms) as i64))
            .map_err(|e| SchedulerError::TimeOverflow(e.to_string()))?;

        if now.timestamp() < effective_fire.timestamp() {
            return Ok(());
        }

        if let Some(max) = options.max {
            if registration.fire_count.load(Ordering::SeqCst) >= max {
                self.emit(SchedulerEvent::Skipped {
                    id: registration.id.clone(),
                    reason: SkipReason::MaxReached,
                });
                registration.state.lock().await.next_fire = None;
                return Ok(());
            }
        }

        // Step 6: clear `next_fire` before invoking the handler so
        // reentrant ticks can't double-fire this trigger.
        registration.state.lock().await.next_fire = None;

        if let Some(window) = options.window {
            let deadline = scheduled
                .checked_add(window.to_jiff_span())
                .map_err(|e| SchedulerError::TimeOverflow(e.to_string()))?;
            if now.timestamp() > deadline.timestamp() {
                self.emit(SchedulerEvent::Skipped {
                    id: registration.id.clone(),
                    reason: SkipReason::WindowExceeded,
                });
                let recomputed = registration.expression.next_occurrence(&scheduled)?;
                registration.state.lock().await.next_fire = recomputed;
                return Ok(());
            }
        }

        let fire_count = registration.fire_count.fetch_add(1, Ordering::SeqCst) + 1;
        registration.state.lock().await.last_fired = Some(now.clone());

        let context = TriggerContext {
            id: registration.id.clone(),
            scheduled: scheduled.clone(),
            actual: now.clone(),
            fire_count,
            expression: registration.expression.clone(),
            metadata: registration.metadata.clone(),
        };

        self.emit(SchedulerEvent::Firing(context.clone()));
        tracing::info!(parent: &registration.span, trigger = %registration.id, fire_count, "firing");

        let outcome = (registration.handler)(context.clone(), self.inner.cancel_rx.clone()).await;

        match outcome {
            HandlerOutcome::Completed => {
                self.emit(SchedulerEvent::Completed(context));
            }
            HandlerOutcome::Failed(error) => {
                let error: Arc<dyn std::error::Error + Send + Sync> = Arc::from(error);
                tracing::error!(parent: &registration.span, trigger = %registration.id, %error, "handler failed");
                if self
                    .inner
                    .events
                    .send(SchedulerEvent::Failed {
                        context,
                        error: error.clone(),
                    })
                    .is_err()
                {
                    // No `Failed` subscriber — route to the diagnostic sink
                    // (structured logging) rather than drop it silently.
                    tracing::warn!(parent: &registration.span, trigger = %registration.id, %error, "no Failed subscriber");
                }
            }
            HandlerOutcome::Cancelled => {
                let recomputed = registration.expression.next_occurrence(&scheduled)?;
                registration.state.lock().await.next_fire = recomputed;
                return Err(SchedulerError::TickCancelled);
            }
        }

        let recomputed = registration.expression.next_occurrence(&scheduled)?;
        let mut state = registration.state.lock().await;
        state.next_fire = match options.max {
            Some(max) if fire_count >= max => None,
            _ => recomputed,
        };
        Ok(())
    }

    /// CAS `started: Stopped -> Running`; on success, spawns the hosted
    /// tick loop (`tick` once per `config.tick_interval` on the injected
    /// clock). Calling `start` twice is a no-op; calling it on a disposed
    /// scheduler fails.
    pub fn start(&self) -> Result<(), SchedulerError> {
        if self.inner.disposed.load(Ordering::SeqCst) {
            return Err(SchedulerError::Disposed);
        }
        if self
            .inner
            .started
            .compare_exchange(STOPPED, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }

        let scheduler = self.clone();
        let handle = tokio::spawn(async move {
            loop {
                if *scheduler.inner.cancel_rx.borrow() {
                    break;
                }
                if scheduler.inner.started.load(Ordering::SeqCst) == STOPPED {
                    break;
                }
                let now = scheduler.inner.clock.now();
                if let Err(error) = scheduler.tick(now).await {
                    tracing::warn!(%error, "tick loop unwound early");
                    break;
                }
                scheduler.inner.clock.sleep(scheduler.inner.config.tick_interval).await;
            }
        });

        *self.inner.loop_handle.lock().unwrap() = Some(handle);
        tracing::info!("scheduler started");
        Ok(())
    }

    /// CAS `started: Running -> Stopped`; signals cancellation, awaits the
    /// tick loop, then resets the cancellation watch so a later `start`
    /// begins clean. Idempotent.
    pub async fn stop_async(&self) {
        if self
            .inner
            .started
            .compare_exchange(RUNNING, STOPPED, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let _ = self.inner.cancel_tx.send(true);
        let handle = self.inner.loop_handle.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        let _ = self.inner.cancel_tx.send(false);
        tracing::info!("scheduler stopped");
    }

    /// CAS `disposed: false -> true`, then `stop_async`. Idempotent.
    pub async fn dispose(&self) {
        if self
            .inner
            .disposed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        self.stop_async().await;
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst) == RUNNING
    }
}

use rand::Rng;

/// Deterministic per-id offset: the same id always yields the same
/// stagger. `DefaultHasher::new()` always starts from the same fixed keys,
/// so this is stable across processes and scheduler instances.
fn stagger_hash(id: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    id.hash(&mut hasher);
    hasher.finish()
}
