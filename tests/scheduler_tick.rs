//! Scheduler tick semantics, driven by an injected [`chronex::FakeClock`]
//! so firing is deterministic.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chronex::{
    handler_fn, Clock, FakeClock, HandlerOutcome, Scheduler, SchedulerConfig, SchedulerEvent,
    SkipReason, TriggerDefinition,
};
use jiff::{Span, Zoned};

fn zoned(s: &str) -> Zoned {
    s.parse().expect("valid zoned datetime")
}

fn counting_handler() -> (Arc<AtomicUsize>, chronex::Handler) {
    let counter = Arc::new(AtomicUsize::new(0));
    let handler_counter = counter.clone();
    let handler = handler_fn(move |_ctx, _cancel| {
        let counter = handler_counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            HandlerOutcome::Completed
        }
    });
    (counter, handler)
}

#[tokio::test]
async fn scenario_9_max_two_stops_firing_across_many_ticks() {
    let clock = Arc::new(FakeClock::new(zoned("2026-01-01T00:00:00+00:00[UTC]")));
    let scheduler = Scheduler::with_clock(SchedulerConfig::default(), clock.clone());
    let (counter, handler) = counting_handler();

    scheduler
        .register(
            TriggerDefinition::new("capped", "* * * * * {max:2}"),
            handler,
        )
        .unwrap();

    for _ in 0..10 {
        clock.advance(Span::new().minutes(1));
        scheduler.tick(clock.now()).await.unwrap();
    }

    assert_eq!(counter.load(Ordering::SeqCst), 2);
    let triggers = scheduler.get_triggers().await;
    assert_eq!(triggers[0].fire_count, 2);
    assert!(triggers[0].next_fire.is_none());
}

#[tokio::test]
async fn scenario_10_failing_handler_does_not_stop_other_triggers() {
    let clock = Arc::new(FakeClock::new(zoned("2026-01-01T00:00:00+00:00[UTC]")));
    let scheduler = Scheduler::with_clock(SchedulerConfig::default(), clock.clone());
    let (good_counter, good_handler) = counting_handler();

    let failing = handler_fn(|_ctx, _cancel| async {
        HandlerOutcome::Failed("handler exploded".into())
    });

    scheduler
        .register(TriggerDefinition::new("exploder", "* * * * *"), failing)
        .unwrap();
    scheduler
        .register(TriggerDefinition::new("steady", "* * * * *"), good_handler)
        .unwrap();

    for _ in 0..3 {
        clock.advance(Span::new().minutes(1));
        scheduler.tick(clock.now()).await.unwrap();
    }

    assert_eq!(good_counter.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn window_exceeded_skips_and_recomputes_next_fire() {
    let clock = Arc::new(FakeClock::new(zoned("2026-01-01T00:00:00+00:00[UTC]")));
    let scheduler = Scheduler::with_clock(SchedulerConfig::default(), clock.clone());
    let (counter, handler) = counting_handler();
    let mut events = scheduler.subscribe();

    scheduler
        .register(
            TriggerDefinition::new("windowed", "0 0 * * * {window:30s}"),
            handler,
        )
        .unwrap();

    // Jump past the scheduled instant by more than the window.
    clock.advance(Span::new().days(1).seconds(90));
    scheduler.tick(clock.now()).await.unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 0);
    let mut saw_window_skip = false;
    while let Ok(event) = events.try_recv() {
        if let SchedulerEvent::Skipped { reason: SkipReason::WindowExceeded, .. } = event {
            saw_window_skip = true;
        }
    }
    assert!(saw_window_skip, "expected a WindowExceeded Skipped event");

    let triggers = scheduler.get_triggers().await;
    assert!(triggers[0].next_fire.is_some());
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let scheduler = Scheduler::new(SchedulerConfig::default());
    let (_c1, h1) = counting_handler();
    let (_c2, h2) = counting_handler();

    scheduler
        .register(TriggerDefinition::new("dup", "0 0 * * *"), h1)
        .unwrap();
    let err = scheduler
        .register(TriggerDefinition::new("dup", "0 0 * * *"), h2)
        .unwrap_err();
    assert!(matches!(err, chronex::SchedulerError::DuplicateTrigger(_)));
}

#[tokio::test]
async fn unregister_removes_the_trigger() {
    let scheduler = Scheduler::new(SchedulerConfig::default());
    let (_counter, handler) = counting_handler();
    scheduler
        .register(TriggerDefinition::new("ephemeral", "0 0 * * *"), handler)
        .unwrap();

    assert!(scheduler.unregister("ephemeral"));
    assert!(!scheduler.unregister("ephemeral"));
    assert!(scheduler.get_triggers().await.is_empty());
}

#[tokio::test]
async fn set_enabled_toggles_firing() {
    let clock = Arc::new(FakeClock::new(zoned("2026-01-01T00:00:00+00:00[UTC]")));
    let scheduler = Scheduler::with_clock(SchedulerConfig::default(), clock.clone());
    let (counter, handler) = counting_handler();

    scheduler
        .register(TriggerDefinition::new("toggle", "* * * * *"), handler)
        .unwrap();
    scheduler.set_enabled("toggle", false).unwrap();

    clock.advance(Span::new().minutes(1));
    scheduler.tick(clock.now()).await.unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    scheduler.set_enabled("toggle", true).unwrap();
    clock.advance(Span::new().minutes(1));
    scheduler.tick(clock.now()).await.unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancelled_handler_restores_next_fire_and_aborts_the_tick() {
    let clock = Arc::new(FakeClock::new(zoned("2026-01-01T00:00:00+00:00[UTC]")));
    let scheduler = Scheduler::with_clock(SchedulerConfig::default(), clock.clone());
    let cancelling = handler_fn(|_ctx, _cancel| async { HandlerOutcome::Cancelled });

    scheduler
        .register(TriggerDefinition::new("cancel-me", "* * * * *"), cancelling)
        .unwrap();

    clock.advance(Span::new().minutes(1));
    let result = scheduler.tick(clock.now()).await;
    assert!(matches!(result, Err(chronex::SchedulerError::TickCancelled)));

    let triggers = scheduler.get_triggers().await;
    assert!(triggers[0].next_fire.is_some());
}

#[tokio::test]
async fn lifecycle_start_stop_dispose_are_idempotent() {
    let scheduler = Scheduler::new(SchedulerConfig::default());

    scheduler.start().unwrap();
    scheduler.start().unwrap();
    assert!(scheduler.is_running());

    scheduler.stop_async().await;
    scheduler.stop_async().await;
    assert!(!scheduler.is_running());

    scheduler.dispose().await;
    scheduler.dispose().await;
    assert!(scheduler.is_disposed());

    let (_counter, handler) = counting_handler();
    let err = scheduler
        .register(TriggerDefinition::new("too-late", "0 0 * * *"), handler)
        .unwrap_err();
    assert!(matches!(err, chronex::SchedulerError::Disposed));
}
