use std::sync::Arc;

use chronex::{handler_fn, Expression, HandlerOutcome, Scheduler, SchedulerConfig, TriggerDefinition};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn fixed_now() -> jiff::Zoned {
    jiff::civil::Date::new(2026, 2, 6)
        .unwrap()
        .to_datetime(jiff::civil::Time::new(12, 0, 0, 0).unwrap())
        .to_zoned(jiff::tz::TimeZone::UTC)
        .unwrap()
}

// ---------------------------------------------------------------------------
// Parse benchmarks
// ---------------------------------------------------------------------------

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    group.bench_function("five_field_cron", |b| {
        b.iter(|| Expression::parse(black_box("*/15 9-17 * * MON-FRI")).unwrap());
    });

    group.bench_function("six_field_cron_with_options", |b| {
        b.iter(|| {
            Expression::parse(black_box(
                "TZ=America/New_York 30 */15 9-17 * * MON-FRI {jitter:5s,max:100,tag:a+b}",
            ))
            .unwrap()
        });
    });

    group.bench_function("alias", |b| {
        b.iter(|| Expression::parse(black_box("@daily")).unwrap());
    });

    group.bench_function("interval", |b| {
        b.iter(|| Expression::parse(black_box("@every 1h-2h")).unwrap());
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Evaluation benchmarks (next_occurrence)
// ---------------------------------------------------------------------------

fn bench_eval(c: &mut Criterion) {
    let mut group = c.benchmark_group("eval");
    let now = fixed_now();

    let simple_cron = Expression::parse("0 9 * * MON-FRI").unwrap();
    group.bench_function("simple_cron", |b| {
        b.iter(|| simple_cron.next_occurrence(black_box(&now)).unwrap());
    });

    let dom_dow_or = Expression::parse("0 0 15 * FRI").unwrap();
    group.bench_function("dom_dow_or", |b| {
        b.iter(|| dom_dow_or.next_occurrence(black_box(&now)).unwrap());
    });

    let nth_weekday = Expression::parse("0 0 * * MON#2").unwrap();
    group.bench_function("nth_weekday", |b| {
        b.iter(|| nth_weekday.next_occurrence(black_box(&now)).unwrap());
    });

    let interval = Expression::parse("@every 1h-2h").unwrap();
    group.bench_function("interval", |b| {
        b.iter(|| interval.next_occurrence(black_box(&now)).unwrap());
    });

    let tz_cron = Expression::parse("TZ=America/New_York 30 2 * * *").unwrap();
    group.bench_function("timezone_cron", |b| {
        b.iter(|| tz_cron.next_occurrence(black_box(&now)).unwrap());
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Display benchmark (parse + to_string round-trip)
// ---------------------------------------------------------------------------

fn bench_display(c: &mut Criterion) {
    let mut group = c.benchmark_group("display");

    let expr = Expression::parse(
        "TZ=America/New_York 30 */15 9-17 * * MON-FRI {jitter:5s,max:100,tag:a+b}",
    )
    .unwrap();

    group.bench_function("to_string_roundtrip", |b| {
        b.iter(|| black_box(&expr).to_string());
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Scheduler tick benchmark: one pass over N registered triggers.
// ---------------------------------------------------------------------------

fn bench_scheduler_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler");
    let rt = tokio::runtime::Runtime::new().unwrap();

    for trigger_count in [10usize, 100, 1000] {
        let scheduler = Scheduler::new(SchedulerConfig::default());
        for i in 0..trigger_count {
            let handler = handler_fn(|_ctx, _cancel| async { HandlerOutcome::Completed });
            scheduler
                .register(TriggerDefinition::new(format!("t{i}"), "* * * * *"), handler)
                .unwrap();
        }
        let scheduler = Arc::new(scheduler);
        let now = fixed_now();

        group.bench_function(format!("tick_{trigger_count}_triggers"), |b| {
            b.iter(|| {
                rt.block_on(async { scheduler.tick(black_box(now.clone())).await.unwrap() });
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_eval, bench_display, bench_scheduler_tick);
criterion_main!(benches);
