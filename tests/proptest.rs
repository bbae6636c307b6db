//! Property-based tests for parsing/formatting invariants: round-trip
//! stability through `Display`, duration canonicalization idempotence, and
//! monotone enumeration order.

use chronex::{Duration, Expression};
use jiff::Zoned;
use proptest::prelude::*;

fn arb_field_value(max: u32) -> impl Strategy<Value = u32> {
    0..=max
}

/// A single cron field: wildcard, a bare value, a `lo-hi` range, or a
/// `*/n` step — the shapes `field.rs` accepts. Many combinations here are
/// out of range for a given position (e.g. DOM `0`); those are expected to
/// fail to parse and are simply skipped by the properties below.
fn arb_cron_field(max: u32) -> impl Strategy<Value = String> {
    prop_oneof![
        Just("*".to_string()),
        arb_field_value(max).prop_map(|v| v.to_string()),
        (arb_field_value(max), arb_field_value(max)).prop_map(|(a, b)| format!("{a}-{b}")),
        (1u32..=5).prop_map(|n| format!("*/{n}")),
    ]
}

fn arb_five_field_cron() -> impl Strategy<Value = String> {
    (
        arb_cron_field(59),
        arb_cron_field(23),
        arb_cron_field(31),
        arb_cron_field(12),
        arb_cron_field(7),
    )
        .prop_map(|(min, hour, dom, month, dow)| format!("{min} {hour} {dom} {month} {dow}"))
}

fn arb_duration_component() -> impl Strategy<Value = String> {
    prop_oneof![
        (1u64..100).prop_map(|n| format!("{n}d")),
        (1u64..100).prop_map(|n| format!("{n}h")),
        (1u64..100).prop_map(|n| format!("{n}m")),
        (1u64..100).prop_map(|n| format!("{n}s")),
        (1u64..1000).prop_map(|n| format!("{n}ms")),
    ]
}

fn arb_duration_string() -> impl Strategy<Value = String> {
    prop::collection::vec(arb_duration_component(), 1..4).prop_map(|parts| parts.concat())
}

proptest! {
    /// `Expression::parse` followed by `Display` followed by another
    /// `Expression::parse` reaches a fixed point: the second parse's
    /// canonical form equals the first's.
    #[test]
    fn five_field_cron_round_trips_through_display(body in arb_five_field_cron()) {
        if let Ok(parsed) = Expression::parse(&body) {
            let canonical = parsed.to_string();
            let reparsed = Expression::parse(&canonical)
                .expect("a canonical form produced by Display must itself parse");
            prop_assert_eq!(canonical, reparsed.to_string());
        }
    }

    /// Any duration string accepted by `Duration::parse` formats back to a
    /// string that reparses to the same millisecond total — canonicalizing
    /// is idempotent even when the input used a non-canonical component
    /// order or redundant units.
    #[test]
    fn duration_canonicalization_is_idempotent(raw in arb_duration_string()) {
        if let Ok(parsed) = Duration::parse(&raw) {
            let canonical = parsed.to_string();
            let reparsed = Duration::parse(&canonical)
                .expect("a canonical form produced by Display must itself parse");
            prop_assert_eq!(parsed.as_millis(), reparsed.as_millis());
            prop_assert_eq!(canonical, reparsed.to_string());
        }
    }

    /// `Duration::from_millis` followed by `Display` followed by
    /// `Duration::parse` recovers the exact millisecond count, for any
    /// magnitude `Duration` can represent.
    #[test]
    fn duration_from_millis_round_trips(millis in 0u64..1_000_000_000) {
        let d = Duration::from_millis(millis);
        let reparsed = Duration::parse(&d.to_string()).unwrap();
        prop_assert_eq!(reparsed.as_millis(), millis);
    }

    /// Successive occurrences of any parseable five-field cron body are
    /// strictly increasing — the scheduler's tick loop depends on this to
    /// never re-fire a past instant.
    #[test]
    fn enumerated_occurrences_are_strictly_monotone(body in arb_five_field_cron()) {
        if let Ok(expr) = Expression::parse(&body) {
            let from: Zoned = "2026-01-01T00:00:00+00:00[UTC]".parse().unwrap();
            if let Ok(occurrences) = expr.enumerate(&from, 8) {
                for window in occurrences.windows(2) {
                    prop_assert!(window[0].timestamp() < window[1].timestamp());
                }
                for occ in &occurrences {
                    prop_assert!(occ.timestamp() > from.timestamp());
                }
            }
        }
    }

    /// `matches(z)` must agree with `z` appearing in `enumerate` starting
    /// just before it, for any parseable five-field cron body.
    #[test]
    fn matches_agrees_with_enumerate(body in arb_five_field_cron()) {
        if let Ok(expr) = Expression::parse(&body) {
            let from: Zoned = "2026-01-01T00:00:00+00:00[UTC]".parse().unwrap();
            if let Ok(occurrences) = expr.enumerate(&from, 3) {
                for occ in &occurrences {
                    prop_assert!(expr.matches(occ).unwrap_or(false));
                }
            }
        }
    }
}
