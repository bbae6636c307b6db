//! Walks through the `{key:value,...}` options clause: `from`/`until`
//! windows, `max` fire caps, `jitter`/`stagger` spread, and `tag` metadata.

use chronex::Expression;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // from/until — gate occurrences to a date window.
    let expr = Expression::parse("0 9 * * * {from:2026-12-20,until:2026-12-25}")?;
    let start: jiff::Zoned = "2026-01-01T00:00:00+00:00[UTC]".parse()?;
    println!("from/until window:");
    for dt in expr.enumerate(&start, 10)? {
        println!("  {dt}");
    }

    // max — stop after N occurrences.
    let expr = Expression::parse("0 9 * * * {max:3}")?;
    println!("\nmax:3 (enumerate(.., 100) still stops at 3):");
    for dt in expr.enumerate(&start, 100)? {
        println!("  {dt}");
    }

    // jitter/stagger affect scheduler firing, not `next_occurrence` itself —
    // show that they parse and round-trip through Display unchanged.
    let expr = Expression::parse("@every 5m {jitter:10s,stagger:30s,tag:ingest+retry}")?;
    println!("\njitter/stagger/tag options round-trip: {expr}");
    let options = expr.options();
    println!(
        "  jitter={:?} stagger={:?} tags={:?}",
        options.jitter, options.stagger, options.tags
    );

    Ok(())
}
