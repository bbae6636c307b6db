//! Basic Chronex API walkthrough: parse, evaluate, match, display.

use chronex::Expression;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let expr: Expression = "TZ=UTC 0 9 * * MON-FRI".parse()?;
    println!("Parsed: {expr}");

    let now: jiff::Zoned = "2026-06-15T08:00:00+00:00[UTC]".parse()?;
    if let Some(next) = expr.next_occurrence(&now)? {
        println!("Next occurrence after {now}: {next}");
    }

    println!("\nNext 5 occurrences:");
    for dt in expr.enumerate(&now, 5)? {
        println!("  {dt}");
    }

    let monday_9am: jiff::Zoned = "2026-06-15T09:00:00+00:00[UTC]".parse()?;
    println!("\n{monday_9am} matches: {}", expr.matches(&monday_9am)?);

    let sunday_9am: jiff::Zoned = "2026-06-14T09:00:00+00:00[UTC]".parse()?;
    println!("{sunday_9am} matches: {}", expr.matches(&sunday_9am)?);

    let roundtripped: Expression = expr.to_string().parse()?;
    assert_eq!(expr.to_string(), roundtripped.to_string());
    println!("\nRoundtrip: {roundtripped}");

    Ok(())
}
