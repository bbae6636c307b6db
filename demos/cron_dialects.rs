//! Walks through every grammar dialect Chronex accepts: five- and
//! six-field cron, named aliases, `@every`, `@once`, and the `L`/`W`/`#`
//! special day-of-month/day-of-week entries.

use chronex::{Expression, ExpressionKind};

fn show(label: &str, input: &str) {
    match Expression::parse(input) {
        Ok(expr) => println!("{label:<28} {input:<40} -> {:?}  (canonical: {expr})", expr.kind()),
        Err(e) => println!("{label:<28} {input:<40} -> error: {e}"),
    }
}

fn main() {
    println!("-- cron5 / cron6 --");
    show("five fields", "*/15 9-17 * * MON-FRI");
    show("six fields (seconds)", "30 */15 9-17 * * MON-FRI");

    println!("\n-- aliases --");
    show("@daily", "@daily");
    show("@hourly", "@hourly");
    show("@weekly", "@weekly");

    println!("\n-- intervals --");
    show("fixed @every", "@every 90s");
    show("ranged @every", "@every 1h-2h");

    println!("\n-- one-shot --");
    show("@once absolute", "@once 2026-12-25T00:00:00Z");

    println!("\n-- DOM/DOW specials --");
    show("last day of month", "0 0 L * *");
    show("nearest weekday to 15th", "0 0 15W * *");
    show("2nd Friday", "0 0 * * FRI#2");

    println!("\n-- timezone prefix --");
    show("explicit TZ", "TZ=America/New_York 0 9 * * *");

    println!("\n-- alias expands like its five-field equivalent --");
    let alias = Expression::parse("@daily").unwrap();
    let cron = Expression::parse("0 0 * * *").unwrap();
    assert!(matches!(alias.kind(), ExpressionKind::Alias(_)));
    let from: jiff::Zoned = "2026-01-01T00:00:00+00:00[UTC]".parse().unwrap();
    assert_eq!(
        alias.next_occurrence(&from).unwrap(),
        cron.next_occurrence(&from).unwrap()
    );
    println!("@daily and '0 0 * * *' agree on next_occurrence: yes");
}
