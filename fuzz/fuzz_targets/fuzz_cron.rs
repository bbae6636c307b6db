#![no_main]
//! Targets the Vixie-cron DOM/DOW OR-semantics path specifically: whenever
//! both fields are restricted (non-`*`), a match only requires satisfying
//! one of them, not both. Built from the fuzz bytes so both fields are
//! reliably non-wildcard, where a generic `fuzz_parse` pass would mostly
//! land on one field left as `*`.

use jiff::civil::Weekday;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let dom = (data[0] % 31) + 1;
    let dow = data[1] % 7;

    let text = format!("0 0 {dom} * {dow}");
    let Ok(expr) = chronex::Expression::parse(&text) else {
        return;
    };

    let from: jiff::Zoned = "2026-01-01T00:00:00+00:00[UTC]".parse().unwrap();
    let Ok(occurrences) = expr.enumerate(&from, 6) else {
        return;
    };

    let target_weekday = match dow {
        0 => Weekday::Sunday,
        1 => Weekday::Monday,
        2 => Weekday::Tuesday,
        3 => Weekday::Wednesday,
        4 => Weekday::Thursday,
        5 => Weekday::Friday,
        _ => Weekday::Saturday,
    };

    for occ in &occurrences {
        let date = occ.date();
        let dom_matches = date.day() as u8 == dom;
        let dow_matches = date.weekday() == target_weekday;
        assert!(
            dom_matches || dow_matches,
            "{occ} satisfies neither DOM={dom} nor DOW={dow}"
        );
        assert!(expr.matches(occ).unwrap());
    }
});
