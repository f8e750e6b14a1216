//! Patterns command for showing potty statistics over recent days.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use pup_core::{EventLog, PatternAnalysis, Trend, analyze_patterns};
use pup_db::Database;

pub fn run<W: Write>(writer: &mut W, db: &Database, days: u32, now: DateTime<Utc>) -> Result<()> {
    if days == 0 {
        bail!("--days must be at least 1");
    }
    let analysis = analyze_patterns(&db.all_events()?, days, now);
    write!(writer, "{}", format_patterns(&analysis))?;
    Ok(())
}

pub fn format_patterns(analysis: &PatternAnalysis) -> String {
    let mut output = String::new();
    writeln!(output, "PATTERNS: last {} days", analysis.period_days).unwrap();
    writeln!(output).unwrap();

    writeln!(
        output,
        "Potty breaks: {} ({} outdoor, {} indoor)",
        analysis.potty_count, analysis.outdoor_count, analysis.indoor_count
    )
    .unwrap();

    match analysis.success_percentage() {
        Some(pct) => {
            let trend = match analysis.trend {
                Trend::Improving => " (improving)",
                Trend::Declining => " (declining)",
                Trend::Stable => " (stable)",
                Trend::Unknown => "",
            };
            writeln!(output, "Outdoor success: {pct}%{trend}").unwrap();
        }
        None => writeln!(output, "Outdoor success: not enough data yet").unwrap(),
    }

    if !analysis.counts_by_type.is_empty() {
        writeln!(output).unwrap();
        writeln!(output, "By type:").unwrap();
        for (event_type, count) in &analysis.counts_by_type {
            writeln!(output, "  {:<12} {count}", event_type.as_str()).unwrap();
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use insta::assert_snapshot;
    use pup_core::{Event, EventId, EventKind, PottyLocation};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 20, 0, 0).unwrap()
    }

    fn seed(db: &mut Database, locations: &[PottyLocation]) {
        for (i, location) in locations.iter().enumerate() {
            let hours = i64::try_from(i).unwrap() + 1;
            db.add_event(Event::new(
                EventId::new(format!("p{i}")).unwrap(),
                now() - Duration::hours(hours),
                EventKind::pee(Some(*location)),
            ))
            .unwrap();
        }
        db.add_event(Event::new(
            EventId::new("m1").unwrap(),
            now() - Duration::hours(2),
            EventKind::Meal,
        ))
        .unwrap();
    }

    fn output(db: &Database) -> String {
        let mut output = Vec::new();
        run(&mut output, db, 7, now()).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn patterns_with_enough_data() {
        let mut db = Database::open_in_memory().unwrap();
        seed(
            &mut db,
            &[
                PottyLocation::Outdoor,
                PottyLocation::Outdoor,
                PottyLocation::Indoor,
                PottyLocation::Outdoor,
                PottyLocation::Outdoor,
            ],
        );

        assert_snapshot!(output(&db), @r"
        PATTERNS: last 7 days

        Potty breaks: 5 (4 outdoor, 1 indoor)
        Outdoor success: 80%

        By type:
          meal         1
          pee          5
        ");
    }

    #[test]
    fn patterns_hide_rate_with_little_data() {
        let mut db = Database::open_in_memory().unwrap();
        seed(&mut db, &[PottyLocation::Outdoor, PottyLocation::Outdoor]);

        assert_snapshot!(output(&db), @r"
        PATTERNS: last 7 days

        Potty breaks: 2 (2 outdoor, 0 indoor)
        Outdoor success: not enough data yet

        By type:
          meal         1
          pee          2
        ");
    }

    #[test]
    fn zero_days_rejected() {
        let db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();
        assert!(run(&mut output, &db, 0, now()).is_err());
    }
}
