//! History command for listing recent events by day.

use std::fmt::Write as _;
use std::io::Write;
use std::sync::atomic::AtomicBool;

use anyhow::{Result, bail};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use pup_core::{Event, EventKind, EventType, FetchOutcome, fetch_history};
use pup_db::Database;

use crate::commands::util::{format_clock, format_minutes};

/// Size of one history fetch batch.
const BATCH_DAYS: i64 = 1;

pub fn run<W: Write, Tz: TimeZone>(
    writer: &mut W,
    db: &Database,
    days: u32,
    types: &[EventType],
    now: DateTime<Utc>,
    tz: &Tz,
) -> Result<()>
where
    Tz::Offset: std::fmt::Display,
{
    let requested = now
        .checked_sub_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    // Batches never reach back past the oldest stored event.
    let Some(earliest) = db.earliest_event_time()? else {
        write!(writer, "{}", format_history(&[], tz))?;
        return Ok(());
    };
    let range = requested.max(earliest)..now + Duration::seconds(1);
    // Nothing cancels a one-shot CLI fetch.
    let cancel = AtomicBool::new(false);

    match fetch_history(db, range, Duration::days(BATCH_DAYS), types, &cancel)? {
        FetchOutcome::Completed(events) => write!(writer, "{}", format_history(&events, tz))?,
        FetchOutcome::Cancelled => bail!("history fetch was cancelled"),
    }
    Ok(())
}

/// Formats events (newest first) grouped under their local date.
pub fn format_history<Tz: TimeZone>(events: &[Event], tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    if events.is_empty() {
        return "No events in this period.\n".to_string();
    }

    let mut output = String::new();
    let mut current_day: Option<NaiveDate> = None;

    for event in events {
        let day = event.timestamp.with_timezone(tz).date_naive();
        if current_day != Some(day) {
            if current_day.is_some() {
                writeln!(output).unwrap();
            }
            writeln!(output, "{}", day.format("%A, %b %-d")).unwrap();
            current_day = Some(day);
        }

        write!(
            output,
            "  {}  {:<12}",
            format_clock(event.timestamp, tz),
            event.event_type().as_str()
        )
        .unwrap();
        if let Some(detail) = detail(event) {
            write!(output, " {detail}").unwrap();
        }
        if let Some(note) = &event.note {
            write!(output, " \"{note}\"").unwrap();
        }
        writeln!(output, "  [{}]", event.id).unwrap();
    }

    output
}

fn detail(event: &Event) -> Option<String> {
    if let Some(location) = event.potty_location() {
        return Some(location.to_string());
    }
    match &event.kind {
        EventKind::Walk { .. } => event
            .walk_duration()
            .map(|d| format_minutes(d.num_minutes())),
        EventKind::Weight { .. } => event.weight_kg().map(|kg| format!("{kg:.1} kg")),
        EventKind::CoverageGap { .. } => event
            .coverage_end()
            .map(|end| format!("for {}", format_minutes((end - event.timestamp).num_minutes()))),
        _ => None,
    }
}
