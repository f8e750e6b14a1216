//! Timeline command for showing one day of activity.
//!
//! Sleep and walks are shown as ranges, potty breaks and meals as single
//! times. Anything not covered is awake time.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use pup_core::{
    ActivityBlock, ActivityBlockSummary, DayWindow, EventLog, generate_blocks, generate_summary,
    timeline_bounds,
};
use pup_db::Database;
use serde::Serialize;

use crate::Config;
use crate::commands::util::{format_clock, format_minutes};

/// Computed timeline for one day.
#[derive(Debug, Serialize)]
pub struct TimelineData {
    pub date: NaiveDate,
    pub timezone: String,
    /// Visible range, snapped to whole hours.
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub blocks: Vec<ActivityBlock>,
    pub summary: ActivityBlockSummary,
}

/// Builds the timeline of `date` in `tz` from the database.
pub fn generate_timeline_data<Tz: TimeZone>(
    db: &Database,
    config: &Config,
    date: NaiveDate,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Result<TimelineData> {
    let window = DayWindow::for_date(date, tz);
    // Read up to now so sessions closed after the day ends are paired.
    let events = db.get_events(window.start, window.end.max(now))?;
    let previous_day = db.get_events(window.start - Duration::days(1), window.start)?;

    let blocks = generate_blocks(&events, &window, &previous_day, &config.timeline, now);
    let summary = generate_summary(&blocks);
    let (start, end) = timeline_bounds(&blocks, &window, now);
    let timezone = iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string());

    Ok(TimelineData {
        date,
        timezone,
        start,
        end,
        blocks,
        summary,
    })
}

pub fn run<W: Write, Tz: TimeZone>(
    writer: &mut W,
    db: &Database,
    config: &Config,
    date: Option<NaiveDate>,
    json: bool,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Result<()>
where
    Tz::Offset: std::fmt::Display,
{
    let date = date.unwrap_or_else(|| now.with_timezone(tz).date_naive());
    let data = generate_timeline_data(db, config, date, now, tz)?;

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&data)?)?;
    } else {
        write!(writer, "{}", format_timeline(&data, tz))?;
    }
    Ok(())
}

/// Formats the human-readable timeline.
pub fn format_timeline<Tz: TimeZone>(data: &TimelineData, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut output = String::new();
    writeln!(
        output,
        "TIMELINE: {} ({})",
        data.date.format("%A, %b %-d, %Y"),
        data.timezone
    )
    .unwrap();
    writeln!(
        output,
        "{} - {}",
        format_clock(data.start, tz),
        format_clock(data.end, tz)
    )
    .unwrap();
    writeln!(output).unwrap();

    if data.blocks.is_empty() {
        writeln!(output, "Nothing logged this day.").unwrap();
        return output;
    }

    for block in &data.blocks {
        let line = match block {
            ActivityBlock::Sleep {
                start,
                end,
                ongoing,
                ..
            } => format!(
                "{}  sleep {}{}",
                range(*start, *end, *ongoing, tz),
                format_minutes(block.minutes()),
                if *ongoing { " (ongoing)" } else { "" }
            ),
            ActivityBlock::Walk {
                start,
                end,
                ongoing,
                potty_count,
                ..
            } => format!(
                "{}  walk {}{}",
                range(*start, *end, *ongoing, tz),
                format_minutes(block.minutes()),
                match potty_count {
                    0 => String::new(),
                    1 => " (1 potty)".to_string(),
                    n => format!(" ({n} potties)"),
                }
            ),
            ActivityBlock::Potty {
                at,
                event_type,
                location,
                during_walk,
            } => format!(
                "{:<13}  {event_type} {location}{}",
                format_clock(*at, tz),
                if *during_walk { " (on walk)" } else { "" }
            ),
            ActivityBlock::Meal { at } => format!("{:<13}  meal", format_clock(*at, tz)),
        };
        writeln!(output, "{line}").unwrap();
    }

    let s = &data.summary;
    writeln!(output).unwrap();
    writeln!(
        output,
        "Sleep {} | Walks {} ({}) | Potty {} outdoor / {} indoor | Meals {}",
        format_minutes(s.total_sleep_minutes),
        s.walk_count,
        format_minutes(s.total_walk_minutes),
        s.outdoor_potty_count,
        s.indoor_potty_count,
        s.meal_count
    )
    .unwrap();

    output
}

fn range<Tz: TimeZone>(start: DateTime<Utc>, end: DateTime<Utc>, ongoing: bool, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let end = if ongoing {
        "now".to_string()
    } else {
        format_clock(end, tz)
    };
    format!("{} - {end:<5}", format_clock(start, tz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use pup_core::{Event, EventId, EventKind, EventType, PottyLocation, SessionLink};

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, day, hour, minute, 0).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    fn sample_data() -> TimelineData {
        let blocks = vec![
            ActivityBlock::Sleep {
                start: at(15, 0, 0),
                end: at(15, 7, 0),
                ongoing: false,
                session: SessionLink::new("night").unwrap(),
            },
            ActivityBlock::Potty {
                at: at(15, 7, 5),
                event_type: EventType::Pee,
                location: PottyLocation::Outdoor,
                during_walk: false,
            },
            ActivityBlock::Meal { at: at(15, 7, 20) },
            ActivityBlock::Walk {
                start: at(15, 8, 0),
                end: at(15, 8, 25),
                ongoing: false,
                walk: EventId::new("walk-1").unwrap(),
                potty_count: 1,
            },
            ActivityBlock::Potty {
                at: at(15, 8, 10),
                event_type: EventType::Poop,
                location: PottyLocation::Outdoor,
                during_walk: true,
            },
            ActivityBlock::Sleep {
                start: at(15, 10, 0),
                end: at(15, 10, 40),
                ongoing: true,
                session: SessionLink::new("nap").unwrap(),
            },
        ];
        let summary = generate_summary(&blocks);
        TimelineData {
            date: date(),
            timezone: "UTC".to_string(),
            start: at(15, 0, 0),
            end: at(15, 11, 0),
            blocks,
            summary,
        }
    }

    #[test]
    fn timeline_text_output() {
        assert_snapshot!(format_timeline(&sample_data(), &Utc), @r"
        TIMELINE: Wednesday, Jan 15, 2025 (UTC)
        00:00 - 11:00

        00:00 - 07:00  sleep 7h 00m
        07:05          pee outdoor
        07:20          meal
        08:00 - 08:25  walk 25m (1 potty)
        08:10          poop outdoor (on walk)
        10:00 - now    sleep 40m (ongoing)

        Sleep 7h 40m | Walks 1 (25m) | Potty 2 outdoor / 0 indoor | Meals 1
        ");
    }

    #[test]
    fn timeline_empty_day() {
        let data = TimelineData {
            date: date(),
            timezone: "UTC".to_string(),
            start: at(15, 0, 0),
            end: at(16, 0, 0),
            blocks: Vec::new(),
            summary: ActivityBlockSummary::default(),
        };

        assert_snapshot!(format_timeline(&data, &Utc), @r"
        TIMELINE: Wednesday, Jan 15, 2025 (UTC)
        00:00 - 00:00

        Nothing logged this day.
        ");
    }

    #[test]
    fn timeline_includes_sleep_from_previous_day() {
        let temp = tempfile::tempdir().unwrap();
        let mut db = Database::open(&temp.path().join("pup.db")).unwrap();
        let link = SessionLink::new("night").unwrap();
        db.add_event(Event::new(
            EventId::new("s1").unwrap(),
            at(14, 23, 0),
            EventKind::sleep(Some(link.clone())),
        ))
        .unwrap();
        db.add_event(Event::new(
            EventId::new("w1").unwrap(),
            at(15, 7, 0),
            EventKind::Wake { link: Some(link) },
        ))
        .unwrap();

        let data =
            generate_timeline_data(&db, &Config::default(), date(), at(15, 12, 0), &Utc).unwrap();

        assert_eq!(data.blocks.len(), 1);
        assert_eq!(data.blocks[0].start(), at(15, 0, 0));
        assert_eq!(data.summary.total_sleep_minutes, 7 * 60);
        assert_eq!(data.start, at(15, 0, 0));
        assert_eq!(data.end, at(15, 12, 0));
    }

    #[test]
    fn past_day_sleep_closed_next_morning() {
        let temp = tempfile::tempdir().unwrap();
        let mut db = Database::open(&temp.path().join("pup.db")).unwrap();
        let link = SessionLink::new("night").unwrap();
        db.add_event(Event::new(
            EventId::new("s1").unwrap(),
            at(14, 22, 0),
            EventKind::sleep(Some(link.clone())),
        ))
        .unwrap();
        db.add_event(Event::new(
            EventId::new("w1").unwrap(),
            at(15, 6, 0),
            EventKind::Wake { link: Some(link) },
        ))
        .unwrap();

        let day = NaiveDate::from_ymd_opt(2025, 1, 14).unwrap();
        let mut data =
            generate_timeline_data(&db, &Config::default(), day, at(15, 12, 0), &Utc).unwrap();
        data.timezone = "UTC".to_string();

        assert_snapshot!(format_timeline(&data, &Utc), @r"
        TIMELINE: Tuesday, Jan 14, 2025 (UTC)
        22:00 - 00:00

        22:00 - 00:00  sleep 2h 00m

        Sleep 2h 00m | Walks 0 (0m) | Potty 0 outdoor / 0 indoor | Meals 0
        ");
    }
}
