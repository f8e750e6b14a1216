//! Log command for recording a puppy event.

use std::io::Write;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, TimeZone, Utc};
use pup_core::{Event, EventId, EventKind, EventType, PottyDetails, SessionLink, StatusCard};
use pup_db::Database;

use crate::cli::LogArgs;
use crate::commands::util::{
    close_service, format_clock, format_minutes, open_service, parse_optional_datetime,
};
use crate::Config;

const POTTY: &[EventType] = &[EventType::Pee, EventType::Poop];
const SLEEP_WAKE: &[EventType] = &[EventType::Sleep, EventType::Wake];

/// Builds the event described by `args`, timestamped `--at` or `now`.
pub fn build_event(args: &LogArgs, now: DateTime<Utc>) -> Result<Event> {
    let event_type = args.event_type;
    let timestamp = parse_optional_datetime(args.at.as_deref(), "at", now)?.unwrap_or(now);

    reject_flag(args.location.is_some(), "location", event_type, POTTY)?;
    reject_flag(args.walk.is_some(), "walk", event_type, POTTY)?;
    reject_flag(args.duration.is_some(), "duration", event_type, &[EventType::Walk])?;
    reject_flag(args.link.is_some(), "link", event_type, SLEEP_WAKE)?;
    reject_flag(args.weight.is_some(), "weight", event_type, &[EventType::Weight])?;
    reject_flag(args.until.is_some(), "until", event_type, &[EventType::CoverageGap])?;

    let link = args.link.as_deref().map(SessionLink::new).transpose()?;

    let kind = match event_type {
        EventType::Pee | EventType::Poop => {
            let Some(location) = args.location else {
                bail!("{event_type} needs --location (indoor or outdoor)");
            };
            let mut details = PottyDetails::new(Some(location));
            if let Some(walk) = args.walk.as_deref() {
                details = details.on_walk(EventId::new(walk)?);
            }
            if event_type == EventType::Pee {
                EventKind::Pee(details)
            } else {
                EventKind::Poop(details)
            }
        }
        EventType::Sleep => EventKind::sleep(link),
        EventType::Wake => EventKind::Wake { link },
        EventType::Walk => {
            if args.duration.is_some_and(|d| d <= 0) {
                bail!("--duration must be a positive number of minutes");
            }
            EventKind::Walk {
                duration_minutes: args.duration,
            }
        }
        EventType::Weight => {
            let Some(kg) = args.weight.filter(|kg| kg.is_finite() && *kg > 0.0) else {
                bail!("weight needs a positive --weight in kilograms");
            };
            EventKind::Weight {
                weight_kg: Some(kg),
            }
        }
        EventType::CoverageGap => {
            let end = parse_optional_datetime(args.until.as_deref(), "until", now)?;
            if end.is_some_and(|end| end < timestamp) {
                bail!("--until must not be before the gap start");
            }
            EventKind::CoverageGap { end }
        }
        other => EventKind::bare(other).with_context(|| format!("cannot log {other}"))?,
    };

    let mut event = Event::create(timestamp, kind);
    if let Some(note) = args.note.as_deref().filter(|n| !n.trim().is_empty()) {
        event = event.with_note(note);
    }
    Ok(event)
}

fn reject_flag(
    present: bool,
    flag: &str,
    event_type: EventType,
    allowed: &[EventType],
) -> Result<()> {
    if present && !allowed.contains(&event_type) {
        bail!("--{flag} does not apply to {event_type}");
    }
    Ok(())
}

/// Logs the event and prints what was stored.
pub fn run<W: Write, Tz: TimeZone>(
    writer: &mut W,
    db: Database,
    config: &Config,
    args: &LogArgs,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Result<()>
where
    Tz::Offset: std::fmt::Display,
{
    let event = build_event(args, now)?;

    if let Some(walk_id) = event.parent_walk() {
        let walk = db.get_event(walk_id)?;
        if !walk.is_some_and(|w| w.event_type() == EventType::Walk) {
            bail!("walk not found: {walk_id}");
        }
    }

    let mut service = open_service(db, config)?;
    let stored = service
        .add_event(event, now)
        .context("failed to store event")?;

    let post_wake = service.status().and_then(|s| match s.combined.primary() {
        Some(StatusCard::PostWakePotty { snapshot, .. }) => Some(snapshot.prediction.clone()),
        _ => None,
    });
    close_service(service)?;

    let mut line = format!(
        "Logged {} at {}",
        stored.event_type(),
        format_clock(stored.timestamp, tz)
    );
    if let Some(location) = stored.potty_location() {
        line.push_str(&format!(" ({location})"));
    }
    if let Some(link) = stored.session_link() {
        line.push_str(&format!(" [session {link}]"));
    }
    writeln!(writer, "{line}")?;
    writeln!(writer, "id: {}", stored.id)?;

    if let Some(prediction) = post_wake {
        match prediction.minutes_since_last {
            Some(since) => writeln!(
                writer,
                "Just woke up: potty {} (last one {} ago)",
                prediction.urgency,
                format_minutes(since)
            )?,
            None => writeln!(writer, "Just woke up: take the puppy out")?,
        }
    }

    Ok(())
}
