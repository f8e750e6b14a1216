//! Status command for showing the current status cards.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use pup_core::{PottyPrediction, PottyTrigger, StatusCard, StatusSnapshot};
use pup_db::Database;

use crate::Config;
use crate::commands::util::{close_service, format_clock, format_minutes, open_service};

pub fn run<W: Write, Tz: TimeZone>(
    writer: &mut W,
    db: Database,
    config: &Config,
    json: bool,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Result<()>
where
    Tz::Offset: std::fmt::Display,
{
    let mut service = open_service(db, config)?;
    service
        .refresh(now, true)
        .context("failed to compute status")?;
    let snapshot = service
        .status()
        .cloned()
        .context("status was not computed")?;
    close_service(service)?;

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&snapshot)?)?;
    } else {
        write!(writer, "{}", format_status(&snapshot, tz))?;
    }
    Ok(())
}

/// Formats the status cards, most important first.
pub fn format_status<Tz: TimeZone>(snapshot: &StatusSnapshot, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut output = String::new();
    writeln!(output, "Status at {}", format_clock(snapshot.computed_at, tz)).unwrap();
    writeln!(output).unwrap();

    for card in &snapshot.combined.cards {
        let line = match card {
            StatusCard::Sleeping { since, minutes } => format!(
                "Sleeping since {} ({})",
                format_clock(*since, tz),
                format_minutes(*minutes)
            ),
            StatusCard::AssumedSleep { last_activity } => format!(
                "Probably asleep: nothing logged since {} (pup dismiss-sleep to hide)",
                format_clock(*last_activity, tz)
            ),
            StatusCard::Awake { since, minutes } => format!(
                "Awake since {} ({})",
                format_clock(*since, tz),
                format_minutes(*minutes)
            ),
            StatusCard::NapNeeded { awake_minutes } => {
                format!("Nap time: awake for {}", format_minutes(*awake_minutes))
            }
            StatusCard::Potty { prediction } => format!("Potty: {}", describe(prediction)),
            StatusCard::PostWakePotty {
                snapshot,
                minutes_since_wake,
            } => format!(
                "Just woke up {} ago, go out now: {}",
                format_minutes(*minutes_since_wake),
                describe(&snapshot.prediction)
            ),
        };
        writeln!(output, "{line}").unwrap();
    }

    let streak = snapshot.streak;
    writeln!(output).unwrap();
    writeln!(
        output,
        "Streak: {} outdoor in a row (best {})",
        streak.current_streak, streak.best_streak
    )
    .unwrap();

    output
}

fn describe(prediction: &PottyPrediction) -> String {
    let (Some(since), Some(remaining)) =
        (prediction.minutes_since_last, prediction.minutes_remaining)
    else {
        return "no potty logged yet".to_string();
    };

    let mut text = format!("{} - last {} ago, ", prediction.urgency, format_minutes(since));
    if remaining < 0 {
        write!(text, "overdue by {}", format_minutes(-remaining)).unwrap();
    } else {
        write!(text, "next in {}", format_minutes(remaining)).unwrap();
    }

    match prediction.trigger {
        PottyTrigger::PostMeal => text.push_str(" (after meal)"),
        PottyTrigger::PostSleep => text.push_str(" (after nap)"),
        PottyTrigger::None => {}
    }
    if prediction.last_was_indoor {
        text.push_str(" - last one was indoors");
    }
    text
}
