//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use pup_core::StatusService;
use pup_db::Database;
use regex::Regex;

use crate::Config;

/// Pre-compiled regex for relative time parsing.
static RELATIVE_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(minute|hour|day|week)s?\s+ago$").unwrap());

/// Conservative bounds for relative time parsing (~1000 years in minutes).
const MAX_RELATIVE_MINUTES: i64 = 1000 * 365 * 24 * 60;

/// Parse a datetime string as either ISO 8601 or time relative to `now`.
///
/// Supports:
/// - ISO 8601: "2026-01-15T10:30:00Z"
/// - Relative: "2 hours ago", "30 minutes ago", "1 day ago", "1 week ago"
/// - "now"
pub fn parse_datetime(s: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if s == "now" {
        return Ok(now);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let Some(caps) = RELATIVE_TIME_RE.captures(s) else {
        anyhow::bail!(
            "Invalid datetime: {s}. Use ISO 8601 (e.g., 2026-01-15T10:30:00Z) or relative (e.g., '2 hours ago')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative time")?;

    let (max_for_unit, minutes_per_unit) = match &caps[2] {
        "minute" => (MAX_RELATIVE_MINUTES, 1),
        "hour" => (MAX_RELATIVE_MINUTES / 60, 60),
        "day" => (MAX_RELATIVE_MINUTES / (60 * 24), 60 * 24),
        "week" => (MAX_RELATIVE_MINUTES / (60 * 24 * 7), 60 * 24 * 7),
        unit => anyhow::bail!("Unknown time unit: {unit}"),
    };

    if n > max_for_unit {
        anyhow::bail!("Relative time value too large: {n} {}", &caps[2]);
    }

    Ok(now - Duration::minutes(n * minutes_per_unit))
}

/// Parses an optional `--flag` value with [`parse_datetime`].
pub fn parse_optional_datetime(
    s: Option<&str>,
    name: &str,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>> {
    s.map(|s| parse_datetime(s, now).with_context(|| format!("invalid --{name}")))
        .transpose()
}

/// Builds the status service over `db`, restoring the persisted engine state.
pub fn open_service(db: Database, config: &Config) -> Result<StatusService<Database>> {
    let wake_state = db
        .load_wake_state()
        .context("failed to load wake-time potty state")?;
    let dismissed = db
        .load_assumed_sleep_dismissal()
        .context("failed to load assumed-sleep dismissal")?;

    Ok(StatusService::new(db, config.engine())
        .with_wake_state(wake_state)
        .with_assumed_sleep_dismissal(dismissed))
}

/// Writes the service's engine state back and returns the database.
pub fn close_service(service: StatusService<Database>) -> Result<Database> {
    let wake_state = service.wake_state().cloned();
    let dismissed = service.dismissed_assumed_sleep_at();

    let mut db = service.into_log();
    db.save_wake_state(wake_state.as_ref())
        .context("failed to save wake-time potty state")?;
    db.save_assumed_sleep_dismissal(dismissed)
        .context("failed to save assumed-sleep dismissal")?;
    Ok(db)
}

/// Formats minutes as "45m" or "2h 05m". Negative values get a leading minus.
pub fn format_minutes(minutes: i64) -> String {
    let sign = if minutes < 0 { "-" } else { "" };
    let minutes = minutes.unsigned_abs();
    let (hours, rest) = (minutes / 60, minutes % 60);
    if hours == 0 {
        format!("{sign}{rest}m")
    } else {
        format!("{sign}{hours}h {rest:02}m")
    }
}

/// Formats an instant as a wall-clock time in `tz`.
pub fn format_clock<Tz: TimeZone>(instant: DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    instant.with_timezone(tz).format("%H:%M").to_string()
}
