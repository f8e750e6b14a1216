//! Events command for querying the local `SQLite` database.
//!
//! This module outputs events from the local database as JSONL for debugging.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use pup_core::EventLog;
use pup_db::Database;

use crate::commands::util::parse_optional_datetime;

/// Runs the events command, writing events as JSONL in time order.
pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    after: Option<&str>,
    before: Option<&str>,
    now: DateTime<Utc>,
) -> Result<()> {
    let after = parse_optional_datetime(after, "after", now)?.unwrap_or(DateTime::<Utc>::MIN_UTC);
    let before =
        parse_optional_datetime(before, "before", now)?.unwrap_or(DateTime::<Utc>::MAX_UTC);

    for event in db.get_events(after, before)? {
        writeln!(writer, "{}", serde_json::to_string(&event)?)?;
    }

    Ok(())
}
