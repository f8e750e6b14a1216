//! Dismiss-sleep command for hiding the assumed-sleep card.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use pup_db::Database;

use crate::Config;
use crate::commands::util::{close_service, open_service};

pub fn run<W: Write>(
    writer: &mut W,
    db: Database,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<()> {
    let mut service = open_service(db, config)?;
    service
        .dismiss_assumed_sleep(now)
        .context("failed to dismiss assumed sleep")?;
    close_service(service)?;

    writeln!(
        writer,
        "Assumed sleep dismissed until the next logged event."
    )?;
    Ok(())
}
