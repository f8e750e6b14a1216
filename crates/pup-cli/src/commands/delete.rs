//! Delete command for removing a logged event.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use pup_core::EventId;
use pup_db::Database;

use crate::Config;
use crate::commands::util::{close_service, open_service};

pub fn run<W: Write>(
    writer: &mut W,
    db: Database,
    config: &Config,
    id: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    let id = EventId::new(id)?;

    let mut service = open_service(db, config)?;
    service
        .delete_event(&id, now)
        .with_context(|| format!("failed to delete {id}"))?;
    close_service(service)?;

    writeln!(writer, "Deleted {id}")?;
    Ok(())
}
