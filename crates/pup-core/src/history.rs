//! Cancellable history fetch.
//!
//! Long ranges are read in fixed-size time batches from newest to oldest so
//! a caller on another thread can abandon the fetch between batches.

use std::collections::HashSet;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::event::Event;
use crate::event_log::EventLog;
use crate::event_type::EventType;

/// Outcome of [`fetch_history`].
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Every batch was read. Events are newest first.
    Completed(Vec<Event>),
    /// The fetch was cancelled; partial results are discarded.
    Cancelled,
}

/// Reads `range` from the log in `batch`-sized windows, newest first.
///
/// Only events whose type is in `filter` are kept; an empty filter keeps
/// everything. `cancel` is checked before each batch. Events returned by
/// more than one batch are kept once.
pub fn fetch_history<L: EventLog>(
    log: &L,
    range: Range<DateTime<Utc>>,
    batch: Duration,
    filter: &[EventType],
    cancel: &AtomicBool,
) -> Result<FetchOutcome, L::Error> {
    let batch = if batch > Duration::zero() {
        batch
    } else {
        Duration::days(1)
    };

    let mut seen = HashSet::new();
    let mut events = Vec::new();
    let mut batch_end = range.end;
    let mut batches = 0_usize;

    while batch_end > range.start {
        if cancel.load(Ordering::Relaxed) {
            debug!(batches, "history fetch cancelled");
            return Ok(FetchOutcome::Cancelled);
        }

        let batch_start = (batch_end - batch).max(range.start);
        let mut chunk = log.get_events(batch_start, batch_end)?;
        chunk.retain(|e| filter.is_empty() || filter.contains(&e.event_type()));
        chunk.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));

        events.extend(chunk.into_iter().filter(|e| seen.insert(e.id.clone())));
        batch_end = batch_start;
        batches += 1;
    }

    debug!(batches, events = events.len(), "history fetch completed");
    Ok(FetchOutcome::Completed(events))
}
