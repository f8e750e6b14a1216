//! Access to the underlying event log.
//!
//! The engine never mutates the log itself; it only reads snapshots through
//! [`EventLog::get_events`]. Mutation is exposed so callers such as
//! [`crate::service::StatusService`] can record events and recompute.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::event::Event;
use crate::types::EventId;

/// A store of puppy events.
///
/// This trait allows the engine to work with different backends
/// (e.g., the SQLite store in pup-db, or the in-memory log for tests).
pub trait EventLog {
    /// Error type of the backing store.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Events with `from <= timestamp < to`. Ordering is not guaranteed.
    fn get_events(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Event>, Self::Error>;

    /// Appends a new event.
    fn add_event(&mut self, event: Event) -> Result<(), Self::Error>;

    /// Replaces the stored event that has the same ID.
    fn update_event(&mut self, event: Event) -> Result<(), Self::Error>;

    /// Removes the event with the given ID.
    fn delete_event(&mut self, id: &EventId) -> Result<(), Self::Error>;

    /// Every event in the log.
    fn all_events(&self) -> Result<Vec<Event>, Self::Error> {
        self.get_events(DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC)
    }
}

/// Errors from [`InMemoryEventLog`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventLogError {
    /// An event with this ID already exists.
    #[error("event already exists: {0}")]
    Duplicate(EventId),
    /// No event with this ID exists.
    #[error("event not found: {0}")]
    NotFound(EventId),
}

/// A vector-backed event log.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventLog {
    events: Vec<Event>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn position(&self, id: &EventId) -> Option<usize> {
        self.events.iter().position(|e| &e.id == id)
    }
}

impl From<Vec<Event>> for InMemoryEventLog {
    fn from(events: Vec<Event>) -> Self {
        Self { events }
    }
}

impl EventLog for InMemoryEventLog {
    type Error = EventLogError;

    fn get_events(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Event>, Self::Error> {
        Ok(self
            .events
            .iter()
            .filter(|e| e.timestamp >= from && e.timestamp < to)
            .cloned()
            .collect())
    }

    fn add_event(&mut self, event: Event) -> Result<(), Self::Error> {
        if self.position(&event.id).is_some() {
            return Err(EventLogError::Duplicate(event.id));
        }
        self.events.push(event);
        Ok(())
    }

    fn update_event(&mut self, event: Event) -> Result<(), Self::Error> {
        let index = self
            .position(&event.id)
            .ok_or_else(|| EventLogError::NotFound(event.id.clone()))?;
        self.events[index] = event;
        Ok(())
    }

    fn delete_event(&mut self, id: &EventId) -> Result<(), Self::Error> {
        let index = self
            .position(id)
            .ok_or_else(|| EventLogError::NotFound(id.clone()))?;
        self.events.remove(index);
        Ok(())
    }

    fn all_events(&self) -> Result<Vec<Event>, Self::Error> {
        Ok(self.events.clone())
    }
}
