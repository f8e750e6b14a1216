//! Storage layer for the puppy log.
//!
//! Provides persistence for events and engine state using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` can be moved between threads but not shared without a `Mutex`.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 format with a fixed nine-digit
//! fraction (e.g., `2025-01-15T10:30:00.000000000Z`), so lexicographic ordering
//! matches chronological ordering and stored instants compare equal to the
//! in-memory values they came from.
//!
//! ## Event Payload Storage
//!
//! The `type` column stores the event type (e.g., `pee`, `sleep`) and the
//! `data` column stores the remaining type-specific fields as JSON. The `id`,
//! `timestamp` and `modified_at` columns are authoritative; the payload never
//! repeats them.
//!
//! ## State
//!
//! The `state` table is a small key/value store for values the status engine
//! keeps between runs: the wake-time potty snapshot and the time the
//! assumed-sleep card was last dismissed.

use std::path::Path;

use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use pup_core::{Event, EventId, EventLog, WakeTimePottyState};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

const WAKE_STATE_KEY: &str = "wake_time_potty_state";
const ASSUMED_SLEEP_DISMISSED_KEY: &str = "assumed_sleep_dismissed_at";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to encode a value as JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// Failed to parse an event timestamp.
    #[error("invalid timestamp for event {event_id}: {timestamp}")]
    TimestampParse {
        event_id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// Failed to parse event payload JSON.
    #[error("invalid event data for {event_id}: {message}")]
    InvalidEventData { event_id: String, message: String },
    /// An event with this ID already exists.
    #[error("event already exists: {0}")]
    Duplicate(EventId),
    /// No event with this ID exists.
    #[error("event not found: {0}")]
    NotFound(EventId),
    /// A stored state value could not be read back.
    #[error("invalid state value for {key}: {message}")]
    InvalidState { key: String, message: String },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- Events table: one row per logged puppy event
            -- timestamp: RFC 3339 with nanoseconds (e.g., '2025-01-15T10:30:00.000000000Z')
            -- type: event type (e.g., 'pee')
            -- data: JSON payload with the type-specific fields
            CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                timestamp TEXT NOT NULL,
                type TEXT NOT NULL,
                data TEXT NOT NULL,
                modified_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp);
            CREATE INDEX IF NOT EXISTS idx_events_type ON events(type);

            CREATE TABLE IF NOT EXISTS state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Looks up a single event by ID.
    pub fn get_event(&self, id: &EventId) -> Result<Option<Event>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, timestamp, type, data, modified_at
            FROM events
            WHERE id = ?
            ",
        )?;
        let record = stmt
            .query_row([id.as_str()], EventRow::from_row)
            .optional()?;
        record.map(EventRow::into_event).transpose()
    }

    /// Number of stored events.
    pub fn event_count(&self) -> Result<usize, DbError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Timestamp of the oldest stored event.
    pub fn earliest_event_time(&self) -> Result<Option<DateTime<Utc>>, DbError> {
        let earliest: Option<String> = self
            .conn
            .query_row("SELECT MIN(timestamp) FROM events", [], |row| row.get(0))?;
        earliest
            .map(|timestamp| parse_timestamp(&timestamp, "<earliest>"))
            .transpose()
    }

    /// Loads the persisted wake-time potty snapshot.
    pub fn load_wake_state(&self) -> Result<Option<WakeTimePottyState>, DbError> {
        self.get_state(WAKE_STATE_KEY)
    }

    /// Persists the wake-time potty snapshot; `None` removes it.
    pub fn save_wake_state(&mut self, state: Option<&WakeTimePottyState>) -> Result<(), DbError> {
        self.set_state(WAKE_STATE_KEY, state)
    }

    /// Loads the last time the assumed-sleep card was dismissed.
    pub fn load_assumed_sleep_dismissal(&self) -> Result<Option<DateTime<Utc>>, DbError> {
        self.get_state(ASSUMED_SLEEP_DISMISSED_KEY)
    }

    /// Persists the assumed-sleep dismissal time; `None` removes it.
    pub fn save_assumed_sleep_dismissal(
        &mut self,
        at: Option<DateTime<Utc>>,
    ) -> Result<(), DbError> {
        self.set_state(ASSUMED_SLEEP_DISMISSED_KEY, at.as_ref())
    }

    fn get_state<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, DbError> {
        let value: Option<String> = self
            .conn
            .query_row("SELECT value FROM state WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?;

        value
            .map(|value| {
                serde_json::from_str(&value).map_err(|err| DbError::InvalidState {
                    key: key.to_string(),
                    message: err.to_string(),
                })
            })
            .transpose()
    }

    fn set_state<T: Serialize>(&mut self, key: &str, value: Option<&T>) -> Result<(), DbError> {
        match value {
            Some(value) => {
                let json = serde_json::to_string(value)?;
                self.conn.execute(
                    "
                    INSERT INTO state (key, value, updated_at) VALUES (?, ?, ?)
                    ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                    ",
                    params![key, json, format_timestamp(Utc::now())],
                )?;
            }
            None => {
                self.conn
                    .execute("DELETE FROM state WHERE key = ?", [key])?;
            }
        }
        debug!(key, cleared = value.is_none(), "saved state");
        Ok(())
    }

    fn query_events(&self, sql: &str, args: &[&str]) -> Result<Vec<Event>, DbError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(args), EventRow::from_row)?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?.into_event()?);
        }
        Ok(events)
    }
}

impl EventLog for Database {
    type Error = DbError;

    /// Events within a time range.
    ///
    /// The range is inclusive of `from` and exclusive of `to`.
    fn get_events(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Event>, DbError> {
        if to <= from {
            return Ok(Vec::new());
        }
        let from = range_bound(from);
        let to = range_bound(to);
        self.query_events(
            "
            SELECT id, timestamp, type, data, modified_at
            FROM events
            WHERE timestamp >= ? AND timestamp < ?
            ORDER BY timestamp ASC, id ASC
            ",
            &[from.as_str(), to.as_str()],
        )
    }

    fn add_event(&mut self, event: Event) -> Result<(), DbError> {
        let record = EventRow::from_event(&event)?;
        let inserted = self.conn.execute(
            "
            INSERT OR IGNORE INTO events (id, timestamp, type, data, modified_at)
            VALUES (?, ?, ?, ?, ?)
            ",
            params![
                record.id,
                record.timestamp,
                record.kind,
                record.data,
                record.modified_at
            ],
        )?;
        if inserted == 0 {
            return Err(DbError::Duplicate(event.id));
        }
        debug!(id = %event.id, kind = %record.kind, "stored event");
        Ok(())
    }

    fn update_event(&mut self, event: Event) -> Result<(), DbError> {
        let record = EventRow::from_event(&event)?;
        let updated = self.conn.execute(
            "
            UPDATE events SET timestamp = ?, type = ?, data = ?, modified_at = ?
            WHERE id = ?
            ",
            params![
                record.timestamp,
                record.kind,
                record.data,
                record.modified_at,
                record.id
            ],
        )?;
        if updated == 0 {
            return Err(DbError::NotFound(event.id));
        }
        Ok(())
    }

    fn delete_event(&mut self, id: &EventId) -> Result<(), DbError> {
        let deleted = self
            .conn
            .execute("DELETE FROM events WHERE id = ?", [id.as_str()])?;
        if deleted == 0 {
            return Err(DbError::NotFound(id.clone()));
        }
        Ok(())
    }

    fn all_events(&self) -> Result<Vec<Event>, DbError> {
        self.query_events(
            "
            SELECT id, timestamp, type, data, modified_at
            FROM events
            ORDER BY timestamp ASC, id ASC
            ",
            &[],
        )
    }
}

/// An event as stored in one row of the `events` table.
struct EventRow {
    id: String,
    timestamp: String,
    kind: String,
    data: String,
    modified_at: Option<String>,
}

impl EventRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            kind: row.get(2)?,
            data: row.get(3)?,
            modified_at: row.get(4)?,
        })
    }

    fn from_event(event: &Event) -> Result<Self, DbError> {
        let Value::Object(mut payload) = serde_json::to_value(event)? else {
            return Err(DbError::InvalidEventData {
                event_id: event.id.to_string(),
                message: "event did not serialize to an object".to_string(),
            });
        };
        for column in ["id", "timestamp", "type", "modified_at"] {
            payload.remove(column);
        }

        Ok(Self {
            id: event.id.to_string(),
            timestamp: format_timestamp(event.timestamp),
            kind: event.event_type().to_string(),
            data: Value::Object(payload).to_string(),
            modified_at: event.modified_at.map(format_timestamp),
        })
    }

    fn into_event(self) -> Result<Event, DbError> {
        let timestamp = parse_timestamp(&self.timestamp, &self.id)?;
        let modified_at = self
            .modified_at
            .as_deref()
            .map(|m| parse_timestamp(m, &self.id))
            .transpose()?;

        let mut payload: Map<String, Value> =
            serde_json::from_str(&self.data).map_err(|err| DbError::InvalidEventData {
                event_id: self.id.clone(),
                message: err.to_string(),
            })?;
        payload.insert("id".to_string(), Value::String(self.id.clone()));
        payload.insert("timestamp".to_string(), serde_json::to_value(timestamp)?);
        payload.insert("type".to_string(), Value::String(self.kind));
        if let Some(modified_at) = modified_at {
            payload.insert("modified_at".to_string(), serde_json::to_value(modified_at)?);
        }

        serde_json::from_value(Value::Object(payload)).map_err(|err| DbError::InvalidEventData {
            event_id: self.id,
            message: err.to_string(),
        })
    }
}

fn parse_timestamp(timestamp: &str, event_id: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            event_id: event_id.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Formats a query bound, mapping instants outside four-digit years to
/// strings that sort before or after every stored timestamp.
fn range_bound(timestamp: DateTime<Utc>) -> String {
    match timestamp.year() {
        year if year < 0 => String::new(),
        year if year > 9999 => "~".to_string(),
        _ => format_timestamp(timestamp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pup_core::{
        EventKind, PottyDetails, PottyLocation, PredictionConfig, SessionLink, calculate_prediction,
        capture_wake_time_potty_state,
    };

    fn ts(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn event(id: &str, minutes: i64, kind: EventKind) -> Event {
        Event::new(EventId::new(id).unwrap(), ts(minutes), kind)
    }

    fn ids(events: &[Event]) -> Vec<&str> {
        events.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn open_in_memory_database() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn schema_matches_data_model() {
        let db = Database::open_in_memory().expect("open in-memory db");

        assert_eq!(
            table_columns(&db.conn, "events"),
            vec!["id", "timestamp", "type", "data", "modified_at"]
        );
        assert_eq!(
            table_columns(&db.conn, "state"),
            vec!["key", "value", "updated_at"]
        );
    }

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .expect("prepare table_info");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query table_info");
        rows.map(|row| row.expect("table_info row")).collect()
    }

    #[test]
    fn events_roundtrip_through_storage() {
        let mut db = Database::open_in_memory().unwrap();
        let walk = event(
            "walk",
            0,
            EventKind::Walk {
                duration_minutes: Some(25),
            },
        );
        let pee = event(
            "pee",
            10,
            EventKind::Pee(
                PottyDetails::new(Some(PottyLocation::Outdoor))
                    .on_walk(EventId::new("walk").unwrap()),
            ),
        )
        .with_note("by the big tree")
        .modified(ts(20));
        let sleep = event("sleep", 30, EventKind::sleep(Some(SessionLink::new("nap").unwrap())));

        for e in [walk.clone(), pee.clone(), sleep.clone()] {
            db.add_event(e).unwrap();
        }

        assert_eq!(db.all_events().unwrap(), vec![walk, pee.clone(), sleep]);
        assert_eq!(db.get_event(&pee.id).unwrap(), Some(pee));
        assert_eq!(db.event_count().unwrap(), 3);
    }

    #[test]
    fn payload_does_not_repeat_columns() {
        let mut db = Database::open_in_memory().unwrap();
        db.add_event(event("m1", 0, EventKind::Meal).with_note("kibble"))
            .unwrap();

        let (kind, data): (String, String) = db
            .conn
            .query_row("SELECT type, data FROM events WHERE id = 'm1'", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(kind, "meal");
        assert_eq!(data, r#"{"note":"kibble"}"#);
    }

    #[test]
    fn get_events_is_half_open_and_sorted() {
        let mut db = Database::open_in_memory().unwrap();
        for (id, minutes) in [("c", 60), ("a", 0), ("b", 30)] {
            db.add_event(event(id, minutes, EventKind::Meal)).unwrap();
        }

        assert_eq!(ids(&db.get_events(ts(0), ts(60)).unwrap()), vec!["a", "b"]);
        assert!(db.get_events(ts(60), ts(0)).unwrap().is_empty());
        assert_eq!(
            ids(&db
                .get_events(DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC)
                .unwrap()),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let mut db = Database::open_in_memory().unwrap();
        db.add_event(event("m1", 0, EventKind::Meal)).unwrap();

        let err = db.add_event(event("m1", 5, EventKind::Meal)).unwrap_err();
        assert!(matches!(err, DbError::Duplicate(id) if id.as_str() == "m1"));
    }

    #[test]
    fn update_and_delete() {
        let mut db = Database::open_in_memory().unwrap();
        db.add_event(event("m1", 0, EventKind::Meal)).unwrap();

        let edited = event("m1", 15, EventKind::Meal).modified(ts(20));
        db.update_event(edited.clone()).unwrap();
        assert_eq!(db.all_events().unwrap(), vec![edited]);

        db.delete_event(&EventId::new("m1").unwrap()).unwrap();
        assert_eq!(db.event_count().unwrap(), 0);

        let missing = EventId::new("m1").unwrap();
        assert!(matches!(
            db.delete_event(&missing),
            Err(DbError::NotFound(_))
        ));
        assert!(matches!(
            db.update_event(event("m1", 0, EventKind::Meal)),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn sub_millisecond_timestamps_roundtrip_exactly() {
        let mut db = Database::open_in_memory().unwrap();
        let at = ts(0) + Duration::nanoseconds(123_456_789);
        let meal = Event::new(EventId::new("m1").unwrap(), at, EventKind::Meal);
        db.add_event(meal.clone()).unwrap();

        assert_eq!(db.get_event(&meal.id).unwrap(), Some(meal));
        assert_eq!(db.get_events(at, at + Duration::nanoseconds(1)).unwrap().len(), 1);
        assert!(db.get_events(at - Duration::nanoseconds(1), at).unwrap().is_empty());
    }

    #[test]
    fn earliest_event_time() {
        let mut db = Database::open_in_memory().unwrap();
        assert_eq!(db.earliest_event_time().unwrap(), None);

        db.add_event(event("m2", 30, EventKind::Meal)).unwrap();
        db.add_event(event("m1", -30, EventKind::Meal)).unwrap();
        assert_eq!(db.earliest_event_time().unwrap(), Some(ts(-30)));
    }

    #[test]
    fn malformed_rows_are_reported() {
        let db = Database::open_in_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO events (id, timestamp, type, data) VALUES (?, ?, ?, ?)",
                params!["bad-json", "2025-01-15T09:00:00.000000000Z", "meal", "{not json"],
            )
            .unwrap();

        let err = db.all_events().unwrap_err();
        assert!(matches!(err, DbError::InvalidEventData { event_id, .. } if event_id == "bad-json"));

        db.conn.execute("DELETE FROM events", []).unwrap();
        db.conn
            .execute(
                "INSERT INTO events (id, timestamp, type, data) VALUES (?, ?, ?, ?)",
                params!["bad-ts", "yesterday", "meal", "{}"],
            )
            .unwrap();
        assert!(matches!(
            db.all_events().unwrap_err(),
            DbError::TimestampParse { .. }
        ));
    }

    #[test]
    fn unreadable_potty_location_still_loads() {
        let db = Database::open_in_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO events (id, timestamp, type, data) VALUES (?, ?, ?, ?)",
                params!["p1", "2025-01-15T09:00:00.000000000Z", "pee", r#"{"location":"balcony"}"#],
            )
            .unwrap();

        let events = db.all_events().unwrap();
        assert_eq!(events[0].potty_location(), Some(PottyLocation::Unknown));
    }

    #[test]
    fn wake_state_roundtrip_and_clear() {
        let mut db = Database::open_in_memory().unwrap();
        assert_eq!(db.load_wake_state().unwrap(), None);

        let snapshot = capture_wake_time_potty_state(
            calculate_prediction(
                &[event("p1", -100, EventKind::pee(Some(PottyLocation::Outdoor)))],
                &PredictionConfig::default(),
                ts(0),
            ),
            ts(0),
        );
        db.save_wake_state(Some(&snapshot)).unwrap();
        assert_eq!(db.load_wake_state().unwrap(), Some(snapshot.clone()));

        db.save_wake_state(Some(&snapshot)).unwrap();
        db.save_wake_state(None).unwrap();
        assert_eq!(db.load_wake_state().unwrap(), None);
    }

    #[test]
    fn assumed_sleep_dismissal_roundtrip() {
        let mut db = Database::open_in_memory().unwrap();
        db.save_assumed_sleep_dismissal(Some(ts(5))).unwrap();
        assert_eq!(db.load_assumed_sleep_dismissal().unwrap(), Some(ts(5)));

        db.save_assumed_sleep_dismissal(None).unwrap();
        assert_eq!(db.load_assumed_sleep_dismissal().unwrap(), None);
    }

    #[test]
    fn data_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pup.db");

        {
            let mut db = Database::open(&path).unwrap();
            db.add_event(event("m1", 0, EventKind::Meal)).unwrap();
            db.save_assumed_sleep_dismissal(Some(ts(1))).unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(ids(&db.all_events().unwrap()), vec!["m1"]);
        assert_eq!(db.load_assumed_sleep_dismissal().unwrap(), Some(ts(1)));
    }
}
