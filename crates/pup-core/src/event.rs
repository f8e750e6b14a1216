//! Logged puppy events.
//!
//! An [`Event`] is one immutable entry in the log. Its kind-specific payload
//! lives in [`EventKind`], a sum type that is flattened into the event when
//! serialized so every event shares one JSON shape:
//!
//! ```json
//! {"id": "e1", "timestamp": "2025-01-15T09:00:00Z", "type": "pee", "location": "outdoor"}
//! ```

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::event_type::EventType;
use crate::types::{EventId, SessionLink};

/// A single entry in the puppy log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier for this event.
    pub id: EventId,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// What happened, with kind-specific details.
    #[serde(flatten)]
    pub kind: EventKind,
    /// Free-text note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Set when the event was edited after being logged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

/// Where a potty event happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PottyLocation {
    Indoor,
    Outdoor,
    /// Missing or unreadable location on a historical record.
    #[default]
    Unknown,
}

impl PottyLocation {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Indoor => "indoor",
            Self::Outdoor => "outdoor",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PottyLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PottyLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "indoor" | "inside" => Ok(Self::Indoor),
            "outdoor" | "outside" => Ok(Self::Outdoor),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!("invalid potty location: {s}")),
        }
    }
}

impl Serialize for PottyLocation {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PottyLocation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // Lenient: a bad location on old data must not make the record unreadable.
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(match raw {
            Some(s) => s.parse().unwrap_or_else(|err| {
                tracing::warn!(%err, "unreadable potty location, treating as unknown");
                Self::Unknown
            }),
            None => Self::Unknown,
        })
    }
}

/// Details shared by pee and poop events.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PottyDetails {
    /// Indoor or outdoor. Defaults to unknown when absent.
    #[serde(default)]
    pub location: PottyLocation,
    /// The walk this potty happened on, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_walk: Option<EventId>,
}

impl PottyDetails {
    /// Creates potty details for a location.
    ///
    /// A potty event must carry a location. Missing locations trip a debug
    /// assertion in development builds and degrade to
    /// [`PottyLocation::Unknown`] otherwise.
    #[must_use]
    pub fn new(location: Option<PottyLocation>) -> Self {
        debug_assert!(location.is_some(), "potty event requires a location");
        let location = location.unwrap_or_else(|| {
            tracing::warn!("potty event without location, treating as unknown");
            PottyLocation::Unknown
        });
        Self {
            location,
            parent_walk: None,
        }
    }

    /// Marks the potty as having happened during the given walk.
    #[must_use]
    pub fn on_walk(mut self, walk_id: EventId) -> Self {
        self.parent_walk = Some(walk_id);
        self
    }
}

/// What kind of event was logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    Meal,
    Drink,
    Pee(PottyDetails),
    Poop(PottyDetails),
    Sleep {
        /// Links this sleep to its closing wake.
        #[serde(default = "SessionLink::generate")]
        link: SessionLink,
    },
    Wake {
        /// The sleep session this wake closes, when known at log time.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        link: Option<SessionLink>,
    },
    Walk {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_minutes: Option<i64>,
    },
    Garden,
    Training,
    Crate,
    Social,
    Milestone,
    Behavior,
    Weight {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        weight_kg: Option<f64>,
    },
    Moment,
    Medication,
    CoverageGap {
        /// End of the untracked interval; the event timestamp is its start.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end: Option<DateTime<Utc>>,
    },
}

impl EventKind {
    /// A pee event at the given location.
    #[must_use]
    pub fn pee(location: Option<PottyLocation>) -> Self {
        Self::Pee(PottyDetails::new(location))
    }

    /// A poop event at the given location.
    #[must_use]
    pub fn poop(location: Option<PottyLocation>) -> Self {
        Self::Poop(PottyDetails::new(location))
    }

    /// A sleep event; a fresh session link is generated when none is given.
    #[must_use]
    pub fn sleep(link: Option<SessionLink>) -> Self {
        Self::Sleep {
            link: link.unwrap_or_else(SessionLink::generate),
        }
    }

    /// Builds the payload-free kind for a type, with empty optional fields.
    ///
    /// Returns `None` for potty types, which need a location.
    #[must_use]
    pub fn bare(event_type: EventType) -> Option<Self> {
        let kind = match event_type {
            EventType::Pee | EventType::Poop => return None,
            EventType::Meal => Self::Meal,
            EventType::Drink => Self::Drink,
            EventType::Sleep => Self::sleep(None),
            EventType::Wake => Self::Wake { link: None },
            EventType::Walk => Self::Walk {
                duration_minutes: None,
            },
            EventType::Garden => Self::Garden,
            EventType::Training => Self::Training,
            EventType::Crate => Self::Crate,
            EventType::Social => Self::Social,
            EventType::Milestone => Self::Milestone,
            EventType::Behavior => Self::Behavior,
            EventType::Weight => Self::Weight { weight_kg: None },
            EventType::Moment => Self::Moment,
            EventType::Medication => Self::Medication,
            EventType::CoverageGap => Self::CoverageGap { end: None },
        };
        Some(kind)
    }

    /// The fieldless type tag of this kind.
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::Meal => EventType::Meal,
            Self::Drink => EventType::Drink,
            Self::Pee(_) => EventType::Pee,
            Self::Poop(_) => EventType::Poop,
            Self::Sleep { .. } => EventType::Sleep,
            Self::Wake { .. } => EventType::Wake,
            Self::Walk { .. } => EventType::Walk,
            Self::Garden => EventType::Garden,
            Self::Training => EventType::Training,
            Self::Crate => EventType::Crate,
            Self::Social => EventType::Social,
            Self::Milestone => EventType::Milestone,
            Self::Behavior => EventType::Behavior,
            Self::Weight { .. } => EventType::Weight,
            Self::Moment => EventType::Moment,
            Self::Medication => EventType::Medication,
            Self::CoverageGap { .. } => EventType::CoverageGap,
        }
    }
}

impl Event {
    /// Creates an event with an explicit identifier.
    pub const fn new(id: EventId, timestamp: DateTime<Utc>, kind: EventKind) -> Self {
        Self {
            id,
            timestamp,
            kind,
            note: None,
            modified_at: None,
        }
    }

    /// Creates an event with a freshly generated identifier.
    #[must_use]
    pub fn create(timestamp: DateTime<Utc>, kind: EventKind) -> Self {
        Self::new(EventId::generate(), timestamp, kind)
    }

    /// Attaches a free-text note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Returns the edited copy of this event, stamped with the edit time.
    #[must_use]
    pub fn modified(mut self, at: DateTime<Utc>) -> Self {
        self.modified_at = Some(at);
        self
    }

    pub const fn event_type(&self) -> EventType {
        self.kind.event_type()
    }

    pub const fn is_potty(&self) -> bool {
        matches!(self.kind, EventKind::Pee(_) | EventKind::Poop(_))
    }

    /// Potty details for pee and poop events.
    pub const fn potty(&self) -> Option<&PottyDetails> {
        match &self.kind {
            EventKind::Pee(details) | EventKind::Poop(details) => Some(details),
            _ => None,
        }
    }

    pub fn potty_location(&self) -> Option<PottyLocation> {
        self.potty().map(|d| d.location)
    }

    pub fn parent_walk(&self) -> Option<&EventId> {
        self.potty().and_then(|d| d.parent_walk.as_ref())
    }

    /// The session link of a sleep event, or of a linked wake event.
    pub const fn session_link(&self) -> Option<&SessionLink> {
        match &self.kind {
            EventKind::Sleep { link } => Some(link),
            EventKind::Wake { link } => link.as_ref(),
            _ => None,
        }
    }

    /// Logged walk duration. Non-positive values are treated as absent.
    pub fn walk_duration(&self) -> Option<Duration> {
        match self.kind {
            EventKind::Walk {
                duration_minutes: Some(minutes),
            } if minutes > 0 => Some(Duration::minutes(minutes)),
            _ => None,
        }
    }

    /// Logged weight. Non-finite and non-positive values are treated as absent.
    pub fn weight_kg(&self) -> Option<f64> {
        match self.kind {
            EventKind::Weight {
                weight_kg: Some(kg),
            } if kg.is_finite() && kg > 0.0 => Some(kg),
            _ => None,
        }
    }

    /// End of a coverage gap. Ends before the start are treated as absent.
    pub fn coverage_end(&self) -> Option<DateTime<Utc>> {
        match self.kind {
            EventKind::CoverageGap { end: Some(end) } if end >= self.timestamp => Some(end),
            _ => None,
        }
    }
}

/// Sorts events by timestamp, breaking ties by ID so the order is total.
pub fn sort_chronologically(events: &mut [&Event]) {
    events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
}

/// The most recent potty event at or before `now`.
pub fn latest_potty(events: &[Event], now: DateTime<Utc>) -> Option<&Event> {
    events
        .iter()
        .filter(|e| e.is_potty() && e.timestamp <= now)
        .max_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)))
}
