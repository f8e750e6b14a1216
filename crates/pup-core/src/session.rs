//! Session reconstruction.
//!
//! Links paired and child events in a flat event log into derived sessions:
//! sleep events are paired with the wake events that close them, and potty
//! events logged during a walk are grouped under that walk.
//!
//! # Sleep matching
//!
//! 1. Sort sleep and wake events ascending (timestamp, then ID)
//! 2. For each sleep, take the first unconsumed wake with the same link
//! 3. Otherwise take the earliest unconsumed wake strictly after the sleep
//! 4. Each wake closes at most one session; unmatched sleeps stay ongoing

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{Event, EventKind, sort_chronologically};
use crate::types::{EventId, SessionLink};

/// A sleep event paired with the wake event that closed it, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepSession {
    /// Link shared by the sleep event and (usually) its wake.
    pub link: SessionLink,
    /// The sleep event that opened the session.
    pub sleep_event: EventId,
    /// The wake event that closed the session.
    pub wake_event: Option<EventId>,
    pub start: DateTime<Utc>,
    /// `None` while the puppy is still asleep.
    pub end: Option<DateTime<Utc>>,
}

impl SleepSession {
    pub const fn is_ongoing(&self) -> bool {
        self.end.is_none()
    }

    /// Session length, measuring ongoing sessions up to `now`. Never negative.
    pub fn duration(&self, now: DateTime<Utc>) -> Duration {
        let end = self.end.unwrap_or(now);
        (end - self.start).max(Duration::zero())
    }

    pub fn duration_minutes(&self, now: DateTime<Utc>) -> i64 {
        self.duration(now).num_minutes()
    }
}

/// A walk together with the potty events logged during it.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkSession {
    pub walk: Event,
    /// Potty events whose parent walk is this walk, ascending.
    pub potties: Vec<Event>,
}

impl WalkSession {
    pub const fn start(&self) -> DateTime<Utc> {
        self.walk.timestamp
    }

    /// Walk end, using `default_duration` when none was logged.
    pub fn end(&self, default_duration: Duration) -> DateTime<Utc> {
        self.walk.timestamp + self.walk.walk_duration().unwrap_or(default_duration)
    }
}

/// Whether the puppy is currently asleep, according to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SleepState {
    Asleep { since: DateTime<Utc> },
    Awake { since: DateTime<Utc> },
    /// No sleep has ever been logged.
    Unknown,
}

impl SleepState {
    pub const fn is_asleep(&self) -> bool {
        matches!(self, Self::Asleep { .. })
    }
}

fn sleep_link(event: &Event) -> Option<&SessionLink> {
    match &event.kind {
        EventKind::Sleep { link } => Some(link),
        _ => None,
    }
}

fn is_wake(event: &Event) -> bool {
    matches!(event.kind, EventKind::Wake { .. })
}

/// Pairs sleep events with wake events into sessions, ascending by start.
///
/// The result does not depend on the order of `events`.
pub fn build_sleep_sessions(events: &[Event]) -> Vec<SleepSession> {
    let mut sleeps: Vec<&Event> = events.iter().filter(|e| sleep_link(e).is_some()).collect();
    let mut wakes: Vec<&Event> = events.iter().filter(|e| is_wake(e)).collect();
    sort_chronologically(&mut sleeps);
    sort_chronologically(&mut wakes);

    let mut consumed = vec![false; wakes.len()];
    let mut sessions = Vec::with_capacity(sleeps.len());

    for sleep in sleeps {
        let Some(link) = sleep_link(sleep) else {
            continue;
        };

        let linked = (0..wakes.len())
            .find(|&i| !consumed[i] && wakes[i].session_link() == Some(link));
        let chosen = linked.or_else(|| {
            (0..wakes.len()).find(|&i| !consumed[i] && wakes[i].timestamp > sleep.timestamp)
        });

        let (wake_event, end) = match chosen {
            Some(i) => {
                consumed[i] = true;
                let wake = wakes[i];
                // A linked wake logged before its sleep closes the session at its start.
                (Some(wake.id.clone()), Some(wake.timestamp.max(sleep.timestamp)))
            }
            None => (None, None),
        };

        sessions.push(SleepSession {
            link: link.clone(),
            sleep_event: sleep.id.clone(),
            wake_event,
            start: sleep.timestamp,
            end,
        });
    }

    sessions.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| a.sleep_event.cmp(&b.sleep_event))
    });

    tracing::debug!(
        sessions = sessions.len(),
        ongoing = sessions.iter().filter(|s| s.is_ongoing()).count(),
        unmatched_wakes = consumed.iter().filter(|c| !**c).count(),
        "reconstructed sleep sessions"
    );

    sessions
}

/// Groups potty events under the walk they reference, ascending by walk time.
pub fn build_walk_sessions(events: &[Event]) -> Vec<WalkSession> {
    let mut children: HashMap<&EventId, Vec<&Event>> = HashMap::new();
    for event in events {
        if let Some(parent) = event.parent_walk() {
            children.entry(parent).or_default().push(event);
        }
    }

    let mut walks: Vec<&Event> = events
        .iter()
        .filter(|e| matches!(e.kind, EventKind::Walk { .. }))
        .collect();
    sort_chronologically(&mut walks);

    let sessions: Vec<WalkSession> = walks
        .into_iter()
        .map(|walk| {
            let mut potties = children.remove(&walk.id).unwrap_or_default();
            sort_chronologically(&mut potties);
            WalkSession {
                walk: walk.clone(),
                potties: potties.into_iter().cloned().collect(),
            }
        })
        .collect();

    if !children.is_empty() {
        tracing::debug!(
            orphaned = children.values().map(Vec::len).sum::<usize>(),
            "potty events reference walks outside the snapshot"
        );
    }

    sessions
}

/// The link of the most recent sleep that no wake has closed yet.
///
/// A sleep counts as closed when any wake shares its link or any wake was
/// logged after it. Used to attach a newly logged wake to its session.
pub fn ongoing_sleep_session_link(events: &[Event]) -> Option<SessionLink> {
    let mut sleeps: Vec<&Event> = events.iter().filter(|e| sleep_link(e).is_some()).collect();
    sort_chronologically(&mut sleeps);
    let wakes: Vec<&Event> = events.iter().filter(|e| is_wake(e)).collect();

    sleeps.iter().rev().find_map(|sleep| {
        let link = sleep_link(sleep)?;
        let closed = wakes
            .iter()
            .any(|w| w.session_link() == Some(link) || w.timestamp > sleep.timestamp);
        (!closed).then(|| link.clone())
    })
}

/// Current sleep state derived from the latest session started by `now`.
pub fn current_sleep_state(events: &[Event], now: DateTime<Utc>) -> SleepState {
    let sessions = build_sleep_sessions(events);
    let Some(latest) = sessions.iter().rev().find(|s| s.start <= now) else {
        return SleepState::Unknown;
    };

    match latest.end {
        Some(end) if end <= now => SleepState::Awake { since: end },
        _ => SleepState::Asleep {
            since: latest.start,
        },
    }
}
