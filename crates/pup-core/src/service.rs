//! Explicit status recomputation over an event log.
//!
//! [`StatusService`] owns an [`EventLog`] and recomputes the status whenever
//! the log changes. Nothing is global: callers construct the service, restore
//! any persisted wake snapshot and dismissal, and read the result back.
//!
//! # Lifecycle
//!
//! 1. Logging a wake freezes the current potty prediction before the wake
//!    is stored, and links an unlinked wake to the open sleep session
//! 2. Every mutation forces a recompute; plain refreshes are debounced
//! 3. Each recompute first drops the wake snapshot once a potty has been
//!    logged at or after its capture time

use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::event::{Event, EventKind, latest_potty};
use crate::event_log::EventLog;
use crate::prediction::{PottyPrediction, PredictionConfig, calculate_prediction};
use crate::recompute::Debouncer;
use crate::session::{SleepState, current_sleep_state, ongoing_sleep_session_link};
use crate::status::{
    CombinedState, StatusConfig, StatusInputs, WakeTimePottyState, calculate_combined_state,
    capture_wake_time_potty_state, should_clear_wake_state,
};
use crate::streak::{StreakInfo, get_streak_info};
use crate::timeline::TimelineConfig;
use crate::types::EventId;

/// How far back events count as recent activity for assumed sleep.
const RECENT_ACTIVITY_HOURS: i64 = 24;

/// All engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub prediction: PredictionConfig,
    pub status: StatusConfig,
    pub timeline: TimelineConfig,
}

/// Result of one status recomputation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub computed_at: DateTime<Utc>,
    pub sleep_state: SleepState,
    pub prediction: PottyPrediction,
    pub streak: StreakInfo,
    pub combined: CombinedState,
}

/// Keeps the status in step with an event log.
pub struct StatusService<L: EventLog> {
    log: L,
    config: EngineConfig,
    wake_state: Option<WakeTimePottyState>,
    dismissed_assumed_sleep_at: Option<DateTime<Utc>>,
    debouncer: Debouncer,
    current: Option<StatusSnapshot>,
}

impl<L: EventLog> StatusService<L> {
    pub fn new(log: L, config: EngineConfig) -> Self {
        Self {
            log,
            config,
            wake_state: None,
            dismissed_assumed_sleep_at: None,
            debouncer: Debouncer::default(),
            current: None,
        }
    }

    /// Restores a wake snapshot persisted by an earlier run.
    #[must_use]
    pub fn with_wake_state(mut self, wake_state: Option<WakeTimePottyState>) -> Self {
        self.wake_state = wake_state;
        self
    }

    /// Restores an assumed-sleep dismissal persisted by an earlier run.
    #[must_use]
    pub fn with_assumed_sleep_dismissal(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.dismissed_assumed_sleep_at = at;
        self
    }

    pub const fn log(&self) -> &L {
        &self.log
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub const fn wake_state(&self) -> Option<&WakeTimePottyState> {
        self.wake_state.as_ref()
    }

    pub const fn dismissed_assumed_sleep_at(&self) -> Option<DateTime<Utc>> {
        self.dismissed_assumed_sleep_at
    }

    /// The last computed status, if any.
    pub const fn status(&self) -> Option<&StatusSnapshot> {
        self.current.as_ref()
    }

    /// Gives the log back.
    pub fn into_log(self) -> L {
        self.log
    }

    /// Records an event and recomputes.
    ///
    /// Returns the event as stored, which for a wake may carry a link
    /// filled in from the open sleep session. The wake snapshot is only
    /// replaced once the store has accepted the wake.
    pub fn add_event(&mut self, mut event: Event, now: DateTime<Utc>) -> Result<Event, L::Error> {
        let mut wake_state = None;
        if let EventKind::Wake { link } = &mut event.kind {
            let events = self.log.all_events()?;

            let prediction = calculate_prediction(&events, &self.config.prediction, event.timestamp);
            wake_state = Some(capture_wake_time_potty_state(prediction, event.timestamp));

            if link.is_none() {
                *link = ongoing_sleep_session_link(&events);
                debug!(link = ?link, "attached wake to open sleep session");
            }
        }

        self.log.add_event(event.clone())?;
        if let Some(snapshot) = wake_state {
            debug!(urgency = %snapshot.prediction.urgency, "captured wake-time potty state");
            self.wake_state = Some(snapshot);
        }
        self.refresh(now, true)?;
        Ok(event)
    }

    /// Replaces an event and recomputes.
    pub fn update_event(&mut self, event: Event, now: DateTime<Utc>) -> Result<(), L::Error> {
        self.log.update_event(event)?;
        self.refresh(now, true)?;
        Ok(())
    }

    /// Removes an event and recomputes.
    pub fn delete_event(&mut self, id: &EventId, now: DateTime<Utc>) -> Result<(), L::Error> {
        self.log.delete_event(id)?;
        self.refresh(now, true)?;
        Ok(())
    }

    /// Hides the assumed-sleep card until something new is logged.
    pub fn dismiss_assumed_sleep(&mut self, now: DateTime<Utc>) -> Result<(), L::Error> {
        self.dismissed_assumed_sleep_at = Some(now);
        self.refresh(now, true)?;
        Ok(())
    }

    /// Recomputes the status as of `now`.
    ///
    /// Returns `false` when the request was debounced and the previous
    /// status was kept.
    pub fn refresh(&mut self, now: DateTime<Utc>, forced: bool) -> Result<bool, L::Error> {
        if !self.debouncer.should_run(Instant::now(), forced) {
            return Ok(false);
        }

        let events = self.log.all_events()?;

        let latest_potty_at = latest_potty(&events, now).map(|e| e.timestamp);
        if self
            .wake_state
            .as_ref()
            .is_some_and(|ws| should_clear_wake_state(ws, latest_potty_at))
        {
            debug!("potty logged since wake, clearing wake-time potty state");
            self.wake_state = None;
        }

        let sleep_state = current_sleep_state(&events, now);
        let prediction = calculate_prediction(&events, &self.config.prediction, now);
        let streak = get_streak_info(&events);

        let recent_from = now - Duration::hours(RECENT_ACTIVITY_HOURS);
        let recent: Vec<Event> = events
            .into_iter()
            .filter(|e| e.timestamp >= recent_from && e.timestamp <= now)
            .collect();

        let combined = calculate_combined_state(
            &StatusInputs {
                sleep_state,
                potty_prediction: &prediction,
                wake_state: self.wake_state.as_ref(),
                recent_events: &recent,
                dismissed_assumed_sleep_at: self.dismissed_assumed_sleep_at,
                now,
            },
            &self.config.status,
        );

        debug!(cards = combined.cards.len(), "recomputed status");
        self.current = Some(StatusSnapshot {
            computed_at: now,
            sleep_state,
            prediction,
            streak,
            combined,
        });
        Ok(true)
    }
}
