//! Combined status for the status cards.
//!
//! Crosses the sleep state with the potty prediction and the post-wake
//! snapshot to decide which cards to show, most important first.
//!
//! # Decision table
//!
//! | Sleep state | Condition                                  | Cards                    |
//! |-------------|--------------------------------------------|--------------------------|
//! | asleep      |                                            | sleeping                 |
//! | not asleep  | inactive too long, not dismissed since     | assumed sleep, potty     |
//! | awake       | wake snapshot held                         | post-wake potty, awake   |
//! | awake       | urgency high or worse, or indoor accident  | potty, awake             |
//! | awake       | otherwise                                  | awake, potty             |
//! | unknown     |                                            | potty                    |
//!
//! Awake rows gain a nap-needed card once the puppy has been up too long.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::prediction::{PottyPrediction, Urgency};
use crate::session::SleepState;

/// Configuration for status card selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Minutes without any logged event before sleep is assumed.
    /// Default: 120.
    pub assumed_sleep_after_minutes: i64,

    /// Minutes awake before suggesting a nap. Default: 60.
    pub nap_needed_after_minutes: i64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            assumed_sleep_after_minutes: 120,
            nap_needed_after_minutes: 60,
        }
    }
}

/// The potty prediction frozen at the moment a wake was logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WakeTimePottyState {
    pub prediction: PottyPrediction,
    pub captured_at: DateTime<Utc>,
}

/// Freezes `prediction` when a wake event is logged at `at`.
///
/// Call exactly once per logged wake; the caller owns the result.
pub fn capture_wake_time_potty_state(
    prediction: PottyPrediction,
    at: DateTime<Utc>,
) -> WakeTimePottyState {
    WakeTimePottyState {
        prediction,
        captured_at: at,
    }
}

/// Whether the snapshot is stale: a potty happened at or after its capture.
///
/// Potties from before the capture never invalidate it.
pub fn should_clear_wake_state(
    wake_state: &WakeTimePottyState,
    latest_potty_at: Option<DateTime<Utc>>,
) -> bool {
    latest_potty_at.is_some_and(|t| t >= wake_state.captured_at)
}

/// One status card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "card", rename_all = "snake_case")]
pub enum StatusCard {
    Sleeping {
        since: DateTime<Utc>,
        minutes: i64,
    },
    /// Nothing logged for a while; the puppy is probably asleep.
    AssumedSleep {
        last_activity: DateTime<Utc>,
    },
    Awake {
        since: DateTime<Utc>,
        minutes: i64,
    },
    NapNeeded {
        awake_minutes: i64,
    },
    Potty {
        prediction: PottyPrediction,
    },
    /// Just woke up: go out before anything else.
    PostWakePotty {
        snapshot: WakeTimePottyState,
        minutes_since_wake: i64,
    },
}

/// The cards to show, most important first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CombinedState {
    pub cards: Vec<StatusCard>,
}

impl CombinedState {
    pub fn primary(&self) -> Option<&StatusCard> {
        self.cards.first()
    }

    /// Whether any potty card is shown.
    pub fn shows_potty(&self) -> bool {
        self.cards.iter().any(|c| {
            matches!(
                c,
                StatusCard::Potty { .. } | StatusCard::PostWakePotty { .. }
            )
        })
    }
}

/// Everything the coordinator looks at for one status computation.
#[derive(Debug, Clone, Copy)]
pub struct StatusInputs<'a> {
    pub sleep_state: SleepState,
    pub potty_prediction: &'a PottyPrediction,
    pub wake_state: Option<&'a WakeTimePottyState>,
    /// Recently logged events, used to detect inactivity.
    pub recent_events: &'a [Event],
    /// When the user last dismissed the assumed-sleep card.
    pub dismissed_assumed_sleep_at: Option<DateTime<Utc>>,
    pub now: DateTime<Utc>,
}

fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_minutes().max(0)
}

/// Selects the status cards for the current moment.
pub fn calculate_combined_state(inputs: &StatusInputs<'_>, config: &StatusConfig) -> CombinedState {
    let now = inputs.now;

    if let SleepState::Asleep { since } = inputs.sleep_state {
        return CombinedState {
            cards: vec![StatusCard::Sleeping {
                since,
                minutes: minutes_between(since, now),
            }],
        };
    }

    let potty_card = StatusCard::Potty {
        prediction: inputs.potty_prediction.clone(),
    };

    if let Some(last_activity) = assumed_sleep_since(inputs, config) {
        return CombinedState {
            cards: vec![StatusCard::AssumedSleep { last_activity }, potty_card],
        };
    }

    let SleepState::Awake { since } = inputs.sleep_state else {
        return CombinedState {
            cards: vec![potty_card],
        };
    };

    let awake_minutes = minutes_between(since, now);
    let awake_card = StatusCard::Awake {
        since,
        minutes: awake_minutes,
    };

    let mut cards = if let Some(snapshot) = inputs.wake_state {
        vec![
            StatusCard::PostWakePotty {
                snapshot: snapshot.clone(),
                minutes_since_wake: minutes_between(snapshot.captured_at, now),
            },
            awake_card,
        ]
    } else if inputs.potty_prediction.urgency >= Urgency::High
        || inputs.potty_prediction.last_was_indoor
    {
        vec![potty_card, awake_card]
    } else {
        vec![awake_card, potty_card]
    };

    if awake_minutes >= config.nap_needed_after_minutes {
        cards.push(StatusCard::NapNeeded { awake_minutes });
    }

    CombinedState { cards }
}

/// Time of the last logged activity, if the puppy has been quiet long
/// enough to assume sleep and the user has not dismissed that since.
fn assumed_sleep_since(inputs: &StatusInputs<'_>, config: &StatusConfig) -> Option<DateTime<Utc>> {
    let last_activity = inputs
        .recent_events
        .iter()
        .map(|e| e.timestamp)
        .filter(|&t| t <= inputs.now)
        .max()?;

    let quiet = inputs.now - last_activity >= Duration::minutes(config.assumed_sleep_after_minutes);
    let dismissed = inputs
        .dismissed_assumed_sleep_at
        .is_some_and(|d| d >= last_activity);

    (quiet && !dismissed).then_some(last_activity)
}
