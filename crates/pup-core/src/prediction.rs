//! Next-potty prediction.
//!
//! Estimates how long the puppy can wait before the next potty break and
//! classifies how urgent a trip outside is.
//!
//! # Algorithm Summary
//!
//! 1. Baseline expected gap comes from configuration
//! 2. A recent meal or a finished nap (both after the last potty) shrink it
//! 3. If both qualify, the trigger with the most recent anchor wins
//! 4. `remaining = expected_gap - minutes_since_last_potty` picks the bucket

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{Event, EventKind, PottyLocation, latest_potty};
use crate::session::build_sleep_sessions;

/// Remaining minutes at or below which urgency is high.
const HIGH_THRESHOLD_MINUTES: i64 = 10;

/// Remaining minutes at or below which urgency is medium.
const MEDIUM_THRESHOLD_MINUTES: i64 = 20;

/// Configuration for potty prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    /// Expected minutes between potty breaks with no trigger active.
    /// Default: 90.
    pub default_gap_minutes: i64,

    /// Gap multiplier after a meal. Default: 0.5.
    pub post_meal_gap_multiplier: f64,

    /// How long after a meal the post-meal trigger stays active. Default: 60.
    pub post_meal_window_minutes: i64,

    /// Gap multiplier after waking from a nap. Default: 0.25.
    pub post_sleep_gap_multiplier: f64,

    /// How long after waking the post-sleep trigger stays active. Default: 30.
    pub post_sleep_window_minutes: i64,

    /// Shortest nap that triggers the post-sleep rule. Default: 20.
    pub min_nap_duration_for_potty_trigger: i64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            default_gap_minutes: 90,
            post_meal_gap_multiplier: 0.5,
            post_meal_window_minutes: 60,
            post_sleep_gap_multiplier: 0.25,
            post_sleep_window_minutes: 30,
            min_nap_duration_for_potty_trigger: 20,
        }
    }
}

/// How soon a potty break is needed.
///
/// Ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    /// No potty has been logged yet.
    Unknown,
    Normal,
    /// Attention: the break is coming up.
    Medium,
    /// Soon.
    High,
    /// Now, or already overdue.
    Critical,
}

impl Urgency {
    /// Short label for status cards.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Normal => "ok",
            Self::Medium => "attention",
            Self::High => "soon",
            Self::Critical => "now",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The contextual signal that shortened the expected gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PottyTrigger {
    None,
    PostMeal,
    PostSleep,
}

/// A potty prediction for one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PottyPrediction {
    pub urgency: Urgency,
    pub trigger: PottyTrigger,
    /// Expected minutes between potties, after any trigger.
    pub expected_gap_minutes: i64,
    /// `None` when no potty has been logged.
    pub minutes_since_last: Option<i64>,
    /// Negative when overdue.
    pub minutes_remaining: Option<i64>,
    pub last_potty_at: Option<DateTime<Utc>>,
    /// The most recent potty happened indoors.
    ///
    /// Independent of the timer: an accident means an outdoor trip is due
    /// whatever the urgency says.
    pub last_was_indoor: bool,
}

impl PottyPrediction {
    pub const fn is_overdue(&self) -> bool {
        matches!(self.minutes_remaining, Some(remaining) if remaining < 0)
    }
}

/// Maps remaining minutes to an urgency bucket. First match wins.
pub const fn urgency_for_remaining(remaining: i64) -> Urgency {
    if remaining <= 0 {
        Urgency::Critical
    } else if remaining <= HIGH_THRESHOLD_MINUTES {
        Urgency::High
    } else if remaining <= MEDIUM_THRESHOLD_MINUTES {
        Urgency::Medium
    } else {
        Urgency::Normal
    }
}

/// Predicts the next potty break from the log as of `now`.
///
/// Pure: the same `(events, config, now)` always gives the same prediction.
/// Events after `now` are ignored.
pub fn calculate_prediction(
    events: &[Event],
    config: &PredictionConfig,
    now: DateTime<Utc>,
) -> PottyPrediction {
    let last_potty = latest_potty(events, now);
    let last_potty_at = last_potty.map(|e| e.timestamp);
    let after_last_potty = |t: DateTime<Utc>| last_potty_at.is_none_or(|p| t > p);

    let meal_window = Duration::minutes(config.post_meal_window_minutes);
    let meal_anchor = events
        .iter()
        .filter(|e| matches!(e.kind, EventKind::Meal))
        .map(|e| e.timestamp)
        .filter(|&t| t <= now && now - t <= meal_window && after_last_potty(t))
        .max();

    let sleep_window = Duration::minutes(config.post_sleep_window_minutes);
    let min_nap = Duration::minutes(config.min_nap_duration_for_potty_trigger);
    let wake_anchor = build_sleep_sessions(events)
        .iter()
        .filter(|s| s.duration(now) >= min_nap)
        .filter_map(|s| s.end)
        .filter(|&end| end <= now && now - end <= sleep_window && after_last_potty(end))
        .max();

    // Most recent anchor wins; a tie goes to the nap.
    let trigger = match (meal_anchor, wake_anchor) {
        (Some(meal), Some(wake)) if meal > wake => PottyTrigger::PostMeal,
        (_, Some(_)) => PottyTrigger::PostSleep,
        (Some(_), None) => PottyTrigger::PostMeal,
        (None, None) => PottyTrigger::None,
    };

    let expected_gap_minutes = match trigger {
        PottyTrigger::None => config.default_gap_minutes,
        PottyTrigger::PostMeal => {
            scale_gap(config.default_gap_minutes, config.post_meal_gap_multiplier)
        }
        PottyTrigger::PostSleep => {
            scale_gap(config.default_gap_minutes, config.post_sleep_gap_multiplier)
        }
    };

    let minutes_since_last = last_potty_at.map(|t| (now - t).num_minutes());
    let minutes_remaining = minutes_since_last.map(|since| expected_gap_minutes - since);
    let urgency = minutes_remaining.map_or(Urgency::Unknown, urgency_for_remaining);
    let last_was_indoor =
        last_potty.and_then(Event::potty_location) == Some(PottyLocation::Indoor);

    tracing::debug!(
        ?trigger,
        expected_gap_minutes,
        ?minutes_remaining,
        ?urgency,
        "calculated potty prediction"
    );

    PottyPrediction {
        urgency,
        trigger,
        expected_gap_minutes,
        minutes_since_last,
        minutes_remaining,
        last_potty_at,
        last_was_indoor,
    }
}

/// Applies a gap multiplier. Non-finite or negative multipliers are ignored.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn scale_gap(minutes: i64, multiplier: f64) -> i64 {
    let multiplier = if multiplier.is_finite() && multiplier >= 0.0 {
        multiplier
    } else {
        1.0
    };
    (minutes as f64 * multiplier).round() as i64
}
