//! Core domain logic for the puppy log.
//!
//! This crate contains the fundamental types and logic for:
//! - Session reconstruction: pairing sleep/wake events and grouping walks
//! - Timeline: the activity blocks of one calendar day
//! - Prediction: when the next potty break is due
//! - Streaks and patterns: outdoor potty training progress
//! - Status: which cards to show right now, kept current by [`StatusService`]

pub mod event;
pub mod event_log;
pub mod event_type;
pub mod history;
pub mod patterns;
pub mod prediction;
pub mod recompute;
pub mod service;
pub mod session;
pub mod status;
pub mod streak;
pub mod timeline;
pub mod types;

pub use event::{Event, EventKind, PottyDetails, PottyLocation};
pub use event_log::{EventLog, EventLogError, InMemoryEventLog};
pub use event_type::{EventType, UnknownEventType};
pub use history::{FetchOutcome, fetch_history};
pub use patterns::{PatternAnalysis, Trend, analyze_patterns};
pub use prediction::{
    PottyPrediction, PottyTrigger, PredictionConfig, Urgency, calculate_prediction,
};
pub use service::{EngineConfig, StatusService, StatusSnapshot};
pub use session::{
    SleepSession, SleepState, WalkSession, build_sleep_sessions, build_walk_sessions,
    current_sleep_state, ongoing_sleep_session_link,
};
pub use status::{
    CombinedState, StatusCard, StatusConfig, StatusInputs, WakeTimePottyState,
    calculate_combined_state, capture_wake_time_potty_state, should_clear_wake_state,
};
pub use streak::{StreakInfo, get_streak_info};
pub use timeline::{
    ActivityBlock, ActivityBlockSummary, DayWindow, TimelineConfig, generate_blocks,
    generate_summary, timeline_bounds,
};
pub use types::{EventId, SessionLink, ValidationError};
