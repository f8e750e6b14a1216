//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use pup_core::{EventType, PottyLocation};

/// Puppy log.
///
/// Records what the puppy does and predicts when the next potty break is due.
#[derive(Debug, Parser)]
#[command(name = "pup", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Log an event.
    Log(LogArgs),

    /// Show the current status cards.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the activity timeline of one day.
    Timeline {
        /// Day to show (YYYY-MM-DD, local time). Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show outdoor potty streaks.
    Streak,

    /// Show potty patterns over recent days.
    Patterns {
        /// Length of the window in days.
        #[arg(long, default_value_t = 7)]
        days: u32,
    },

    /// Dump events as JSONL.
    Events {
        /// Only events at or after this time (ISO 8601 or "2 hours ago").
        #[arg(long)]
        after: Option<String>,

        /// Only events before this time (ISO 8601 or "2 hours ago").
        #[arg(long)]
        before: Option<String>,
    },

    /// List recent events grouped by day, newest first.
    History {
        /// How many days back to go.
        #[arg(long, default_value_t = 7)]
        days: u32,

        /// Only show these event types.
        #[arg(long = "type", value_name = "TYPE")]
        types: Vec<EventType>,
    },

    /// Delete an event.
    Delete {
        /// ID of the event to delete.
        id: String,
    },

    /// Hide the "probably asleep" card until something new is logged.
    DismissSleep,
}

/// Arguments for `pup log`.
#[derive(Debug, Clone, Args)]
pub struct LogArgs {
    /// Event type (pee, poop, meal, sleep, wake, walk, ...).
    pub event_type: EventType,

    /// Where a pee or poop happened (indoor, outdoor).
    #[arg(long)]
    pub location: Option<PottyLocation>,

    /// ID of the walk a pee or poop happened on.
    #[arg(long)]
    pub walk: Option<String>,

    /// Walk duration in minutes.
    #[arg(long)]
    pub duration: Option<i64>,

    /// Session link tying a sleep to its wake.
    #[arg(long)]
    pub link: Option<String>,

    /// Weight in kilograms.
    #[arg(long)]
    pub weight: Option<f64>,

    /// End of a coverage gap (ISO 8601 or "2 hours ago").
    #[arg(long)]
    pub until: Option<String>,

    /// Free-text note.
    #[arg(long)]
    pub note: Option<String>,

    /// When it happened (ISO 8601 or "2 hours ago"). Defaults to now.
    #[arg(long)]
    pub at: Option<String>,
}
