//! Outdoor potty streaks.

use serde::{Deserialize, Serialize};

use crate::event::{Event, PottyLocation, sort_chronologically};

/// Current and best runs of consecutive outdoor potties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakInfo {
    /// Outdoor potties since the last indoor one.
    pub current_streak: u32,
    /// Longest outdoor run anywhere in the history.
    pub best_streak: u32,
}

impl StreakInfo {
    /// The current run is (or ties) the best ever.
    pub const fn is_personal_best(&self) -> bool {
        self.current_streak > 0 && self.current_streak == self.best_streak
    }
}

/// Recomputes streaks from the full potty history.
///
/// Potties with an unknown location neither extend nor break a streak.
pub fn get_streak_info(events: &[Event]) -> StreakInfo {
    let mut potties: Vec<&Event> = events.iter().filter(|e| e.is_potty()).collect();
    sort_chronologically(&mut potties);

    let mut running = 0_u32;
    let mut best = 0_u32;

    for location in potties.iter().filter_map(|e| e.potty_location()) {
        match location {
            PottyLocation::Outdoor => {
                running += 1;
                best = best.max(running);
            }
            PottyLocation::Indoor => running = 0,
            PottyLocation::Unknown => {}
        }
    }

    StreakInfo {
        current_streak: running,
        best_streak: best,
    }
}
