//! Event type enum as the single source of truth for event type strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical kinds of logged puppy events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventType {
    Meal,
    Drink,
    Pee,
    Poop,
    Sleep,
    Wake,
    Walk,
    Garden,
    Training,
    Crate,
    Social,
    Milestone,
    Behavior,
    Weight,
    Moment,
    Medication,
    CoverageGap,
}

impl EventType {
    /// Every event type, in declaration order.
    pub const ALL: [Self; 17] = [
        Self::Meal,
        Self::Drink,
        Self::Pee,
        Self::Poop,
        Self::Sleep,
        Self::Wake,
        Self::Walk,
        Self::Garden,
        Self::Training,
        Self::Crate,
        Self::Social,
        Self::Milestone,
        Self::Behavior,
        Self::Weight,
        Self::Moment,
        Self::Medication,
        Self::CoverageGap,
    ];

    /// String representation for storage and display.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Meal => "meal",
            Self::Drink => "drink",
            Self::Pee => "pee",
            Self::Poop => "poop",
            Self::Sleep => "sleep",
            Self::Wake => "wake",
            Self::Walk => "walk",
            Self::Garden => "garden",
            Self::Training => "training",
            Self::Crate => "crate",
            Self::Social => "social",
            Self::Milestone => "milestone",
            Self::Behavior => "behavior",
            Self::Weight => "weight",
            Self::Moment => "moment",
            Self::Medication => "medication",
            Self::CoverageGap => "coverage_gap",
        }
    }

    /// Whether this is a potty type (pee or poop).
    #[must_use]
    pub const fn is_potty(&self) -> bool {
        matches!(self, Self::Pee | Self::Poop)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "meal" => Ok(Self::Meal),
            "drink" => Ok(Self::Drink),
            "pee" => Ok(Self::Pee),
            "poop" => Ok(Self::Poop),
            "sleep" | "nap" => Ok(Self::Sleep),
            "wake" => Ok(Self::Wake),
            "walk" => Ok(Self::Walk),
            "garden" => Ok(Self::Garden),
            "training" => Ok(Self::Training),
            "crate" => Ok(Self::Crate),
            "social" => Ok(Self::Social),
            "milestone" => Ok(Self::Milestone),
            "behavior" | "behaviour" => Ok(Self::Behavior),
            "weight" => Ok(Self::Weight),
            "moment" | "photo" => Ok(Self::Moment),
            "medication" => Ok(Self::Medication),
            "coverage_gap" | "coverage-gap" => Ok(Self::CoverageGap),
            _ => Err(UnknownEventType(s.to_string())),
        }
    }
}

impl Serialize for EventType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for unknown event type strings.
#[derive(Debug, Clone)]
pub struct UnknownEventType(String);

impl fmt::Display for UnknownEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event type: {}", self.0)
    }
}

impl std::error::Error for UnknownEventType {}
