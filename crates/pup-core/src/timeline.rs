//! Daily activity timeline.
//!
//! Turns sessions and point events into the blocks rendered for one calendar
//! day. Sleep and walk sessions become duration blocks clipped to the day;
//! potty and meal events become instant markers. Awake time is whatever the
//! duration blocks leave uncovered, so no block is emitted for it.

use std::collections::HashSet;

use chrono::{
    DateTime, Days, Duration, DurationRound, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc,
};
use serde::{Deserialize, Serialize};

use crate::event::{Event, EventKind, PottyLocation};
use crate::event_type::EventType;
use crate::session::{build_sleep_sessions, build_walk_sessions};
use crate::types::{EventId, SessionLink};

/// Configuration for timeline generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Walk length assumed when a walk was logged without a duration.
    /// Default: 20.
    pub default_walk_minutes: i64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            default_walk_minutes: 20,
        }
    }
}

/// The half-open instant range `[start, end)` covered by one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// Day boundaries of `date` in the given time zone.
    pub fn for_date<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Self {
        let next = date.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX);
        Self {
            date,
            start: local_midnight_to_utc(date, tz),
            end: local_midnight_to_utc(next, tz),
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }
}

/// Converts a local date at midnight to UTC.
/// Handles DST ambiguity by picking the earlier time.
fn local_midnight_to_utc<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::default());
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => {
            // DST spring-forward gap at midnight; 1am local exists
            let one_am = midnight + Duration::hours(1);
            tz.from_local_datetime(&one_am)
                .earliest()
                .map_or_else(|| midnight.and_utc(), |dt| dt.with_timezone(&Utc))
        }
    }
}

/// One segment of the daily timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "block", rename_all = "snake_case")]
pub enum ActivityBlock {
    Sleep {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        /// The session had not ended when the timeline was built.
        ongoing: bool,
        session: SessionLink,
    },
    Walk {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        ongoing: bool,
        walk: EventId,
        potty_count: usize,
    },
    Potty {
        at: DateTime<Utc>,
        event_type: EventType,
        location: PottyLocation,
        during_walk: bool,
    },
    Meal {
        at: DateTime<Utc>,
    },
}

impl ActivityBlock {
    pub const fn start(&self) -> DateTime<Utc> {
        match self {
            Self::Sleep { start, .. } | Self::Walk { start, .. } => *start,
            Self::Potty { at, .. } | Self::Meal { at } => *at,
        }
    }

    /// End of a duration block; instant markers end where they start.
    pub const fn end(&self) -> DateTime<Utc> {
        match self {
            Self::Sleep { end, .. } | Self::Walk { end, .. } => *end,
            Self::Potty { at, .. } | Self::Meal { at } => *at,
        }
    }

    pub const fn is_duration(&self) -> bool {
        matches!(self, Self::Sleep { .. } | Self::Walk { .. })
    }

    pub fn minutes(&self) -> i64 {
        (self.end() - self.start()).num_minutes()
    }

    fn trim_start(&mut self, new_start: DateTime<Utc>) {
        if let Self::Sleep { start, .. } | Self::Walk { start, .. } = self {
            *start = new_start;
        }
    }
}

/// Totals over a day's blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActivityBlockSummary {
    pub total_sleep_minutes: i64,
    pub walk_count: usize,
    pub total_walk_minutes: i64,
    pub outdoor_potty_count: usize,
    pub indoor_potty_count: usize,
    pub meal_count: usize,
}

/// Builds the ordered blocks for one day.
///
/// `previous_day_events` lets sleep that began the day before show up from
/// midnight, and `events` may run past the window end so that sessions closed
/// on a later day are seen as closed. Duration blocks are clipped to `window`,
/// never overlap, and only blocks of the day containing `now` are ongoing.
pub fn generate_blocks(
    events: &[Event],
    window: &DayWindow,
    previous_day_events: &[Event],
    config: &TimelineConfig,
    now: DateTime<Utc>,
) -> Vec<ActivityBlock> {
    let mut seen: HashSet<&EventId> = HashSet::new();
    let combined: Vec<Event> = events
        .iter()
        .chain(previous_day_events)
        .filter(|e| seen.insert(&e.id))
        .cloned()
        .collect();

    let mut durations = Vec::new();
    let viewing_today = window.contains(now);

    for session in build_sleep_sessions(&combined) {
        let start = session.start.max(window.start);
        let end = session.end.unwrap_or(now).min(window.end);
        if end > start {
            durations.push(ActivityBlock::Sleep {
                start,
                end,
                ongoing: session.is_ongoing() && viewing_today,
                session: session.link,
            });
        }
    }

    let default_walk = Duration::minutes(config.default_walk_minutes.max(0));
    for session in build_walk_sessions(&combined) {
        let planned_end = session.end(default_walk);
        let ongoing = planned_end > now && viewing_today;
        let start = session.start().max(window.start);
        let end = planned_end.min(now).min(window.end);
        if end > start {
            durations.push(ActivityBlock::Walk {
                start,
                end,
                ongoing,
                walk: session.walk.id.clone(),
                potty_count: session.potties.len(),
            });
        }
    }

    durations.sort_by(|a, b| a.start().cmp(&b.start()).then_with(|| a.end().cmp(&b.end())));
    let mut blocks = remove_overlaps(durations);

    for event in combined.iter().filter(|e| window.contains(e.timestamp)) {
        match &event.kind {
            EventKind::Pee(details) | EventKind::Poop(details) => {
                blocks.push(ActivityBlock::Potty {
                    at: event.timestamp,
                    event_type: event.event_type(),
                    location: details.location,
                    during_walk: details.parent_walk.is_some(),
                });
            }
            EventKind::Meal => blocks.push(ActivityBlock::Meal {
                at: event.timestamp,
            }),
            _ => {}
        }
    }

    // Stable: duration blocks stay ahead of markers at the same instant.
    blocks.sort_by_key(ActivityBlock::start);

    tracing::debug!(date = %window.date, blocks = blocks.len(), "generated timeline");
    blocks
}

/// Trims each duration block to start no earlier than the previous one ended.
/// Blocks left empty are dropped. Input must be sorted by start.
fn remove_overlaps(sorted: Vec<ActivityBlock>) -> Vec<ActivityBlock> {
    let mut result: Vec<ActivityBlock> = Vec::with_capacity(sorted.len());
    let mut covered_until: Option<DateTime<Utc>> = None;

    for mut block in sorted {
        if let Some(until) = covered_until {
            if block.start() < until {
                block.trim_start(until);
            }
        }
        if block.end() <= block.start() {
            continue;
        }
        covered_until = Some(covered_until.map_or(block.end(), |u| u.max(block.end())));
        result.push(block);
    }

    result
}

/// Sums a day's blocks.
pub fn generate_summary(blocks: &[ActivityBlock]) -> ActivityBlockSummary {
    blocks
        .iter()
        .fold(ActivityBlockSummary::default(), |mut summary, block| {
            match block {
                ActivityBlock::Sleep { .. } => summary.total_sleep_minutes += block.minutes(),
                ActivityBlock::Walk { .. } => {
                    summary.walk_count += 1;
                    summary.total_walk_minutes += block.minutes();
                }
                ActivityBlock::Potty { location, .. } => match location {
                    PottyLocation::Outdoor => summary.outdoor_potty_count += 1,
                    PottyLocation::Indoor => summary.indoor_potty_count += 1,
                    PottyLocation::Unknown => {}
                },
                ActivityBlock::Meal { .. } => summary.meal_count += 1,
            }
            summary
        })
}

/// Visible range of the timeline, snapped outward to whole hours.
///
/// The start is at or before every block start (the day start when there are
/// no blocks). The end is at or after every block end and, on the current
/// day, at or after `now`.
pub fn timeline_bounds(
    blocks: &[ActivityBlock],
    window: &DayWindow,
    now: DateTime<Utc>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = blocks
        .iter()
        .map(ActivityBlock::start)
        .min()
        .map_or(window.start, |s| floor_to_hour(s).max(window.start));

    let latest = blocks.iter().map(ActivityBlock::end).max();
    let live_end = window.contains(now).then_some(now);

    let end = match latest.into_iter().chain(live_end).max() {
        Some(latest) => ceil_to_hour(latest).min(window.end).max(latest),
        None => window.end,
    };

    (start, end)
}

fn floor_to_hour(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .duration_trunc(Duration::hours(1))
        .unwrap_or(instant)
}

fn ceil_to_hour(instant: DateTime<Utc>) -> DateTime<Utc> {
    let floor = floor_to_hour(instant);
    if floor < instant {
        floor + Duration::hours(1)
    } else {
        floor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::PottyDetails;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, day, hour, minute, 0).unwrap()
    }

    fn today() -> DayWindow {
        DayWindow::for_date(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(), &Utc)
    }

    fn id(s: &str) -> EventId {
        EventId::new(s).unwrap()
    }

    fn sleep(event_id: &str, ts: DateTime<Utc>, link: &str) -> Event {
        Event::new(
            id(event_id),
            ts,
            EventKind::sleep(Some(SessionLink::new(link).unwrap())),
        )
    }

    fn wake(event_id: &str, ts: DateTime<Utc>, link: &str) -> Event {
        Event::new(
            id(event_id),
            ts,
            EventKind::Wake {
                link: Some(SessionLink::new(link).unwrap()),
            },
        )
    }

    fn walk(event_id: &str, ts: DateTime<Utc>, minutes: Option<i64>) -> Event {
        Event::new(
            id(event_id),
            ts,
            EventKind::Walk {
                duration_minutes: minutes,
            },
        )
    }

    fn pee(event_id: &str, ts: DateTime<Utc>, location: PottyLocation) -> Event {
        Event::new(id(event_id), ts, EventKind::pee(Some(location)))
    }

    #[test]
    fn test_day_window_in_utc() {
        let window = today();
        assert_eq!(window.start, at(15, 0, 0));
        assert_eq!(window.end, at(16, 0, 0));
        assert!(window.contains(at(15, 23, 59)));
        assert!(!window.contains(at(16, 0, 0)));
    }

    #[test]
    fn test_day_window_with_offset() {
        let tz = chrono::FixedOffset::east_opt(2 * 3600).unwrap();
        let window = DayWindow::for_date(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(), &tz);
        assert_eq!(window.start, at(14, 22, 0));
        assert_eq!(window.end, at(15, 22, 0));
    }

    #[test]
    fn test_overnight_sleep_clipped_to_midnight() {
        let previous = vec![sleep("s1", at(14, 23, 0), "night")];
        let events = vec![wake("w1", at(15, 7, 0), "night")];

        let blocks = generate_blocks(
            &events,
            &today(),
            &previous,
            &TimelineConfig::default(),
            at(15, 12, 0),
        );

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].start(), at(15, 0, 0));
        assert_eq!(blocks[0].end(), at(15, 7, 0));
        assert_eq!(blocks[0].minutes(), 7 * 60);
    }

    #[test]
    fn test_ongoing_sleep_today_ends_now() {
        let events = vec![sleep("s1", at(15, 13, 0), "nap")];
        let blocks = generate_blocks(
            &events,
            &today(),
            &[],
            &TimelineConfig::default(),
            at(15, 14, 30),
        );

        let ActivityBlock::Sleep { end, ongoing, .. } = &blocks[0] else {
            panic!("expected sleep block");
        };
        assert_eq!(*end, at(15, 14, 30));
        assert!(*ongoing);
    }

    #[test]
    fn test_ongoing_sleep_on_past_day_ends_at_day_end() {
        let events = vec![sleep("s1", at(15, 22, 0), "night")];
        let blocks = generate_blocks(
            &events,
            &today(),
            &[],
            &TimelineConfig::default(),
            at(16, 3, 0),
        );

        assert_eq!(blocks[0].end(), at(16, 0, 0));
        assert!(matches!(blocks[0], ActivityBlock::Sleep { ongoing: false, .. }));
    }

    #[test]
    fn test_sleep_closed_next_day_is_not_ongoing() {
        let events = vec![
            sleep("s1", at(15, 22, 0), "night"),
            wake("w1", at(16, 6, 0), "night"),
        ];
        let blocks = generate_blocks(
            &events,
            &today(),
            &[],
            &TimelineConfig::default(),
            at(16, 12, 0),
        );

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].start(), at(15, 22, 0));
        assert_eq!(blocks[0].end(), at(16, 0, 0));
        assert!(matches!(blocks[0], ActivityBlock::Sleep { ongoing: false, .. }));
    }

    #[test]
    fn test_walk_uses_default_duration_and_children() {
        let walk_id = id("walk-1");
        let events = vec![
            walk("walk-1", at(15, 8, 0), None),
            Event::new(
                id("p1"),
                at(15, 8, 10),
                EventKind::Pee(PottyDetails::new(Some(PottyLocation::Outdoor)).on_walk(walk_id)),
            ),
        ];
        let blocks = generate_blocks(
            &events,
            &today(),
            &[],
            &TimelineConfig::default(),
            at(15, 12, 0),
        );

        assert_eq!(blocks.len(), 2);
        let ActivityBlock::Walk {
            end,
            potty_count,
            ongoing,
            ..
        } = &blocks[0]
        else {
            panic!("expected walk block first");
        };
        assert_eq!(*end, at(15, 8, 20));
        assert_eq!(*potty_count, 1);
        assert!(!*ongoing);
        assert!(matches!(
            blocks[1],
            ActivityBlock::Potty {
                during_walk: true,
                ..
            }
        ));
    }

    #[test]
    fn test_walk_in_progress_is_clipped_to_now() {
        let events = vec![walk("walk-1", at(15, 8, 0), Some(60))];
        let blocks = generate_blocks(
            &events,
            &today(),
            &[],
            &TimelineConfig::default(),
            at(15, 8, 15),
        );

        let ActivityBlock::Walk { end, ongoing, .. } = &blocks[0] else {
            panic!("expected walk block");
        };
        assert_eq!(*end, at(15, 8, 15));
        assert!(*ongoing);
    }

    #[test]
    fn test_duration_blocks_never_overlap() {
        let events = vec![
            sleep("s1", at(15, 9, 0), "a"),
            wake("w1", at(15, 10, 0), "a"),
            walk("walk-1", at(15, 9, 30), Some(60)),
            walk("walk-2", at(15, 9, 40), Some(10)),
        ];
        let blocks = generate_blocks(
            &events,
            &today(),
            &[],
            &TimelineConfig::default(),
            at(15, 20, 0),
        );

        let durations: Vec<_> = blocks.iter().filter(|b| b.is_duration()).collect();
        assert_eq!(durations.len(), 2);
        for pair in durations.windows(2) {
            assert!(pair[0].end() <= pair[1].start());
        }
        assert_eq!(durations[1].start(), at(15, 10, 0));
        assert_eq!(durations[1].end(), at(15, 10, 30));
    }

    #[test]
    fn test_duplicate_events_across_days_counted_once() {
        let meal = Event::new(id("m1"), at(15, 8, 0), EventKind::Meal);
        let blocks = generate_blocks(
            &[meal.clone()],
            &today(),
            &[meal],
            &TimelineConfig::default(),
            at(15, 12, 0),
        );
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn test_summary_totals() {
        let events = vec![
            sleep("s1", at(15, 9, 0), "a"),
            wake("w1", at(15, 10, 30), "a"),
            walk("walk-1", at(15, 11, 0), Some(25)),
            pee("p1", at(15, 11, 10), PottyLocation::Outdoor),
            pee("p2", at(15, 12, 0), PottyLocation::Indoor),
            pee("p3", at(15, 12, 30), PottyLocation::Unknown),
            Event::new(id("m1"), at(15, 8, 0), EventKind::Meal),
        ];
        let blocks = generate_blocks(
            &events,
            &today(),
            &[],
            &TimelineConfig::default(),
            at(15, 20, 0),
        );
        let summary = generate_summary(&blocks);

        assert_eq!(
            summary,
            ActivityBlockSummary {
                total_sleep_minutes: 90,
                walk_count: 1,
                total_walk_minutes: 25,
                outdoor_potty_count: 1,
                indoor_potty_count: 1,
                meal_count: 1,
            }
        );
    }

    #[test]
    fn test_bounds_without_blocks() {
        let window = today();
        assert_eq!(
            timeline_bounds(&[], &window, at(20, 0, 0)),
            (window.start, window.end)
        );

        let (start, end) = timeline_bounds(&[], &window, at(15, 9, 20));
        assert_eq!(start, window.start);
        assert_eq!(end, at(15, 10, 0));
    }

    #[test]
    fn test_bounds_cover_blocks_and_now() {
        let blocks = vec![
            ActivityBlock::Meal { at: at(15, 7, 45) },
            ActivityBlock::Walk {
                start: at(15, 9, 0),
                end: at(15, 9, 20),
                ongoing: false,
                walk: id("w"),
                potty_count: 0,
            },
        ];
        let (start, end) = timeline_bounds(&blocks, &today(), at(15, 13, 5));

        assert_eq!(start, at(15, 7, 0));
        assert_eq!(end, at(15, 14, 0));
        assert!(blocks.iter().all(|b| b.start() >= start && b.end() <= end));
    }
}
