//! Rolling-window potty patterns.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{Event, PottyLocation};
use crate::event_type::EventType;

/// Fewest potty events in a window before a success rate is shown.
pub const MIN_POTTY_EVENTS_FOR_RATE: usize = 5;

/// Rate change, in percentage points, that counts as a trend.
const TREND_THRESHOLD_POINTS: f64 = 5.0;

/// Direction of the outdoor success rate compared to the previous window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
    /// One of the windows has too little data.
    Unknown,
}

/// Potty statistics over a trailing window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternAnalysis {
    pub period_days: u32,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub potty_count: usize,
    pub outdoor_count: usize,
    pub indoor_count: usize,
    /// Too few potty events for a meaningful rate.
    pub insufficient_data: bool,
    /// Outdoor share of located potties, whatever the sample size.
    #[serde(skip)]
    raw_rate: Option<f64>,
    pub counts_by_type: BTreeMap<EventType, usize>,
    pub trend: Trend,
}

impl PatternAnalysis {
    /// Outdoor success rate in `[0, 1]`, withheld when data is insufficient.
    pub fn success_rate(&self) -> Option<f64> {
        if self.insufficient_data {
            None
        } else {
            self.raw_rate
        }
    }

    /// Success rate as a whole percentage, withheld when data is insufficient.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn success_percentage(&self) -> Option<u32> {
        self.success_rate().map(|rate| (rate * 100.0).round() as u32)
    }
}

struct WindowStats {
    potty_count: usize,
    outdoor_count: usize,
    indoor_count: usize,
    counts_by_type: BTreeMap<EventType, usize>,
}

impl WindowStats {
    fn collect(events: &[Event], start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let mut stats = Self {
            potty_count: 0,
            outdoor_count: 0,
            indoor_count: 0,
            counts_by_type: BTreeMap::new(),
        };

        for event in events.iter().filter(|e| e.timestamp > start && e.timestamp <= end) {
            *stats.counts_by_type.entry(event.event_type()).or_insert(0) += 1;
            match event.potty_location() {
                Some(PottyLocation::Outdoor) => stats.outdoor_count += 1,
                Some(PottyLocation::Indoor) => stats.indoor_count += 1,
                Some(PottyLocation::Unknown) | None => {}
            }
            if event.is_potty() {
                stats.potty_count += 1;
            }
        }

        stats
    }

    const fn sufficient(&self) -> bool {
        self.potty_count >= MIN_POTTY_EVENTS_FOR_RATE
    }

    #[allow(clippy::cast_precision_loss)]
    fn rate(&self) -> Option<f64> {
        let located = self.outdoor_count + self.indoor_count;
        (located > 0).then(|| self.outdoor_count as f64 / located as f64)
    }
}

/// Analyzes the trailing `period_days` ending at `now`.
///
/// The trend compares against the window of equal length just before it.
pub fn analyze_patterns(events: &[Event], period_days: u32, now: DateTime<Utc>) -> PatternAnalysis {
    let period = Duration::days(i64::from(period_days));
    let window_start = start_before(now, period);
    let current = WindowStats::collect(events, window_start, now);
    let previous = WindowStats::collect(events, start_before(window_start, period), window_start);

    let trend = match (current.rate(), previous.rate()) {
        (Some(now_rate), Some(before)) if current.sufficient() && previous.sufficient() => {
            let delta = (now_rate - before) * 100.0;
            if delta > TREND_THRESHOLD_POINTS {
                Trend::Improving
            } else if delta < -TREND_THRESHOLD_POINTS {
                Trend::Declining
            } else {
                Trend::Stable
            }
        }
        _ => Trend::Unknown,
    };

    PatternAnalysis {
        period_days,
        window_start,
        window_end: now,
        potty_count: current.potty_count,
        outdoor_count: current.outdoor_count,
        indoor_count: current.indoor_count,
        insufficient_data: !current.sufficient(),
        raw_rate: current.rate(),
        counts_by_type: current.counts_by_type,
        trend,
    }
}

/// `end - period`, saturating at the earliest representable instant.
fn start_before(end: DateTime<Utc>, period: Duration) -> DateTime<Utc> {
    end.checked_sub_signed(period).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::types::EventId;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 20, 0, 0).unwrap()
    }

    fn pee(n: usize, days_ago: i64, location: PottyLocation) -> Event {
        Event::new(
            EventId::new(format!("p{n}-{days_ago}")).unwrap(),
            now() - Duration::days(days_ago) + Duration::minutes(i64::try_from(n).unwrap()),
            EventKind::pee(Some(location)),
        )
    }

    fn potties(days_ago: i64, outdoor: usize, indoor: usize) -> Vec<Event> {
        let mut events: Vec<_> = (0..outdoor)
            .map(|n| pee(n, days_ago, PottyLocation::Outdoor))
            .collect();
        events.extend((outdoor..outdoor + indoor).map(|n| pee(n, days_ago, PottyLocation::Indoor)));
        events
    }

    #[test]
    fn test_small_sample_is_insufficient() {
        let events = potties(1, 3, 0);
        let analysis = analyze_patterns(&events, 7, now());

        assert_eq!(analysis.potty_count, 3);
        assert!(analysis.insufficient_data);
        assert_eq!(analysis.success_rate(), None);
        assert_eq!(analysis.success_percentage(), None);
    }

    #[test]
    fn test_success_rate_with_enough_data() {
        let events = potties(2, 4, 1);
        let analysis = analyze_patterns(&events, 7, now());

        assert!(!analysis.insufficient_data);
        assert_eq!(analysis.success_percentage(), Some(80));
        assert_eq!(analysis.outdoor_count, 4);
        assert_eq!(analysis.indoor_count, 1);
    }

    #[test]
    fn test_events_outside_window_excluded() {
        let mut events = potties(2, 5, 0);
        events.extend(potties(10, 0, 5));
        let analysis = analyze_patterns(&events, 7, now());

        assert_eq!(analysis.potty_count, 5);
        assert_eq!(analysis.success_percentage(), Some(100));
    }

    #[test]
    fn test_counts_by_type() {
        let mut events = potties(1, 2, 0);
        events.push(Event::new(
            EventId::new("m1").unwrap(),
            now() - Duration::hours(3),
            EventKind::Meal,
        ));
        let analysis = analyze_patterns(&events, 7, now());

        assert_eq!(analysis.counts_by_type.get(&EventType::Pee), Some(&2));
        assert_eq!(analysis.counts_by_type.get(&EventType::Meal), Some(&1));
        assert_eq!(analysis.counts_by_type.get(&EventType::Walk), None);
    }

    #[test]
    fn test_trend_improving() {
        let mut events = potties(2, 5, 0);
        events.extend(potties(9, 3, 2));
        let analysis = analyze_patterns(&events, 7, now());

        assert_eq!(analysis.trend, Trend::Improving);
    }

    #[test]
    fn test_trend_declining_and_stable() {
        let mut events = potties(2, 3, 2);
        events.extend(potties(9, 5, 0));
        assert_eq!(analyze_patterns(&events, 7, now()).trend, Trend::Declining);

        let mut events = potties(2, 4, 1);
        events.extend(potties(9, 4, 1));
        assert_eq!(analyze_patterns(&events, 7, now()).trend, Trend::Stable);
    }

    #[test]
    fn test_trend_unknown_without_previous_data() {
        let events = potties(2, 5, 0);
        assert_eq!(analyze_patterns(&events, 7, now()).trend, Trend::Unknown);
    }

    #[test]
    fn test_huge_period_saturates() {
        let events = potties(2, 4, 1);
        let analysis = analyze_patterns(&events, u32::MAX, now());

        assert_eq!(analysis.window_start, DateTime::<Utc>::MIN_UTC);
        assert_eq!(analysis.potty_count, 5);
        assert_eq!(analysis.trend, Trend::Unknown);
    }
}
