//! Streak command for showing outdoor potty streaks.

use std::io::Write;

use anyhow::Result;
use pup_core::{EventLog, StreakInfo, get_streak_info};
use pup_db::Database;

pub fn run<W: Write>(writer: &mut W, db: &Database) -> Result<()> {
    let info = get_streak_info(&db.all_events()?);
    write!(writer, "{}", format_streak(info))?;
    Ok(())
}

pub fn format_streak(info: StreakInfo) -> String {
    let mut output = format!(
        "Current streak: {} outdoor in a row\nBest streak:    {}\n",
        info.current_streak, info.best_streak
    );
    if info.is_personal_best() {
        output.push_str("New personal best!\n");
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use insta::assert_snapshot;
    use pup_core::{Event, EventId, EventKind, PottyLocation};

    #[test]
    fn streak_output() {
        let info = StreakInfo {
            current_streak: 1,
            best_streak: 2,
        };
        assert_snapshot!(format_streak(info), @r"
        Current streak: 1 outdoor in a row
        Best streak:    2
        ");
    }

    #[test]
    fn streak_from_database() {
        let mut db = Database::open_in_memory().unwrap();
        let start = Utc.with_ymd_and_hms(2025, 1, 15, 8, 0, 0).unwrap();
        for (i, location) in [PottyLocation::Indoor, PottyLocation::Outdoor, PottyLocation::Outdoor]
            .into_iter()
            .enumerate()
        {
            let minutes = i64::try_from(i).unwrap() * 60;
            db.add_event(Event::new(
                EventId::new(format!("p{i}")).unwrap(),
                start + Duration::minutes(minutes),
                EventKind::pee(Some(location)),
            ))
            .unwrap();
        }

        let mut output = Vec::new();
        run(&mut output, &db).unwrap();
        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        Current streak: 2 outdoor in a row
        Best streak:    2
        New personal best!
        ");
    }
}
