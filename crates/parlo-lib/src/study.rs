//! Daily study-time accumulator.
//!
//! Whole minutes of drill time, persisted to a single JSON record that is
//! overwritten on every update and reset when the wall-clock date changes.
//! The clock comes in as a parameter so tests can steer it.

use std::path::PathBuf;

use chrono::{DateTime, Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// The persisted shape: `{"date": "YYYY-MM-DD", "time": <minutes>}`.
#[derive(Debug, Serialize, Deserialize)]
struct StudyTimeRecord {
    date: String,
    time: u32,
}

pub struct StudyTimeAccumulator {
    /// `None` keeps the accumulator purely in memory (tests, `--no-persist`).
    path: Option<PathBuf>,
    date: NaiveDate,
    minutes: u32,
    /// Seconds observed but not yet converted to a whole minute.
    carry_secs: i64,
    last_tick: Option<DateTime<Local>>,
}

impl StudyTimeAccumulator {
    /// Load today's total from disk; a stale or unreadable record starts
    /// the day at zero.
    pub fn load(path: PathBuf, now: DateTime<Local>) -> Self {
        let today = now.date_naive();
        let minutes = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<StudyTimeRecord>(&contents) {
                Ok(record) if record.date == format_date(today) => record.time,
                Ok(_) => 0,
                Err(e) => {
                    warn!("malformed study-time record, starting at zero: {e}");
                    0
                }
            },
            Err(_) => 0,
        };
        Self {
            path: Some(path),
            date: today,
            minutes,
            carry_secs: 0,
            last_tick: None,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            date: Local::now().date_naive(),
            minutes: 0,
            carry_secs: 0,
            last_tick: None,
        }
    }

    /// Record elapsed time up to `now`. Called at least once per sentence
    /// boundary. Every accumulated whole minute is persisted immediately;
    /// the first tick of a new calendar day resets the total before adding.
    pub fn tick(&mut self, now: DateTime<Local>) {
        let elapsed = self
            .last_tick
            .map(|last| (now - last).num_seconds().max(0))
            .unwrap_or(0);
        self.last_tick = Some(now);

        let today = now.date_naive();
        if today != self.date {
            debug!(old = %self.date, new = %today, "date rollover, study time reset");
            self.date = today;
            self.minutes = 0;
            self.carry_secs = 0;
        }

        self.carry_secs += elapsed;
        if self.carry_secs >= 60 {
            self.minutes += (self.carry_secs / 60) as u32;
            self.carry_secs %= 60;
            self.persist();
        }
    }

    pub fn minutes_today(&self) -> u32 {
        self.minutes
    }

    /// Overwrite the record. Failure is reported, never fatal — the
    /// in-memory total stays authoritative for the rest of the process.
    fn persist(&self) {
        let Some(path) = &self.path else { return };
        let record = StudyTimeRecord {
            date: format_date(self.date),
            time: self.minutes,
        };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let result = serde_json::to_string(&record)
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(path, json).map_err(|e| e.to_string()));
        if let Err(e) = result {
            warn!("failed to persist study time: {e}");
        }
    }
}

fn format_date(date: NaiveDate) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn ninety_seconds_is_one_minute() {
        let mut acc = StudyTimeAccumulator::in_memory();
        acc.tick(at(2026, 3, 1, 10, 0, 0));
        acc.tick(at(2026, 3, 1, 10, 1, 30));
        assert_eq!(acc.minutes_today(), 1);
    }

    #[test]
    fn remainder_carries_into_the_next_tick() {
        let mut acc = StudyTimeAccumulator::in_memory();
        acc.tick(at(2026, 3, 1, 10, 0, 0));
        acc.tick(at(2026, 3, 1, 10, 0, 45));
        assert_eq!(acc.minutes_today(), 0);
        acc.tick(at(2026, 3, 1, 10, 1, 30)); // 45 + 45 = 90 s total
        assert_eq!(acc.minutes_today(), 1);
    }

    #[test]
    fn date_rollover_resets_before_adding() {
        let mut acc = StudyTimeAccumulator::in_memory();
        acc.tick(at(2026, 3, 1, 23, 50, 0));
        acc.tick(at(2026, 3, 1, 23, 56, 0));
        assert_eq!(acc.minutes_today(), 6);

        // 120 s later, across midnight: total resets, then the elapsed
        // time lands in the fresh day.
        acc.tick(at(2026, 3, 2, 0, 1, 0));
        assert_eq!(acc.minutes_today(), 2);
    }

    #[test]
    fn backwards_clock_adds_nothing() {
        let mut acc = StudyTimeAccumulator::in_memory();
        acc.tick(at(2026, 3, 1, 10, 5, 0));
        acc.tick(at(2026, 3, 1, 10, 3, 0));
        assert_eq!(acc.minutes_today(), 0);
    }

    #[test]
    fn persists_and_reloads_same_day() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("study_time.json");

        let mut acc = StudyTimeAccumulator::load(path.clone(), at(2026, 3, 1, 10, 0, 0));
        acc.tick(at(2026, 3, 1, 10, 0, 0));
        acc.tick(at(2026, 3, 1, 10, 3, 0));
        assert_eq!(acc.minutes_today(), 3);

        let reloaded = StudyTimeAccumulator::load(path.clone(), at(2026, 3, 1, 12, 0, 0));
        assert_eq!(reloaded.minutes_today(), 3);

        // A new day ignores the stale record.
        let next_day = StudyTimeAccumulator::load(path, at(2026, 3, 2, 9, 0, 0));
        assert_eq!(next_day.minutes_today(), 0);
    }

    #[test]
    fn record_shape_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("study_time.json");

        let mut acc = StudyTimeAccumulator::load(path.clone(), at(2026, 3, 1, 10, 0, 0));
        acc.tick(at(2026, 3, 1, 10, 0, 0));
        acc.tick(at(2026, 3, 1, 10, 2, 0));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["date"], "2026-03-01");
        assert_eq!(json["time"], 2);
    }
}
