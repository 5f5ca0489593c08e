//! Lookback windows for the standup and today reports.
//!
//! Everything here is a pure function of the `now` argument. Weekdays and
//! calendar days are evaluated in the timezone `now` carries.
//!
//! The standup window covers exactly one calendar day: the lookback day.
//! On Monday that is Friday, so work finished over the weekend is not
//! reported; on any other day it is the previous day.

use chrono::{DateTime, Datelike, Days, Duration, NaiveTime, TimeZone, Utc, Weekday};

use crate::task::Task;

pub const MONDAY_LOOKBACK_DAYS: u64 = 3;
pub const DEFAULT_LOOKBACK_DAYS: u64 = 1;

pub fn lookback_days(weekday: Weekday) -> u64 {
    match weekday {
        Weekday::Mon => MONDAY_LOOKBACK_DAYS,
        _ => DEFAULT_LOOKBACK_DAYS,
    }
}

/// `now` minus the lookback days, keeping the time of day.
pub fn compute_lookback_date<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let days = lookback_days(now.weekday());
    now.clone()
        .checked_sub_days(Days::new(days))
        .unwrap_or_else(|| now.clone() - Duration::days(days as i64))
}

/// Midnight at the start of the calendar day of `at`, in its own timezone.
pub fn start_of_day<Tz: TimeZone>(at: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = at.timezone();
    let midnight = at.date_naive().and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&midnight))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandupWindow<Tz: TimeZone> {
    /// Label for the report: the lookback date with the caller's time of day.
    pub lookback: DateTime<Tz>,
    /// Exclusive lower bound: start of the lookback day.
    pub start: DateTime<Utc>,
    /// Exclusive upper bound: start of the day after the lookback day.
    pub end: DateTime<Utc>,
}

impl<Tz: TimeZone> StandupWindow<Tz> {
    pub fn for_time(now: &DateTime<Tz>) -> Self {
        let lookback = compute_lookback_date(now);
        let start = start_of_day(&lookback);
        let end = lookback
            .clone()
            .checked_add_days(Days::new(1))
            .map(|next| start_of_day(&next))
            .unwrap_or_else(|| start.clone() + Duration::days(1));
        Self {
            lookback,
            start: start.with_timezone(&Utc),
            end: end.with_timezone(&Utc),
        }
    }

    pub fn contains(&self, task: &Task) -> bool {
        task.completed_after(self.start)
            && task
                .completed_at
                .map(|completed| completed < self.end)
                .unwrap_or(false)
    }
}

/// Descriptions of tasks completed inside the standup window, in input
/// order, plus the lookback date used as the report label.
pub fn standup_tasks<Tz: TimeZone>(
    tasks: &[Task],
    now: &DateTime<Tz>,
) -> (Vec<String>, DateTime<Tz>) {
    let window = StandupWindow::for_time(now);
    let selected = tasks
        .iter()
        .filter(|task| window.contains(task))
        .map(|task| task.task.clone())
        .collect();
    (selected, window.lookback)
}

/// Descriptions of every pending task. `now` is only echoed back as a label.
pub fn today_tasks<Tz: TimeZone>(
    tasks: &[Task],
    now: &DateTime<Tz>,
) -> (Vec<String>, DateTime<Tz>) {
    let pending = tasks
        .iter()
        .filter(|task| task.is_pending())
        .map(|task| task.task.clone())
        .collect();
    (pending, now.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use pretty_assertions::assert_eq;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn item(name: &str, done: bool, completed_at: DateTime<Utc>) -> Task {
        Task {
            id: 0,
            task: name.to_string(),
            done,
            created_at: utc(2024, 9, 1, 0),
            completed_at: Some(completed_at),
        }
    }

    #[test]
    fn monday_looks_back_to_friday_only() {
        let monday = utc(2024, 9, 16, 0);
        let tasks = vec![
            item("Task 1", true, utc(2024, 9, 13, 14)),
            item("Task 2", true, utc(2024, 9, 14, 12)),
            item("Task 3", false, utc(2024, 9, 13, 11)),
        ];

        let (selected, lookback) = standup_tasks(&tasks, &monday);
        assert_eq!(lookback, utc(2024, 9, 13, 0));
        assert_eq!(selected, vec!["Task 1".to_string()]);
    }

    #[test]
    fn regular_day_looks_back_one_day() {
        let wednesday = utc(2024, 9, 18, 0);
        let tasks = vec![
            item("Task 1", true, utc(2024, 9, 17, 14)),
            item("Task 2", true, utc(2024, 9, 16, 12)),
            item("Task 3", false, utc(2024, 9, 17, 11)),
        ];

        let (selected, lookback) = standup_tasks(&tasks, &wednesday);
        assert_eq!(lookback, utc(2024, 9, 17, 0));
        assert_eq!(selected, vec!["Task 1".to_string()]);
    }

    #[test]
    fn lookback_keeps_time_of_day() {
        let monday_afternoon = utc(2024, 9, 16, 15);
        assert_eq!(compute_lookback_date(&monday_afternoon), utc(2024, 9, 13, 15));
        let sunday = utc(2024, 9, 15, 9);
        assert_eq!(compute_lookback_date(&sunday), utc(2024, 9, 14, 9));
    }

    #[test]
    fn window_spans_the_whole_lookback_day() {
        let window = StandupWindow::for_time(&utc(2024, 9, 18, 10));
        assert_eq!(window.start, utc(2024, 9, 17, 0));
        assert_eq!(window.end, utc(2024, 9, 18, 0));

        let late = item("Late", true, utc(2024, 9, 17, 23) + Duration::minutes(59));
        let midnight = item("Midnight", true, utc(2024, 9, 17, 0));
        let next_day = item("Next", true, utc(2024, 9, 18, 0));
        assert!(window.contains(&late));
        assert!(!window.contains(&midnight));
        assert!(!window.contains(&next_day));

        let last_micro = item("Last", true, utc(2024, 9, 18, 0) - Duration::microseconds(1));
        assert!(window.contains(&last_micro));
    }

    #[test]
    fn window_uses_callers_timezone_for_day_boundaries() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        // Tuesday 01:00 at UTC-5 is Tuesday 06:00 UTC.
        let now = tz.with_ymd_and_hms(2024, 9, 17, 1, 0, 0).unwrap();
        let window = StandupWindow::for_time(&now);
        assert_eq!(window.lookback, tz.with_ymd_and_hms(2024, 9, 16, 1, 0, 0).unwrap());
        assert_eq!(window.start, utc(2024, 9, 16, 5));
        assert_eq!(window.end, utc(2024, 9, 17, 5));

        // 02:00 UTC on the 16th is still Sunday evening in UTC-5.
        let sunday_local = item("Sunday", true, utc(2024, 9, 16, 2));
        assert!(!window.contains(&sunday_local));
    }

    #[test]
    fn today_returns_pending_tasks_and_echoes_time() {
        let wednesday = utc(2024, 9, 18, 0);
        let tasks = vec![
            item("Task 1", true, utc(2024, 9, 17, 14)),
            item("Task 2", false, utc(2024, 9, 16, 12)),
            item("Task 3", false, utc(2024, 9, 17, 11)),
        ];

        let (pending, label) = today_tasks(&tasks, &wednesday);
        assert_eq!(label, wednesday);
        assert_eq!(pending, vec!["Task 2".to_string(), "Task 3".to_string()]);
    }

    #[test]
    fn empty_input_yields_empty_reports() {
        let now = utc(2024, 9, 16, 9);
        assert!(standup_tasks(&[], &now).0.is_empty());
        assert!(today_tasks(&[], &now).0.is_empty());
    }
}
