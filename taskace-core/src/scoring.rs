//! Scoring: task weight for global ordering, slot desirability for time-of-day.
//!
//! Weight = 3·priority + 2·deadline + category + duration. Higher weight is
//! scheduled first; equal weights keep the order the pool holds them in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::preferences::StudyTime;
use crate::task::{Priority, Task};
use crate::time::MINUTES_PER_DAY;

/// Category with the largest tie-break bonus.
pub const PRIMARY_CATEGORY: &str = "Education";
/// Category with the secondary bonus.
pub const SECONDARY_CATEGORY: &str = "Personal";

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

pub fn priority_score(priority: Priority) -> u32 {
    match priority {
        Priority::High => 10,
        Priority::Medium => 5,
        Priority::Low => 1,
    }
}

/// Whole days until `deadline`, rounded up; zero when due or overdue.
pub fn days_until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let ms = (deadline - now).num_milliseconds();
    if ms <= 0 {
        0
    } else {
        (ms + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
    }
}

/// 10 for due today or overdue, one point less per day out, floored at 0.
pub fn deadline_score(deadline: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    (10 - days_until(deadline, now)).clamp(0, 10) as u32
}

pub fn category_score(category: &str) -> u32 {
    match category {
        PRIMARY_CATEGORY => 3,
        SECONDARY_CATEGORY => 2,
        _ => 1,
    }
}

/// Known durations pack predictably, so they get a small bonus.
pub fn duration_score(task: &Task) -> u32 {
    u32::from(task.estimated_duration.is_some())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightBreakdown {
    pub priority: u32,
    pub deadline: u32,
    pub category: u32,
    pub duration: u32,
    pub total: u32,
}

pub fn weigh(task: &Task, now: DateTime<Utc>) -> WeightBreakdown {
    let priority = priority_score(task.priority);
    let deadline = deadline_score(task.deadline, now);
    let category = category_score(&task.category);
    let duration = duration_score(task);
    WeightBreakdown {
        priority,
        deadline,
        category,
        duration,
        total: 3 * priority + 2 * deadline + category + duration,
    }
}

pub fn task_weight(task: &Task, now: DateTime<Utc>) -> u32 {
    weigh(task, now).total
}

/// Order tasks by weight, highest first. Stable: ties keep input order.
pub fn order_by_weight<'a, I>(tasks: I, now: DateTime<Utc>) -> Vec<&'a Task>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut weighted: Vec<(u32, &Task)> = tasks
        .into_iter()
        .map(|t| (task_weight(t, now), t))
        .collect();
    // sort_by is stable
    weighted.sort_by(|a, b| b.0.cmp(&a.0));
    weighted.into_iter().map(|(_, t)| t).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBucket {
    Morning,
    Afternoon,
    Evening,
    Night,
}

/// Morning [05:00,12:00), afternoon [12:00,17:00), evening [17:00,22:00),
/// night [22:00,05:00).
pub fn time_bucket(minute: u32) -> TimeBucket {
    match minute % MINUTES_PER_DAY {
        300..=719 => TimeBucket::Morning,
        720..=1019 => TimeBucket::Afternoon,
        1020..=1319 => TimeBucket::Evening,
        _ => TimeBucket::Night,
    }
}

/// 3 for the preferred bucket, 2/1 for its neighbours, 0 otherwise.
pub fn slot_preference_score(slot_start_minute: u32, preferred: StudyTime) -> u32 {
    use TimeBucket::*;

    let bucket = time_bucket(slot_start_minute);
    match (preferred, bucket) {
        (StudyTime::Morning, Morning) => 3,
        (StudyTime::Morning, Afternoon) => 2,
        (StudyTime::Morning, Evening) => 1,

        (StudyTime::Afternoon, Afternoon) => 3,
        (StudyTime::Afternoon, Evening) => 2,
        (StudyTime::Afternoon, Morning) => 1,

        (StudyTime::Evening, Evening) => 3,
        (StudyTime::Evening, Afternoon) => 2,
        (StudyTime::Evening, Morning) => 1,

        (StudyTime::Night, Night) => 3,
        (StudyTime::Night, Evening) => 2,
        (StudyTime::Night, Afternoon) => 1,

        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_deadline_score_counts_days_rounded_up() {
        let now = now();
        assert_eq!(deadline_score(now, now), 10);
        assert_eq!(deadline_score(now - Duration::days(3), now), 10);
        // 1 minute away rounds up to 1 day
        assert_eq!(deadline_score(now + Duration::minutes(1), now), 9);
        assert_eq!(deadline_score(now + Duration::days(1), now), 9);
        assert_eq!(deadline_score(now + Duration::hours(25), now), 8);
        assert_eq!(deadline_score(now + Duration::days(10), now), 0);
        assert_eq!(deadline_score(now + Duration::days(40), now), 0);
    }

    #[test]
    fn test_weight_formula() {
        let now = now();
        let t = Task::new("a", "essay", now, now)
            .with_priority(Priority::High)
            .with_category("Education")
            .with_duration(45);
        let w = weigh(&t, now);
        assert_eq!(w.priority, 10);
        assert_eq!(w.deadline, 10);
        assert_eq!(w.category, 3);
        assert_eq!(w.duration, 1);
        assert_eq!(w.total, 30 + 20 + 3 + 1);

        let low = Task::new("b", "chores", now + Duration::days(12), now)
            .with_priority(Priority::Low)
            .with_category("Household");
        assert_eq!(task_weight(&low, now), 3 + 0 + 1 + 0);
    }

    #[test]
    fn test_order_by_weight_is_stable_on_ties() {
        let now = now();
        let a = Task::new("a", "first", now, now);
        let b = Task::new("b", "second", now, now);
        let c = Task::new("c", "urgent", now, now).with_priority(Priority::High);
        let pool = vec![a, b, c];
        let ids: Vec<&str> = order_by_weight(&pool, now)
            .into_iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_buckets_and_night_wrap() {
        assert_eq!(time_bucket(5 * 60), TimeBucket::Morning);
        assert_eq!(time_bucket(12 * 60 - 1), TimeBucket::Morning);
        assert_eq!(time_bucket(12 * 60), TimeBucket::Afternoon);
        assert_eq!(time_bucket(17 * 60), TimeBucket::Evening);
        assert_eq!(time_bucket(22 * 60), TimeBucket::Night);
        assert_eq!(time_bucket(2 * 60), TimeBucket::Night);
        assert_eq!(time_bucket(4 * 60 + 59), TimeBucket::Night);
    }

    #[test]
    fn test_preference_table() {
        let morning = 9 * 60;
        let afternoon = 14 * 60;
        let evening = 19 * 60;
        let night = 23 * 60;

        let row = |p| {
            [
                slot_preference_score(morning, p),
                slot_preference_score(afternoon, p),
                slot_preference_score(evening, p),
                slot_preference_score(night, p),
            ]
        };
        assert_eq!(row(StudyTime::Morning), [3, 2, 1, 0]);
        assert_eq!(row(StudyTime::Afternoon), [1, 3, 2, 0]);
        assert_eq!(row(StudyTime::Evening), [1, 2, 3, 0]);
        assert_eq!(row(StudyTime::Night), [0, 1, 2, 3]);
    }
}
