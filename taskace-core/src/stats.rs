//! Read-side projections over the task pool.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::scoring::days_until;
use crate::task::Task;
use crate::time::{local_date, local_today};

/// A task is "due soon" within this many days (rounded up).
pub const DUE_SOON_DAYS: i64 = 2;

/// Tasks whose deadline falls on local today, completed or not.
pub fn tasks_due_today(tasks: &[Task], now: DateTime<Utc>, tz: Tz) -> Vec<&Task> {
    let today = local_today(now, tz);
    tasks
        .iter()
        .filter(|t| local_date(t.deadline, tz) == today)
        .collect()
}

/// Tasks completed on the given local date.
pub fn tasks_completed_on(tasks: &[Task], date: NaiveDate, tz: Tz) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|t| t.completed_at.is_some_and(|at| local_date(at, tz) == date))
        .collect()
}

pub fn completed_tasks(tasks: &[Task]) -> Vec<&Task> {
    tasks.iter().filter(|t| t.completed).collect()
}

/// Rounded percentage of completed tasks; 0 for an empty pool.
pub fn completion_rate(tasks: &[Task]) -> u8 {
    let total = tasks.len();
    if total == 0 {
        return 0;
    }
    let done = tasks.iter().filter(|t| t.completed).count();
    // round half up
    ((200 * done + total) / (2 * total)) as u8
}

pub fn is_due_soon(task: &Task, now: DateTime<Utc>) -> bool {
    !task.completed && days_until(task.deadline, now) <= DUE_SOON_DAYS
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskQuery {
    /// Case-insensitive substring of title or description.
    pub text: Option<String>,
    /// Exact category match.
    pub category: Option<String>,
}

impl TaskQuery {
    pub fn matches(&self, task: &Task) -> bool {
        let text_ok = match &self.text {
            Some(q) if !q.trim().is_empty() => {
                let q = q.trim().to_lowercase();
                task.title.to_lowercase().contains(&q)
                    || task.description.to_lowercase().contains(&q)
            }
            _ => true,
        };
        let category_ok = self
            .category
            .as_deref()
            .is_none_or(|c| task.category == c);
        text_ok && category_ok
    }
}

/// Matching tasks, pending first, then High → Low. Stable otherwise.
pub fn search<'a>(tasks: &'a [Task], query: &TaskQuery) -> Vec<&'a Task> {
    let mut out: Vec<&Task> = tasks.iter().filter(|t| query.matches(t)).collect();
    out.sort_by(|a, b| {
        a.completed
            .cmp(&b.completed)
            .then_with(|| b.priority.rank().cmp(&a.priority.rank()))
    });
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub completion_rate: u8,
    pub due_today: usize,
    pub due_soon: usize,
    pub points: i64,
    pub points_progress: u8,
    pub next_milestone: Option<i64>,
}
