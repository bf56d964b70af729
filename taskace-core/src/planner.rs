//! Horizon planner: runs the slot allocator over a rolling 7-day window.
//!
//! The schedule is a pure projection of (pool, template, preferences, now).
//! It is recomputed from scratch on every change and never patched.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::allocator::allocate_day;
use crate::preferences::UserPreferences;
use crate::scoring::order_by_weight;
use crate::task::Task;
use crate::template::DayTemplate;
use crate::time::{format_hhmm, local_today};

/// Days planned, starting with local today.
pub const HORIZON_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledAssignment {
    pub task_id: String,
    pub title: String,
    /// Local calendar date.
    pub date: NaiveDate,
    /// Minutes since local midnight, half-open `[start, end)`.
    pub start_minute: u32,
    pub end_minute: u32,
}

impl ScheduledAssignment {
    pub fn new(task: &Task, date: NaiveDate, start_minute: u32, end_minute: u32) -> Self {
        Self {
            task_id: task.id.clone(),
            title: task.title.clone(),
            date,
            start_minute,
            end_minute,
        }
    }

    pub fn start_time(&self) -> String {
        format_hhmm(self.start_minute)
    }

    pub fn end_time(&self) -> String {
        format_hhmm(self.end_minute)
    }

    /// "HH:MM - HH:MM"
    pub fn time_slot(&self) -> String {
        format!("{} - {}", self.start_time(), self.end_time())
    }

    pub fn overlaps(&self, other: &ScheduledAssignment) -> bool {
        self.date == other.date
            && self.start_minute < other.end_minute
            && other.start_minute < self.end_minute
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Local date of day 0; `None` until the first plan.
    pub generated_for: Option<NaiveDate>,
    /// Ordered by day, then by placement order within the day.
    pub assignments: Vec<ScheduledAssignment>,
    /// Pending tasks that found no slot within the horizon, in weight order.
    pub unplaced: Vec<String>,
}

impl Schedule {
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn on(&self, date: NaiveDate) -> impl Iterator<Item = &ScheduledAssignment> {
        self.assignments.iter().filter(move |a| a.date == date)
    }

    pub fn count_on(&self, date: NaiveDate) -> usize {
        self.on(date).count()
    }

    pub fn for_task(&self, task_id: &str) -> Option<&ScheduledAssignment> {
        self.assignments.iter().find(|a| a.task_id == task_id)
    }

    /// Distinct dates with at least one assignment, in order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut out: Vec<NaiveDate> = Vec::new();
        for a in &self.assignments {
            if out.last() != Some(&a.date) {
                out.push(a.date);
            }
        }
        out
    }
}

/// Inputs to one planning run.
#[derive(Debug, Clone, Copy)]
pub struct PlanInput<'a> {
    pub tasks: &'a [Task],
    pub template: Option<&'a DayTemplate>,
    pub preferences: &'a UserPreferences,
    pub now: DateTime<Utc>,
    pub timezone: Tz,
}

/// Compute the schedule for the next [`HORIZON_DAYS`] days.
///
/// Completed tasks are ignored. Weights are computed once against `now`,
/// not per day. Without an active template nothing is placed.
pub fn plan_horizon(input: PlanInput<'_>) -> Schedule {
    let today = local_today(input.now, input.timezone);
    let pending = input.tasks.iter().filter(|t| t.is_pending());
    let mut queue: VecDeque<&Task> = order_by_weight(pending, input.now).into();

    let mut assignments: Vec<ScheduledAssignment> = Vec::new();

    if let Some(template) = input.template {
        let blocks = template.schedulable_blocks();
        let cap = input.preferences.max_tasks_per_day as usize;

        for offset in 0..HORIZON_DAYS {
            if queue.is_empty() {
                break;
            }
            let date = today + Duration::days(offset);

            let already = assignments.iter().filter(|a| a.date == date).count();
            if already >= cap {
                continue;
            }

            let day = allocate_day(date, &blocks, &mut queue, input.preferences, already);
            debug!(%date, placed = day.len(), remaining = queue.len(), "planned day");
            assignments.extend(day);
        }
    }

    let unplaced: Vec<String> = queue.into_iter().map(|t| t.id.clone()).collect();
    debug!(
        template = input.template.map(|t| t.name.as_str()).unwrap_or("<none>"),
        placed = assignments.len(),
        unplaced = unplaced.len(),
        "recomputed schedule"
    );

    Schedule {
        generated_for: Some(today),
        assignments,
        unplaced,
    }
}
