//! Slot allocator: packs one calendar day.
//!
//! Greedy, first-unplaced-task-or-nothing:
//! 1) stable-sort the day's blocks by slot preference score (desc)
//! 2) per block, walk a cursor from the block start
//! 3) place the queue head if it fits, then advance by duration + break
//! 4) the first task that does not fit ends the block (no look-ahead)
//!
//! The break is added after every placed task, including the last one in a
//! block. That trailing slack is part of the heuristic and is kept as is.

use std::collections::VecDeque;

use chrono::NaiveDate;
use tracing::debug;

use crate::planner::ScheduledAssignment;
use crate::preferences::UserPreferences;
use crate::scoring::slot_preference_score;
use crate::task::Task;
use crate::template::TimeBlock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    start: u32,
    end: u32,
    score: u32,
}

/// Per-day working copy of the candidate blocks, best slots first.
fn ranked_slots(blocks: &[TimeBlock], prefs: &UserPreferences) -> Vec<Slot> {
    let mut slots: Vec<Slot> = blocks
        .iter()
        .filter_map(|b| match b.span() {
            Ok((start, end)) => Some(Slot {
                start,
                end,
                score: slot_preference_score(start, prefs.preferred_study_time),
            }),
            Err(e) => {
                debug!(block = %b, error = %e, "skipping malformed block");
                None
            }
        })
        .collect();

    // stable: equal scores keep template order
    slots.sort_by(|a, b| b.score.cmp(&a.score));
    slots
}

/// Place tasks from the front of `queue` into `date`'s blocks.
///
/// `queue` must already be in global weight order; placed tasks are popped
/// and the residual stays in the queue for the next day. `already_placed`
/// counts assignments on `date` made earlier in the same run and counts
/// toward `max_tasks_per_day`.
pub fn allocate_day(
    date: NaiveDate,
    blocks: &[TimeBlock],
    queue: &mut VecDeque<&Task>,
    prefs: &UserPreferences,
    already_placed: usize,
) -> Vec<ScheduledAssignment> {
    let cap = prefs.max_tasks_per_day as usize;
    let mut placed = already_placed;
    let mut out = Vec::new();

    for slot in ranked_slots(blocks, prefs) {
        if placed >= cap || queue.is_empty() {
            break;
        }

        let mut cursor = slot.start;
        while cursor < slot.end && placed < cap {
            let Some(task) = queue.front() else { break };

            let duration = task.duration_or(prefs.study_session_duration);
            let end = cursor.saturating_add(duration);
            if end > slot.end {
                break;
            }

            out.push(ScheduledAssignment::new(task, date, cursor, end));
            queue.pop_front();
            placed += 1;
            cursor = end.saturating_add(prefs.break_duration);
        }
    }

    out
}
