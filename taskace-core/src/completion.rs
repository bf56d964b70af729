//! Completion state machine: Pending ⇄ Completed with a 30-second undo window.
//!
//! The window is checked lazily against the supplied clock when `uncomplete`
//! runs. Nothing here ticks; a displayed countdown comes from
//! [`remaining_undo_seconds`] and never changes task state.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::{TaskError, ValidationError};
use crate::ledger::{COMPLETION_REWARD, PointsLedger};
use crate::task::Task;

pub const UNDO_WINDOW_SECS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
    Pending,
    Completed { at: DateTime<Utc> },
}

pub fn state(task: &Task) -> CompletionState {
    match (task.completed, task.completed_at) {
        (true, Some(at)) => CompletionState::Completed { at },
        _ => CompletionState::Pending,
    }
}

/// Authoritative window check: elapsed ≤ 30s, inclusive.
pub fn can_undo(completed_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    (now - completed_at).num_milliseconds() <= UNDO_WINDOW_SECS * 1000
}

/// Seconds left in the undo window, rounded up, 0..=30. Advisory only.
///
/// Non-zero exactly when [`can_undo`] holds, so the last instant of the
/// window still reads 1.
pub fn remaining_undo_seconds(completed_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    if !can_undo(completed_at, now) {
        return 0;
    }
    let left_ms = UNDO_WINDOW_SECS * 1000 - (now - completed_at).num_milliseconds();
    ((left_ms + 999) / 1000).clamp(1, UNDO_WINDOW_SECS)
}

/// Restore `completed ⟺ completed_at.is_some()` and
/// `completed_at >= created_at` on a task read from storage.
///
/// A completed task missing its timestamp is stamped with `created_at`,
/// which keeps it completed and well outside the undo window. Returns
/// whether anything changed.
pub fn repair(task: &mut Task) -> bool {
    match (task.completed, task.completed_at) {
        (true, None) => {
            warn!(task_id = %task.id, "completed task without completed_at, stamping created_at");
            task.completed_at = Some(task.created_at);
            true
        }
        (false, Some(_)) => {
            warn!(task_id = %task.id, "pending task with completed_at, clearing it");
            task.completed_at = None;
            true
        }
        (true, Some(at)) if at < task.created_at => {
            warn!(task_id = %task.id, "completed_at precedes created_at, clamping");
            task.completed_at = Some(task.created_at);
            true
        }
        _ => false,
    }
}

/// Pending → Completed. Credits the ledger.
///
/// `completed_at` never precedes `created_at`, even with a skewed clock.
pub fn complete(
    task: &mut Task,
    ledger: &mut PointsLedger,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ValidationError> {
    if let CompletionState::Completed { .. } = state(task) {
        return Err(ValidationError::AlreadyCompleted(task.id.clone()));
    }

    let at = now.max(task.created_at);
    task.completed = true;
    task.completed_at = Some(at);
    ledger.credit(COMPLETION_REWARD);

    info!(task_id = %task.id, balance = ledger.balance(), "task completed");
    Ok(at)
}

/// Completed → Pending, only inside the undo window. Debits the ledger.
pub fn uncomplete(
    task: &mut Task,
    ledger: &mut PointsLedger,
    now: DateTime<Utc>,
) -> Result<(), TaskError> {
    let CompletionState::Completed { at } = state(task) else {
        return Err(ValidationError::NotCompleted(task.id.clone()).into());
    };

    if !can_undo(at, now) {
        let elapsed_secs = (now - at).num_seconds();
        warn!(task_id = %task.id, elapsed_secs, "undo rejected, window expired");
        return Err(TaskError::WindowExpired {
            task_id: task.id.clone(),
            elapsed_secs,
        });
    }

    task.completed = false;
    task.completed_at = None;
    ledger.debit(COMPLETION_REWARD);

    info!(task_id = %task.id, balance = ledger.balance(), "task completion undone");
    Ok(())
}
