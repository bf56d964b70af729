//! TaskManager: the single owner of one principal's task pool.
//!
//! Every mutation follows the same exit path: change in-memory state,
//! recompute the schedule, then persist. A failed save surfaces as
//! [`TaskError::Persistence`] but the in-memory change stands.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::completion;
use crate::error::{Result, TaskError};
use crate::ledger::PointsLedger;
use crate::planner::{PlanInput, Schedule, plan_horizon};
use crate::preferences::{PreferencesPatch, UserPreferences};
use crate::scoring::{WeightBreakdown, weigh};
use crate::stats::{self, PoolStats, TaskQuery};
use crate::store::{Snapshot, TaskStore};
use crate::task::{NewTask, Task, TaskPatch};
use crate::template::{DayTemplate, NewTemplate};
use crate::time::{Clock, local_today};

pub struct TaskManager<S: TaskStore, C: Clock> {
    store: S,
    principal: String,
    clock: C,
    timezone: Tz,

    tasks: Vec<Task>,
    templates: Vec<DayTemplate>,
    active_template_id: Option<String>,
    preferences: UserPreferences,
    ledger: PointsLedger,

    schedule: Schedule,
}

impl<S: TaskStore, C: Clock> TaskManager<S, C> {
    /// Load `principal` from `store`, or start from [`Snapshot::seed`].
    ///
    /// Stored state that breaks an invariant is repaired with a warning:
    /// a dangling active template is cleared, invalid preferences fall back
    /// to defaults, and task completion stamps are made consistent. Neither
    /// the seed nor a repair is written back until the first mutation.
    pub fn open(store: S, principal: impl Into<String>, clock: C, timezone: Tz) -> Result<Self> {
        let principal = principal.into();
        let snapshot = match store.load(&principal)? {
            Some(s) => s,
            None => {
                debug!(%principal, "no stored state, using seed data");
                Snapshot::seed(clock.now())
            }
        };

        let mut manager = Self {
            store,
            principal,
            clock,
            timezone,
            tasks: snapshot.tasks,
            templates: snapshot.templates,
            active_template_id: snapshot.active_template_id,
            preferences: snapshot.preferences,
            ledger: snapshot.points,
            schedule: Schedule::default(),
        };

        if let Some(id) = manager.active_template_id.clone()
            && manager.find_template(&id).is_none()
        {
            warn!(template_id = %id, "stored active template is missing, clearing it");
            manager.active_template_id = None;
        }

        if let Err(e) = manager.preferences.validate() {
            warn!(error = %e, "stored preferences are invalid, using defaults");
            manager.preferences = UserPreferences::default();
        }

        for task in &mut manager.tasks {
            completion::repair(task);
        }

        manager.recompute();
        Ok(manager)
    }

    // ---- mutations ----

    /// Validate and insert a new task. Returns the generated id.
    pub fn add_task(&mut self, new: NewTask) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let task = new.into_task(id.clone(), self.clock.now())?;
        info!(task_id = %id, title = %task.title, "task added");
        self.tasks.push(task);
        self.commit()?;
        Ok(id)
    }

    /// Pending → Completed, +10 points. Returns the recorded completion time.
    pub fn complete_task(&mut self, id: &str) -> Result<DateTime<Utc>> {
        let now = self.clock.now();
        let idx = self.task_index(id)?;
        let at = completion::complete(&mut self.tasks[idx], &mut self.ledger, now)?;
        self.commit()?;
        Ok(at)
    }

    /// Completed → Pending within the undo window, −10 points.
    pub fn uncomplete_task(&mut self, id: &str) -> Result<()> {
        let now = self.clock.now();
        let idx = self.task_index(id)?;
        completion::uncomplete(&mut self.tasks[idx], &mut self.ledger, now)?;
        self.commit()
    }

    /// Remove a task in either state. The ledger is untouched.
    pub fn delete_task(&mut self, id: &str) -> Result<Task> {
        let idx = self.task_index(id)?;
        let removed = self.tasks.remove(idx);
        info!(task_id = %removed.id, completed = removed.completed, "task deleted");
        self.commit()?;
        Ok(removed)
    }

    /// Apply a field patch. Completion state is only changed through
    /// [`complete_task`](Self::complete_task) and [`uncomplete_task`](Self::uncomplete_task).
    pub fn update_task(&mut self, id: &str, patch: TaskPatch) -> Result<()> {
        let idx = self.task_index(id)?;
        let updated = patch.apply(&self.tasks[idx])?;
        self.tasks[idx] = updated;
        info!(task_id = %id, "task updated");
        self.commit()
    }

    /// Validate and store a new template. It does not become active.
    pub fn add_schedule_template(&mut self, new: NewTemplate) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let template = new.into_template(id.clone())?;
        info!(template_id = %id, name = %template.name, blocks = template.blocks.len(), "template added");
        self.templates.push(template);
        self.commit()?;
        Ok(id)
    }

    pub fn select_active_template(&mut self, id: &str) -> Result<()> {
        if self.find_template(id).is_none() {
            return Err(TaskError::template_not_found(id));
        }
        self.active_template_id = Some(id.to_string());
        info!(template_id = %id, "active template selected");
        self.commit()
    }

    /// Merge `patch` into the current preferences. Nothing changes on a
    /// validation failure.
    pub fn update_preferences(&mut self, patch: PreferencesPatch) -> Result<UserPreferences> {
        let merged = self.preferences.merged(&patch)?;
        self.preferences = merged;
        info!(
            study_time = %merged.preferred_study_time,
            max_tasks_per_day = merged.max_tasks_per_day,
            "preferences updated"
        );
        self.commit()?;
        Ok(merged)
    }

    /// Recompute from current state. Idempotent; nothing is persisted.
    pub fn force_reschedule(&mut self) -> &Schedule {
        self.recompute();
        &self.schedule
    }

    // ---- reads ----

    pub fn principal(&self) -> &str {
        &self.principal
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn today(&self) -> NaiveDate {
        local_today(self.clock.now(), self.timezone)
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn templates(&self) -> &[DayTemplate] {
        &self.templates
    }

    pub fn active_template(&self) -> Option<&DayTemplate> {
        self.active_template_id
            .as_deref()
            .and_then(|id| self.find_template(id))
    }

    pub fn preferences(&self) -> &UserPreferences {
        &self.preferences
    }

    pub fn points(&self) -> i64 {
        self.ledger.balance()
    }

    pub fn ledger(&self) -> &PointsLedger {
        &self.ledger
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Seconds left to undo a completion; `None` while the task is pending.
    pub fn remaining_undo_seconds(&self, id: &str) -> Result<Option<i64>> {
        let task = self.task(id).ok_or_else(|| TaskError::task_not_found(id))?;
        Ok(task
            .completed_at
            .map(|at| completion::remaining_undo_seconds(at, self.clock.now())))
    }

    /// Weight components for one task as of now.
    pub fn weight(&self, id: &str) -> Result<WeightBreakdown> {
        let task = self.task(id).ok_or_else(|| TaskError::task_not_found(id))?;
        Ok(weigh(task, self.clock.now()))
    }

    pub fn tasks_due_today(&self) -> Vec<&Task> {
        stats::tasks_due_today(&self.tasks, self.clock.now(), self.timezone)
    }

    pub fn tasks_completed_on(&self, date: NaiveDate) -> Vec<&Task> {
        stats::tasks_completed_on(&self.tasks, date, self.timezone)
    }

    pub fn completed_tasks(&self) -> Vec<&Task> {
        stats::completed_tasks(&self.tasks)
    }

    pub fn search(&self, query: &TaskQuery) -> Vec<&Task> {
        stats::search(&self.tasks, query)
    }

    pub fn stats(&self) -> PoolStats {
        let now = self.clock.now();
        let completed = self.tasks.iter().filter(|t| t.completed).count();
        PoolStats {
            total: self.tasks.len(),
            completed,
            pending: self.tasks.len() - completed,
            completion_rate: stats::completion_rate(&self.tasks),
            due_today: self.tasks_due_today().len(),
            due_soon: self.tasks.iter().filter(|t| stats::is_due_soon(t, now)).count(),
            points: self.ledger.balance(),
            points_progress: self.ledger.progress_percent(),
            next_milestone: self.ledger.next_milestone(),
        }
    }

    /// Current persistable state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tasks: self.tasks.clone(),
            templates: self.templates.clone(),
            active_template_id: self.active_template_id.clone(),
            preferences: self.preferences,
            points: self.ledger,
        }
    }

    // ---- internals ----

    fn task_index(&self, id: &str) -> Result<usize> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| TaskError::task_not_found(id))
    }

    fn find_template(&self, id: &str) -> Option<&DayTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    fn recompute(&mut self) {
        let schedule = plan_horizon(PlanInput {
            tasks: &self.tasks,
            template: self.active_template(),
            preferences: &self.preferences,
            now: self.clock.now(),
            timezone: self.timezone,
        });
        self.schedule = schedule;
    }

    fn commit(&mut self) -> Result<()> {
        self.recompute();
        if let Err(e) = self.store.save(&self.principal, &self.snapshot()) {
            warn!(principal = %self.principal, error = %e, "failed to persist state");
            return Err(TaskError::Persistence(e));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::store::MemoryStore;
    use crate::task::Priority;
    use crate::template::TimeBlock;
    use crate::time::ManualClock;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 6, 0, 0).unwrap()
    }

    fn seeded() -> TaskManager<MemoryStore, ManualClock> {
        TaskManager::open(MemoryStore::new(), "alice", ManualClock::new(t0()), chrono_tz::UTC)
            .unwrap()
    }

    #[test]
    fn test_open_without_stored_state_uses_seed() {
        let m = seeded();
        assert_eq!(m.tasks().len(), 5);
        assert_eq!(m.points(), 155);
        assert_eq!(m.active_template().map(|t| t.name.as_str()), Some("Working Day"));
        assert_eq!(m.store().save_count(), 0);
        assert!(!m.schedule().is_empty());
        // the seeded completed task is never planned
        assert!(m.schedule().for_task("2").is_none());
    }

    #[test]
    fn test_open_restores_stored_state() {
        let mut snap = Snapshot::seed(t0());
        snap.tasks.truncate(1);
        snap.points = PointsLedger::new(7);
        let store = MemoryStore::with_snapshot("bob", snap);

        let m = TaskManager::open(store, "bob", ManualClock::new(t0()), chrono_tz::UTC).unwrap();
        assert_eq!(m.tasks().len(), 1);
        assert_eq!(m.points(), 7);
    }

    #[test]
    fn test_dangling_active_template_is_cleared() {
        let mut snap = Snapshot::seed(t0());
        snap.active_template_id = Some("gone".into());
        let store = MemoryStore::with_snapshot("bob", snap);

        let m = TaskManager::open(store, "bob", ManualClock::new(t0()), chrono_tz::UTC).unwrap();
        assert!(m.active_template().is_none());
        assert!(m.schedule().is_empty());
    }

    fn open_with(snap: Snapshot) -> TaskManager<MemoryStore, ManualClock> {
        let store = MemoryStore::with_snapshot("bob", snap);
        TaskManager::open(store, "bob", ManualClock::new(t0()), chrono_tz::UTC).unwrap()
    }

    #[test]
    fn test_stored_completed_task_without_timestamp_is_not_credited_twice() {
        let mut snap = Snapshot::seed(t0());
        snap.tasks[0].completed = true;
        snap.tasks[0].completed_at = None;
        let mut m = open_with(snap);

        let t = m.task("1").unwrap();
        assert_eq!(t.completed_at, Some(t.created_at));
        assert!(m.schedule().for_task("1").is_none());

        let err = m.complete_task("1").unwrap_err();
        assert!(matches!(
            err,
            TaskError::Validation(ValidationError::AlreadyCompleted(_))
        ));
        assert_eq!(m.points(), 155);
        assert_eq!(m.remaining_undo_seconds("1").unwrap(), Some(0));
        assert!(m.uncomplete_task("1").unwrap_err().is_window_expired());
    }

    #[test]
    fn test_stored_stray_completion_stamp_is_cleared() {
        let mut snap = Snapshot::seed(t0());
        snap.tasks[0].completed_at = Some(t0());
        let m = open_with(snap);

        assert_eq!(m.task("1").unwrap().completed_at, None);
        assert!(m.schedule().for_task("1").is_some());
    }

    #[test]
    fn test_stored_completion_before_creation_is_clamped() {
        let mut snap = Snapshot::seed(t0());
        let created = snap.tasks[1].created_at;
        snap.tasks[1].completed_at = Some(created - Duration::days(3));
        let m = open_with(snap);

        assert_eq!(m.task("2").unwrap().completed_at, Some(created));
    }

    #[test]
    fn test_stored_invalid_preferences_fall_back_to_defaults() {
        for prefs in [
            UserPreferences {
                max_tasks_per_day: 0,
                ..UserPreferences::default()
            },
            UserPreferences {
                study_session_duration: 0,
                ..UserPreferences::default()
            },
        ] {
            let mut snap = Snapshot::seed(t0());
            snap.preferences = prefs;
            let m = open_with(snap);
            assert_eq!(*m.preferences(), UserPreferences::default());
            assert!(!m.schedule().is_empty());
        }
    }

    #[test]
    fn test_add_task_persists_and_schedules() {
        let mut m = seeded();
        let id = m
            .add_task(NewTask::new("Read chapter 4", t0() + Duration::days(1)).with_priority(Priority::High))
            .unwrap();

        assert_eq!(m.task(&id).map(|t| t.title.as_str()), Some("Read chapter 4"));
        assert_eq!(m.store().save_count(), 1);
        assert_eq!(m.store().get("alice").unwrap().tasks.len(), 6);
        assert!(m.schedule().for_task(&id).is_some());
    }

    #[test]
    fn test_invalid_task_is_rejected_before_mutation() {
        let mut m = seeded();
        let err = m.add_task(NewTask::new("   ", t0())).unwrap_err();
        assert!(matches!(err, TaskError::Validation(_)));
        assert_eq!(m.tasks().len(), 5);
        assert_eq!(m.store().save_count(), 0);
    }

    #[test]
    fn test_complete_then_undo_restores_points_and_schedule() {
        let mut m = seeded();
        let before = m.schedule().clone();

        m.complete_task("1").unwrap();
        assert_eq!(m.points(), 165);
        assert!(m.schedule().for_task("1").is_none());
        assert_eq!(m.remaining_undo_seconds("1").unwrap(), Some(30));

        m.clock().advance(Duration::seconds(29));
        m.uncomplete_task("1").unwrap();
        assert_eq!(m.points(), 155);
        assert_eq!(m.remaining_undo_seconds("1").unwrap(), None);
        assert_eq!(m.schedule().assignments.len(), before.assignments.len());
    }

    #[test]
    fn test_undo_after_window_is_rejected() {
        let mut m = seeded();
        m.complete_task("1").unwrap();
        m.clock().advance(Duration::seconds(31));

        let err = m.uncomplete_task("1").unwrap_err();
        assert!(err.is_window_expired());
        assert!(m.task("1").unwrap().completed);
        assert_eq!(m.points(), 165);
        assert_eq!(m.remaining_undo_seconds("1").unwrap(), Some(0));
    }

    #[test]
    fn test_unknown_ids_are_not_found() {
        let mut m = seeded();
        assert!(m.complete_task("nope").unwrap_err().is_not_found());
        assert!(m.uncomplete_task("nope").unwrap_err().is_not_found());
        assert!(m.delete_task("nope").unwrap_err().is_not_found());
        assert!(m.update_task("nope", TaskPatch::default()).unwrap_err().is_not_found());
        assert!(m.select_active_template("nope").unwrap_err().is_not_found());
        assert!(m.remaining_undo_seconds("nope").unwrap_err().is_not_found());
        assert_eq!(m.points(), 155);
        assert_eq!(m.store().save_count(), 0);
    }

    #[test]
    fn test_completing_twice_is_validation_error() {
        let mut m = seeded();
        let err = m.complete_task("2").unwrap_err();
        assert!(matches!(
            err,
            TaskError::Validation(ValidationError::AlreadyCompleted(_))
        ));
        assert_eq!(m.points(), 155);
    }

    #[test]
    fn test_delete_completed_task_keeps_points() {
        let mut m = seeded();
        let removed = m.delete_task("2").unwrap();
        assert!(removed.completed);
        assert_eq!(m.points(), 155);
        assert!(m.task("2").is_none());
    }

    #[test]
    fn test_update_task_changes_fields() {
        let mut m = seeded();
        m.update_task(
            "5",
            TaskPatch {
                title: Some("Logo v2".into()),
                priority: Some(Priority::High),
                ..TaskPatch::default()
            },
        )
        .unwrap();
        let t = m.task("5").unwrap();
        assert_eq!(t.title, "Logo v2");
        assert_eq!(t.priority, Priority::High);
    }

    #[test]
    fn test_selecting_a_template_replans() {
        let mut m = seeded();
        let id = m
            .add_schedule_template(NewTemplate::new(
                "Focus",
                vec![TimeBlock::new("20:00", "23:00", "Work/Study")],
            ))
            .unwrap();
        assert_eq!(m.active_template().map(|t| t.id.as_str()), Some("1"));

        m.select_active_template(&id).unwrap();
        assert!(m.schedule().assignments.iter().all(|a| a.start_minute >= 20 * 60));
    }

    #[test]
    fn test_invalid_preferences_leave_state_untouched() {
        let mut m = seeded();
        let err = m
            .update_preferences(PreferencesPatch {
                max_tasks_per_day: Some(0),
                ..PreferencesPatch::default()
            })
            .unwrap_err();
        assert!(matches!(err, TaskError::Validation(_)));
        assert_eq!(m.preferences().max_tasks_per_day, 5);
    }

    #[test]
    fn test_persistence_failure_keeps_the_mutation() {
        let mut m = seeded();
        m.store().set_fail_saves(true);

        let err = m.complete_task("1").unwrap_err();
        assert!(matches!(err, TaskError::Persistence(_)));
        assert!(m.task("1").unwrap().completed);
        assert_eq!(m.points(), 165);
        assert!(m.schedule().for_task("1").is_none());
    }

    #[test]
    fn test_force_reschedule_is_idempotent() {
        let mut m = seeded();
        let first = m.force_reschedule().clone();
        let second = m.force_reschedule().clone();
        assert_eq!(first, second);
        assert_eq!(m.store().save_count(), 0);
    }

    #[test]
    fn test_stats_reflect_the_pool() {
        let m = seeded();
        let s = m.stats();
        assert_eq!(s.total, 5);
        assert_eq!(s.completed, 1);
        assert_eq!(s.pending, 4);
        assert_eq!(s.completion_rate, 20);
        assert_eq!(s.points, 155);
        assert_eq!(s.next_milestone, Some(500));
        assert_eq!(m.completed_tasks().len(), 1);
        assert_eq!(m.tasks_due_today().len(), 2);
    }
}
