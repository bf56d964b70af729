use chrono::{DateTime, Duration, TimeZone, Utc};
use taskace_core::{
    DayTemplate, JsonFileStore, ManualClock, MemoryStore, NewTask, PointsLedger,
    PreferencesPatch, Priority, Snapshot, TaskManager, TimeBlock, UserPreferences,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 6, 0, 0).unwrap()
}

/// Empty pool with a single active template.
fn single_block_manager(block: TimeBlock) -> TaskManager<MemoryStore, ManualClock> {
    let snapshot = Snapshot {
        tasks: Vec::new(),
        templates: vec![DayTemplate {
            id: "study".to_string(),
            name: "Study".to_string(),
            blocks: vec![block],
        }],
        active_template_id: Some("study".to_string()),
        preferences: UserPreferences::default(),
        points: PointsLedger::new(0),
    };
    let store = MemoryStore::with_snapshot("me", snapshot);
    TaskManager::open(store, "me", ManualClock::new(now()), chrono_tz::UTC).unwrap()
}

#[test]
fn test_single_high_task_lands_at_block_start() {
    let mut m = single_block_manager(TimeBlock::new("08:00", "09:30", "Work/Study"));
    let id = m
        .add_task(
            NewTask::new("Essay draft", now() + Duration::days(1))
                .with_priority(Priority::High)
                .with_duration(45),
        )
        .unwrap();

    let s = m.schedule();
    assert_eq!(s.len(), 1);
    let a = &s.assignments[0];
    assert_eq!(a.task_id, id);
    assert_eq!(a.date, now().date_naive());
    assert_eq!(a.time_slot(), "08:00 - 08:45");
    assert!(s.unplaced.is_empty());
}

#[test]
fn test_task_due_today_lands_at_block_start_and_outranks_tomorrow() {
    let mut m = single_block_manager(TimeBlock::new("08:00", "09:30", "Work/Study"));
    let tomorrow = m
        .add_task(
            NewTask::new("Reading", now() + Duration::days(1))
                .with_priority(Priority::High)
                .with_duration(45),
        )
        .unwrap();
    let today = m
        .add_task(
            NewTask::new("Essay draft", now())
                .with_priority(Priority::High)
                .with_duration(45),
        )
        .unwrap();

    assert_eq!(m.weight(&today).unwrap().deadline, 10);
    assert_eq!(m.weight(&tomorrow).unwrap().deadline, 9);

    let s = m.schedule();
    let a = &s.assignments[0];
    assert_eq!(a.task_id, today);
    assert_eq!(a.date, now().date_naive());
    assert_eq!(a.time_slot(), "08:00 - 08:45");
    // 08:45 + 15 min break leaves 30 minutes: the second task waits a day
    let b = s.for_task(&tomorrow).unwrap();
    assert_eq!(b.date, now().date_naive() + Duration::days(1));
    assert_eq!(b.time_slot(), "08:00 - 08:45");
}

#[test]
fn test_second_task_starts_after_duration_plus_break() {
    let mut m = single_block_manager(TimeBlock::new("13:00", "15:00", "Free Time"));
    let first = m
        .add_task(
            NewTask::new("Problem set", now() + Duration::days(1))
                .with_priority(Priority::High)
                .with_duration(45),
        )
        .unwrap();
    let second = m
        .add_task(NewTask::new("Flashcards", now() + Duration::days(3)).with_duration(45))
        .unwrap();

    let s = m.schedule();
    assert_eq!(s.len(), 2);
    assert_eq!(s.assignments[0].task_id, first);
    assert_eq!(s.assignments[1].task_id, second);
    assert_eq!(
        s.assignments[1].start_minute,
        s.assignments[0].start_minute + 60
    );
    assert_eq!(s.assignments[1].time_slot(), "14:00 - 14:45");
}

#[test]
fn test_cap_of_one_spreads_tasks_over_days() {
    let mut m = single_block_manager(TimeBlock::new("09:00", "17:00", "Work/Study"));
    m.update_preferences(PreferencesPatch {
        max_tasks_per_day: Some(1),
        ..PreferencesPatch::default()
    })
    .unwrap();

    m.add_task(NewTask::new("A", now() + Duration::days(1)).with_priority(Priority::High))
        .unwrap();
    m.add_task(NewTask::new("B", now() + Duration::days(2)))
        .unwrap();

    let dates = m.schedule().dates();
    assert_eq!(dates, vec![now().date_naive(), now().date_naive() + Duration::days(1)]);
    assert_eq!(m.schedule().count_on(now().date_naive()), 1);
}

#[test]
fn test_undo_boundary_through_the_manager() {
    let mut m = single_block_manager(TimeBlock::new("09:00", "17:00", "Work/Study"));
    let id = m.add_task(NewTask::new("A", now() + Duration::days(1))).unwrap();

    m.complete_task(&id).unwrap();
    assert_eq!(m.points(), 10);
    m.clock().advance(Duration::seconds(29));
    m.uncomplete_task(&id).unwrap();
    assert_eq!(m.points(), 0);

    m.complete_task(&id).unwrap();
    m.clock().advance(Duration::seconds(30));
    m.uncomplete_task(&id).unwrap();

    m.complete_task(&id).unwrap();
    m.clock().advance(Duration::seconds(31));
    let err = m.uncomplete_task(&id).unwrap_err();
    assert!(err.is_window_expired());
    assert!(!err.is_not_found());
    assert_eq!(m.points(), 10);
    assert!(m.schedule().for_task(&id).is_none());
}

#[test]
fn test_json_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::new(now());

    let id = {
        let mut m = TaskManager::open(
            JsonFileStore::new(dir.path()),
            "reopen",
            clock.clone(),
            chrono_tz::UTC,
        )
        .unwrap();
        let id = m.add_task(NewTask::new("Lab report", now() + Duration::days(2))).unwrap();
        m.complete_task(&id).unwrap();
        id
    };

    let m = TaskManager::open(JsonFileStore::new(dir.path()), "reopen", clock, chrono_tz::UTC)
        .unwrap();
    assert_eq!(m.tasks().len(), 6);
    assert_eq!(m.points(), 165);
    assert!(m.task(&id).unwrap().completed);
    assert_eq!(m.completed_tasks().len(), 2);
    // the seeded completed task was finished an hour before `now`, same day
    assert_eq!(m.tasks_completed_on(now().date_naive()).len(), 2);
}
