//! Persistence contract for the task pool, templates, preferences and ledger.
//!
//! The store is keyed by principal identity. The schedule is derived and is
//! never persisted.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreError;
use crate::ledger::{PointsLedger, SEED_POINTS};
use crate::preferences::UserPreferences;
use crate::task::{Priority, Task};
use crate::template::{DayTemplate, default_templates};

/// Everything persisted for one principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tasks: Vec<Task>,
    pub templates: Vec<DayTemplate>,
    #[serde(default)]
    pub active_template_id: Option<String>,
    #[serde(default)]
    pub preferences: UserPreferences,
    #[serde(default)]
    pub points: PointsLedger,
}

impl Snapshot {
    /// Starter data for a principal with nothing stored yet.
    pub fn seed(now: DateTime<Utc>) -> Self {
        let created = now - Duration::days(1);
        let mut tasks = vec![
            Task::new("1", "Design Homepage", now + Duration::days(5), created)
                .with_description("Create wireframe for new website homepage")
                .with_category("Education")
                .with_priority(Priority::High),
            Task::new("2", "Sketch Illustrations", now + Duration::days(2), created)
                .with_description("Create sketches for the new project")
                .with_category("Education")
                .with_priority(Priority::Medium),
            Task::new("3", "Onboarding Design", now + Duration::days(2), created)
                .with_description("Design onboarding screens for the app")
                .with_category("Education")
                .with_priority(Priority::High),
            Task::new("4", "Create Wireframe", now, created)
                .with_description("Design wireframes for the dashboard")
                .with_category("Education")
                .with_priority(Priority::Medium),
            Task::new("5", "Logo Redesign", now, created)
                .with_description("Redesign the team logo")
                .with_category("Personal")
                .with_priority(Priority::Low),
        ];
        tasks[1].completed = true;
        tasks[1].completed_at = Some(now - Duration::hours(1));

        let templates = default_templates();
        let active_template_id = templates.first().map(|t| t.id.clone());

        Self {
            tasks,
            templates,
            active_template_id,
            preferences: UserPreferences::default(),
            points: PointsLedger::new(SEED_POINTS),
        }
    }
}

/// Load/save keyed by principal.
pub trait TaskStore {
    /// `Ok(None)` when nothing has been stored for `principal`.
    fn load(&self, principal: &str) -> Result<Option<Snapshot>, StoreError>;

    fn save(&self, principal: &str, snapshot: &Snapshot) -> Result<(), StoreError>;
}

/// One pretty-printed JSON file per principal.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, principal: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_principal(principal)))
    }
}

impl TaskStore for JsonFileStore {
    fn load(&self, principal: &str) -> Result<Option<Snapshot>, StoreError> {
        let p = self.path_for(principal);
        if !p.exists() {
            return Ok(None);
        }
        let s = fs::read_to_string(&p)?;
        let snapshot = serde_json::from_str(&s)?;
        debug!(path = %p.display(), "loaded snapshot");
        Ok(Some(snapshot))
    }

    fn save(&self, principal: &str, snapshot: &Snapshot) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let p = self.path_for(principal);
        let tmp = p.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(snapshot)?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &p)?;
        debug!(path = %p.display(), tasks = snapshot.tasks.len(), "saved snapshot");
        Ok(())
    }
}

/// File stem for `principal`: `[A-Za-z0-9_-]` pass through, every other byte
/// becomes `%XX`. Injective, so distinct principals never share a file. The
/// empty principal maps to a bare `%`, which no escape sequence produces.
fn encode_principal(principal: &str) -> String {
    if principal.is_empty() {
        return "%".to_string();
    }
    let mut out = String::with_capacity(principal.len());
    for b in principal.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

/// In-process store. Saves can be switched to fail for error-path tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: Mutex<HashMap<String, Snapshot>>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(principal: &str, snapshot: Snapshot) -> Self {
        let store = Self::default();
        store
            .snapshots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(principal.to_string(), snapshot);
        store
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn get(&self, principal: &str) -> Option<Snapshot> {
        self.snapshots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(principal)
            .cloned()
    }
}

impl TaskStore for MemoryStore {
    fn load(&self, principal: &str) -> Result<Option<Snapshot>, StoreError> {
        Ok(self.get(principal))
    }

    fn save(&self, principal: &str, snapshot: &Snapshot) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("saves disabled".to_string()));
        }
        self.snapshots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(principal.to_string(), snapshot.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
