//! taskace-core: task pool, weighted scheduler and completion ledger

pub mod allocator;
pub mod completion;
pub mod error;
pub mod ledger;
pub mod manager;
pub mod planner;
pub mod preferences;
pub mod scoring;
pub mod stats;
pub mod store;
pub mod task;
pub mod template;
pub mod time;

pub use completion::{CompletionState, UNDO_WINDOW_SECS, can_undo, remaining_undo_seconds};
pub use error::{EntityKind, Result, StoreError, TaskError, ValidationError};
pub use ledger::{COMPLETION_REWARD, MILESTONES, PointsLedger, SEED_POINTS};
pub use manager::TaskManager;
pub use planner::{HORIZON_DAYS, PlanInput, Schedule, ScheduledAssignment, plan_horizon};
pub use preferences::{PreferencesPatch, StudyTime, UserPreferences};
pub use scoring::{WeightBreakdown, order_by_weight, task_weight, weigh};
pub use stats::{PoolStats, TaskQuery};
pub use store::{JsonFileStore, MemoryStore, Snapshot, TaskStore};
pub use task::{NewTask, Priority, Task, TaskPatch};
pub use template::{DayTemplate, NewTemplate, TimeBlock, default_templates, parse_block_spec};
pub use time::{Clock, ManualClock, SystemClock, format_hhmm, parse_hhmm};
