//! Error types for taskace-core.
//!
//! Every public operation on [`crate::TaskManager`] either commits fully or
//! returns one of these without touching state. The one exception is
//! [`TaskError::Persistence`]: the in-memory mutation has already been
//! committed and the schedule recomputed, only the save failed.

use std::fmt;

use thiserror::Error;

/// What kind of entity an id referred to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Task,
    Template,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Task => f.write_str("task"),
            EntityKind::Template => f.write_str("template"),
        }
    }
}

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// The undo window closed before `uncomplete` was called.
    #[error("undo window expired for task {task_id} ({elapsed_secs}s since completion)")]
    WindowExpired { task_id: String, elapsed_secs: i64 },

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// State was committed in memory; only durability failed.
    #[error("persistence failed: {0}")]
    Persistence(#[from] StoreError),
}

impl TaskError {
    pub fn task_not_found(id: impl Into<String>) -> Self {
        TaskError::NotFound {
            kind: EntityKind::Task,
            id: id.into(),
        }
    }

    pub fn template_not_found(id: impl Into<String>) -> Self {
        TaskError::NotFound {
            kind: EntityKind::Template,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TaskError::NotFound { .. })
    }

    pub fn is_window_expired(&self) -> bool {
        matches!(self, TaskError::WindowExpired { .. })
    }
}

/// Malformed input, rejected before any mutation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("invalid value for '{field}': {message}")]
    InvalidValue { field: &'static str, message: String },

    #[error("invalid time '{0}' (expected HH:MM)")]
    InvalidTime(String),

    #[error("invalid block '{spec}': {message}")]
    InvalidBlock { spec: String, message: String },

    #[error("task {0} is already completed")]
    AlreadyCompleted(String),

    #[error("task {0} is not completed")]
    NotCompleted(String),
}

impl ValidationError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field,
            message: message.into(),
        }
    }
}

/// Load/save failures from a [`crate::store::TaskStore`].
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend refused the operation (used by in-memory stores in tests).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T, E = TaskError> = std::result::Result<T, E>;
