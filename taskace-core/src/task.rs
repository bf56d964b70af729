//! Task model.
//!
//! Tasks are owned by the pool inside [`crate::TaskManager`]. The planner
//! only reads them; completion state changes go through [`crate::completion`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Display rank, highest first. Used for list ordering, not scheduling.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        };
        f.write_str(s)
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" | "h" => Ok(Priority::High),
            "medium" | "med" | "m" => Ok(Priority::Medium),
            "low" | "l" => Ok(Priority::Low),
            other => Err(ValidationError::invalid(
                "priority",
                format!("expected High, Medium or Low, got '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Opaque label; only used as a scoring tie-break.
    pub category: String,
    pub priority: Priority,
    pub deadline: DateTime<Utc>,

    /// Invariant: `completed == completed_at.is_some()`.
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,

    /// Minutes. `None` means the preferred session length applies.
    #[serde(default)]
    pub estimated_duration: Option<u32>,
    /// Informational only.
    #[serde(default)]
    pub last_worked_on: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        deadline: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            category: "Personal".to_string(),
            priority: Priority::Medium,
            deadline,
            completed: false,
            created_at,
            completed_at: None,
            estimated_duration: None,
            last_worked_on: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.estimated_duration = Some(minutes);
        self
    }

    pub fn is_pending(&self) -> bool {
        !self.completed
    }

    /// Minutes this task occupies in a slot.
    pub fn duration_or(&self, default_minutes: u32) -> u32 {
        self.estimated_duration.unwrap_or(default_minutes)
    }
}

/// Input for creating a task. Identity and completion fields are assigned by the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub priority: Priority,
    pub deadline: DateTime<Utc>,
    #[serde(default)]
    pub estimated_duration: Option<u32>,
    #[serde(default)]
    pub last_worked_on: Option<DateTime<Utc>>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, deadline: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            category: "Personal".to_string(),
            priority: Priority::Medium,
            deadline,
            estimated_duration: None,
            last_worked_on: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.estimated_duration = Some(minutes);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(&self.title, &self.category, self.estimated_duration)
    }

    pub fn into_task(self, id: String, created_at: DateTime<Utc>) -> Result<Task, ValidationError> {
        self.validate()?;
        Ok(Task {
            id,
            title: self.title.trim().to_string(),
            description: self.description,
            category: self.category.trim().to_string(),
            priority: self.priority,
            deadline: self.deadline,
            completed: false,
            created_at,
            completed_at: None,
            estimated_duration: self.estimated_duration,
            last_worked_on: self.last_worked_on,
        })
    }
}

/// Partial edit. `id`, `created_at` and completion state are not editable here.
///
/// The doubly-optional fields distinguish "leave alone" (`None`) from
/// "clear" (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub deadline: Option<DateTime<Utc>>,
    pub estimated_duration: Option<Option<u32>>,
    pub last_worked_on: Option<Option<DateTime<Utc>>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }

    /// Produce the edited task without touching `task`, so a rejected patch
    /// leaves the pool untouched.
    pub fn apply(&self, task: &Task) -> Result<Task, ValidationError> {
        let mut out = task.clone();
        if let Some(title) = &self.title {
            out.title = title.trim().to_string();
        }
        if let Some(description) = &self.description {
            out.description = description.clone();
        }
        if let Some(category) = &self.category {
            out.category = category.trim().to_string();
        }
        if let Some(priority) = self.priority {
            out.priority = priority;
        }
        if let Some(deadline) = self.deadline {
            out.deadline = deadline;
        }
        if let Some(duration) = self.estimated_duration {
            out.estimated_duration = duration;
        }
        if let Some(worked) = self.last_worked_on {
            out.last_worked_on = worked;
        }

        validate_fields(&out.title, &out.category, out.estimated_duration)?;
        Ok(out)
    }
}

fn validate_fields(
    title: &str,
    category: &str,
    estimated_duration: Option<u32>,
) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::MissingField("title"));
    }
    if category.trim().is_empty() {
        return Err(ValidationError::MissingField("category"));
    }
    if estimated_duration == Some(0) {
        return Err(ValidationError::invalid(
            "estimated_duration",
            "must be greater than zero",
        ));
    }
    Ok(())
}
