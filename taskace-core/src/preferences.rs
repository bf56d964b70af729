//! User scheduling preferences.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Time of day the user prefers to work. A soft ordering, never a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudyTime {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl fmt::Display for StudyTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StudyTime::Morning => "morning",
            StudyTime::Afternoon => "afternoon",
            StudyTime::Evening => "evening",
            StudyTime::Night => "night",
        };
        f.write_str(s)
    }
}

impl FromStr for StudyTime {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "morning" => Ok(StudyTime::Morning),
            "afternoon" => Ok(StudyTime::Afternoon),
            "evening" => Ok(StudyTime::Evening),
            "night" => Ok(StudyTime::Night),
            other => Err(ValidationError::invalid(
                "preferred_study_time",
                format!("expected morning, afternoon, evening or night, got '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub preferred_study_time: StudyTime,
    /// At least 1.
    pub max_tasks_per_day: u32,
    /// Minutes inserted after every placed task.
    pub break_duration: u32,
    /// Minutes; the duration used for tasks without an estimate.
    pub study_session_duration: u32,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            preferred_study_time: StudyTime::Afternoon,
            max_tasks_per_day: 5,
            break_duration: 15,
            study_session_duration: 45,
        }
    }
}

impl UserPreferences {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_tasks_per_day == 0 {
            return Err(ValidationError::invalid(
                "max_tasks_per_day",
                "must be at least 1",
            ));
        }
        if self.study_session_duration == 0 {
            return Err(ValidationError::invalid(
                "study_session_duration",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Merge `patch` and validate the result without modifying `self`.
    pub fn merged(&self, patch: &PreferencesPatch) -> Result<Self, ValidationError> {
        let out = Self {
            preferred_study_time: patch
                .preferred_study_time
                .unwrap_or(self.preferred_study_time),
            max_tasks_per_day: patch.max_tasks_per_day.unwrap_or(self.max_tasks_per_day),
            break_duration: patch.break_duration.unwrap_or(self.break_duration),
            study_session_duration: patch
                .study_session_duration
                .unwrap_or(self.study_session_duration),
        };
        out.validate()?;
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferencesPatch {
    pub preferred_study_time: Option<StudyTime>,
    pub max_tasks_per_day: Option<u32>,
    pub break_duration: Option<u32>,
    pub study_session_duration: Option<u32>,
}
