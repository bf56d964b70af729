//! Day templates: reusable lists of labelled time blocks.
//!
//! Blocks are half-open `[start, end)` "HH:MM" intervals. Templates are
//! validated when they enter the pool (times parse, `start < end`), but
//! overlaps are allowed; the planner packs overlapping blocks in whatever
//! order the preference sort leaves them.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::time::{format_hhmm, parse_hhmm};

/// Activity labels the planner may place tasks into.
const SCHEDULABLE_LABELS: [&str; 2] = ["free time", "work/study"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBlock {
    pub start_time: String,
    pub end_time: String,
    pub activity: String,
}

impl TimeBlock {
    pub fn new(
        start_time: impl Into<String>,
        end_time: impl Into<String>,
        activity: impl Into<String>,
    ) -> Self {
        Self {
            start_time: start_time.into(),
            end_time: end_time.into(),
            activity: activity.into(),
        }
    }

    /// `(start, end)` in minutes since midnight.
    pub fn span(&self) -> Result<(u32, u32), ValidationError> {
        Ok((parse_hhmm(&self.start_time)?, parse_hhmm(&self.end_time)?))
    }

    /// Whether tasks may be placed here (free or work/study time, not meals etc).
    pub fn is_schedulable(&self) -> bool {
        let label = self.activity.to_lowercase();
        SCHEDULABLE_LABELS.iter().any(|l| label.contains(l))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let (start, end) = self.span()?;
        if start >= end {
            return Err(ValidationError::InvalidBlock {
                spec: self.to_string(),
                message: "start must be before end".to_string(),
            });
        }
        if self.activity.trim().is_empty() {
            return Err(ValidationError::MissingField("activity"));
        }
        Ok(())
    }
}

impl std::fmt::Display for TimeBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{} {}", self.start_time, self.end_time, self.activity)
    }
}

/// Parse a block written as `HH:MM-HH:MM Activity label`.
///
/// Times are normalized to zero-padded form.
pub fn parse_block_spec(spec: &str) -> Result<TimeBlock, ValidationError> {
    let re = Regex::new(concat!(
        r"^\s*(?P<start>\d{1,2}:\d{2})\s*-\s*",
        r"(?P<end>\d{1,2}:\d{2})\s+",
        r"(?P<activity>.+?)\s*$"
    ))
    .map_err(|e| ValidationError::InvalidBlock {
        spec: spec.to_string(),
        message: e.to_string(),
    })?;

    let caps = re.captures(spec).ok_or_else(|| ValidationError::InvalidBlock {
        spec: spec.to_string(),
        message: "expected 'HH:MM-HH:MM Activity'".to_string(),
    })?;

    let block = TimeBlock::new(
        format_hhmm(parse_hhmm(&caps["start"])?),
        format_hhmm(parse_hhmm(&caps["end"])?),
        caps["activity"].to_string(),
    );
    block.validate()?;
    Ok(block)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTemplate {
    pub id: String,
    pub name: String,
    pub blocks: Vec<TimeBlock>,
}

impl DayTemplate {
    /// Schedulable blocks in template order.
    pub fn schedulable_blocks(&self) -> Vec<TimeBlock> {
        self.blocks
            .iter()
            .filter(|b| b.is_schedulable())
            .cloned()
            .collect()
    }

    /// Total schedulable minutes per day; malformed blocks count as zero.
    pub fn schedulable_minutes(&self) -> u32 {
        self.blocks
            .iter()
            .filter(|b| b.is_schedulable())
            .filter_map(|b| b.span().ok())
            .map(|(s, e)| e.saturating_sub(s))
            .sum()
    }
}

/// Input for adding a template; the pool assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTemplate {
    pub name: String,
    pub blocks: Vec<TimeBlock>,
}

impl NewTemplate {
    pub fn new(name: impl Into<String>, blocks: Vec<TimeBlock>) -> Self {
        Self {
            name: name.into(),
            blocks,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.blocks.is_empty() {
            return Err(ValidationError::MissingField("blocks"));
        }
        self.blocks.iter().try_for_each(TimeBlock::validate)
    }

    pub fn into_template(self, id: String) -> Result<DayTemplate, ValidationError> {
        self.validate()?;
        Ok(DayTemplate {
            id,
            name: self.name.trim().to_string(),
            blocks: self.blocks,
        })
    }
}

/// Default templates seeded for a new principal.
pub fn default_templates() -> Vec<DayTemplate> {
    vec![
        DayTemplate {
            id: "1".to_string(),
            name: "Working Day".to_string(),
            blocks: vec![
                TimeBlock::new("08:00", "09:30", "Morning Routine"),
                TimeBlock::new("09:30", "12:00", "Work/Study"),
                TimeBlock::new("12:00", "13:00", "Lunch Break"),
                TimeBlock::new("13:00", "17:00", "Work/Study"),
                TimeBlock::new("17:00", "18:00", "Exercise"),
                TimeBlock::new("18:00", "19:00", "Dinner"),
                TimeBlock::new("19:00", "22:00", "Free Time"),
            ],
        },
        DayTemplate {
            id: "2".to_string(),
            name: "Holiday".to_string(),
            blocks: vec![
                TimeBlock::new("09:00", "10:00", "Morning Routine"),
                TimeBlock::new("10:00", "12:00", "Free Time"),
                TimeBlock::new("12:00", "13:00", "Lunch"),
                TimeBlock::new("13:00", "18:00", "Free Time"),
                TimeBlock::new("18:00", "19:00", "Dinner"),
                TimeBlock::new("19:00", "23:00", "Free Time"),
            ],
        },
    ]
}
