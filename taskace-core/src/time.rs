//! Time utilities: "HH:MM" wall-clock strings, minute offsets, local days,
//! and the clock the task manager reads "now" from.

use std::cell::Cell;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::ValidationError;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Source of the current instant.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Cell<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Cell::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

/// Parse "HH:MM" into minutes since midnight.
///
/// Hours 0..=23, minutes 0..=59. "24:00" is accepted as the end of the day
/// so a template block can run up to midnight.
pub fn parse_hhmm(s: &str) -> Result<u32, ValidationError> {
    let invalid = || ValidationError::InvalidTime(s.to_string());

    let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
    let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if h.is_empty() || h.len() > 2 || m.len() != 2 || !digits(h) || !digits(m) {
        return Err(invalid());
    }
    let hours: u32 = h.parse().map_err(|_| invalid())?;
    let minutes: u32 = m.parse().map_err(|_| invalid())?;

    match (hours, minutes) {
        (24, 0) => Ok(MINUTES_PER_DAY),
        (0..=23, 0..=59) => Ok(hours * 60 + minutes),
        _ => Err(invalid()),
    }
}

/// Format minutes since midnight as zero-padded "HH:MM".
pub fn format_hhmm(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Calendar date of `ts` in `tz`.
pub fn local_date(ts: DateTime<Utc>, tz: Tz) -> NaiveDate {
    ts.with_timezone(&tz).date_naive()
}

/// "Today" for the planner: the local calendar date of `now`.
pub fn local_today(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    local_date(now, tz)
}

/// Parse a deadline like "2026-02-20 23:59" in an IANA tz, returning UTC.
pub fn parse_local_deadline(local: &str, tz: Tz) -> Result<DateTime<Utc>, ValidationError> {
    let ndt = NaiveDateTime::parse_from_str(local.trim(), "%Y-%m-%d %H:%M")
        .map_err(|e| ValidationError::invalid("deadline", format!("'{local}': {e}")))?;

    let local_dt = tz.from_local_datetime(&ndt).single().ok_or_else(|| {
        ValidationError::invalid(
            "deadline",
            format!("ambiguous or invalid local time (DST?): {local} {tz}"),
        )
    })?;

    Ok(local_dt.with_timezone(&Utc))
}

/// Parse an IANA zone name such as "America/Chicago".
pub fn parse_timezone(name: &str) -> Result<Tz, ValidationError> {
    name.parse()
        .map_err(|_| ValidationError::invalid("timezone", format!("unknown timezone: {name}")))
}
