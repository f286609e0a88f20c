//! The interval entity: one focus or break period and its progress.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PomoError;

/// The kind of period an interval represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Working interval.
    Pomodoro,
    /// Break between working intervals.
    ShortBreak,
    /// Break after a set of pomodoros.
    LongBreak,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Pomodoro, Category::ShortBreak, Category::LongBreak];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Pomodoro => "Pomodoro",
            Category::ShortBreak => "ShortBreak",
            Category::LongBreak => "LongBreak",
        }
    }

    pub fn is_break(self) -> bool {
        !matches!(self, Category::Pomodoro)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

/// Lifecycle state of an interval.
///
/// ```text
/// NotStarted -> Running <-> Paused
///                  |          |
///                  v          v
///          Done | Cancelled (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State {
    NotStarted,
    Running,
    Paused,
    Done,
    Cancelled,
}

impl State {
    pub fn as_str(self) -> &'static str {
        match self {
            State::NotStarted => "NotStarted",
            State::Running => "Running",
            State::Paused => "Paused",
            State::Done => "Done",
            State::Cancelled => "Cancelled",
        }
    }

    /// Stable integer code used by persistent backends.
    pub fn code(self) -> i64 {
        match self {
            State::NotStarted => 0,
            State::Running => 1,
            State::Paused => 2,
            State::Done => 3,
            State::Cancelled => 4,
        }
    }

    /// Done and Cancelled admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Done | State::Cancelled)
    }
}

impl TryFrom<i64> for State {
    type Error = PomoError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(State::NotStarted),
            1 => Ok(State::Running),
            2 => Ok(State::Paused),
            3 => Ok(State::Done),
            4 => Ok(State::Cancelled),
            other => Err(PomoError::InvalidState(other)),
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One focus or break period.
///
/// `id` is 0 until storage assigns one in `Storage::create`; after that it
/// never changes. Only the engine mutates `state`, `actual_duration` and
/// `start_time`, and only through storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub id: i64,
    pub start_time: Option<DateTime<Utc>>,
    pub planned_duration: Duration,
    pub actual_duration: Duration,
    pub category: Category,
    pub state: State,
}

impl Interval {
    /// A not-yet-persisted interval with no progress.
    pub fn new(category: Category, planned_duration: Duration) -> Self {
        Self {
            id: 0,
            start_time: None,
            planned_duration,
            actual_duration: Duration::ZERO,
            category,
            state: State::NotStarted,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.planned_duration.saturating_sub(self.actual_duration)
    }

    /// 0.0 .. 1.0 progress through the planned duration.
    pub fn progress(&self) -> f64 {
        if self.planned_duration.is_zero() {
            return 0.0;
        }
        (self.actual_duration.as_secs_f64() / self.planned_duration.as_secs_f64()).min(1.0)
    }
}
