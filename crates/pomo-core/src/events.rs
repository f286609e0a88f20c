use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{Category, Interval, State};

/// Presentation-facing description of something the engine did.
///
/// The engine reports through callbacks; front ends turn those calls into
/// events for rendering or logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    IntervalStarted {
        id: i64,
        category: Category,
        planned_secs: u64,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    IntervalTicked {
        id: i64,
        category: Category,
        actual_secs: u64,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    IntervalCompleted {
        id: i64,
        category: Category,
        actual_secs: u64,
        at: DateTime<Utc>,
    },
    IntervalCancelled {
        id: i64,
        category: Category,
        actual_secs: u64,
        at: DateTime<Utc>,
    },
    IntervalPaused {
        id: i64,
        category: Category,
        actual_secs: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        id: i64,
        category: Category,
        state: State,
        planned_secs: u64,
        actual_secs: u64,
        remaining_secs: u64,
        progress_pct: f64,
        start_time: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn started(i: &Interval) -> Self {
        Event::IntervalStarted {
            id: i.id,
            category: i.category,
            planned_secs: i.planned_duration.as_secs(),
            remaining_secs: i.remaining().as_secs(),
            at: Utc::now(),
        }
    }

    pub fn ticked(i: &Interval) -> Self {
        Event::IntervalTicked {
            id: i.id,
            category: i.category,
            actual_secs: i.actual_duration.as_secs(),
            remaining_secs: i.remaining().as_secs(),
            at: Utc::now(),
        }
    }

    pub fn completed(i: &Interval) -> Self {
        Event::IntervalCompleted {
            id: i.id,
            category: i.category,
            actual_secs: i.actual_duration.as_secs(),
            at: Utc::now(),
        }
    }

    /// Terminal event for a `start` that returned without `on_end`.
    ///
    /// Picks Cancelled or Paused from the stored state; `None` for any other.
    pub fn stopped(i: &Interval) -> Option<Self> {
        let (id, category, actual_secs, at) = (i.id, i.category, i.actual_duration.as_secs(), Utc::now());
        match i.state {
            State::Cancelled => Some(Event::IntervalCancelled { id, category, actual_secs, at }),
            State::Paused => Some(Event::IntervalPaused { id, category, actual_secs, at }),
            _ => None,
        }
    }

    pub fn snapshot(i: &Interval) -> Self {
        Event::StateSnapshot {
            id: i.id,
            category: i.category,
            state: i.state,
            planned_secs: i.planned_duration.as_secs(),
            actual_secs: i.actual_duration.as_secs(),
            remaining_secs: i.remaining().as_secs(),
            progress_pct: i.progress() * 100.0,
            start_time: i.start_time,
            at: Utc::now(),
        }
    }
}
