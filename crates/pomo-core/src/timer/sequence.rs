//! Sequencing: which interval comes next, and whether to resume the last one.
//!
//! The resulting cycle has period 8:
//!
//! ```text
//! Pomodoro, ShortBreak, Pomodoro, ShortBreak, Pomodoro, ShortBreak, Pomodoro, LongBreak
//! ```

use tracing::debug;

use super::interval::{Category, Interval};
use crate::config::IntervalConfig;
use crate::error::{PomoError, Result};
use crate::storage::Storage;

/// Breaks looked at when deciding on a long break.
const BREAKS_BEFORE_LONG: usize = 3;

/// Category of the interval that should follow the most recent one.
pub fn next_category(storage: &dyn Storage) -> Result<Category> {
    let last = match storage.last() {
        Ok(last) => last,
        Err(PomoError::NoIntervals) => return Ok(Category::Pomodoro),
        Err(e) => return Err(e),
    };

    if last.category.is_break() {
        return Ok(Category::Pomodoro);
    }

    let breaks = storage.breaks(BREAKS_BEFORE_LONG)?;
    if breaks.len() < BREAKS_BEFORE_LONG
        || breaks.iter().any(|b| b.category == Category::LongBreak)
    {
        return Ok(Category::ShortBreak);
    }
    Ok(Category::LongBreak)
}

/// The interval a caller should work on now.
///
/// Returns the most recent interval while it is still in progress (not
/// started, running or paused); otherwise creates the next one in sequence.
/// Repeated calls during an interval return that same interval.
pub fn get_interval(config: &IntervalConfig) -> Result<Interval> {
    match config.storage().last() {
        Ok(last) if !last.state.is_terminal() => Ok(last),
        Ok(_) | Err(PomoError::NoIntervals) => new_interval(config),
        Err(e) => Err(e),
    }
}

fn new_interval(config: &IntervalConfig) -> Result<Interval> {
    let category = next_category(config.storage())?;
    let mut interval = Interval::new(category, config.duration_for(category));
    interval.id = config.storage().create(&interval)?;
    debug!(id = interval.id, %category, planned_ms = interval.planned_duration.as_millis() as u64, "created interval");
    Ok(interval)
}
