//! Interval configuration: the storage handle plus per-category durations.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::storage::Storage;
use crate::timer::Category;

pub const DEFAULT_POMODORO: Duration = Duration::from_secs(25 * 60);
pub const DEFAULT_SHORT_BREAK: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_LONG_BREAK: Duration = Duration::from_secs(15 * 60);

/// Everything the resolver and the tick engine need.
///
/// Cheap to clone; clones share the same storage.
#[derive(Clone)]
pub struct IntervalConfig {
    storage: Arc<dyn Storage>,
    pub pomodoro_duration: Duration,
    pub short_break_duration: Duration,
    pub long_break_duration: Duration,
}

impl IntervalConfig {
    /// Zero durations fall back to 25/5/15 minutes, each independently.
    pub fn new(
        storage: Arc<dyn Storage>,
        pomodoro: Duration,
        short_break: Duration,
        long_break: Duration,
    ) -> Self {
        let or_default = |d: Duration, default: Duration| if d.is_zero() { default } else { d };
        Self {
            storage,
            pomodoro_duration: or_default(pomodoro, DEFAULT_POMODORO),
            short_break_duration: or_default(short_break, DEFAULT_SHORT_BREAK),
            long_break_duration: or_default(long_break, DEFAULT_LONG_BREAK),
        }
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    pub fn duration_for(&self, category: Category) -> Duration {
        match category {
            Category::Pomodoro => self.pomodoro_duration,
            Category::ShortBreak => self.short_break_duration,
            Category::LongBreak => self.long_break_duration,
        }
    }
}

impl fmt::Debug for IntervalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntervalConfig")
            .field("pomodoro_duration", &self.pomodoro_duration)
            .field("short_break_duration", &self.short_break_duration)
            .field("long_break_duration", &self.long_break_duration)
            .finish_non_exhaustive()
    }
}
