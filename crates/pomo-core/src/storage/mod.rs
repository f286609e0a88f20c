//! Interval persistence.
//!
//! [`Storage`] is the only shared mutable state in the engine. Every backend
//! must serialize writes and never hand out a torn record to readers.

mod memory;
pub mod settings;
mod sqlite;

pub use memory::InMemoryStorage;
pub use settings::{Backend, Settings};
pub use sqlite::SqliteStorage;

use std::path::PathBuf;

use crate::error::{ConfigError, Result};
use crate::timer::Interval;

/// Ordered record store keyed by sequentially assigned ids.
pub trait Storage: Send + Sync {
    /// Persist a new interval; returns the assigned id (1, 2, 3, ...).
    fn create(&self, interval: &Interval) -> Result<i64>;

    /// Overwrite the record with `interval.id`.
    fn update(&self, interval: &Interval) -> Result<()>;

    fn by_id(&self, id: i64) -> Result<Interval>;

    /// Most recently created interval, or `PomoError::NoIntervals`.
    fn last(&self) -> Result<Interval>;

    /// Up to `n` most recent non-Pomodoro intervals, most recent first.
    fn breaks(&self, n: usize) -> Result<Vec<Interval>>;

    /// Read-modify-write of a single record.
    ///
    /// `apply` returns whether the record changed and must be written back.
    /// Returns the record as it stands afterwards. Bundled backends run the
    /// whole operation under their write lock; this default does not.
    fn update_with(
        &self,
        id: i64,
        apply: &mut dyn FnMut(&mut Interval) -> bool,
    ) -> Result<Interval> {
        let mut interval = self.by_id(id)?;
        if apply(&mut interval) {
            self.update(&interval)?;
        }
        Ok(interval)
    }
}

/// Returns `~/.config/pomo[-dev]/` based on POMO_ENV.
///
/// Set POMO_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("POMO_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("pomo-dev")
    } else {
        base_dir.join("pomo")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
