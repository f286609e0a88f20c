//! Core error types for pomo-core.
//!
//! The engine-defined kinds (`NoIntervals`, `IntervalNotRunning`, ...) are
//! plain enum variants so callers can branch on them with `matches!`.
//! Everything a storage backend or the settings file can fail with is wrapped
//! in its own enum and propagated unchanged.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for pomo-core.
#[derive(Error, Debug)]
pub enum PomoError {
    /// Storage holds no intervals yet.
    #[error("no intervals")]
    NoIntervals,

    /// `pause` was called on an interval that is not running.
    #[error("interval not running")]
    IntervalNotRunning,

    /// `start` was called on a done or cancelled interval.
    #[error("interval {id} is completed or cancelled: cannot start")]
    IntervalCompleted { id: i64 },

    /// A record carries a state value the engine does not know.
    #[error("invalid state: {0}")]
    InvalidState(i64),

    /// Zero or unresolvable interval id.
    #[error("invalid id: {0}")]
    InvalidId(i64),

    /// Storage backend failures
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Settings file failures
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Storage backend errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored row could not be decoded
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// A writer panicked while holding the store lock
    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Settings-file errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the settings schema
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Home/data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

impl<T> From<std::sync::PoisonError<T>> for StorageError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        StorageError::Poisoned
    }
}

impl From<rusqlite::Error> for PomoError {
    fn from(err: rusqlite::Error) -> Self {
        PomoError::Storage(StorageError::Database(err))
    }
}

impl<T> From<std::sync::PoisonError<T>> for PomoError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        PomoError::Storage(StorageError::Poisoned)
    }
}

/// Result type alias for PomoError
pub type Result<T, E = PomoError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_kinds_are_distinguishable() {
        let err = PomoError::IntervalNotRunning;
        assert!(matches!(err, PomoError::IntervalNotRunning));
        assert!(!matches!(err, PomoError::NoIntervals));
    }

    #[test]
    fn messages_carry_context() {
        assert_eq!(PomoError::InvalidId(0).to_string(), "invalid id: 0");
        assert_eq!(
            PomoError::IntervalCompleted { id: 7 }.to_string(),
            "interval 7 is completed or cancelled: cannot start"
        );
    }

    #[test]
    fn poisoned_lock_maps_to_storage_error() {
        let lock = std::sync::Mutex::new(());
        let _ = std::panic::catch_unwind(|| {
            let _guard = lock.lock().unwrap();
            panic!("poison");
        });
        let err: PomoError = lock.lock().unwrap_err().into();
        assert!(matches!(err, PomoError::Storage(StorageError::Poisoned)));
    }
}
