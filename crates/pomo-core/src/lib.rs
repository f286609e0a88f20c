//! # Pomo Core Library
//!
//! The timeboxed interval timer behind the `pomo` CLI: alternating focus and
//! break periods, persisted through a pluggable storage backend.
//!
//! ## Architecture
//!
//! - **Sequencing**: decides whether the next interval is a Pomodoro, a short
//!   break or a long break from the stored history
//! - **Tick engine**: an async countdown driven by a 1-second clock that can be
//!   cancelled with a token or paused from another task
//! - **Storage**: the single source of truth; in-memory and SQLite backends
//! - **Settings**: TOML-based durations and backend selection
//!
//! ## Key Components
//!
//! - [`get_interval`]: resume the current interval or create the next one
//! - [`Interval::start`] / [`Interval::pause`]: drive an interval
//! - [`Storage`]: trait every backend implements
//! - [`IntervalConfig`]: storage handle plus per-category durations

pub mod config;
pub mod error;
pub mod events;
pub mod storage;
pub mod timer;

pub use config::IntervalConfig;
pub use error::{ConfigError, PomoError, StorageError};
pub use events::Event;
pub use storage::{InMemoryStorage, Settings, SqliteStorage, Storage};
pub use timer::{get_interval, next_category, Category, Interval, State, TICK};
pub use tokio_util::sync::CancellationToken;
