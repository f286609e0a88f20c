//! Integration tests for the interval engine.
//!
//! These run full acquire-start-finish cycles against real storage backends.
//! The tokio clock is paused, so the 1-second ticks advance virtual time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pomo_core::{
    get_interval, CancellationToken, Category, InMemoryStorage, Interval, IntervalConfig,
    PomoError, SqliteStorage, State, Storage, StorageError,
};

const SEC: Duration = Duration::from_secs(1);

fn noop(_: &Interval) {}

fn memory_config(pomodoro: u32, short_break: u32, long_break: u32) -> IntervalConfig {
    IntervalConfig::new(
        Arc::new(InMemoryStorage::new()),
        pomodoro * SEC,
        short_break * SEC,
        long_break * SEC,
    )
}

#[tokio::test(start_paused = true)]
async fn test_sixteen_cycles_follow_the_sequence() {
    let config = memory_config(3, 1, 2);
    let cancel = CancellationToken::new();

    for step in 1..=16 {
        let (expected_category, expected_duration) = match step {
            s if s % 2 != 0 => (Category::Pomodoro, 3 * SEC),
            s if s % 8 == 0 => (Category::LongBreak, 2 * SEC),
            _ => (Category::ShortBreak, SEC),
        };

        let interval = get_interval(&config).unwrap();
        assert_eq!(interval.category, expected_category, "step {step}");
        assert_eq!(interval.planned_duration, expected_duration, "step {step}");
        assert_eq!(interval.state, State::NotStarted);

        interval.start(&cancel, &config, noop, noop, noop).await.unwrap();

        let stored = config.storage().by_id(interval.id).unwrap();
        assert_eq!(stored.state, State::Done, "step {step}");
        assert_eq!(stored.actual_duration, expected_duration, "step {step}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_run_to_completion() {
    let config = memory_config(2, 2, 2);
    let cancel = CancellationToken::new();
    let interval = get_interval(&config).unwrap();

    let mut begins = Vec::new();
    let mut ticks = Vec::new();
    let mut ends = Vec::new();
    interval
        .start(
            &cancel,
            &config,
            |i| begins.push(i.clone()),
            |i| ticks.push(i.clone()),
            |i| ends.push(i.clone()),
        )
        .await
        .unwrap();

    assert_eq!(begins.len(), 1);
    assert_eq!(begins[0].state, State::Running);
    assert!(begins[0].actual_duration < begins[0].planned_duration);

    let tick_durations: Vec<Duration> = ticks.iter().map(|i| i.actual_duration).collect();
    assert_eq!(tick_durations, vec![SEC, 2 * SEC]);
    assert!(ticks.iter().all(|i| i.state == State::Running));

    assert_eq!(ends.len(), 1);
    assert_eq!(ends[0].state, State::Done);

    let stored = config.storage().by_id(interval.id).unwrap();
    assert_eq!(stored.state, State::Done);
    assert_eq!(stored.actual_duration, stored.planned_duration);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_tick() {
    let config = memory_config(2, 2, 2);
    let cancel = CancellationToken::new();
    let interval = get_interval(&config).unwrap();

    let token = cancel.clone();
    interval
        .start(
            &cancel,
            &config,
            noop,
            move |_| token.cancel(),
            |_| panic!("on_end must not run after cancellation"),
        )
        .await
        .unwrap();

    let stored = config.storage().by_id(interval.id).unwrap();
    assert_eq!(stored.state, State::Cancelled);
    assert_eq!(stored.actual_duration, SEC);
    assert!(stored.actual_duration < stored.planned_duration);

    // The next acquisition moves on in the sequence.
    assert_eq!(get_interval(&config).unwrap().category, Category::ShortBreak);
}

#[tokio::test(start_paused = true)]
async fn test_pause_from_another_task_then_resume() {
    let config = memory_config(4, 4, 4);
    let cancel = CancellationToken::new();
    let interval = get_interval(&config).unwrap();
    let id = interval.id;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let runner = {
        let config = config.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            interval
                .start(
                    &cancel,
                    &config,
                    noop,
                    move |i| {
                        let _ = tx.send(i.actual_duration);
                    },
                    |_| panic!("on_end must not run while paused"),
                )
                .await
        })
    };

    assert_eq!(rx.recv().await, Some(SEC));
    let current = get_interval(&config).unwrap();
    assert_eq!(current.id, id);
    assert_eq!(current.state, State::Running);
    current.pause(&config).unwrap();

    runner.await.unwrap().unwrap();
    assert_eq!(rx.recv().await, None, "no ticks after the pause was observed");

    let paused = config.storage().by_id(id).unwrap();
    assert_eq!(paused.state, State::Paused);
    assert_eq!(paused.actual_duration, SEC);

    // Pausing again is rejected and changes nothing.
    assert!(matches!(paused.pause(&config), Err(PomoError::IntervalNotRunning)));
    assert_eq!(config.storage().by_id(id).unwrap(), paused);

    // Resuming picks up where it left off.
    let resumed = get_interval(&config).unwrap();
    assert_eq!(resumed, paused);
    let mut ticks = Vec::new();
    let mut ended = None;
    resumed
        .start(
            &cancel,
            &config,
            noop,
            |i| ticks.push(i.actual_duration),
            |i| ended = Some(i.clone()),
        )
        .await
        .unwrap();

    assert_eq!(ticks, vec![2 * SEC, 3 * SEC, 4 * SEC]);
    let ended = ended.expect("on_end runs once the resumed interval expires");
    assert_eq!(ended.state, State::Done);
    assert_eq!(ended.actual_duration, 4 * SEC);
    assert_eq!(ended.start_time, paused.start_time);
}

#[tokio::test(start_paused = true)]
async fn test_pause_rejects_non_running_intervals() {
    let config = memory_config(2, 2, 2);
    let cancel = CancellationToken::new();

    let fresh = get_interval(&config).unwrap();
    assert!(matches!(fresh.pause(&config), Err(PomoError::IntervalNotRunning)));
    assert_eq!(config.storage().by_id(fresh.id).unwrap().state, State::NotStarted);

    fresh.start(&cancel, &config, noop, noop, noop).await.unwrap();
    let done = config.storage().by_id(fresh.id).unwrap();
    assert!(matches!(done.pause(&config), Err(PomoError::IntervalNotRunning)));
    assert_eq!(config.storage().by_id(fresh.id).unwrap().state, State::Done);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_start_is_idempotent_while_running() {
    let config = memory_config(3, 3, 3);
    let cancel = CancellationToken::new();
    let interval = get_interval(&config).unwrap();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let runner = {
        let config = config.clone();
        let cancel = cancel.clone();
        let interval = interval.clone();
        tokio::spawn(async move {
            let on_begin = move |_: &Interval| {
                let _ = tx.send(());
            };
            interval.start(&cancel, &config, on_begin, noop, noop).await
        })
    };
    rx.recv().await.unwrap();

    // A second start request on the running interval returns immediately.
    let again = get_interval(&config).unwrap();
    assert_eq!(again.state, State::Running);
    let mut begun = false;
    again
        .start(&cancel, &config, |_| begun = true, noop, noop)
        .await
        .unwrap();
    assert!(!begun);

    // So does a stale NotStarted copy: storage already says Running.
    interval
        .start(&cancel, &config, |_| begun = true, noop, noop)
        .await
        .unwrap();
    assert!(!begun);

    runner.await.unwrap().unwrap();
    assert_eq!(config.storage().by_id(interval.id).unwrap().state, State::Done);
}

/// Delegates to memory storage until told to fail.
struct FlakyStorage {
    inner: InMemoryStorage,
    failing: AtomicBool,
}

impl FlakyStorage {
    fn check(&self) -> Result<(), PomoError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Corrupt("disk on fire".to_string()).into());
        }
        Ok(())
    }
}

impl Storage for FlakyStorage {
    fn create(&self, interval: &Interval) -> Result<i64, PomoError> {
        self.check()?;
        self.inner.create(interval)
    }
    fn update(&self, interval: &Interval) -> Result<(), PomoError> {
        self.check()?;
        self.inner.update(interval)
    }
    fn by_id(&self, id: i64) -> Result<Interval, PomoError> {
        self.check()?;
        self.inner.by_id(id)
    }
    fn last(&self) -> Result<Interval, PomoError> {
        self.check()?;
        self.inner.last()
    }
    fn breaks(&self, n: usize) -> Result<Vec<Interval>, PomoError> {
        self.check()?;
        self.inner.breaks(n)
    }
}

#[tokio::test(start_paused = true)]
async fn test_storage_failure_aborts_countdown() {
    let storage = Arc::new(FlakyStorage {
        inner: InMemoryStorage::new(),
        failing: AtomicBool::new(false),
    });
    let config = IntervalConfig::new(storage.clone(), 5 * SEC, SEC, SEC);
    let cancel = CancellationToken::new();
    let interval = get_interval(&config).unwrap();

    let mut ticks = 0;
    let err = interval
        .start(
            &cancel,
            &config,
            noop,
            |_| {
                ticks += 1;
                storage.failing.store(ticks == 2, Ordering::SeqCst);
            },
            |_| panic!("on_end must not run after a storage failure"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PomoError::Storage(StorageError::Corrupt(_))));
    assert_eq!(ticks, 2);

    storage.failing.store(false, Ordering::SeqCst);
    let stored = storage.by_id(interval.id).unwrap();
    assert_eq!(stored.state, State::Running);
    assert_eq!(stored.actual_duration, 2 * SEC);
}

#[tokio::test(start_paused = true)]
async fn test_sqlite_backend_full_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(SqliteStorage::open(dir.path().join("pomo.db")).unwrap());
    let config = IntervalConfig::new(storage, 2 * SEC, SEC, SEC);
    let cancel = CancellationToken::new();

    let mut categories = Vec::new();
    for _ in 0..4 {
        let interval = get_interval(&config).unwrap();
        categories.push(interval.category);
        interval.start(&cancel, &config, noop, noop, noop).await.unwrap();
        let stored = config.storage().by_id(interval.id).unwrap();
        assert_eq!(stored.state, State::Done);
        assert_eq!(stored.actual_duration, stored.planned_duration);
        assert!(stored.start_time.is_some());
    }
    assert_eq!(
        categories,
        vec![
            Category::Pomodoro,
            Category::ShortBreak,
            Category::Pomodoro,
            Category::ShortBreak
        ]
    );

    // History is on disk: a second handle sees the same sequence position.
    let reopened = IntervalConfig::new(
        Arc::new(SqliteStorage::open(dir.path().join("pomo.db")).unwrap()),
        2 * SEC,
        SEC,
        SEC,
    );
    let next = get_interval(&reopened).unwrap();
    assert_eq!(next.id, 5);
    assert_eq!(next.category, Category::Pomodoro);
}
