//! Tick engine: runs one interval's countdown.
//!
//! `start` blocks its task until the interval finishes, is cancelled through
//! the [`CancellationToken`], or is paused by a concurrent [`Interval::pause`].
//! Every change goes through storage before the matching callback runs, and
//! the loop re-reads the record on each tick instead of trusting its own copy.
//!
//! ## State Transitions
//!
//! ```text
//! NotStarted -> Running      start (stamps start_time)
//! Paused     -> Running      start (resumes from actual_duration)
//! Running    -> Paused       pause, observed by the loop on its next tick
//! Running    -> Done         expiration
//! Running    -> Cancelled    cancellation token
//! ```
//!
//! ## Callbacks
//!
//! `on_begin`, `on_tick` and `on_end` run synchronously inside the loop's
//! task. They must return quickly since they delay the next tick, and must
//! not call `start`/`pause` on the same interval.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::interval::{Interval, State};
use crate::config::IntervalConfig;
use crate::error::{PomoError, Result};

/// One unit of progress accounting.
pub const TICK: Duration = Duration::from_secs(1);

/// Stand-in deadline for plans too long to represent as an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// What the storage record allowed when we tried to move it to Running.
enum Claim {
    Claimed,
    AlreadyRunning,
    Completed,
}

impl Interval {
    /// Run this interval until it is done, cancelled or paused.
    ///
    /// Starting a running interval is a no-op; starting a done or cancelled
    /// one fails with [`PomoError::IntervalCompleted`]. Returns `Ok(())` on
    /// every normal exit, including pause and cancellation.
    pub async fn start<B, T, E>(
        &self,
        cancel: &CancellationToken,
        config: &IntervalConfig,
        on_begin: B,
        on_tick: T,
        on_end: E,
    ) -> Result<()>
    where
        B: FnMut(&Interval),
        T: FnMut(&Interval),
        E: FnMut(&Interval),
    {
        match self.state {
            State::Running => Ok(()),
            State::NotStarted => {
                self.run(Some(Utc::now()), cancel, config, on_begin, on_tick, on_end)
                    .await
            }
            State::Paused => self.run(None, cancel, config, on_begin, on_tick, on_end).await,
            State::Done | State::Cancelled => Err(PomoError::IntervalCompleted { id: self.id }),
        }
    }

    /// Pause a running interval.
    ///
    /// The running loop notices on its next tick and returns. This is the
    /// only way an interval becomes Paused.
    pub fn pause(&self, config: &IntervalConfig) -> Result<()> {
        if self.state != State::Running {
            return Err(PomoError::IntervalNotRunning);
        }

        let mut was_running = false;
        let paused = config.storage().update_with(self.id, &mut |stored| {
            was_running = stored.state == State::Running;
            if was_running {
                stored.state = State::Paused;
            }
            was_running
        })?;
        if !was_running {
            return Err(PomoError::IntervalNotRunning);
        }

        info!(
            id = paused.id,
            category = %paused.category,
            actual_ms = paused.actual_duration.as_millis() as u64,
            "interval paused"
        );
        Ok(())
    }

    /// Shared begin/resume action: mark Running, notify, count down.
    async fn run<B, T, E>(
        &self,
        started_at: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
        config: &IntervalConfig,
        mut on_begin: B,
        mut on_tick: T,
        mut on_end: E,
    ) -> Result<()>
    where
        B: FnMut(&Interval),
        T: FnMut(&Interval),
        E: FnMut(&Interval),
    {
        let mut claim = Claim::Claimed;
        let running = config.storage().update_with(self.id, &mut |stored| match stored.state {
            State::NotStarted | State::Paused => {
                if stored.start_time.is_none() {
                    stored.start_time = started_at;
                }
                stored.state = State::Running;
                true
            }
            State::Running => {
                claim = Claim::AlreadyRunning;
                false
            }
            State::Done | State::Cancelled => {
                claim = Claim::Completed;
                false
            }
        })?;

        match claim {
            Claim::Claimed => {}
            // Another task won the race to start it.
            Claim::AlreadyRunning => return Ok(()),
            Claim::Completed => return Err(PomoError::IntervalCompleted { id: self.id }),
        }

        info!(
            id = running.id,
            category = %running.category,
            remaining_ms = running.remaining().as_millis() as u64,
            "interval running"
        );
        on_begin(&running);

        countdown(&running, cancel, config, &mut on_tick, &mut on_end)
            .await
            .inspect_err(|e| warn!(id = running.id, error = %e, "countdown aborted"))
    }
}

/// The countdown loop proper.
///
/// Waits on three events: the 1-second tick, expiration of the remaining
/// planned time, and cancellation. Ticks are checked first so that the tick
/// landing on the expiration instant is still counted.
async fn countdown<T, E>(
    running: &Interval,
    cancel: &CancellationToken,
    config: &IntervalConfig,
    on_tick: &mut T,
    on_end: &mut E,
) -> Result<()>
where
    T: FnMut(&Interval),
    E: FnMut(&Interval),
{
    let id = running.id;
    let entered = Instant::now();

    let mut ticker = time::interval_at(entered + TICK, TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let deadline = entered
        .checked_add(running.remaining())
        .unwrap_or_else(|| entered + FAR_FUTURE);
    let expire = time::sleep_until(deadline);
    tokio::pin!(expire);

    loop {
        tokio::select! {
            biased;

            _ = ticker.tick() => {
                let mut advanced = false;
                let current = config.storage().update_with(id, &mut |stored| {
                    if stored.state != State::Running
                        || stored.actual_duration + TICK > stored.planned_duration
                    {
                        return false;
                    }
                    stored.actual_duration += TICK;
                    advanced = true;
                    true
                })?;

                match current.state {
                    State::Running => {}
                    State::Paused => {
                        debug!(id, "pause observed, leaving countdown");
                        return Ok(());
                    }
                    other => {
                        warn!(id, state = %other, "interval left Running outside the engine");
                        return Ok(());
                    }
                }

                if advanced {
                    debug!(id, actual_ms = current.actual_duration.as_millis() as u64, "tick");
                    on_tick(&current);
                }
            }

            _ = &mut expire => {
                let done = finish(config, id, State::Done)?;
                if done.state == State::Done {
                    info!(id, actual_ms = done.actual_duration.as_millis() as u64, "interval done");
                    on_end(&done);
                }
                return Ok(());
            }

            _ = cancel.cancelled() => {
                let cancelled = finish(config, id, State::Cancelled)?;
                info!(id, state = %cancelled.state, actual_ms = cancelled.actual_duration.as_millis() as u64, "interval cancelled");
                return Ok(());
            }
        }
    }
}

/// Move a record to a terminal state unless it already is in one.
fn finish(config: &IntervalConfig, id: i64, state: State) -> Result<Interval> {
    config.storage().update_with(id, &mut |stored| {
        if stored.state.is_terminal() {
            return false;
        }
        stored.state = state;
        true
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;
    use crate::timer::{get_interval, Category};
    use std::sync::Arc;

    fn config(secs: u64) -> IntervalConfig {
        let d = Duration::from_secs(secs);
        IntervalConfig::new(Arc::new(InMemoryStorage::new()), d, d, d)
    }

    fn noop(_: &Interval) {}

    #[tokio::test(start_paused = true)]
    async fn start_on_running_is_noop() {
        let config = config(3);
        let mut i = get_interval(&config).unwrap();
        i.state = State::Running;
        config.storage().update(&i).unwrap();

        let cancel = CancellationToken::new();
        let mut begun = 0;
        i.start(&cancel, &config, |_| begun += 1, noop, noop)
            .await
            .unwrap();
        assert_eq!(begun, 0);
        assert_eq!(config.storage().by_id(i.id).unwrap().actual_duration, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn start_on_terminal_fails() {
        let config = config(3);
        let cancel = CancellationToken::new();
        for state in [State::Done, State::Cancelled] {
            let mut i = get_interval(&config).unwrap();
            i.state = state;
            config.storage().update(&i).unwrap();
            let err = i.start(&cancel, &config, noop, noop, noop).await.unwrap_err();
            assert!(matches!(err, PomoError::IntervalCompleted { id } if id == i.id));
            assert_eq!(config.storage().by_id(i.id).unwrap().state, state);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stale_copy_of_finished_interval_is_rejected() {
        let config = config(2);
        let i = get_interval(&config).unwrap();
        let cancel = CancellationToken::new();
        i.start(&cancel, &config, noop, noop, noop).await.unwrap();

        // `i` still says NotStarted; storage says Done.
        let err = i.start(&cancel, &config, noop, noop, noop).await.unwrap_err();
        assert!(matches!(err, PomoError::IntervalCompleted { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn begin_stamps_start_time_once() {
        let config = config(2);
        let i = get_interval(&config).unwrap();
        assert!(i.start_time.is_none());

        let cancel = CancellationToken::new();
        let mut seen = None;
        i.start(&cancel, &config, |r| seen = Some(r.clone()), noop, noop)
            .await
            .unwrap();

        let begun = seen.unwrap();
        assert_eq!(begun.state, State::Running);
        assert_eq!(begun.category, Category::Pomodoro);
        let stored = config.storage().by_id(i.id).unwrap();
        assert_eq!(stored.start_time, begun.start_time);
        assert!(stored.start_time.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn pre_cancelled_token_cancels_without_ticking() {
        let config = config(5);
        let i = get_interval(&config).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut ticks = 0;
        i.start(&cancel, &config, noop, |_| ticks += 1, |_| panic!("on_end after cancel"))
            .await
            .unwrap();
        assert_eq!(ticks, 0);
        let stored = config.storage().by_id(i.id).unwrap();
        assert_eq!(stored.state, State::Cancelled);
        assert_eq!(stored.actual_duration, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn unrepresentable_deadline_still_counts_down() {
        let config = config(u64::MAX);
        let i = get_interval(&config).unwrap();

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let mut ticks = 0;
        i.start(
            &cancel,
            &config,
            noop,
            |_| {
                ticks += 1;
                if ticks == 2 {
                    token.cancel();
                }
            },
            |_| panic!("on_end before the plan elapsed"),
        )
        .await
        .unwrap();

        assert_eq!(ticks, 2);
        let stored = config.storage().by_id(i.id).unwrap();
        assert_eq!(stored.state, State::Cancelled);
        assert_eq!(stored.actual_duration, 2 * TICK);
        assert_eq!(stored.planned_duration, Duration::from_secs(u64::MAX));
    }

    #[test]
    fn pause_requires_running() {
        let config = config(5);
        let i = get_interval(&config).unwrap();
        assert!(matches!(i.pause(&config), Err(PomoError::IntervalNotRunning)));

        // Local copy claims Running but storage disagrees.
        let mut stale = i.clone();
        stale.state = State::Running;
        assert!(matches!(stale.pause(&config), Err(PomoError::IntervalNotRunning)));
        assert_eq!(config.storage().by_id(i.id).unwrap().state, State::NotStarted);
    }
}
