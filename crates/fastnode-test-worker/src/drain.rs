//! Drain Supervisor: bounds how long one run waits on the engine's event
//! loop so a leaked timer, socket, or unresolved promise in user code can
//! never keep the worker stuck on a single request.
//!
//! Two call sites in `crate::executor` use this, for the two places a
//! leaked handle can block completion: [`DrainSupervisor::run_until`] bounds
//! waiting on one leaf's own completion signal, and
//! [`DrainSupervisor::drain_tail`] bounds the run's tail phase after every
//! leaf has finished, which is what actually catches a handle the *last*
//! test leaked (e.g. an uncleared `setInterval`) rather than one it awaited
//! directly.
//!
//! There is no separate OS thread driving a stream here (see
//! `crate::executor`): "destroying the stream" is realized by simply
//! ceasing to poll the in-flight `run_event_loop` future and returning
//! instead — `tokio::select!` drops the losing branch, so the abandoned
//! future (and whatever leaked timer it represents) is never polled again.

use fastnode_runtime::{Runtime, RuntimeError};
use std::time::{Duration, Instant};

/// 200ms, per contract: the tick must not itself hold the event loop alive.
const TICK: Duration = Duration::from_millis(200);

const FORCE_EXIT_IDLE_DEADLINE: Duration = Duration::from_millis(500);
const DEFAULT_IDLE_DEADLINE: Duration = Duration::from_millis(5000);

/// Outcome of racing a step of progress against the idle deadline.
pub enum DrainOutcome<T> {
    /// `check` produced a value before the deadline elapsed.
    Completed(T),
    /// No event was observed for longer than the idle deadline; the engine
    /// was abandoned mid-run.
    Drained,
}

/// Tracks the last time forward progress was observed and decides when a
/// run has gone idle long enough to be forcibly abandoned.
pub struct DrainSupervisor {
    last_event_at: Instant,
    idle_deadline: Duration,
}

impl DrainSupervisor {
    /// `force_exit` selects the 500ms deadline (caller expects tests to
    /// already be finished); otherwise the conservative 5000ms deadline.
    pub fn new(force_exit: bool) -> Self {
        Self {
            last_event_at: Instant::now(),
            idle_deadline: if force_exit {
                FORCE_EXIT_IDLE_DEADLINE
            } else {
                DEFAULT_IDLE_DEADLINE
            },
        }
    }

    /// Record that forward progress happened just now (a leaf finished, a
    /// new leaf started). Resets the idle clock.
    pub fn note_event(&mut self) {
        self.last_event_at = Instant::now();
    }

    /// Drive `runtime`'s event loop, polling `check` after every step, until
    /// either `check` returns `Some(value)` or the idle deadline elapses
    /// without forward progress.
    ///
    /// `check` is re-evaluated both before driving the loop and after each
    /// `run_event_loop` step returns, since the loop can go idle (nothing
    /// pending) while the thing `check` is waiting for — e.g. a promise
    /// with no pending op backing it — never actually resolves. The
    /// deadline itself is also re-evaluated immediately after a
    /// `run_event_loop` step, not only on the ticker branch: when nothing is
    /// pending (e.g. that same unbacked promise), `run_event_loop` resolves
    /// instantly every time, and under `biased` selection that branch would
    /// otherwise always win the race, starving the ticker branch forever.
    pub async fn run_until<T>(
        &mut self,
        runtime: &mut Runtime,
        mut check: impl FnMut(&mut Runtime) -> Result<Option<T>, RuntimeError>,
    ) -> Result<DrainOutcome<T>, RuntimeError> {
        let mut ticker = tokio::time::interval(TICK);
        ticker.tick().await; // interval's first tick fires immediately

        loop {
            if let Some(value) = check(runtime)? {
                return Ok(DrainOutcome::Completed(value));
            }
            if self.last_event_at.elapsed() >= self.idle_deadline {
                return Ok(DrainOutcome::Drained);
            }

            tokio::select! {
                biased;

                result = runtime.run_event_loop() => {
                    result?;
                    if self.last_event_at.elapsed() >= self.idle_deadline {
                        return Ok(DrainOutcome::Drained);
                    }
                    // Loop went idle (or took one step) with no fresh event
                    // of our own to record; the next iteration re-checks
                    // `check`.
                }

                _ = ticker.tick() => {
                    if self.last_event_at.elapsed() >= self.idle_deadline {
                        return Ok(DrainOutcome::Drained);
                    }
                }
            }
        }
    }

    /// Drive `runtime`'s event loop to natural completion (no more pending
    /// handles at all) or until the idle deadline elapses since the last
    /// observed event, whichever comes first.
    ///
    /// This is the run's tail phase, after every leaf has finished: it is
    /// what actually bounds a leaked `setInterval`/open socket/unresolved
    /// promise left behind by the last test. Unlike `run_until`, there is
    /// no `check` predicate — `run_event_loop` completing at all (rather
    /// than being abandoned mid-poll) *is* "done" here, so a clean run with
    /// nothing left pending returns immediately instead of waiting out the
    /// idle deadline.
    pub async fn drain_tail(&mut self, runtime: &mut Runtime) -> Result<(), RuntimeError> {
        let mut ticker = tokio::time::interval(TICK);
        ticker.tick().await;

        loop {
            if self.last_event_at.elapsed() >= self.idle_deadline {
                return Ok(());
            }

            tokio::select! {
                biased;

                result = runtime.run_event_loop() => {
                    return result;
                }

                _ = ticker.tick() => {
                    if self.last_event_at.elapsed() >= self.idle_deadline {
                        return Ok(());
                    }
                }
            }
        }
    }
}
