use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::split_hms;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Blocking wait between ticks. Injected so tests can drive the loop
/// without waiting on the wall clock.
pub trait Sleeper: Send + Sync + 'static {
    fn sleep(&self, period: Duration);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, period: Duration) {
        thread::sleep(period);
    }
}

type TickFn = dyn Fn(u64, u64, u64) + Send + Sync;
type FinishFn = dyn Fn() + Send + Sync;

struct Shared {
    running: AtomicBool,
    // Bumped by every start and stop; a worker only acts while it still matches.
    generation: AtomicU64,
    remaining: AtomicU64,
    on_tick: Box<TickFn>,
    on_finish: Box<FinishFn>,
    sleeper: Box<dyn Sleeper>,
}

impl Shared {
    fn is_current(&self, run: u64) -> bool {
        self.generation.load(Ordering::Acquire) == run
    }
}

/// Single countdown with one-second granularity.
///
/// `start` spawns a worker thread that calls `on_tick(h, m, s)` for every
/// remaining value from the initial duration down to zero inclusive, then
/// `on_finish()` once. Both callbacks run on the worker; callers that touch
/// UI state must forward them to their own thread.
pub struct CountdownEngine {
    shared: Arc<Shared>,
}

impl CountdownEngine {
    pub fn new<T, F>(on_tick: T, on_finish: F) -> Self
    where
        T: Fn(u64, u64, u64) + Send + Sync + 'static,
        F: Fn() + Send + Sync + 'static,
    {
        Self::with_sleeper(on_tick, on_finish, ThreadSleeper)
    }

    pub fn with_sleeper<T, F, S>(on_tick: T, on_finish: F, sleeper: S) -> Self
    where
        T: Fn(u64, u64, u64) + Send + Sync + 'static,
        F: Fn() + Send + Sync + 'static,
        S: Sleeper,
    {
        Self {
            shared: Arc::new(Shared {
                running: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                remaining: AtomicU64::new(0),
                on_tick: Box::new(on_tick),
                on_finish: Box::new(on_finish),
                sleeper: Box::new(sleeper),
            }),
        }
    }

    /// Begin counting down from `total_seconds`. Ignored while a run is active.
    pub fn start(&self, total_seconds: u64) {
        if self.shared.running.swap(true, Ordering::AcqRel) {
            return;
        }
        let run = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.shared.remaining.store(total_seconds, Ordering::Release);

        let shared = Arc::clone(&self.shared);
        thread::spawn(move || run_countdown(shared, run, total_seconds));
    }

    /// Return to idle. Does not wait for the worker, which exits silently at
    /// its next tick boundary.
    pub fn stop(&self) {
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        self.shared.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.shared.remaining.load(Ordering::Acquire)
    }
}

impl Drop for CountdownEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_countdown(shared: Arc<Shared>, run: u64, total_seconds: u64) {
    for remaining in (0..=total_seconds).rev() {
        if !shared.is_current(run) {
            return;
        }
        shared.remaining.store(remaining, Ordering::Release);
        let (h, m, s) = split_hms(remaining);
        (shared.on_tick)(h, m, s);
        shared.sleeper.sleep(TICK_PERIOD);
    }

    if !shared.is_current(run) {
        return;
    }
    (shared.on_finish)();

    // A stop or restart may have landed while on_finish ran
    if shared.is_current(run) {
        shared.running.store(false, Ordering::Release);
    }
}
