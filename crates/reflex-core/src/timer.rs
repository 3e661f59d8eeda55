//! Monotonic clocks and the cancellable one-shot cue timer.
//!
//! Everything runs on one thread. A [`CueScheduler`] does not call back into
//! the controller; the event loop pulls expired timers with
//! [`CueScheduler::pop_due`] and hands them to the controller. Cancelling a
//! timer before it is popped guarantees it is never observed.

use std::cell::Cell;
use std::ops::Range;
use std::rc::Rc;
use std::time::{Duration, Instant};

use rand::Rng;

/// Lower bound of the random cue delay, inclusive.
pub const CUE_DELAY_MIN_MS: u64 = 1300;
/// Upper bound of the random cue delay, exclusive.
pub const CUE_DELAY_MAX_MS: u64 = 3500;

/// Half-open range the cue delay is drawn from, in milliseconds.
pub const CUE_DELAY_RANGE_MS: Range<f64> = CUE_DELAY_MIN_MS as f64..CUE_DELAY_MAX_MS as f64;

/// Draw a cue delay uniformly from [`CUE_DELAY_RANGE_MS`].
pub fn random_cue_delay<R: Rng>(rng: &mut R) -> Duration {
    let ms = rng.random_range(CUE_DELAY_RANGE_MS);
    Duration::from_nanos((ms * 1_000_000.0) as u64)
}

// ---------------------------------------------------------------------------
// Clocks
// ---------------------------------------------------------------------------

/// Monotonic time source. Readings are offsets from an arbitrary origin and
/// never go backwards.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Real clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven clock for tests. Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Handle to a scheduled cue. Never reused by the scheduler that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

impl TimerToken {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Single-fire, cancellable delayed events.
pub trait CueScheduler {
    /// Schedule a timer that becomes due after `delay`.
    fn schedule(&mut self, delay: Duration) -> TimerToken;

    /// Cancel a pending timer. Unknown or already-fired tokens are ignored.
    fn cancel(&mut self, token: TimerToken);

    /// Pop the earliest timer whose deadline has passed.
    fn pop_due(&mut self) -> Option<TimerToken>;

    /// Time until the earliest pending timer is due (zero if overdue).
    fn time_until_next(&self) -> Option<Duration>;

    fn is_pending(&self, token: TimerToken) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    token: TimerToken,
    deadline: Duration,
}

/// Deadline-ordered timer queue driven by a [`Clock`].
#[derive(Debug)]
pub struct TimerQueue<C: Clock> {
    clock: C,
    pending: Vec<Entry>,
    next_id: u64,
}

impl<C: Clock> TimerQueue<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            pending: Vec::new(),
            next_id: 1,
        }
    }

    /// Number of timers still waiting to fire.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<C: Clock> CueScheduler for TimerQueue<C> {
    fn schedule(&mut self, delay: Duration) -> TimerToken {
        let token = TimerToken(self.next_id);
        self.next_id += 1;
        let deadline = self.clock.now() + delay;
        // Keep sorted by deadline; ties fire in scheduling order.
        let at = self.pending.partition_point(|e| e.deadline <= deadline);
        self.pending.insert(at, Entry { token, deadline });
        token
    }

    fn cancel(&mut self, token: TimerToken) {
        self.pending.retain(|e| e.token != token);
    }

    fn pop_due(&mut self) -> Option<TimerToken> {
        let first = self.pending.first()?;
        if first.deadline <= self.clock.now() {
            Some(self.pending.remove(0).token)
        } else {
            None
        }
    }

    fn time_until_next(&self) -> Option<Duration> {
        let first = self.pending.first()?;
        Some(first.deadline.saturating_sub(self.clock.now()))
    }

    fn is_pending(&self, token: TimerToken) -> bool {
        self.pending.iter().any(|e| e.token == token)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
