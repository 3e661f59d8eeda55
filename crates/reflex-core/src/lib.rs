//! # reflex-core
//!
//! **How fast are you, really?**
//!
//! `reflex-core` runs reaction-time trials: wait for a cue shown after a
//! random delay, press, and the elapsed monotonic time is folded into
//! persisted running statistics.
//!
//! ## Quick Start
//!
//! ```no_run
//! use reflex_core::{
//!     MemoryStore, MonotonicClock, StatisticsStore, TimerQueue, TrialController,
//! };
//!
//! let clock = MonotonicClock::new();
//! let mut trial = TrialController::new(
//!     StatisticsStore::open(MemoryStore::new()),
//!     TimerQueue::new(clock),
//!     clock,
//!     (),
//! );
//!
//! trial.press(); // begin: cue in 1.3-3.5 s
//! std::thread::sleep(trial.time_until_cue().unwrap_or_default());
//! trial.tick(); // cue fires, latency clock starts
//! trial.press(); // reaction recorded
//! println!("best: {}", reflex_core::format_optional_ms(trial.statistics().best));
//! ```
//!
//! ## Architecture
//!
//! Input signal → [`TrialController`] (interprets it against the current
//! [`Phase`]) → on a valid reaction, a [`Sample`] goes to the
//! [`StatisticsStore`] → the store recomputes aggregates and writes through to
//! a [`KeyValueStore`] → the controller hands a [`TrialView`] to a
//! [`Presenter`].
//!
//! Everything is single-threaded. The cue timer is a [`CueScheduler`] that the
//! event loop polls; no callbacks, no locks.

pub mod config;
pub mod present;
pub mod stats;
pub mod store;
pub mod timer;
pub mod trial;

pub use config::ReflexConfig;
pub use present::{
    Aggregates, PLACEHOLDER, PadMode, Phase, PhaseLabel, Presenter, TrialView, format_ms,
    format_optional_ms,
};
pub use stats::{RECENT_WINDOW, Sample, Statistics, StatisticsStore, average, load_statistics};
pub use store::{FileStore, KeyValueStore, MemoryStore, STORAGE_KEY};
pub use timer::{
    CUE_DELAY_MAX_MS, CUE_DELAY_MIN_MS, Clock, CueScheduler, ManualClock, MonotonicClock,
    TimerQueue, TimerToken, random_cue_delay,
};
pub use trial::{Transition, TrialController};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
