//! Reaction trial state machine.
//!
//! ```text
//!   Idle/Result --press|start--> Waiting --cue fires--> Ready --press--> Result
//!                                   |
//!                                   +--press (false start)--> Idle
//! ```
//!
//! A trial begins by scheduling a cue after a random delay in
//! [1300, 3500) ms. Pressing before the cue is a false start: the pending cue
//! is cancelled and nothing is recorded. Pressing after the cue records the
//! elapsed monotonic time as a sample. Resetting statistics never changes
//! the phase.
//!
//! At most one cue is pending at any time. Starting a trial always cancels
//! the previous cue first, and a cue whose token no longer matches the
//! pending one is ignored.

use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::present::{Phase, PhaseLabel, Presenter, TrialView};
use crate::stats::{Sample, Statistics, StatisticsStore};
use crate::store::KeyValueStore;
use crate::timer::{Clock, CueScheduler, TimerToken, random_cue_delay};

/// Outcome of feeding one event to the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    /// A new trial began; the cue is due after `delay`.
    TrialStarted { token: TimerToken, delay: Duration },
    /// Pressed before the cue. Back to idle, nothing recorded.
    FalseStart,
    /// The cue fired; the latency clock is running.
    Armed,
    /// Valid reaction measured and recorded.
    Reacted { latency: Sample },
    /// Statistics cleared; phase untouched.
    StatisticsReset,
    /// The event has no effect in the current phase.
    Ignored,
}

/// Drives trials and owns the statistics store.
pub struct TrialController<K, S, C, P>
where
    K: KeyValueStore,
    S: CueScheduler,
    C: Clock,
    P: Presenter,
{
    phase: Phase,
    label: PhaseLabel,
    pending_cue: Option<TimerToken>,
    baseline: Option<Duration>,
    last: Option<f64>,
    stats: StatisticsStore<K>,
    scheduler: S,
    clock: C,
    presenter: P,
    rng: StdRng,
}

impl<K, S, C, P> TrialController<K, S, C, P>
where
    K: KeyValueStore,
    S: CueScheduler,
    C: Clock,
    P: Presenter,
{
    /// Create an idle controller and present the initial view.
    pub fn new(stats: StatisticsStore<K>, scheduler: S, clock: C, presenter: P) -> Self {
        Self::with_rng(stats, scheduler, clock, presenter, StdRng::from_os_rng())
    }

    /// Like [`TrialController::new`] with a caller-supplied delay generator.
    pub fn with_rng(
        stats: StatisticsStore<K>,
        scheduler: S,
        clock: C,
        presenter: P,
        rng: StdRng,
    ) -> Self {
        let mut controller = Self {
            phase: Phase::Idle,
            label: PhaseLabel::Start,
            pending_cue: None,
            baseline: None,
            last: None,
            stats,
            scheduler,
            clock,
            presenter,
            rng,
        };
        controller.present();
        controller
    }

    /// Deterministic delays, for tests and replays.
    pub fn with_seed(
        stats: StatisticsStore<K>,
        scheduler: S,
        clock: C,
        presenter: P,
        seed: u64,
    ) -> Self {
        Self::with_rng(stats, scheduler, clock, presenter, StdRng::seed_from_u64(seed))
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Unified press signal (click, tap, Space, Enter).
    pub fn press(&mut self) -> Transition {
        match self.phase {
            Phase::Idle | Phase::Result => self.begin_trial(),
            Phase::Waiting => self.false_start(),
            Phase::Ready => self.react(),
        }
    }

    /// External start/restart request. Ignored while a trial is in flight.
    pub fn start(&mut self) -> Transition {
        if self.phase.is_active() {
            log::debug!("start ignored while {}", self.phase);
            return Transition::Ignored;
        }
        self.begin_trial()
    }

    /// Clear all statistics. The phase and any pending cue are kept.
    pub fn reset_statistics(&mut self) -> Transition {
        self.stats.reset();
        self.last = None;
        if !self.phase.is_active() {
            self.label = PhaseLabel::Start;
        }
        log::debug!("statistics reset during {}", self.phase);
        self.present();
        Transition::StatisticsReset
    }

    /// Deliver an expired cue timer.
    pub fn fire_cue(&mut self, token: TimerToken) -> Transition {
        if self.phase != Phase::Waiting || self.pending_cue != Some(token) {
            log::debug!("stale cue {} ignored during {}", token.id(), self.phase);
            return Transition::Ignored;
        }
        self.pending_cue = None;
        self.baseline = Some(self.clock.now());
        self.phase = Phase::Ready;
        self.label = PhaseLabel::Go;
        log::debug!("cue {} fired", token.id());
        self.present();
        Transition::Armed
    }

    /// Fire every cue the scheduler reports as due.
    pub fn tick(&mut self) -> Vec<Transition> {
        let mut fired = Vec::new();
        while let Some(token) = self.scheduler.pop_due() {
            fired.push(self.fire_cue(token));
        }
        fired
    }

    // -----------------------------------------------------------------------
    // Internal transitions
    // -----------------------------------------------------------------------

    fn begin_trial(&mut self) -> Transition {
        self.cancel_pending_cue();
        self.phase = Phase::Waiting;
        self.label = PhaseLabel::Wait;
        self.baseline = None;

        let delay = random_cue_delay(&mut self.rng);
        let token = self.scheduler.schedule(delay);
        self.pending_cue = Some(token);
        log::debug!("trial started, cue {} in {delay:?}", token.id());
        self.present();
        Transition::TrialStarted { token, delay }
    }

    fn false_start(&mut self) -> Transition {
        self.phase = Phase::Idle;
        self.cancel_pending_cue();
        self.last = None;
        self.label = PhaseLabel::FalseStart;
        log::debug!("false start");
        self.present();
        Transition::FalseStart
    }

    fn react(&mut self) -> Transition {
        let now = self.clock.now();
        let Some(baseline) = self.baseline.take() else {
            log::warn!("press in ready phase without a baseline");
            return Transition::Ignored;
        };
        let latency = Sample::from_duration(now.saturating_sub(baseline));

        self.stats.record(latency);
        self.last = Some(latency.millis());
        self.phase = Phase::Result;
        self.label = PhaseLabel::Reaction(latency.millis());
        log::debug!("reaction {:.1} ms", latency.millis());
        self.present();
        Transition::Reacted { latency }
    }

    fn cancel_pending_cue(&mut self) {
        if let Some(token) = self.pending_cue.take() {
            self.scheduler.cancel(token);
        }
    }

    fn present(&mut self) {
        let view = self.view();
        self.presenter.present(&view);
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Current phase, label and aggregates.
    pub fn view(&self) -> TrialView {
        TrialView {
            phase: self.phase,
            label: self.label,
            aggregates: self.stats.aggregates(self.last),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn label(&self) -> PhaseLabel {
        self.label
    }

    pub fn last_latency(&self) -> Option<f64> {
        self.last
    }

    pub fn statistics(&self) -> &Statistics {
        self.stats.statistics()
    }

    pub fn store(&self) -> &StatisticsStore<K> {
        &self.stats
    }

    pub fn pending_cue(&self) -> Option<TimerToken> {
        self.pending_cue
    }

    /// How long until the pending cue is due, if any.
    pub fn time_until_cue(&self) -> Option<Duration> {
        self.pending_cue?;
        self.scheduler.time_until_next()
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
