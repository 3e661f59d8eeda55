//! What the trial controller hands to whatever draws the screen.
//!
//! The controller never renders anything itself. After each transition or
//! statistics change it builds a [`TrialView`] and passes it to a
//! [`Presenter`].

use serde::Serialize;

/// Shown in place of a latency that has not been measured.
pub const PLACEHOLDER: &str = "—";

/// Phase of the reaction trial state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// No trial in flight.
    #[default]
    Idle,
    /// Trial started, cue not shown yet. Pressing now is a false start.
    Waiting,
    /// Cue shown, latency clock running.
    Ready,
    /// Latency measured and recorded.
    Result,
}

impl Phase {
    /// Whether a trial is in flight (an external start request is ignored).
    pub fn is_active(self) -> bool {
        matches!(self, Self::Waiting | Self::Ready)
    }

    pub fn pad_mode(self) -> PadMode {
        match self {
            Self::Idle | Self::Result => PadMode::Idle,
            Self::Waiting => PadMode::Wait,
            Self::Ready => PadMode::Ready,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Waiting => write!(f, "waiting"),
            Self::Ready => write!(f, "ready"),
            Self::Result => write!(f, "result"),
        }
    }
}

/// Visual treatment of the reaction pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadMode {
    Idle,
    Wait,
    Ready,
}

/// Operator-facing text on the reaction pad.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhaseLabel {
    Start,
    Wait,
    Go,
    Reaction(f64),
    FalseStart,
}

impl std::fmt::Display for PhaseLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "Click or press Space to start"),
            Self::Wait => write!(f, "Get ready... (don't press while red)"),
            Self::Go => write!(f, "Now! Press!"),
            Self::Reaction(ms) => {
                write!(f, "Reaction: {} (press again to restart)", format_ms(*ms))
            }
            Self::FalseStart => write!(f, "False start! Press to try again"),
        }
    }
}

/// The four displayed aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Aggregates {
    /// Latency of the most recent valid reaction, cleared by a false start
    /// or a reset.
    pub last: Option<f64>,
    pub best: Option<f64>,
    /// Mean of the recent window.
    pub average: Option<f64>,
    pub attempts: u64,
}

/// Everything a presenter needs for one update.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialView {
    pub phase: Phase,
    pub label: PhaseLabel,
    pub aggregates: Aggregates,
}

impl TrialView {
    pub fn pad_mode(&self) -> PadMode {
        self.phase.pad_mode()
    }
}

/// Receives a view after every phase transition and statistics update.
pub trait Presenter {
    fn present(&mut self, view: &TrialView);
}

/// Discards updates.
impl Presenter for () {
    fn present(&mut self, _view: &TrialView) {}
}

/// Records every update, oldest first.
impl Presenter for Vec<TrialView> {
    fn present(&mut self, view: &TrialView) {
        self.push(view.clone());
    }
}

/// Round to the nearest whole millisecond and add the unit, e.g. `"123 ms"`.
pub fn format_ms(ms: f64) -> String {
    // Half-up rounding, so 122.5 shows as 123.
    let rounded = (ms + 0.5).floor();
    format!("{} ms", rounded as i64)
}

/// [`format_ms`] for an optional latency, or [`PLACEHOLDER`].
pub fn format_optional_ms(ms: Option<f64>) -> String {
    match ms {
        Some(ms) if ms.is_finite() => format_ms(ms),
        _ => PLACEHOLDER.to_string(),
    }
}
