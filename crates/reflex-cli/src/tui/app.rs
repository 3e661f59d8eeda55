//! TUI application state and event loop.
//!
//! Design: one thread, no background collectors. The loop draws, waits for
//! input no longer than the time until the pending cue, feeds input to the
//! trial controller, then lets due cues fire.

use std::io;
use std::time::{Duration, Instant};

use crossterm::{
    event::{
        self, DisableMouseCapture, Event, EnableMouseCapture, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
        supports_keyboard_enhancement,
    },
};
use ratatui::prelude::*;

use reflex_core::{
    KeyValueStore, MonotonicClock, Presenter, Statistics, StatisticsStore, TimerQueue,
    TrialController, TrialView,
};

use super::input::{self, RepeatFilter, Signal};

/// Upper bound on how long the loop blocks waiting for input.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// FramePresenter
// ---------------------------------------------------------------------------

/// Keeps the most recent view for the next frame.
#[derive(Debug, Default)]
pub struct FramePresenter {
    latest: Option<TrialView>,
    updates: u64,
}

impl FramePresenter {
    pub fn latest(&self) -> Option<&TrialView> {
        self.latest.as_ref()
    }

    /// Number of views received so far.
    pub fn updates(&self) -> u64 {
        self.updates
    }
}

impl Presenter for FramePresenter {
    fn present(&mut self, view: &TrialView) {
        self.latest = Some(view.clone());
        self.updates += 1;
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

type Trial<K> = TrialController<K, TimerQueue<MonotonicClock>, MonotonicClock, FramePresenter>;

pub struct App<K: KeyValueStore> {
    trial: Trial<K>,
    running: bool,
    /// Where statistics are stored, for the title bar.
    storage_label: String,
    /// Pad area of the last drawn frame; clicks elsewhere are ignored.
    pad: Rect,
    /// Set when the terminal cannot report key repeats itself.
    repeat_filter: Option<RepeatFilter>,
}

impl<K: KeyValueStore> App<K> {
    pub fn new(stats: StatisticsStore<K>, storage_label: impl Into<String>) -> Self {
        let clock = MonotonicClock::new();
        Self {
            trial: TrialController::new(
                stats,
                TimerQueue::new(clock),
                clock,
                FramePresenter::default(),
            ),
            running: true,
            storage_label: storage_label.into(),
            pad: Rect::default(),
            repeat_filter: None,
        }
    }

    pub fn run(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

        // Without event-type reporting, terminals deliver auto-repeat as
        // ordinary presses.
        let enhanced = supports_keyboard_enhancement().unwrap_or(false);
        if enhanced {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        } else {
            log::debug!("keyboard enhancement unsupported; debouncing same-key presses");
            self.repeat_filter = Some(RepeatFilter::default());
        }

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // Install panic hook that restores terminal before printing the panic.
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = disable_raw_mode();
            let _ = execute!(
                io::stdout(),
                PopKeyboardEnhancementFlags,
                DisableMouseCapture,
                LeaveAlternateScreen,
                crossterm::cursor::Show
            );
            original_hook(info);
        }));

        let result = self.run_loop(&mut terminal);

        // Always restore terminal, even if the loop returned an error.
        let _ = std::panic::take_hook();
        disable_raw_mode()?;
        if enhanced {
            execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
        }
        execute!(
            terminal.backend_mut(),
            DisableMouseCapture,
            LeaveAlternateScreen,
            crossterm::cursor::Show
        )?;

        result
    }

    fn run_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        while self.running {
            let frame = terminal.draw(|f| super::ui::draw(f, self))?;
            self.pad = super::ui::pad_area(frame.area);

            let timeout = self
                .trial
                .time_until_cue()
                .map_or(POLL_INTERVAL, |d| d.min(POLL_INTERVAL));

            if event::poll(timeout)? {
                let ev = event::read()?;
                self.handle_event(&ev, Instant::now());
            }

            // Input first: a press that raced the cue onto the screen is
            // still a false start.
            self.trial.tick();
        }

        Ok(())
    }

    /// Filter and map one terminal event, then act on it.
    pub fn handle_event(&mut self, event: &Event, now: Instant) {
        if let Some(filter) = self.repeat_filter.as_mut()
            && !filter.accept(event, now)
        {
            log::trace!("dropped repeated key {event:?}");
            return;
        }
        if let Some(signal) = input::map_event(event, self.pad) {
            self.handle_signal(signal);
        }
    }

    pub fn handle_signal(&mut self, signal: Signal) {
        let transition = match signal {
            Signal::Press => self.trial.press(),
            Signal::Start => self.trial.start(),
            Signal::Reset => self.trial.reset_statistics(),
            Signal::Quit => {
                self.running = false;
                return;
            }
        };
        log::trace!("{signal:?} -> {transition:?}");
    }

    // --- Accessors for rendering ---

    /// The view most recently presented by the controller.
    pub fn view(&self) -> TrialView {
        self.trial
            .presenter()
            .latest()
            .cloned()
            .unwrap_or_else(|| self.trial.view())
    }

    pub fn statistics(&self) -> &Statistics {
        self.trial.statistics()
    }

    pub fn write_failures(&self) -> u64 {
        self.trial.store().write_failures()
    }

    pub fn storage_label(&self) -> &str {
        &self.storage_label
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Final statistics once the loop has ended.
    pub fn into_statistics(self) -> Statistics {
        self.trial.statistics().clone()
    }
}
