//! Terminal events → trial signals.
//!
//! Space, Enter and a left click on the pad are all the same "press". Key
//! auto-repeat and key release events never become presses; a held Space
//! would otherwise read as a false start.

use std::time::{Duration, Instant};

use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::layout::{Position, Rect};

/// Same-key presses closer together than this are treated as auto-repeat
/// when the terminal cannot label repeats itself.
pub const REPEAT_WINDOW: Duration = Duration::from_millis(80);

/// What the operator asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Press,
    Start,
    Reset,
    Quit,
}

/// Translate one terminal event, or `None` if it means nothing here.
///
/// Clicks only count inside `pad`, the pad area of the last drawn frame.
pub fn map_event(event: &Event, pad: Rect) -> Option<Signal> {
    match event {
        Event::Key(key) => map_key(key),
        Event::Mouse(mouse) => map_mouse(mouse, pad),
        _ => None,
    }
}

fn map_key(key: &KeyEvent) -> Option<Signal> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(key.code, KeyCode::Char('c')).then_some(Signal::Quit);
    }
    match key.code {
        KeyCode::Char(' ') | KeyCode::Enter => Some(Signal::Press),
        KeyCode::Char('s') | KeyCode::Char('S') => Some(Signal::Start),
        KeyCode::Char('r') | KeyCode::Char('R') => Some(Signal::Reset),
        KeyCode::Char('q') | KeyCode::Esc => Some(Signal::Quit),
        _ => None,
    }
}

fn map_mouse(mouse: &MouseEvent, pad: Rect) -> Option<Signal> {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left)
            if pad.contains(Position::new(mouse.column, mouse.row)) =>
        {
            Some(Signal::Press)
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// RepeatFilter
// ---------------------------------------------------------------------------

/// Drops key presses that belong to an auto-repeat stream.
///
/// Fallback for terminals without keyboard enhancement, where repeats arrive
/// as ordinary presses. A press of the same key within [`REPEAT_WINDOW`] of
/// the previous one is dropped, and every dropped press extends the stream.
/// The first repeat after the keyboard's initial repeat delay still gets
/// through.
#[derive(Debug)]
pub struct RepeatFilter {
    window: Duration,
    last: Option<(KeyCode, Instant)>,
}

impl RepeatFilter {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Whether `event`, seen at `now`, should be handled.
    pub fn accept(&mut self, event: &Event, now: Instant) -> bool {
        let Event::Key(key) = event else {
            return true;
        };
        if key.kind != KeyEventKind::Press {
            return true;
        }
        match self.last.replace((key.code, now)) {
            Some((code, at)) => code != key.code || now.duration_since(at) >= self.window,
            None => true,
        }
    }
}

impl Default for RepeatFilter {
    fn default() -> Self {
        Self::new(REPEAT_WINDOW)
    }
}
