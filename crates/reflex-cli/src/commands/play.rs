//! `reflex play` — interactive reaction trials.

use reflex_core::{ReflexConfig, format_optional_ms};

pub fn run(config: &ReflexConfig) {
    let stats = super::open_statistics(config);
    let mut app = crate::tui::app::App::new(stats, super::storage_label(config));
    if let Err(e) = app.run() {
        eprintln!("TUI error: {e}");
        std::process::exit(1);
    }

    let failures = app.write_failures();
    let stats = app.into_statistics();
    println!(
        "Attempts: {}   Best: {}   Average: {}",
        stats.attempts,
        format_optional_ms(stats.best),
        format_optional_ms(stats.average()),
    );
    if failures > 0 {
        eprintln!("Warning: {failures} statistics writes failed; some results were not saved");
    }
}
