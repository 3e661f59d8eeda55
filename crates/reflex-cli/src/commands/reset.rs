//! `reflex reset` — clear persisted statistics.

use reflex_core::ReflexConfig;

pub fn run(config: &ReflexConfig) {
    let mut store = super::open_statistics(config);
    let previous = store.statistics().attempts;
    store.reset();

    if store.write_failures() > 0 {
        eprintln!("Error: could not write {}", super::storage_label(config));
        std::process::exit(1);
    }
    println!("Statistics cleared ({previous} attempts removed).");
}
