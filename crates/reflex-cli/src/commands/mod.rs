pub mod play;
pub mod reset;
pub mod stats;

use std::fs::OpenOptions;
use std::path::PathBuf;

use reflex_core::{KeyValueStore, ReflexConfig, STORAGE_KEY, StatisticsStore};

/// Build the runtime config from command-line flags.
pub fn make_config(data_dir: &str, ephemeral: bool) -> ReflexConfig {
    ReflexConfig {
        data_dir: PathBuf::from(data_dir),
        ephemeral,
    }
}

/// Open the statistics store, exiting with an error message on failure.
pub fn open_statistics(config: &ReflexConfig) -> StatisticsStore<Box<dyn KeyValueStore>> {
    match config.open_store() {
        Ok(store) => StatisticsStore::open(store),
        Err(e) => {
            eprintln!("Error: cannot open statistics store: {e}");
            std::process::exit(1);
        }
    }
}

/// Human-readable location of the statistics blob.
pub fn storage_label(config: &ReflexConfig) -> String {
    if config.ephemeral {
        "memory (not saved)".to_string()
    } else {
        config
            .data_dir
            .join(format!("{STORAGE_KEY}.json"))
            .display()
            .to_string()
    }
}

/// Initialize env_logger. `RUST_LOG` wins over `default_level`; with a log
/// file everything goes there instead of stderr.
pub fn init_logging(log_file: Option<&str>, default_level: &str) {
    let env = env_logger::Env::default().default_filter_or(default_level);
    let mut builder = env_logger::Builder::from_env(env);

    if let Some(path) = log_file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => {
                eprintln!("Warning: cannot open log file '{path}': {e}; logging to stderr");
            }
        }
    }

    // A second init (e.g. from tests) is harmless.
    let _ = builder.try_init();
}
