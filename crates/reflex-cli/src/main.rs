//! CLI for reflex — measure your reaction time in the terminal.

mod commands;
mod tui;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "reflex")]
#[command(about = "reflex — wait for green, press, see how fast you are")]
#[command(version = reflex_core::VERSION)]
struct Cli {
    /// Directory holding persisted statistics
    #[arg(long, global = true, default_value = "reflex-data")]
    data_dir: String,

    /// Keep statistics in memory only; nothing is read from or written to disk
    #[arg(long, global = true)]
    ephemeral: bool,

    /// Append log output to this file (RUST_LOG selects the level)
    #[arg(long, global = true)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run reaction trials in an interactive terminal UI
    Play,

    /// Print best, average, last-10 history and attempt count
    Stats {
        /// Emit machine-readable JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Clear all recorded statistics
    Reset,
}

fn main() {
    let cli = Cli::parse();
    let config = commands::make_config(&cli.data_dir, cli.ephemeral);

    match cli.command {
        Commands::Play => {
            // Keep stderr quiet while the alternate screen is up.
            commands::init_logging(cli.log_file.as_deref(), "error");
            commands::play::run(&config)
        }
        Commands::Stats { json } => {
            commands::init_logging(cli.log_file.as_deref(), "warn");
            commands::stats::run(&config, json)
        }
        Commands::Reset => {
            commands::init_logging(cli.log_file.as_deref(), "warn");
            commands::reset::run(&config)
        }
    }
}
