//! `reflex stats` — print persisted statistics.

use reflex_core::{ReflexConfig, Statistics, format_ms, format_optional_ms};

pub fn run(config: &ReflexConfig, json: bool) {
    let store = super::open_statistics(config);
    let stats = store.statistics();

    if json {
        match serde_json::to_string_pretty(&to_json(stats)) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
    } else {
        println!("Reaction statistics ({})", super::storage_label(config));
        print!("{}", render_summary(stats));
    }
}

fn to_json(stats: &Statistics) -> serde_json::Value {
    serde_json::json!({
        "attempts": stats.attempts,
        "best": stats.best,
        "average": stats.average(),
        "recent": stats.recent,
    })
}

/// Aligned multi-line summary.
fn render_summary(stats: &Statistics) -> String {
    let recent = if stats.recent.is_empty() {
        reflex_core::PLACEHOLDER.to_string()
    } else {
        stats
            .recent
            .iter()
            .map(|&ms| format_ms(ms))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let average = match stats.average() {
        Some(avg) => format!("{} (last {})", format_ms(avg), stats.recent.len()),
        None => format_optional_ms(None),
    };

    format!(
        "  Attempts : {}\n  Best     : {}\n  Average  : {}\n  Recent   : {}\n",
        stats.attempts,
        format_optional_ms(stats.best),
        average,
        recent,
    )
}
