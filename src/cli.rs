//! Shared helpers for the command-line binaries

use crate::batch::BatchSummary;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color as TableColor, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

/// Log to stderr, filtered by `RUST_LOG` (defaults to `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // a second init in the same process is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn progress_bar(len: u64, label: &str) -> ProgressBar {
    let bar = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        .map(|style| style.progress_chars("##-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar.set_message(label.to_string());
    bar
}

pub fn banner(title: &str) {
    let line = "═".repeat(title.chars().count() + 4);
    println!("{}", format!("╔{}╗", line).bright_cyan());
    println!("{}", format!("║  {}  ║", title).bright_cyan().bold());
    println!("{}", format!("╚{}╝", line).bright_cyan());
}

pub fn styled_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| {
            Cell::new(h)
                .fg(TableColor::Cyan)
                .add_attribute(Attribute::Bold)
        }));
    table
}

/// Record counts per tag, as printed by `generate` and `inspect`.
pub fn summary_table(summary: &BatchSummary) -> Table {
    let mut table = styled_table(&["Tag", "Value", "Records"]);
    for (tag, count) in &summary.per_tag {
        table.add_row(vec![
            Cell::new(tag.to_string()).fg(TableColor::Green),
            Cell::new(tag.tag()),
            Cell::new(count),
        ]);
    }
    table.add_row(vec![
        Cell::new("total").add_attribute(Attribute::Bold),
        Cell::new(""),
        Cell::new(summary.records).add_attribute(Attribute::Bold),
    ]);
    table
}
