//! Terminal output for export and store statistics.

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};

use crate::domain::ExtractionStats;
use crate::infrastructure::TableCounts;

/// Formats store row counts as a table.
pub fn format_table_counts(db_path: &str, counts: &TableCounts) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Table", "Rows"]);

    table.add_row(vec!["messages".to_string(), counts.messages.to_string()]);
    table.add_row(vec!["reactions".to_string(), counts.reactions.to_string()]);
    table.add_row(vec!["users".to_string(), counts.users.to_string()]);

    format!("{} {}\n{table}", "📂".bold(), db_path)
}

/// Formats extraction statistics for display.
pub fn format_extraction_stats(chat_id: i64, stats: &ExtractionStats) -> String {
    format!(
        "{} chat {}\n  Fetched items: {}\n  Messages: {}\n  Skipped events: {}\n  Reactions: {}\n  Users: {} ({} unresolved)",
        "📊 Extraction".bold(),
        chat_id,
        stats.fetched.to_string().cyan(),
        stats.accepted.to_string().green(),
        stats.skipped.to_string().yellow(),
        stats.reactions.to_string().cyan(),
        stats.participants_resolved.to_string().green(),
        stats.participants_missing.to_string().yellow()
    )
}
