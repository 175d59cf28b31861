//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};

use crate::domain::DateRange;

/// Chat Archiver - Extract chat messages, reactions and users into SQLite.
#[derive(Parser, Debug)]
#[command(name = "chat-archiver")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (default: ~/.chat-archiver/config.toml).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database schema.
    InitDb {
        /// Delete an existing database first.
        #[arg(long)]
        drop: bool,
    },

    /// Export a chat and save it to the database.
    Export {
        /// Chat ID (negative for groups and channels).
        #[arg(allow_negative_numbers = true)]
        chat_id: i64,

        /// Captured service data to replay.
        #[arg(short, long)]
        archive: PathBuf,

        /// First day or instant to export (YYYY-MM-DD or RFC 3339).
        #[arg(long, value_parser = parse_start_date)]
        from: Option<DateTime<Utc>>,

        /// Last day or instant to export (YYYY-MM-DD or RFC 3339).
        #[arg(long, value_parser = parse_end_date)]
        to: Option<DateTime<Utc>>,

        /// Export yesterday only.
        #[arg(long, conflicts_with_all = ["from", "to", "days_ago"])]
        yesterday: bool,

        /// Export the single day N days ago.
        #[arg(long, conflicts_with_all = ["from", "to"])]
        days_ago: Option<u32>,

        /// Session name, used in snapshot file names.
        #[arg(short, long, default_value = "main")]
        session: String,

        /// Also write a JSON snapshot of the extracted data.
        #[arg(long)]
        snapshot: bool,

        /// Extract only, do not write to the database.
        #[arg(long)]
        no_save: bool,
    },

    /// Save a previously written snapshot to the database.
    Load {
        /// Snapshot file.
        snapshot: PathBuf,
    },

    /// Show row counts of the database.
    Stats,

    /// Manage the configuration file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write the default configuration file if missing.
    Init,
    /// Print the effective configuration.
    Show,
}

/// Parses a start bound: a date means its local midnight.
pub fn parse_start_date(s: &str) -> Result<DateTime<Utc>, String> {
    parse_bound(s, |range| range.start_utc())
}

/// Parses an end bound: a date means its last second, local time.
pub fn parse_end_date(s: &str) -> Result<DateTime<Utc>, String> {
    parse_bound(s, |range| range.end_utc())
}

fn parse_bound(s: &str, pick: fn(&DateRange) -> DateTime<Utc>) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let day = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date: {s}. Use YYYY-MM-DD or RFC 3339"))?;

    DateRange::whole_day(day)
        .map(|range| pick(&range))
        .ok_or_else(|| format!("Local midnight does not exist on {s}"))
}
