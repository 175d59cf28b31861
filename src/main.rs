//! Chat Archiver - Extract a chat's history into a relational store.
//!
//! Resolves a date range to a message-id window, extracts messages,
//! reactions and the users behind them, and upserts everything into
//! `SQLite` for later analysis.
//!
//!   chat-archiver init-db                                 # Create the schema
//!   chat-archiver export <chat> -a capture.json --from 2024-05-01
//!   chat-archiver export <chat> -a capture.json --yesterday --snapshot
//!   chat-archiver load snapshots/main_<chat>_<ts>.json    # Save without re-extracting
//!   chat-archiver stats                                   # Row counts per table

mod application;
mod cli;
mod domain;
mod infrastructure;

use std::path::Path;

use chrono::Local;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::{
    export, format_extraction_stats, format_table_counts, with_progress, ExportRequest,
    NoProgress, PersistenceOrchestrator, ProgressSink, SaveSummary, TerminalProgress, TracingLog,
};
use cli::{Cli, Commands, ConfigAction};
use domain::{AppConfig, AppError, DateRange, FailureKind, Message, Participant};
use infrastructure::{
    ensure_config_exists, init_database, load_config, read_snapshot, render_config,
    write_snapshot, ArchiveService, Snapshot, SqliteStore,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if e.kind() == FailureKind::Write {
            eprintln!(
                "{} rows written before the failure were kept; the store is partially applied",
                "Note:".yellow().bold()
            );
        }
        std::process::exit(1);
    }
}

/// Main application logic.
async fn run(cli: Cli) -> domain::Result<()> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(AppConfig::default_config_path);

    if let Commands::Config { action } = &cli.command {
        return cmd_config(&config_path, action);
    }

    let config = load_config(&config_path)?;

    match cli.command {
        Commands::InitDb { drop } => cmd_init_db(&config, drop)?,
        Commands::Export {
            chat_id,
            archive,
            from,
            to,
            yesterday,
            days_ago,
            session,
            snapshot,
            no_save,
        } => {
            let now = Local::now();
            let day = match (yesterday, days_ago) {
                (true, _) => Some(DateRange::previous_day(now)),
                (false, Some(days)) => Some(DateRange::days_ago(now, days)),
                (false, None) => None,
            };
            let (start_date, end_date) = match day {
                Some(range) => {
                    let range = range.ok_or_else(|| AppError::Config {
                        message: "Cannot determine the requested day in local time".into(),
                    })?;
                    (Some(range.start_utc()), Some(range.end_utc()))
                }
                None => (from, to),
            };

            let request = ExportRequest {
                chat_id,
                start_date,
                end_date,
            };

            cmd_export(&config, &archive, &request, &session, snapshot, no_save).await?;
        }
        Commands::Load { snapshot } => cmd_load(&config, &snapshot)?,
        Commands::Stats => cmd_stats(&config)?,
        Commands::Config { .. } => {}
    }

    Ok(())
}

/// Create the database schema.
fn cmd_init_db(config: &AppConfig, drop: bool) -> domain::Result<()> {
    let path = config.db_path();
    init_database(&path, drop)?;

    println!("{} Database created at {}", "✓".green().bold(), path.display());
    Ok(())
}

/// Export a chat, optionally snapshot it, then save it.
async fn cmd_export(
    config: &AppConfig,
    archive: &Path,
    request: &ExportRequest,
    session: &str,
    snapshot: bool,
    no_save: bool,
) -> domain::Result<()> {
    let service = ArchiveService::from_file(archive)?;
    if service.chat_id() != request.chat_id {
        return Err(AppError::InvalidData {
            message: format!(
                "{} was captured from chat {}, not chat {}",
                archive.display(),
                service.chat_id(),
                request.chat_id
            ),
        });
    }
    let log = TracingLog;
    let progress = progress_sink(config);

    let extraction = with_progress(
        progress.as_ref(),
        "Exporting messages",
        config.tick_period(),
        export(&service, &log, request),
    )
    .await?;

    println!(
        "{}",
        format_extraction_stats(extraction.chat_id, &extraction.stats)
    );

    if snapshot || config.snapshot.enabled {
        let snap = Snapshot::new(
            extraction.chat_id,
            extraction.messages.clone(),
            extraction.participants.clone(),
        );
        let path = write_snapshot(&config.snapshot_dir(), session, &snap)?;
        println!("{} Snapshot written to {}", "✓".green().bold(), path.display());
    }

    if no_save {
        return Ok(());
    }

    let summary = persist(
        config,
        progress.as_ref(),
        &extraction.messages,
        &extraction.participants,
    )?;
    println!("{} {summary}", "✓".green().bold());

    Ok(())
}

/// Save a snapshot without extraction.
fn cmd_load(config: &AppConfig, path: &Path) -> domain::Result<()> {
    let snapshot = read_snapshot(path)?;
    tracing::info!(
        chat_id = snapshot.chat_id,
        created_at = %snapshot.created_at,
        "Loaded snapshot"
    );

    let progress = progress_sink(config);
    let summary = persist(
        config,
        progress.as_ref(),
        &snapshot.messages,
        &snapshot.participants,
    )?;
    println!("{} {summary}", "✓".green().bold());

    Ok(())
}

/// Show database row counts.
fn cmd_stats(config: &AppConfig) -> domain::Result<()> {
    let path = config.db_path();
    if !path.exists() {
        return Err(AppError::Config {
            message: format!(
                "Database not found at {}. Run `chat-archiver init-db` first",
                path.display()
            ),
        });
    }

    let store = SqliteStore::open(&path)?;
    println!(
        "{}",
        format_table_counts(&path.display().to_string(), &store.counts()?)
    );

    Ok(())
}

/// Write or print the configuration.
fn cmd_config(path: &Path, action: &ConfigAction) -> domain::Result<()> {
    match action {
        ConfigAction::Init => {
            if ensure_config_exists(path)? {
                println!("{} Created {}", "✓".green().bold(), path.display());
            } else {
                println!("Configuration already exists at {}", path.display());
            }
        }
        ConfigAction::Show => {
            let config = load_config(path)?;
            println!("# {}", path.display());
            println!("{}", render_config(&config)?);
        }
    }

    Ok(())
}

fn persist(
    config: &AppConfig,
    progress: &dyn ProgressSink,
    messages: &[Message],
    participants: &[Participant],
) -> domain::Result<SaveSummary> {
    let store = SqliteStore::open(&config.db_path())?;
    let log = TracingLog;

    PersistenceOrchestrator::new(&store, &log, progress).save(messages, participants)
}

fn progress_sink(config: &AppConfig) -> Box<dyn ProgressSink> {
    if config.progress.enabled {
        Box::new(TerminalProgress::new())
    } else {
        Box::new(NoProgress)
    }
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter)
        .init();
}
