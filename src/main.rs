//! likability CLI
//!
//! Batch entry points for the likability scoring engine.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;

use likability_lib::commands::{db, settings};
use likability_lib::models::rollup::{EngagementRollupRow, Genre, RollupRecord};
use likability_lib::{compute_likability, run_schedule, LikabilityError};

#[derive(Parser)]
#[command(name = "likability")]
#[command(about = "Score games for the discovery feed from engagement rollups", long_about = None)]
struct Cli {
    /// Directory holding likability.db and settings.json
    #[arg(short, long, global = true, default_value = ".likability")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute likability for all games with rollup data, once
    Compute,

    /// Re-run the computation on a fixed interval until Ctrl-C
    Schedule {
        /// Seconds between runs (defaults to scheduleIntervalSecs from settings)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval_secs: Option<u64>,
    },

    /// Print scores in feed order
    Scores {
        /// Only scores for this genre (e.g. runner, tower_defense)
        #[arg(short, long)]
        genre: Option<Genre>,

        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Print the most recent batch runs
    Jobs {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Load rollup rows from a JSON array into the rollup table
    ImportRollup {
        path: PathBuf,
    },

    /// Print the effective settings file, optionally merging a JSON patch first
    Settings {
        /// Partial settings object, e.g. '{"weights":{"runner":{"shareRate":0.4}}}'
        #[arg(long)]
        set: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), LikabilityError> {
    let data_dir = cli.data_dir;

    match cli.command {
        Commands::Compute => {
            let effective = settings::load_effective_settings(&data_dir).map_err(LikabilityError::Settings)?;
            let conn = db::open_database(&data_dir)?;
            let summary = compute_likability(&conn, &effective)?;
            print_json(&summary)
        }
        Commands::Schedule { interval_secs } => {
            let effective = settings::load_effective_settings(&data_dir).map_err(LikabilityError::Settings)?;
            let interval = interval_secs
                .map(Duration::from_secs)
                .unwrap_or(effective.schedule_interval);
            log::info!("Scheduling likability every {}s", interval.as_secs());

            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    log::error!("Failed to listen for Ctrl-C: {e}");
                }
            };
            let runs = run_schedule(data_dir, interval, shutdown).await;
            println!("{runs} scheduled runs");
            Ok(())
        }
        Commands::Scores { genre, limit } => {
            let conn = db::open_database(&data_dir)?;
            let scores = db::load_ranked_scores(&conn, genre, limit)?;
            print_json(&scores)
        }
        Commands::Jobs { limit } => {
            let conn = db::open_database(&data_dir)?;
            let jobs = db::load_recent_jobs(&conn, limit)?;
            print_json(&jobs)
        }
        Commands::ImportRollup { path } => {
            let rows = read_rollup_file(&path)?;
            let conn = db::open_database(&data_dir)?;
            let count = db::upsert_rollup_rows(&conn, &rows)?;
            println!("Imported {count} rollup rows from {}", path.display());
            Ok(())
        }
        Commands::Settings { set } => {
            let value = match set {
                Some(patch) => {
                    let patch: serde_json::Value = serde_json::from_str(&patch)?;
                    settings::save_settings_to_disk(&data_dir, patch)
                }
                None => settings::load_settings_from_disk(&data_dir),
            }
            .map_err(LikabilityError::Settings)?;
            print_json(&value)
        }
    }
}

fn read_rollup_file(path: &Path) -> Result<Vec<EngagementRollupRow>, LikabilityError> {
    let raw = fs::read_to_string(path)?;
    let records: Vec<RollupRecord> = serde_json::from_str(&raw)?;
    Ok(records.into_iter().map(EngagementRollupRow::from).collect())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), LikabilityError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_schedule_interval_is_rejected() {
        let parsed = Cli::try_parse_from(["likability", "schedule", "--interval-secs", "0"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn positive_schedule_interval_is_accepted() {
        let cli = Cli::try_parse_from(["likability", "schedule", "--interval-secs", "90"])
            .expect("valid interval");
        assert!(matches!(cli.command, Commands::Schedule { interval_secs: Some(90) }));
    }
}
