use crate::analysis::metrics::extract_metrics;
use crate::analysis::normalize::MetricRanges;
use crate::analysis::scorer::score_game;
use crate::analysis::weights::WeightTable;
use crate::commands::db;
use crate::commands::settings::EffectiveSettings;
use crate::error::{LikabilityError, Result};
use crate::models::job::JobRecord;
use crate::models::likability::{LikabilityScore, MetricVector};
use crate::models::rollup::EngagementRollupRow;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use std::time::{Duration, Instant};

/// States a batch run passes through. `Failed` is terminal for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPhase {
    Idle,
    Loading,
    Computing,
    Publishing,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Number of score rows written; 0 when the rollup was empty.
    pub rows: usize,
    /// Audit-log id, absent when the rollup was empty or the log write failed.
    pub job_id: Option<String>,
    pub duration_ms: u64,
}

/// Compute likability for every game with rollup data, using stored settings.
pub fn compute_likability(conn: &Connection, settings: &EffectiveSettings) -> Result<BatchSummary> {
    compute_likability_internal(conn, &settings.weights, Some(settings.time_budget), |phase| {
        log::info!("Likability batch phase: {phase:?}");
    })
}

pub fn compute_likability_internal<F>(
    conn: &Connection,
    weights: &WeightTable,
    budget: Option<Duration>,
    mut on_phase: F,
) -> Result<BatchSummary>
where
    F: FnMut(BatchPhase),
{
    let start = Instant::now();

    match run_batch(conn, weights, budget, start, &mut on_phase) {
        Ok(summary) => {
            on_phase(BatchPhase::Idle);
            Ok(summary)
        }
        Err(err) => {
            on_phase(BatchPhase::Failed);
            log::error!("Likability batch failed: {err}");
            if let Err(log_err) = db::record_job(conn, &JobRecord::failed(&err.to_string())) {
                log::warn!("Failed to log failed likability job: {log_err}");
            }
            Err(err)
        }
    }
}

fn run_batch<F>(
    conn: &Connection,
    weights: &WeightTable,
    budget: Option<Duration>,
    start: Instant,
    on_phase: &mut F,
) -> Result<BatchSummary>
where
    F: FnMut(BatchPhase),
{
    on_phase(BatchPhase::Loading);
    let rollup = db::load_rollup(conn).map_err(LikabilityError::RollupRead)?;

    if rollup.is_empty() {
        log::info!("No engagement data yet, nothing to score");
        return Ok(BatchSummary {
            rows: 0,
            job_id: None,
            duration_ms: start.elapsed().as_millis() as u64,
        });
    }

    on_phase(BatchPhase::Computing);
    let scores = score_batch(&rollup, weights, Utc::now());
    check_budget(start, budget)?;

    on_phase(BatchPhase::Publishing);
    let rows = db::replace_scores(conn, &scores)?;

    let job = JobRecord::completed(rows);
    let job_id = match db::record_job(conn, &job) {
        Ok(()) => Some(job.id),
        Err(e) => {
            log::warn!("Failed to log likability job: {e}");
            None
        }
    };

    log::info!("Published {rows} likability scores");
    Ok(BatchSummary {
        rows,
        job_id,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Pure part of the batch: extract, normalize over the whole batch, score.
///
/// Every score of one batch carries the same `computed_at`.
pub fn score_batch(
    rollup: &[EngagementRollupRow],
    weights: &WeightTable,
    computed_at: DateTime<Utc>,
) -> Vec<LikabilityScore> {
    let observed: Vec<MetricVector> = rollup.iter().map(extract_metrics).collect();
    let ranges = MetricRanges::from_batch(&observed);

    rollup
        .iter()
        .zip(&observed)
        .map(|(row, metrics)| {
            let normalized = ranges.normalize_vector(metrics);
            let score = score_game(row, metrics, &normalized, weights, computed_at);
            log::debug!("Scored {} ({}): {:.6}", score.game_id, score.genre, score.score);
            score
        })
        .collect()
}

fn check_budget(start: Instant, budget: Option<Duration>) -> Result<()> {
    let Some(budget) = budget else {
        return Ok(());
    };
    let elapsed = start.elapsed();
    if elapsed > budget {
        return Err(LikabilityError::BudgetExceeded {
            elapsed_ms: elapsed.as_millis(),
            budget_ms: budget.as_millis(),
        });
    }
    Ok(())
}
