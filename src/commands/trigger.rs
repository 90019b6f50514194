use crate::commands::compute::{compute_likability, BatchSummary};
use crate::commands::{db, settings};
use crate::error::{LikabilityError, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::MissedTickBehavior;

const MIN_SCHEDULE_INTERVAL: Duration = Duration::from_secs(1);

/// One scheduled invocation: open the store, read settings, compute.
pub fn trigger_compute(data_dir: &Path) -> Result<BatchSummary> {
    let effective = settings::load_effective_settings(data_dir).map_err(LikabilityError::Settings)?;
    let conn = db::open_database(data_dir)?;
    compute_likability(&conn, &effective)
}

/// Invoke the batch every `interval` until `shutdown` resolves.
///
/// The first run starts immediately. A failed run is logged and the next
/// tick starts a fresh batch; runs never overlap. Returns the number of
/// runs attempted. Intervals shorter than one second are raised to one
/// second.
pub async fn run_schedule<S>(data_dir: PathBuf, interval: Duration, shutdown: S) -> u64
where
    S: Future<Output = ()>,
{
    if interval < MIN_SCHEDULE_INTERVAL {
        log::warn!(
            "Schedule interval {} ms is below the minimum, using {}s",
            interval.as_millis(),
            MIN_SCHEDULE_INTERVAL.as_secs()
        );
    }
    let mut ticker = tokio::time::interval(interval.max(MIN_SCHEDULE_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut runs = 0;
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                log::info!("Likability schedule stopping after {runs} runs");
                break;
            }
            _ = ticker.tick() => {
                runs += 1;
                let dir = data_dir.clone();
                let outcome = tokio::task::spawn_blocking(move || trigger_compute(&dir))
                    .await
                    .unwrap_or_else(|e| Err(LikabilityError::Trigger(e.to_string())));

                match outcome {
                    Ok(summary) => log::info!(
                        "Scheduled likability run {runs}: {} rows in {} ms",
                        summary.rows,
                        summary.duration_ms
                    ),
                    Err(e) => log::error!("Scheduled likability run {runs} failed: {e}"),
                }
            }
        }
    }

    runs
}
