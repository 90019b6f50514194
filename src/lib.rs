pub mod analysis;
pub mod commands;
pub mod error;
pub mod models;

pub use commands::compute::{compute_likability, score_batch, BatchPhase, BatchSummary};
pub use commands::trigger::{run_schedule, trigger_compute};
pub use error::LikabilityError;
