use thiserror::Error;

/// Errors that end a likability batch run.
#[derive(Debug, Error)]
pub enum LikabilityError {
    /// The rollup table could not be read; nothing was computed.
    #[error("Failed to load engagement rollup: {0}")]
    RollupRead(#[source] rusqlite::Error),

    /// Deleting superseded scores failed; no insert was attempted.
    #[error("Failed to delete superseded scores: {0}")]
    DeleteScores(#[source] rusqlite::Error),

    /// Inserting or committing the new scores failed; the batch was rolled back.
    #[error("Failed to insert likability scores: {0}")]
    InsertScores(#[source] rusqlite::Error),

    #[error("DB error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Batch exceeded its time budget ({elapsed_ms} ms > {budget_ms} ms)")]
    BudgetExceeded { elapsed_ms: u128, budget_ms: u128 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scheduled run aborted: {0}")]
    Trigger(String),
}

pub type Result<T> = std::result::Result<T, LikabilityError>;
