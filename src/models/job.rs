use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn from_db(value: &str) -> JobStatus {
        if value == "completed" {
            JobStatus::Completed
        } else {
            JobStatus::Failed
        }
    }
}

/// One row of the `likability_jobs` audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub status: JobStatus,
    pub rows: usize,
    pub details: serde_json::Value, // {"rows": n} or {"error": "..."}
    pub created_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn completed(rows: usize) -> Self {
        JobRecord {
            id: uuid::Uuid::new_v4().to_string(),
            status: JobStatus::Completed,
            rows,
            details: serde_json::json!({ "rows": rows }),
            created_at: Utc::now(),
        }
    }

    pub fn failed(error: &str) -> Self {
        JobRecord {
            id: uuid::Uuid::new_v4().to_string(),
            status: JobStatus::Failed,
            rows: 0,
            details: serde_json::json!({ "error": error }),
            created_at: Utc::now(),
        }
    }
}
