use crate::error::LikabilityError;
use crate::models::job::{JobRecord, JobStatus};
use crate::models::likability::{LikabilityComponent, LikabilityScore};
use crate::models::rollup::{EngagementRollupRow, Genre};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result, Row};
use std::path::Path;

const DB_SCHEMA_VERSION: i64 = 2;
const DB_FILE_NAME: &str = "likability.db";

// Stays well under SQLite's bound-parameter limit.
const DELETE_CHUNK_SIZE: usize = 500;

pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;",
    )?;

    let mut version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version < 1 {
        apply_migration_1(conn)?;
        version = 1;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version < 2 {
        apply_migration_2(conn)?;
        version = 2;
        conn.pragma_update(None, "user_version", version)?;
    }

    Ok(())
}

fn apply_migration_1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS game_engagement_rollup (
            game_id TEXT PRIMARY KEY,
            genre TEXT NOT NULL DEFAULT 'other',
            sessions INTEGER NOT NULL DEFAULT 0,
            completions INTEGER NOT NULL DEFAULT 0,
            total_seconds REAL NOT NULL DEFAULT 0,
            restarts INTEGER NOT NULL DEFAULT 0,
            shares INTEGER NOT NULL DEFAULT 0,
            abandons INTEGER NOT NULL DEFAULT 0,
            favorites INTEGER
        );

        CREATE TABLE IF NOT EXISTS likability_scores (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            game_id TEXT NOT NULL,
            genre TEXT NOT NULL,
            score REAL NOT NULL,
            components_json TEXT NOT NULL DEFAULT '[]',
            sample_size INTEGER NOT NULL DEFAULT 0,
            computed_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS likability_jobs (
            id TEXT PRIMARY KEY,
            status TEXT CHECK(status IN ('completed', 'failed')) NOT NULL,
            rows INTEGER NOT NULL DEFAULT 0,
            details_json TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL
        );
        ",
    )
}

fn apply_migration_2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_likability_scores_game_id ON likability_scores(game_id);
        CREATE INDEX IF NOT EXISTS idx_likability_scores_rank ON likability_scores(score DESC, computed_at DESC);
        CREATE INDEX IF NOT EXISTS idx_likability_scores_genre ON likability_scores(genre);
        CREATE INDEX IF NOT EXISTS idx_likability_jobs_created_at ON likability_jobs(created_at);
        ",
    )
}

/// Open (creating if needed) the store under `data_dir` and migrate it.
pub fn open_database(data_dir: &Path) -> std::result::Result<Connection, LikabilityError> {
    std::fs::create_dir_all(data_dir)?;
    let conn = Connection::open(data_dir.join(DB_FILE_NAME))?;
    initialize_schema(&conn)?;
    Ok(conn)
}

pub fn upsert_rollup_rows(conn: &Connection, rows: &[EngagementRollupRow]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "
            INSERT INTO game_engagement_rollup (
                game_id, genre, sessions, completions, total_seconds, restarts, shares, abandons, favorites
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(game_id) DO UPDATE SET
                genre = excluded.genre,
                sessions = excluded.sessions,
                completions = excluded.completions,
                total_seconds = excluded.total_seconds,
                restarts = excluded.restarts,
                shares = excluded.shares,
                abandons = excluded.abandons,
                favorites = excluded.favorites
            ",
        )?;

        for row in rows {
            stmt.execute(params![
                row.game_id,
                row.genre.as_str(),
                row.sessions,
                row.completions,
                row.total_seconds,
                row.restarts,
                row.shares,
                row.abandons,
                row.favorites,
            ])?;
        }
    }
    tx.commit()?;
    Ok(rows.len())
}

/// Snapshot of the rollup table. A null `favorites` column reads as 0.
pub fn load_rollup(conn: &Connection) -> Result<Vec<EngagementRollupRow>> {
    let mut stmt = conn.prepare(
        "SELECT game_id, genre, sessions, completions, total_seconds, restarts, shares, abandons, favorites
         FROM game_engagement_rollup
         ORDER BY game_id ASC",
    )?;

    let rows = stmt.query_map([], |row| {
        let genre: String = row.get(1)?;
        Ok(EngagementRollupRow {
            game_id: row.get(0)?,
            genre: Genre::from_tag(&genre),
            sessions: row.get(2)?,
            completions: row.get(3)?,
            total_seconds: row.get(4)?,
            restarts: row.get(5)?,
            shares: row.get(6)?,
            abandons: row.get(7)?,
            favorites: row.get::<_, Option<i64>>(8)?.unwrap_or(0),
        })
    })?;

    rows.collect()
}

/// Replace the score rows of every game in `scores` with the new set.
///
/// Delete and insert share one transaction: readers never see the affected
/// games without a score, and a failed insert leaves the old rows in place.
pub fn replace_scores(
    conn: &Connection,
    scores: &[LikabilityScore],
) -> std::result::Result<usize, LikabilityError> {
    let tx = conn.unchecked_transaction()?;

    let game_ids: Vec<&str> = scores.iter().map(|s| s.game_id.as_str()).collect();
    for chunk in game_ids.chunks(DELETE_CHUNK_SIZE) {
        let placeholders = vec!["?"; chunk.len()].join(", ");
        tx.execute(
            &format!("DELETE FROM likability_scores WHERE game_id IN ({placeholders})"),
            params_from_iter(chunk.iter()),
        )
        .map_err(LikabilityError::DeleteScores)?;
    }

    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO likability_scores (game_id, genre, score, components_json, sample_size, computed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .map_err(LikabilityError::InsertScores)?;

        for score in scores {
            let components_json = serde_json::to_string(&score.components)?;
            stmt.execute(params![
                score.game_id,
                score.genre.as_str(),
                score.score,
                components_json,
                score.sample_size,
                score.computed_at,
            ])
            .map_err(LikabilityError::InsertScores)?;
        }
    }

    tx.commit().map_err(LikabilityError::InsertScores)?;
    Ok(scores.len())
}

pub fn record_job(conn: &Connection, job: &JobRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO likability_jobs (id, status, rows, details_json, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            job.id,
            job.status.as_str(),
            job.rows as i64,
            job.details.to_string(),
            job.created_at,
        ],
    )?;
    Ok(())
}

pub fn load_recent_jobs(conn: &Connection, limit: usize) -> Result<Vec<JobRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, status, rows, details_json, created_at FROM likability_jobs ORDER BY created_at DESC LIMIT ?1",
    )?;

    let jobs = stmt.query_map(params![limit as i64], |row| {
        let status: String = row.get(1)?;
        let details_json: String = row.get(3)?;
        let details = serde_json::from_str(&details_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
        Ok(JobRecord {
            id: row.get(0)?,
            status: JobStatus::from_db(&status),
            rows: row.get::<_, i64>(2)? as usize,
            details,
            created_at: row.get(4)?,
        })
    })?;

    jobs.collect()
}

/// Scores in feed order: highest score first, newest computation on ties.
pub fn load_ranked_scores(
    conn: &Connection,
    genre: Option<Genre>,
    limit: Option<usize>,
) -> Result<Vec<LikabilityScore>> {
    let limit = limit.map(|l| l as i64).unwrap_or(-1);
    let mut stmt = conn.prepare(
        "SELECT game_id, genre, score, components_json, sample_size, computed_at
         FROM likability_scores
         WHERE ?1 IS NULL OR genre = ?1
         ORDER BY score DESC, computed_at DESC
         LIMIT ?2",
    )?;

    let scores = stmt.query_map(params![genre.map(Genre::as_str), limit], map_score_row)?;
    scores.collect()
}

pub fn load_score(conn: &Connection, game_id: &str) -> Result<Option<LikabilityScore>> {
    conn.query_row(
        "SELECT game_id, genre, score, components_json, sample_size, computed_at
         FROM likability_scores WHERE game_id = ?1
         ORDER BY computed_at DESC LIMIT 1",
        params![game_id],
        map_score_row,
    )
    .optional()
}

pub fn count_scores(conn: &Connection, game_id: &str) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM likability_scores WHERE game_id = ?1",
        params![game_id],
        |row| row.get(0),
    )
}

fn map_score_row(row: &Row<'_>) -> Result<LikabilityScore> {
    let genre: String = row.get(1)?;
    let components_json: String = row.get(3)?;
    let components = serde_json::from_str::<Vec<LikabilityComponent>>(&components_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    Ok(LikabilityScore {
        game_id: row.get(0)?,
        genre: Genre::from_tag(&genre),
        score: row.get(2)?,
        components,
        sample_size: row.get(4)?,
        computed_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::likability::{MetricKey, WeightSource};
    use chrono::{Duration, Utc};

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory db");
        initialize_schema(&conn).expect("schema init");
        conn
    }

    fn score(game_id: &str, genre: Genre, value: f64) -> LikabilityScore {
        LikabilityScore {
            game_id: game_id.to_string(),
            genre,
            score: value,
            components: vec![LikabilityComponent {
                key: MetricKey::ShareRate,
                label: MetricKey::ShareRate.label().to_string(),
                weight: 0.2,
                genre: WeightSource::Global,
                observed_value: 0.1,
                normalized_value: 0.5,
            }],
            computed_at: Utc::now(),
            sample_size: 10,
        }
    }

    #[test]
    fn schema_initializes_with_expected_version() {
        let conn = memory_db();
        let version: i64 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .expect("schema version");
        assert_eq!(version, DB_SCHEMA_VERSION);
    }

    #[test]
    fn newer_schema_version_is_left_alone() {
        let conn = Connection::open_in_memory().expect("in-memory db");
        initialize_schema(&conn).expect("schema init");
        conn.pragma_update(None, "user_version", DB_SCHEMA_VERSION + 3)
            .expect("bump version");

        initialize_schema(&conn).expect("reopen newer schema");
        let version: i64 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .expect("schema version");
        assert_eq!(version, DB_SCHEMA_VERSION + 3);
    }

    #[test]
    fn rollup_round_trip_reads_null_favorites_as_zero() {
        let conn = memory_db();
        conn.execute(
            "INSERT INTO game_engagement_rollup (game_id, genre, sessions, favorites) VALUES ('g1', 'puzzle', 5, NULL)",
            [],
        )
        .expect("insert rollup");
        conn.execute(
            "INSERT INTO game_engagement_rollup (game_id, genre, sessions) VALUES ('g2', 'racing', 1)",
            [],
        )
        .expect("insert rollup");

        let rows = load_rollup(&conn).expect("load rollup");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].favorites, 0);
        assert_eq!(rows[0].genre, Genre::Puzzle);
        assert_eq!(rows[1].genre, Genre::Other);
    }

    #[test]
    fn replace_scores_supersedes_previous_rows() {
        let conn = memory_db();
        replace_scores(&conn, &[score("g1", Genre::Runner, 0.1)]).expect("first publish");
        replace_scores(&conn, &[score("g1", Genre::Runner, 0.7)]).expect("second publish");

        assert_eq!(count_scores(&conn, "g1").expect("count"), 1);
        let loaded = load_score(&conn, "g1").expect("load").expect("score exists");
        assert_eq!(loaded.score, 0.7);
        assert_eq!(loaded.components.len(), 1);
        assert_eq!(loaded.components[0].genre, WeightSource::Global);
    }

    #[test]
    fn replace_scores_leaves_other_games_untouched() {
        let conn = memory_db();
        replace_scores(&conn, &[score("g1", Genre::Runner, 0.1), score("g2", Genre::Puzzle, 0.2)])
            .expect("publish");
        replace_scores(&conn, &[score("g1", Genre::Runner, 0.3)]).expect("partial publish");

        assert_eq!(count_scores(&conn, "g2").expect("count"), 1);
    }

    #[test]
    fn ranked_scores_sort_by_score_then_recency() {
        let conn = memory_db();
        let mut older = score("old", Genre::Runner, 0.5);
        older.computed_at = Utc::now() - Duration::hours(1);
        let newer = score("new", Genre::Runner, 0.5);
        let top = score("top", Genre::Puzzle, 0.9);
        replace_scores(&conn, &[older, newer, top]).expect("publish");

        let ranked = load_ranked_scores(&conn, None, None).expect("ranked");
        let ids: Vec<&str> = ranked.iter().map(|s| s.game_id.as_str()).collect();
        assert_eq!(ids, vec!["top", "new", "old"]);

        let runners = load_ranked_scores(&conn, Some(Genre::Runner), Some(1)).expect("ranked runners");
        assert_eq!(runners.len(), 1);
        assert_eq!(runners[0].game_id, "new");
    }

    #[test]
    fn jobs_are_listed_newest_first() {
        let conn = memory_db();
        let mut first = JobRecord::completed(3);
        first.created_at = Utc::now() - Duration::minutes(5);
        record_job(&conn, &first).expect("record first");
        record_job(&conn, &JobRecord::failed("boom")).expect("record second");

        let jobs = load_recent_jobs(&conn, 10).expect("jobs");
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].status, JobStatus::Failed);
        assert_eq!(jobs[1].rows, 3);
        assert_eq!(jobs[1].details["rows"], serde_json::json!(3));
    }

    #[test]
    fn corrupt_job_details_surface_as_errors() {
        let conn = memory_db();
        conn.execute(
            "INSERT INTO likability_jobs (id, status, rows, details_json, created_at)
             VALUES ('j1', 'completed', 1, '{not json', ?1)",
            params![Utc::now()],
        )
        .expect("insert corrupt job");

        let err = load_recent_jobs(&conn, 10).expect_err("corrupt details");
        assert!(
            matches!(err, rusqlite::Error::FromSqlConversionFailure(3, Type::Text, _)),
            "{err:?}"
        );
    }
}
