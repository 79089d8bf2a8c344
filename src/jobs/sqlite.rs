// SQLite job store
// Owns the connection and the schema; implements the JobStore contract.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::PathBuf;
use std::sync::Mutex;

use super::model::{ArtifactKind, Job, JobStatus, ProgressUpdate};
use super::store::JobStore;
use crate::now_rfc3339;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// JobStore backed by a single SQLite database
pub struct SqliteJobStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteJobStore {
    /// Open (or create) the database at the given path and run migrations
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let conn = Connection::open(&db_path).context("Failed to open database")?;

        run_migrations(&conn).context("Failed to run database migrations")?;

        info!("Job database initialized at: {:?}", db_path);

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to lock database connection: {}", e))?;
        f(&conn)
    }
}

fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

fn get_schema_version(conn: &Connection) -> Result<i32> {
    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )
        .unwrap_or(false);

    if !table_exists {
        return Ok(0);
    }

    let version: i32 = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    Ok(version)
}

/// Initial schema creation (version 1)
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS jobs (
            id TEXT PRIMARY KEY,
            status TEXT NOT NULL,
            stage TEXT NOT NULL DEFAULT 'queued',
            progress_percent INTEGER NOT NULL DEFAULT 0,
            current_chunk INTEGER NOT NULL DEFAULT 0,
            total_chunks INTEGER NOT NULL DEFAULT 0,
            eta_seconds INTEGER,
            created_at TEXT NOT NULL,
            started_at TEXT,
            finished_at TEXT,
            error_message TEXT,
            transcript_file TEXT,
            minutes_file TEXT,
            audio_duration_seconds REAL,
            audio_file TEXT NOT NULL,
            owner TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);
        CREATE INDEX IF NOT EXISTS idx_jobs_created_at ON jobs(created_at);
        "#,
    )
    .context("Failed to create schema v1")?;

    conn.execute(
        "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
        params![SCHEMA_VERSION, now_rfc3339()],
    )
    .context("Failed to record schema version")?;

    Ok(())
}

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<Job> {
    let status_text: String = row.get(1)?;
    let status = JobStatus::parse(&status_text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown job status: {}", status_text).into(),
        )
    })?;

    Ok(Job {
        id: row.get(0)?,
        status,
        stage: row.get(2)?,
        progress_percent: row.get(3)?,
        current_chunk: row.get(4)?,
        total_chunks: row.get(5)?,
        eta_seconds: row.get::<_, Option<i64>>(6)?.map(|v| v.max(0) as u64),
        created_at: row.get(7)?,
        started_at: row.get(8)?,
        finished_at: row.get(9)?,
        error_message: row.get(10)?,
        transcript_file: row.get(11)?,
        minutes_file: row.get(12)?,
        audio_duration_seconds: row.get(13)?,
        audio_file: row.get(14)?,
        owner: row.get(15)?,
    })
}

const JOB_COLUMNS: &str = "id, status, stage, progress_percent, current_chunk, total_chunks, \
     eta_seconds, created_at, started_at, finished_at, error_message, \
     transcript_file, minutes_file, audio_duration_seconds, audio_file, owner";

impl JobStore for SqliteJobStore {
    fn create_job(&self, job: &Job) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                r#"
                INSERT INTO jobs (
                    id, status, stage, progress_percent, current_chunk, total_chunks,
                    eta_seconds, created_at, started_at, finished_at, error_message,
                    transcript_file, minutes_file, audio_duration_seconds, audio_file, owner
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                "#,
                params![
                    job.id,
                    job.status.as_str(),
                    job.stage,
                    job.progress_percent,
                    job.current_chunk,
                    job.total_chunks,
                    job.eta_seconds.map(|v| v as i64),
                    job.created_at,
                    job.started_at,
                    job.finished_at,
                    job.error_message,
                    job.transcript_file,
                    job.minutes_file,
                    job.audio_duration_seconds,
                    job.audio_file,
                    job.owner,
                ],
            )
            .context("Failed to insert job")?;
            Ok(())
        })
    }

    fn get_job(&self, id: &str) -> Result<Option<Job>> {
        self.with_connection(|conn| {
            conn.query_row(
                &format!("SELECT {} FROM jobs WHERE id = ?1", JOB_COLUMNS),
                params![id],
                job_from_row,
            )
            .optional()
            .context("Failed to query job")
        })
    }

    fn mark_running(&self, id: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "UPDATE jobs SET status = 'running', stage = 'starting', started_at = ?1 \
                 WHERE id = ?2 AND status = 'queued'",
                params![now_rfc3339(), id],
            )
            .context("Failed to mark job running")?;
            Ok(())
        })
    }

    fn set_audio_duration(&self, id: &str, seconds: f64) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "UPDATE jobs SET audio_duration_seconds = ?1 WHERE id = ?2",
                params![seconds, id],
            )
            .context("Failed to set audio duration")?;
            Ok(())
        })
    }

    fn set_total_chunks(&self, id: &str, total: u32) -> Result<()> {
        self.with_connection(|conn| {
            // Written exactly once per job
            conn.execute(
                "UPDATE jobs SET total_chunks = ?1 WHERE id = ?2 AND total_chunks = 0",
                params![total, id],
            )
            .context("Failed to set total chunks")?;
            Ok(())
        })
    }

    fn update_progress(&self, id: &str, update: &ProgressUpdate) -> Result<()> {
        self.with_connection(|conn| {
            // MAX keeps the percent monotonic within a run
            conn.execute(
                "UPDATE jobs SET stage = ?1, \
                     progress_percent = MAX(progress_percent, ?2), \
                     current_chunk = ?3, eta_seconds = ?4 \
                 WHERE id = ?5 AND status = 'running'",
                params![
                    update.stage,
                    update.percent,
                    update.current_chunk,
                    update.eta_seconds.map(|v| v as i64),
                    id
                ],
            )
            .context("Failed to update job progress")?;
            Ok(())
        })
    }

    fn set_artifact(&self, id: &str, kind: ArtifactKind, file_name: &str) -> Result<()> {
        let column = match kind {
            ArtifactKind::Conversation => "transcript_file",
            ArtifactKind::Minutes => "minutes_file",
        };

        self.with_connection(|conn| {
            conn.execute(
                &format!("UPDATE jobs SET {} = ?1 WHERE id = ?2", column),
                params![file_name, id],
            )
            .context("Failed to set artifact file")?;
            Ok(())
        })
    }

    fn mark_completed(&self, id: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "UPDATE jobs SET status = 'completed', stage = 'completed', \
                     progress_percent = 100, eta_seconds = 0, finished_at = ?1 \
                 WHERE id = ?2 AND status = 'running'",
                params![now_rfc3339(), id],
            )
            .context("Failed to mark job completed")?;
            Ok(())
        })
    }

    fn mark_error(&self, id: &str, message: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "UPDATE jobs SET status = 'error', error_message = ?1, finished_at = ?2 \
                 WHERE id = ?3 AND status IN ('queued', 'running')",
                params![message, now_rfc3339(), id],
            )
            .context("Failed to mark job errored")?;
            Ok(())
        })
    }

    fn queue_position(&self, id: &str) -> Result<Option<u32>> {
        self.with_connection(|conn| {
            let position: Option<u32> = conn
                .query_row(
                    "SELECT COUNT(*) FROM jobs \
                     WHERE status = 'queued' \
                       AND created_at <= (SELECT created_at FROM jobs \
                                          WHERE id = ?1 AND status = 'queued')",
                    params![id],
                    |row| row.get(0),
                )
                .optional()
                .context("Failed to query queue position")?;

            // COUNT over an empty subquery result yields 0, not NULL
            Ok(position.filter(|p| *p > 0))
        })
    }

    fn queued_count(&self) -> Result<u32> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM jobs WHERE status = 'queued'",
                [],
                |row| row.get(0),
            )
            .context("Failed to count queued jobs")
        })
    }

    fn running_job(&self) -> Result<Option<Job>> {
        self.with_connection(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {} FROM jobs WHERE status = 'running' \
                     ORDER BY started_at DESC LIMIT 1",
                    JOB_COLUMNS
                ),
                [],
                job_from_row,
            )
            .optional()
            .context("Failed to query running job")
        })
    }

    fn average_job_duration_secs(&self) -> Result<Option<f64>> {
        let pairs: Vec<(String, String)> = self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT started_at, finished_at FROM jobs \
                     WHERE status = 'completed' \
                       AND started_at IS NOT NULL AND finished_at IS NOT NULL",
                )
                .context("Failed to prepare duration query")?;

            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
                .context("Failed to query completed jobs")?;

            rows.collect::<std::result::Result<Vec<_>, _>>()
                .context("Failed to collect completed jobs")
        })?;

        let durations: Vec<f64> = pairs
            .iter()
            .filter_map(|(started, finished)| {
                let start = DateTime::parse_from_rfc3339(started).ok()?;
                let finish = DateTime::parse_from_rfc3339(finished).ok()?;
                let secs = (finish - start).num_milliseconds() as f64 / 1000.0;
                (secs >= 0.0).then_some(secs)
            })
            .collect();

        if durations.is_empty() {
            return Ok(None);
        }

        Ok(Some(durations.iter().sum::<f64>() / durations.len() as f64))
    }

    fn recover_orphaned_jobs(&self, message: &str) -> Result<u32> {
        self.with_connection(|conn| {
            let swept = conn
                .execute(
                    "UPDATE jobs SET status = 'error', error_message = ?1, finished_at = ?2 \
                     WHERE status IN ('queued', 'running')",
                    params![message, now_rfc3339()],
                )
                .context("Failed to sweep orphaned jobs")?;
            Ok(swept as u32)
        })
    }

    fn delete_job(&self, id: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM jobs WHERE id = ?1", params![id])
                .context("Failed to delete job")?;
            Ok(())
        })
    }

    fn jobs_created_before(&self, cutoff: &str) -> Result<Vec<Job>> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {} FROM jobs WHERE created_at < ?1 ORDER BY created_at ASC",
                    JOB_COLUMNS
                ))
                .context("Failed to prepare cleanup query")?;

            let jobs = stmt
                .query_map(params![cutoff], job_from_row)
                .context("Failed to query expired jobs")?;

            jobs.collect::<std::result::Result<Vec<_>, _>>()
                .context("Failed to collect expired jobs")
        })
    }
}

/// Cutoff timestamp for the age-based cleanup sweep
pub fn retention_cutoff(retention_days: i64) -> String {
    (Utc::now() - chrono::Duration::days(retention_days))
        .to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
