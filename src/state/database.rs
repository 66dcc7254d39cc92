//! SQLite run log with WAL mode and migration support.

use crate::state::schema;
use crate::types::*;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::info;

/// A persisted run.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub outcome: RunOutcome,
    pub steps: Vec<Step>,
    pub iterations: u32,
    pub total_cost: f64,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

impl RunRecord {
    /// Build a record for a just-finished run.
    pub fn from_result(question: &str, model: &str, result: &RunResult) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            question: question.to_string(),
            answer: result.answer.clone(),
            outcome: result.outcome,
            steps: result.steps.clone(),
            iterations: result.iterations,
            total_cost: result.total_cost,
            model: model.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// The run log database.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&mut self) -> Result<()> {
        let version = self.schema_version();

        if version == 0 {
            info!("Creating database schema v{}", schema::SCHEMA_VERSION);
            self.conn
                .execute_batch(schema::CREATE_SCHEMA)
                .context("Failed to create schema")?;
            self.conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![schema::SCHEMA_VERSION],
            )?;
        } else if version > schema::SCHEMA_VERSION {
            anyhow::bail!(
                "Database schema v{} is newer than supported v{}",
                version,
                schema::SCHEMA_VERSION
            );
        }

        Ok(())
    }

    /// Current schema version (0 if uninitialized).
    fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    // -----------------------------------------------------------------------
    // Runs
    // -----------------------------------------------------------------------

    pub fn save_run(&self, run: &RunRecord) -> Result<()> {
        let steps_json = serde_json::to_string(&run.steps)?;
        self.conn.execute(
            "INSERT INTO runs (id, question, answer, outcome, steps_json, iterations, total_cost, model, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                run.id,
                run.question,
                run.answer,
                run.outcome.to_string(),
                steps_json,
                run.iterations,
                run.total_cost,
                run.model,
                run.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Most recent runs first.
    pub fn recent_runs(&self, limit: usize) -> Result<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, question, answer, outcome, steps_json, iterations, total_cost, model, created_at
             FROM runs ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            let outcome: String = row.get(3)?;
            let steps_json: String = row.get(4)?;
            let created_at: String = row.get(8)?;
            Ok(RunRecord {
                id: row.get(0)?,
                question: row.get(1)?,
                answer: row.get(2)?,
                outcome: outcome.parse().unwrap_or(RunOutcome::Failed),
                steps: serde_json::from_str(&steps_json).unwrap_or_default(),
                iterations: row.get(5)?,
                total_cost: row.get(6)?,
                model: row.get(7)?,
                created_at: DateTime::parse_from_rfc3339(&created_at)
                    .map(|d| d.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;

        let mut runs = Vec::new();
        for row in rows {
            runs.push(row?);
        }
        Ok(runs)
    }

    pub fn run_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Total cost across all logged runs.
    pub fn total_cost(&self) -> Result<f64> {
        let total: f64 = self.conn.query_row(
            "SELECT COALESCE(SUM(total_cost), 0.0) FROM runs",
            [],
            |row| row.get(0),
        )?;
        Ok(total)
    }
}
