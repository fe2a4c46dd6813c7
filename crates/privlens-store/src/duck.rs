//! DuckDB usage store for metered feature quotas.

use std::path::Path;

use arrow::array::{Int32Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use duckdb::Connection;
use tracing::info;
use uuid::Uuid;

use privlens_core::usage::{QuotaDecision, UsageRecord};

use crate::{StoreError, UsageStore};

/// Usage store backed by DuckDB.
///
/// One row per (user, feature) pair in `user_usage`. The free-run check
/// and increment run as a single guarded UPDATE, so the quota cannot be
/// overrun between a read and a write.
///
/// Supports both in-memory (ephemeral) and persistent (file-backed) modes.
/// Use [`open`](Self::open) for in-memory and [`open_persistent`](Self::open_persistent)
/// for counters that survive across process restarts.
pub struct DuckUsageStore {
    conn: Connection,
}

const SCHEMA_SQL: &str = "
    CREATE TABLE IF NOT EXISTS user_usage (
        user_id VARCHAR NOT NULL,
        feature VARCHAR NOT NULL,
        free_runs_used INTEGER NOT NULL DEFAULT 0,
        pro_runs_used INTEGER NOT NULL DEFAULT 0,
        usage_count INTEGER NOT NULL DEFAULT 0,
        last_used_at VARCHAR,
        PRIMARY KEY (user_id, feature)
    );
    CREATE TABLE IF NOT EXISTS user_profiles (
        email VARCHAR PRIMARY KEY,
        user_id VARCHAR NOT NULL,
        created_at VARCHAR NOT NULL
    );
";

impl DuckUsageStore {
    /// Open an in-memory store.
    pub fn open() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    /// Open or create a persistent store at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "opened usage store");
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    fn profile_id(&self, email: &str) -> Result<Option<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT user_id FROM user_profiles WHERE email = ?")?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([email])?.collect();
        let Some(batch) = batches.iter().find(|b| b.num_rows() > 0) else {
            return Ok(None);
        };
        let col = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| StoreError::Other("user_id column not a string".into()))?;
        Ok(Some(col.value(0).to_string()))
    }
}

impl UsageStore for DuckUsageStore {
    fn ensure_record(&self, user_id: &str, feature: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO user_usage (user_id, feature) VALUES (?, ?) ON CONFLICT DO NOTHING",
            duckdb::params![user_id, feature],
        )?;
        Ok(())
    }

    fn check_and_consume(
        &self,
        user_id: &str,
        feature: &str,
        limit: u32,
    ) -> Result<QuotaDecision, StoreError> {
        self.ensure_record(user_id, feature)?;

        // The `free_runs_used < limit` predicate gates the increment inside
        // the UPDATE itself; zero changed rows means the quota is spent.
        let mut stmt = self.conn.prepare(
            "UPDATE user_usage
             SET free_runs_used = free_runs_used + 1,
                 usage_count = usage_count + 1,
                 last_used_at = ?
             WHERE user_id = ? AND feature = ? AND free_runs_used < ?
             RETURNING free_runs_used, pro_runs_used, usage_count",
        )?;
        let batches: Vec<RecordBatch> = stmt
            .query_arrow(duckdb::params![
                Utc::now().to_rfc3339(),
                user_id,
                feature,
                limit
            ])?
            .collect();

        match first_record(&batches)? {
            Some(record) => Ok(QuotaDecision::Allowed(record)),
            None => {
                let current = self.get(user_id, feature)?.unwrap_or_default();
                Ok(QuotaDecision::Denied(current))
            }
        }
    }

    fn record_pro_run(&self, user_id: &str, feature: &str) -> Result<UsageRecord, StoreError> {
        self.ensure_record(user_id, feature)?;
        let mut stmt = self.conn.prepare(
            "UPDATE user_usage
             SET pro_runs_used = pro_runs_used + 1,
                 usage_count = usage_count + 1,
                 last_used_at = ?
             WHERE user_id = ? AND feature = ?
             RETURNING free_runs_used, pro_runs_used, usage_count",
        )?;
        let batches: Vec<RecordBatch> = stmt
            .query_arrow(duckdb::params![Utc::now().to_rfc3339(), user_id, feature])?
            .collect();
        first_record(&batches)?.ok_or(StoreError::NoResults)
    }

    fn get(&self, user_id: &str, feature: &str) -> Result<Option<UsageRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT free_runs_used, pro_runs_used, usage_count
             FROM user_usage WHERE user_id = ? AND feature = ?",
        )?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([user_id, feature])?.collect();
        first_record(&batches)
    }

    fn ensure_profile(&self, email: &str) -> Result<String, StoreError> {
        if let Some(id) = self.profile_id(email)? {
            return Ok(id);
        }
        let user_id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO user_profiles (email, user_id, created_at)
             VALUES (?, ?, ?) ON CONFLICT DO NOTHING",
            duckdb::params![email, user_id, Utc::now().to_rfc3339()],
        )?;
        // Re-select instead of trusting our insert: a concurrent writer
        // may have claimed the email first.
        self.profile_id(email)?.ok_or(StoreError::NoResults)
    }
}

/// Read the first returned (free, pro, total) counter row, if any.
fn first_record(batches: &[RecordBatch]) -> Result<Option<UsageRecord>, StoreError> {
    let Some(batch) = batches.iter().find(|b| b.num_rows() > 0) else {
        return Ok(None);
    };
    Ok(Some(UsageRecord {
        free_runs_used: counter_value(batch, 0)?,
        pro_runs_used: counter_value(batch, 1)?,
        usage_count: counter_value(batch, 2)?,
    }))
}

fn counter_value(batch: &RecordBatch, col: usize) -> Result<u32, StoreError> {
    let column = batch.column(col);
    if let Some(arr) = column.as_any().downcast_ref::<Int32Array>() {
        return Ok(arr.value(0) as u32);
    }
    if let Some(arr) = column.as_any().downcast_ref::<Int64Array>() {
        return Ok(arr.value(0) as u32);
    }
    Err(StoreError::Other(format!(
        "counter column {col} not an integer"
    )))
}
