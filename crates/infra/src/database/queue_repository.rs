//! SQLCipher-backed durable queue and checkpoint store.
//!
//! Timestamps are stored as Unix milliseconds. Every port method runs on the
//! blocking pool in a single transaction.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use outpost_common::storage::SqlCipherConnection;
use outpost_common::time::Clock;
use outpost_core::{CheckpointStore, DurableQueue, HealthCheckable};
use outpost_domain::{
    EntryId, HealthStatus, OutpostError, QueueEntry, Result as DomainResult, StreamStats,
};
use rusqlite::{params, OptionalExtension, Row};
use tokio::task;
use tracing::{debug, warn};

use super::manager::{map_sql_error, DbManager};

pub struct SqlCipherQueueRepository {
    db: Arc<DbManager>,
    clock: Arc<dyn Clock>,
}

impl SqlCipherQueueRepository {
    pub fn new(db: Arc<DbManager>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    async fn with_connection<T, F>(&self, op: F) -> DomainResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqlCipherConnection) -> DomainResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> DomainResult<T> {
            let mut conn = db.get_connection()?;
            op(&mut conn)
        })
        .await
        .map_err(map_join_error)?
    }

    fn insert_entry(
        conn: &mut SqlCipherConnection,
        stream: &str,
        payload: &[u8],
        created_at: i64,
    ) -> DomainResult<EntryId> {
        let tx = conn.transaction().map_err(map_sql_error)?;
        tx.execute(QUEUE_INSERT_SQL, params![stream, payload, created_at]).map_err(map_sql_error)?;
        let id = tx.last_insert_rowid();
        tx.commit().map_err(map_sql_error)?;
        Ok(EntryId(id))
    }

    fn fetch_pending(
        conn: &SqlCipherConnection,
        stream: &str,
        limit: usize,
    ) -> DomainResult<Vec<QueueEntry>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut stmt = conn.prepare(QUEUE_PENDING_SQL).map_err(map_sql_error)?;
        let rows = stmt
            .query_map(params![stream, usize_to_i64(limit)], map_entry_row)
            .map_err(map_sql_error)?;
        let entries = rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)?;
        Ok(entries)
    }

    /// Run `sql` once per id inside one transaction; returns rows changed.
    fn update_ids(
        conn: &mut SqlCipherConnection,
        sql: &str,
        ids: &[EntryId],
        now: Option<i64>,
    ) -> DomainResult<usize> {
        let tx = conn.transaction().map_err(map_sql_error)?;
        let mut changed = 0;
        {
            let mut stmt = tx.prepare(sql).map_err(map_sql_error)?;
            for id in ids {
                changed += match now {
                    Some(now) => stmt.execute(params![now, id.0]),
                    None => stmt.execute(params![id.0]),
                }
                .map_err(map_sql_error)?;
            }
        }
        tx.commit().map_err(map_sql_error)?;
        Ok(changed)
    }
}

#[async_trait]
impl DurableQueue for SqlCipherQueueRepository {
    async fn append(&self, stream: &str, payload: &[u8]) -> DomainResult<EntryId> {
        let stream = stream.to_string();
        let payload = payload.to_vec();
        let created_at = self.clock.utc_now().timestamp_millis();

        self.with_connection(move |conn| Self::insert_entry(conn, &stream, &payload, created_at))
            .await
    }

    async fn list_pending(&self, stream: &str, limit: usize) -> DomainResult<Vec<QueueEntry>> {
        let stream = stream.to_string();
        self.with_connection(move |conn| Self::fetch_pending(conn, &stream, limit)).await
    }

    async fn mark_delivered(&self, ids: &[EntryId]) -> DomainResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let ids = ids.to_vec();
        let now = self.clock.utc_now().timestamp_millis();

        let changed = self
            .with_connection(move |conn| Self::update_ids(conn, MARK_DELIVERED_SQL, &ids, Some(now)))
            .await?;
        debug!(changed, "entries marked delivered");
        Ok(changed)
    }

    async fn record_attempt(&self, ids: &[EntryId]) -> DomainResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let ids = ids.to_vec();
        self.with_connection(move |conn| Self::update_ids(conn, RECORD_ATTEMPT_SQL, &ids, None))
            .await
    }

    async fn cleanup(&self, stream: &str, retention: Duration) -> DomainResult<usize> {
        let stream = stream.to_string();
        let retention_ms = i64::try_from(retention.as_millis()).unwrap_or(i64::MAX);
        let cutoff = self.clock.utc_now().timestamp_millis().saturating_sub(retention_ms);

        self.with_connection(move |conn| {
            let tx = conn.transaction().map_err(map_sql_error)?;
            let deleted =
                tx.execute(CLEANUP_SQL, params![stream, cutoff]).map_err(map_sql_error)?;
            tx.commit().map_err(map_sql_error)?;
            Ok(deleted)
        })
        .await
    }

    async fn pending_count(&self, stream: &str) -> DomainResult<u64> {
        let stream = stream.to_string();
        self.with_connection(move |conn| {
            let count: i64 = conn
                .query_row(PENDING_COUNT_SQL, params![stream], |row| row.get(0))
                .map_err(map_sql_error)?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
        .await
    }

    async fn stats(&self) -> DomainResult<Vec<StreamStats>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(STATS_SQL).map_err(map_sql_error)?;
            let rows = stmt
                .query_map([], |row| {
                    let pending: i64 = row.get(1)?;
                    let delivered: i64 = row.get(2)?;
                    let oldest: Option<i64> = row.get(3)?;
                    Ok(StreamStats {
                        stream_name: row.get(0)?,
                        pending: u64::try_from(pending).unwrap_or(0),
                        delivered: u64::try_from(delivered).unwrap_or(0),
                        oldest_pending_at: oldest.and_then(DateTime::from_timestamp_millis),
                    })
                })
                .map_err(map_sql_error)?;
            let stats = rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)?;
            Ok(stats)
        })
        .await
    }
}

/// The queue is healthy while a pooled connection answers `SELECT 1` and the
/// per-stream counters can be read.
#[async_trait]
impl HealthCheckable for SqlCipherQueueRepository {
    fn name(&self) -> String {
        "queue".to_string()
    }

    async fn check(&self) -> HealthStatus {
        let db = Arc::clone(&self.db);
        let pool = match task::spawn_blocking(move || db.health_check()).await {
            Ok(Ok(pool)) => pool,
            Ok(Err(err)) => return HealthStatus::unhealthy(format!("database unavailable: {err}")),
            Err(err) => return HealthStatus::unhealthy(format!("database check failed: {err}")),
        };

        match self.stats().await {
            Ok(stats) => {
                let pending: u64 = stats.iter().map(|s| s.pending).sum();
                let oldest_pending_at = stats.iter().filter_map(|s| s.oldest_pending_at).min();
                debug!(
                    pending,
                    streams = stats.len(),
                    ?oldest_pending_at,
                    connections = pool.connections,
                    idle = pool.idle_connections,
                    "queue health"
                );
                HealthStatus::Healthy
            }
            Err(err) => {
                warn!(error = %err, "queue counters unavailable");
                HealthStatus::unhealthy(format!("queue unreadable: {err}"))
            }
        }
    }
}

#[async_trait]
impl CheckpointStore for SqlCipherQueueRepository {
    async fn load_checkpoint(&self, stream: &str) -> DomainResult<Option<String>> {
        let stream = stream.to_string();
        self.with_connection(move |conn| {
            conn.query_row(LOAD_CHECKPOINT_SQL, params![stream], |row| row.get(0))
                .optional()
                .map_err(map_sql_error)
        })
        .await
    }

    async fn store_checkpoint(&self, stream: &str, checkpoint: &str) -> DomainResult<()> {
        let stream = stream.to_string();
        let checkpoint = checkpoint.to_string();
        let now = self.clock.utc_now().timestamp_millis();
        self.with_connection(move |conn| {
            conn.execute(STORE_CHECKPOINT_SQL, params![stream, checkpoint, now])
                .map(|_| ())
                .map_err(map_sql_error)
        })
        .await
    }
}

const QUEUE_INSERT_SQL: &str =
    "INSERT INTO queue_entries (stream_name, payload, created_at, attempt_count) VALUES (?1, ?2, ?3, 0)";

const QUEUE_PENDING_SQL: &str = "SELECT id, stream_name, payload, created_at, delivered_at, attempt_count
    FROM queue_entries
    WHERE stream_name = ?1 AND delivered_at IS NULL
    ORDER BY id ASC
    LIMIT ?2";

const MARK_DELIVERED_SQL: &str =
    "UPDATE queue_entries SET delivered_at = ?1 WHERE id = ?2 AND delivered_at IS NULL";

const RECORD_ATTEMPT_SQL: &str =
    "UPDATE queue_entries SET attempt_count = attempt_count + 1 WHERE id = ?1 AND delivered_at IS NULL";

const CLEANUP_SQL: &str = "DELETE FROM queue_entries
    WHERE stream_name = ?1 AND delivered_at IS NOT NULL AND created_at < ?2";

const PENDING_COUNT_SQL: &str =
    "SELECT COUNT(*) FROM queue_entries WHERE stream_name = ?1 AND delivered_at IS NULL";

const STATS_SQL: &str = "SELECT stream_name,
        SUM(CASE WHEN delivered_at IS NULL THEN 1 ELSE 0 END),
        SUM(CASE WHEN delivered_at IS NULL THEN 0 ELSE 1 END),
        MIN(CASE WHEN delivered_at IS NULL THEN created_at END)
    FROM queue_entries
    GROUP BY stream_name
    ORDER BY stream_name";

const LOAD_CHECKPOINT_SQL: &str =
    "SELECT checkpoint FROM stream_checkpoints WHERE stream_name = ?1";

const STORE_CHECKPOINT_SQL: &str = "INSERT INTO stream_checkpoints (stream_name, checkpoint, updated_at)
    VALUES (?1, ?2, ?3)
    ON CONFLICT(stream_name) DO UPDATE SET checkpoint = excluded.checkpoint, updated_at = excluded.updated_at";

fn map_entry_row(row: &Row<'_>) -> rusqlite::Result<QueueEntry> {
    let created_at: i64 = row.get(3)?;
    let delivered_at: Option<i64> = row.get(4)?;
    let attempt_count: i64 = row.get(5)?;

    Ok(QueueEntry {
        id: EntryId(row.get(0)?),
        stream_name: row.get(1)?,
        payload: row.get(2)?,
        created_at: millis_to_utc(created_at),
        delivered_at: delivered_at.map(millis_to_utc),
        attempt_count: u32::try_from(attempt_count).unwrap_or(u32::MAX),
    })
}

fn millis_to_utc(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

fn map_join_error(err: task::JoinError) -> OutpostError {
    if err.is_cancelled() {
        OutpostError::Internal("queue task cancelled".into())
    } else {
        OutpostError::Internal(format!("queue task panic: {err}"))
    }
}

fn usize_to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
