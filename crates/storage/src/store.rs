// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store lifecycle: open the database, enforce schema, hand out the pool

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Storage errors. The store performs no retries; callers decide whether a
/// failure is fatal.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Owner of all database rows. Every component shares this handle; plugins
/// never open their own connections.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if missing) the database at `path` with WAL
    /// journaling and a 5-second busy timeout, then apply the schema.
    /// Reopening an existing database is safe: the DDL is idempotent.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        let store = Self { pool };
        store.apply_schema().await?;
        Ok(store)
    }

    /// In-memory database for tests. Pinned to a single connection so every
    /// query sees the same database.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.apply_schema().await?;
        Ok(store)
    }

    /// The shared connection pool. Safe for concurrent use.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool. Operations after close fail.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn apply_schema(&self) -> Result<(), StoreError> {
        for ddl in SCHEMA {
            sqlx::query(ddl).execute(&self.pool).await?;
        }
        Ok(())
    }
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS events (
        id            TEXT PRIMARY KEY,
        source        TEXT NOT NULL,
        type          TEXT NOT NULL,
        payload       TEXT NOT NULL,
        timestamp_ms  INTEGER NOT NULL,
        route         TEXT,
        created_at_ms INTEGER NOT NULL DEFAULT (strftime('%s', 'now') * 1000)
    )",
    "CREATE TABLE IF NOT EXISTS pipeline_runs (
        id             INTEGER PRIMARY KEY AUTOINCREMENT,
        event_id       TEXT NOT NULL REFERENCES events(id),
        route          TEXT NOT NULL,
        status         TEXT NOT NULL,
        started_at_ms  INTEGER NOT NULL,
        finished_at_ms INTEGER,
        duration_ms    INTEGER,
        error          TEXT,
        steps          TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_pipeline_runs_event_id
        ON pipeline_runs(event_id)",
    "CREATE TABLE IF NOT EXISTS plugin_state (
        plugin        TEXT NOT NULL,
        key           TEXT NOT NULL,
        value         TEXT NOT NULL,
        updated_at_ms INTEGER NOT NULL,
        PRIMARY KEY (plugin, key)
    )",
    "CREATE TABLE IF NOT EXISTS supervisor_log (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        task         TEXT NOT NULL,
        result       TEXT NOT NULL,
        timestamp_ms INTEGER NOT NULL
    )",
];

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
