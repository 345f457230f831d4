// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only log of supervisor task firings

use crate::store::{Store, StoreError};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SupervisorLogRow {
    pub id: i64,
    pub task: String,
    pub result: String,
    pub timestamp_ms: i64,
}

impl Store {
    pub async fn append_supervisor_log(
        &self,
        task: &str,
        result: &str,
        now_ms: u64,
    ) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO supervisor_log (task, result, timestamp_ms) VALUES (?, ?, ?)")
            .bind(task)
            .bind(result)
            .bind(now_ms as i64)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// The latest `limit` entries, newest first.
    pub async fn recent_supervisor_log(
        &self,
        limit: u32,
    ) -> Result<Vec<SupervisorLogRow>, StoreError> {
        let rows = sqlx::query_as::<_, SupervisorLogRow>(
            "SELECT id, task, result, timestamp_ms FROM supervisor_log
             ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
#[path = "supervisor_log_tests.rs"]
mod tests;
