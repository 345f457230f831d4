// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline-run ledger: one row per (route match, event)

use crate::store::{Store, StoreError};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

/// Run lifecycle. Transitions are monotonic: `running` moves to exactly one
/// of the terminal states and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Completed,
    Failed,
}

/// Outcome of one pipeline step. Sink deliveries are recorded as a final
/// step with action `"sink"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub plugin: String,
    pub action: String,
    pub status: StepStatus,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepResult {
    pub fn completed(plugin: &str, action: &str, duration_ms: u64) -> Self {
        Self {
            plugin: plugin.to_string(),
            action: action.to_string(),
            status: StepStatus::Completed,
            duration_ms,
            error: None,
        }
    }

    pub fn failed(plugin: &str, action: &str, duration_ms: u64, error: impl Into<String>) -> Self {
        Self {
            plugin: plugin.to_string(),
            action: action.to_string(),
            status: StepStatus::Failed,
            duration_ms,
            error: Some(error.into()),
        }
    }
}

/// A persisted pipeline run, shaped for `/api/events/{id}/runs`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PipelineRunRow {
    pub id: i64,
    pub event_id: String,
    pub route: String,
    pub status: RunStatus,
    #[serde(rename = "started_at")]
    pub started_at_ms: i64,
    #[serde(rename = "finished_at", skip_serializing_if = "Option::is_none")]
    pub finished_at_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<Json<Vec<StepResult>>>,
}

const SELECT_COLUMNS: &str =
    "id, event_id, route, status, started_at_ms, finished_at_ms, duration_ms, error, steps";

impl Store {
    /// Insert a `running` row and return its assigned id.
    pub async fn insert_run(
        &self,
        event_id: &str,
        route: &str,
        started_at_ms: u64,
    ) -> Result<i64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO pipeline_runs (event_id, route, status, started_at_ms)
             VALUES (?, ?, 'running', ?)",
        )
        .bind(event_id)
        .bind(route)
        .bind(started_at_ms as i64)
        .execute(self.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Move a run to a terminal status, setting finish time, duration,
    /// error, and the serialized step ledger together. Rows already
    /// terminal are left untouched.
    pub async fn finish_run(
        &self,
        id: i64,
        status: RunStatus,
        finished_at_ms: u64,
        duration_ms: u64,
        error: Option<&str>,
        steps: &[StepResult],
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE pipeline_runs
             SET status = ?, finished_at_ms = ?, duration_ms = ?, error = ?, steps = ?
             WHERE id = ? AND status = 'running'",
        )
        .bind(status)
        .bind(finished_at_ms as i64)
        .bind(duration_ms as i64)
        .bind(error)
        .bind(Json(steps))
        .bind(id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Runs for one event, newest first.
    pub async fn runs_for_event(&self, event_id: &str) -> Result<Vec<PipelineRunRow>, StoreError> {
        let rows = sqlx::query_as::<_, PipelineRunRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM pipeline_runs
             WHERE event_id = ? ORDER BY id DESC"
        ))
        .bind(event_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Runs belonging to the latest `limit` events, for the dashboard.
    pub async fn runs_for_recent_events(
        &self,
        limit: u32,
    ) -> Result<Vec<PipelineRunRow>, StoreError> {
        let rows = sqlx::query_as::<_, PipelineRunRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM pipeline_runs
             WHERE event_id IN
                 (SELECT id FROM events ORDER BY created_at_ms DESC, rowid DESC LIMIT ?)
             ORDER BY id DESC"
        ))
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
#[path = "runs_tests.rs"]
mod tests;
