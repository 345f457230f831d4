// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event log: insert-or-ignore persistence and dashboard queries

use crate::store::{Store, StoreError};
use sb_core::{Event, Payload};
use serde::Serialize;
use sqlx::types::Json;

/// A persisted event, shaped for the `/api/events` surface.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EventRow {
    pub id: String,
    pub source: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Json<Payload>,
    #[serde(rename = "timestamp")]
    pub timestamp_ms: i64,
    /// Name of the last route that processed the event, once routed.
    pub route: Option<String>,
}

const SELECT_COLUMNS: &str = "id, source, type, payload, timestamp_ms, route";

impl Store {
    /// Persist an event. Re-emitting an id already in the log is a no-op:
    /// after return, exactly one row with that id exists.
    pub async fn insert_event(&self, event: &Event) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT OR IGNORE INTO events (id, source, type, payload, timestamp_ms)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&event.id)
        .bind(&event.source)
        .bind(&event.kind)
        .bind(event.payload_text())
        .bind(event.timestamp_ms as i64)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Record the name of the route that processed the event.
    pub async fn update_event_route(&self, event_id: &str, route: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE events SET route = ? WHERE id = ?")
            .bind(route)
            .bind(event_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// The latest `limit` events, newest first.
    pub async fn recent_events(&self, limit: u32) -> Result<Vec<EventRow>, StoreError> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM events
             ORDER BY created_at_ms DESC, rowid DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn event_by_id(&self, id: &str) -> Result<Option<EventRow>, StoreError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM events WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
