// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-plugin key/value state. Values are opaque to the core.

use crate::store::{Store, StoreError};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PluginStateRow {
    pub plugin: String,
    pub key: String,
    pub value: String,
    pub updated_at_ms: i64,
}

impl Store {
    /// Upsert by (plugin, key).
    pub async fn set_plugin_state(
        &self,
        plugin: &str,
        key: &str,
        value: &str,
        now_ms: u64,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO plugin_state (plugin, key, value, updated_at_ms)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (plugin, key)
             DO UPDATE SET value = excluded.value, updated_at_ms = excluded.updated_at_ms",
        )
        .bind(plugin)
        .bind(key)
        .bind(value)
        .bind(now_ms as i64)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn get_plugin_state(
        &self,
        plugin: &str,
        key: &str,
    ) -> Result<Option<String>, StoreError> {
        let value: Option<(String,)> =
            sqlx::query_as("SELECT value FROM plugin_state WHERE plugin = ? AND key = ?")
                .bind(plugin)
                .bind(key)
                .fetch_optional(self.pool())
                .await?;
        Ok(value.map(|(v,)| v))
    }

    /// All state rows for one plugin, keyed order.
    pub async fn plugin_state_for(&self, plugin: &str) -> Result<Vec<PluginStateRow>, StoreError> {
        let rows = sqlx::query_as::<_, PluginStateRow>(
            "SELECT plugin, key, value, updated_at_ms FROM plugin_state
             WHERE plugin = ? ORDER BY key",
        )
        .bind(plugin)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
#[path = "plugin_state_tests.rs"]
mod tests;
