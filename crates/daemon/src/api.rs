// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Data layer for the HTTP surface. The server framing lives with the web
//! collaborator; these are the payloads its endpoints serve.

use sb_core::{aggregate_health, Health, HealthReport, HealthStatus};
use sb_engine::PluginRegistry;
use sb_storage::{EventRow, PipelineRunRow, Store, StoreError};
use serde::Serialize;
use std::time::Duration;

/// Window served by `GET /api/events` and streamed by the hub.
pub const RECENT_EVENT_LIMIT: u32 = 50;

/// Per-plugin budget for `GET /api/health` probes.
pub const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Body of `GET /api/health`: aggregate status plus per-plugin results.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    #[serde(flatten)]
    pub aggregate: Health,
    pub plugins: Vec<HealthReport>,
}

impl HealthResponse {
    /// 200 when everything is ok, 503 otherwise.
    pub fn http_status(&self) -> u16 {
        if self.aggregate.status == HealthStatus::Ok {
            200
        } else {
            503
        }
    }
}

pub async fn health_response(registry: &PluginRegistry) -> HealthResponse {
    let plugins = registry.check_health(HEALTH_PROBE_TIMEOUT).await;
    HealthResponse { aggregate: aggregate_health(&plugins), plugins }
}

/// `GET /api/events`: the latest 50 events, newest first.
pub async fn recent_events(store: &Store) -> Result<Vec<EventRow>, StoreError> {
    store.recent_events(RECENT_EVENT_LIMIT).await
}

/// `GET /api/events/{id}/runs`: pipeline runs for one event, id-desc.
pub async fn event_runs(store: &Store, event_id: &str) -> Result<Vec<PipelineRunRow>, StoreError> {
    store.runs_for_event(event_id).await
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
