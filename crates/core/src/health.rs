// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plugin health results and aggregation

use serde::{Deserialize, Serialize};

/// Health of a single plugin. Ordering is severity: `Error` is worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
    Error,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Ok => "ok",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Error => "error",
        }
    }
}

/// Status plus a human-readable message (empty when there is nothing to say).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub status: HealthStatus,
    #[serde(default)]
    pub message: String,
}

impl Health {
    pub fn ok() -> Self {
        Self { status: HealthStatus::Ok, message: String::new() }
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self { status: HealthStatus::Degraded, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { status: HealthStatus::Error, message: message.into() }
    }
}

/// One plugin's probe result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub plugin: String,
    #[serde(flatten)]
    pub health: Health,
}

/// Worst status across all reports; the message joins every non-empty
/// per-plugin message as `"<name>: <message>"` with `"; "`.
pub fn aggregate_health(reports: &[HealthReport]) -> Health {
    let status = reports
        .iter()
        .map(|r| r.health.status)
        .max()
        .unwrap_or(HealthStatus::Ok);
    let message = reports
        .iter()
        .filter(|r| !r.health.message.is_empty())
        .map(|r| format!("{}: {}", r.plugin, r.health.message))
        .collect::<Vec<_>>()
        .join("; ");
    Health { status, message }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
