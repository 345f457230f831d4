// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Route configuration: event selector, transform pipeline, sink

use crate::event::{Event, Payload};
use crate::schedule::parse_duration;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeout applied when a route does not configure one.
pub const DEFAULT_ROUTE_TIMEOUT: Duration = Duration::from_secs(30);

/// A configured selector with a pipeline and a sink. Immutable after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Unique route name.
    pub name: String,

    /// Required match on `event.source`.
    pub source: String,

    /// Optional exact match on `event.type`; empty matches any type.
    #[serde(default)]
    pub event: String,

    /// Duration string ("30s", "5m"); empty or unparseable falls back to 30s.
    #[serde(default)]
    pub timeout: String,

    #[serde(default)]
    pub pipeline: Vec<PipelineStep>,

    pub sink: SinkSpec,
}

/// One transform invocation in a route's pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStep {
    pub plugin: String,
    pub action: String,
    #[serde(default)]
    pub params: Payload,
}

/// Terminal delivery target for a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkSpec {
    pub plugin: String,
    #[serde(default)]
    pub params: Payload,
}

impl Route {
    /// True when this route selects the event: source must equal, and a
    /// non-empty `event` field must equal the event's type exactly.
    pub fn matches(&self, event: &Event) -> bool {
        if self.source != event.source {
            return false;
        }
        self.event.is_empty() || self.event == event.kind
    }

    /// Resolved per-run timeout.
    pub fn timeout(&self) -> Duration {
        if self.timeout.is_empty() {
            return DEFAULT_ROUTE_TIMEOUT;
        }
        parse_duration(&self.timeout).unwrap_or(DEFAULT_ROUTE_TIMEOUT)
    }
}

#[cfg(test)]
#[path = "route_tests.rs"]
mod tests;
