// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Default dashboard renderer

use sb_engine::{DashboardState, StateRenderer};

/// Serializes the dashboard snapshot as JSON. The HTML fragment renderer
/// ships with the web layer; this is what `sbd` streams when none is
/// plugged in.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRenderer;

impl StateRenderer for JsonRenderer {
    fn render(&self, state: &DashboardState) -> Vec<u8> {
        serde_json::to_vec(state).unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;
