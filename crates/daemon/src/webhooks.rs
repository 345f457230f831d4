// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Webhook handler table for the HTTP layer's `/hooks/<name>` endpoints

use sb_engine::{WebhookError, WebhookHandler, WebhookRegistrar};
use std::collections::HashMap;
use tracing::warn;

/// Collects the handlers plugins register; the HTTP collaborator dispatches
/// each POST body here by hook name.
#[derive(Default)]
pub struct HookTable {
    handlers: HashMap<String, WebhookHandler>,
}

impl HookTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered hook names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn dispatch(&self, name: &str, body: serde_json::Value) -> Result<(), WebhookError> {
        match self.handlers.get(name) {
            Some(handler) => handler(body),
            None => Err(WebhookError::UnknownHook(name.to_string())),
        }
    }
}

impl WebhookRegistrar for HookTable {
    fn register_webhook(&mut self, name: &str, handler: WebhookHandler) {
        if self.handlers.insert(name.to_string(), handler).is_some() {
            warn!(hook = name, "webhook handler replaced");
        }
    }
}

#[cfg(test)]
#[path = "webhooks_tests.rs"]
mod tests;
