// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plugin capability traits and error kinds
//!
//! A plugin implements [`Plugin`] plus whichever capability traits it
//! supports; the registry records the capability handles at registration
//! time, so dispatch never needs runtime downcasting.

use crate::bus::EventBus;
use async_trait::async_trait;
use sb_core::{Event, Health, Payload};
use sb_storage::Store;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Lifecycle errors from init/start. Short-circuits startup.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("invalid config: {0}")]
    Config(String),

    #[error("{0}")]
    Failed(String),
}

impl PluginError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Transform step errors.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Policy rejection. Fails the run but is never re-surfaced through
    /// the sink.
    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("{0}")]
    Failed(String),
}

impl TransformError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self::AccessDenied(reason.into())
    }

    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied(_))
    }
}

/// Sink delivery errors.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SinkError(pub String);

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Webhook dispatch errors.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("no webhook registered for {0}")]
    UnknownHook(String),

    #[error("{0}")]
    Failed(String),
}

/// Base lifecycle every plugin implements.
///
/// Order: `init` (after an optional store injection) runs once per plugin
/// in registration order; `start` may spawn background work parented by the
/// shutdown token; `stop` runs in reverse registration order.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    async fn init(&self, config: serde_json::Value) -> Result<(), PluginError> {
        let _ = config;
        Ok(())
    }

    async fn start(
        &self,
        shutdown: CancellationToken,
        bus: Arc<EventBus>,
    ) -> Result<(), PluginError> {
        let _ = (shutdown, bus);
        Ok(())
    }

    async fn stop(&self) {}
}

/// Rewrites an event. Receives an owned deep copy; returns the replacement
/// the next step sees.
#[async_trait]
pub trait Transform: Send + Sync {
    async fn transform(
        &self,
        shutdown: &CancellationToken,
        event: Event,
        action: &str,
        params: &Payload,
    ) -> Result<Event, TransformError>;
}

/// Consumes an event. Terminal step of every route.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn handle_event(
        &self,
        shutdown: &CancellationToken,
        event: Event,
    ) -> Result<(), SinkError>;
}

/// Liveness probe. The registry bounds each probe with a per-plugin timeout.
#[async_trait]
pub trait HealthChecker: Send + Sync {
    async fn health_check(&self) -> Health;
}

pub type WebhookHandler = Box<dyn Fn(serde_json::Value) -> Result<(), WebhookError> + Send + Sync>;

/// Accepts webhook handlers; the HTTP collaborator exposes each as a POST
/// endpoint under `/hooks/<name>`.
pub trait WebhookRegistrar {
    fn register_webhook(&mut self, name: &str, handler: WebhookHandler);
}

/// A plugin that wants an inbound webhook endpoint.
pub trait WebhookSource: Send + Sync {
    fn register_webhook(&self, registrar: &mut dyn WebhookRegistrar);
}

/// A routable subcommand discovered from route config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub name: String,
    pub description: String,
}

/// A plugin that dispatches chat-style subcommands.
pub trait CommandAware: Send + Sync {
    fn set_commands(&self, commands: Vec<CommandSpec>);
}

/// A plugin that persists state through the shared store. Injection happens
/// before `init`; plugins never open their own connections.
pub trait StoreAware: Send + Sync {
    fn set_store(&self, store: Store);
}

/// Self-described channel membership, used for command filtering.
pub trait WorkspaceChannelProvider: Send + Sync {
    fn workspace_channels(&self) -> Vec<String>;
}
