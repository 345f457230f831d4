// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered plugin collection: lifecycle, capability lookups, health

use crate::bus::EventBus;
use crate::plugin::{
    CommandAware, CommandSpec, HealthChecker, Plugin, PluginError, Sink, StoreAware, Transform,
    WebhookRegistrar, WebhookSource, WorkspaceChannelProvider,
};
use futures_util::FutureExt;
use parking_lot::RwLock;
use sb_core::{Health, HealthReport, Route};
use sb_storage::Store;
use serde::Serialize;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("plugin already registered: {0}")]
    Duplicate(String),

    #[error("plugin {plugin} init failed: {source}")]
    Init { plugin: String, source: PluginError },

    #[error("plugin {plugin} start failed: {source}")]
    Start { plugin: String, source: PluginError },
}

/// One registered plugin with its capability handles. Built by the plugin's
/// host: the same `Arc` is passed once per capability the plugin supports.
#[derive(Clone)]
pub struct Registration {
    name: String,
    plugin: Arc<dyn Plugin>,
    transform: Option<Arc<dyn Transform>>,
    sink: Option<Arc<dyn Sink>>,
    health: Option<Arc<dyn HealthChecker>>,
    webhook: Option<Arc<dyn WebhookSource>>,
    commands: Option<Arc<dyn CommandAware>>,
    store_aware: Option<Arc<dyn StoreAware>>,
    channels: Option<Arc<dyn WorkspaceChannelProvider>>,
}

impl Registration {
    pub fn new(plugin: Arc<dyn Plugin>) -> Self {
        Self {
            name: plugin.name().to_string(),
            plugin,
            transform: None,
            sink: None,
            health: None,
            webhook: None,
            commands: None,
            store_aware: None,
            channels: None,
        }
    }

    pub fn with_transform(mut self, transform: Arc<dyn Transform>) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_health(mut self, health: Arc<dyn HealthChecker>) -> Self {
        self.health = Some(health);
        self
    }

    pub fn with_webhook(mut self, webhook: Arc<dyn WebhookSource>) -> Self {
        self.webhook = Some(webhook);
        self
    }

    pub fn with_commands(mut self, commands: Arc<dyn CommandAware>) -> Self {
        self.commands = Some(commands);
        self
    }

    pub fn with_store_aware(mut self, store_aware: Arc<dyn StoreAware>) -> Self {
        self.store_aware = Some(store_aware);
        self
    }

    pub fn with_channels(mut self, channels: Arc<dyn WorkspaceChannelProvider>) -> Self {
        self.channels = Some(channels);
        self
    }
}

/// Name plus discovered capability tags for the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginInfo {
    pub name: String,
    pub kinds: Vec<&'static str>,
}

#[derive(Default)]
struct Inner {
    order: Vec<Registration>,
    index: HashMap<String, usize>,
}

/// Ordered set of plugins. Lookups take a read lock; registration a write
/// lock. Lifecycle methods snapshot the list before awaiting.
#[derive(Default)]
pub struct PluginRegistry {
    inner: RwLock<Inner>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append in registration order. Duplicate names are rejected.
    pub fn register(&self, registration: Registration) -> Result<(), RegistryError> {
        let mut inner = self.inner.write();
        let name = registration.name.clone();
        if inner.index.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        let slot = inner.order.len();
        inner.order.push(registration);
        inner.index.insert(name, slot);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.lookup(name, |r| Some(Arc::clone(&r.plugin)))
    }

    pub fn get_transform(&self, name: &str) -> Option<Arc<dyn Transform>> {
        self.lookup(name, |r| r.transform.clone())
    }

    pub fn get_sink(&self, name: &str) -> Option<Arc<dyn Sink>> {
        self.lookup(name, |r| r.sink.clone())
    }

    /// Channel membership for one plugin, when it self-describes.
    pub fn workspace_channels(&self, name: &str) -> Option<Vec<String>> {
        self.lookup(name, |r| r.channels.as_ref().map(|c| c.workspace_channels()))
    }

    fn lookup<T>(&self, name: &str, extract: impl FnOnce(&Registration) -> Option<T>) -> Option<T> {
        let inner = self.inner.read();
        let slot = *inner.index.get(name)?;
        extract(&inner.order[slot])
    }

    fn snapshot(&self) -> Vec<Registration> {
        self.inner.read().order.clone()
    }

    /// Initialize every plugin in registration order, injecting the store
    /// handle into `StoreAware` plugins first. Fails on the first error.
    pub async fn init_all(
        &self,
        store: &Store,
        configs: &HashMap<String, serde_json::Value>,
    ) -> Result<(), RegistryError> {
        for registration in self.snapshot() {
            if let Some(store_aware) = &registration.store_aware {
                store_aware.set_store(store.clone());
            }
            let config = configs
                .get(&registration.name)
                .cloned()
                .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));
            registration.plugin.init(config).await.map_err(|source| RegistryError::Init {
                plugin: registration.name.clone(),
                source,
            })?;
            info!(plugin = %registration.name, "plugin initialized");
        }
        Ok(())
    }

    /// Start every plugin in registration order. Fails on the first error.
    pub async fn start_all(
        &self,
        shutdown: &CancellationToken,
        bus: &Arc<EventBus>,
    ) -> Result<(), RegistryError> {
        for registration in self.snapshot() {
            registration
                .plugin
                .start(shutdown.child_token(), Arc::clone(bus))
                .await
                .map_err(|source| RegistryError::Start {
                    plugin: registration.name.clone(),
                    source,
                })?;
            info!(plugin = %registration.name, "plugin started");
        }
        Ok(())
    }

    /// Stop every plugin in reverse registration order. Panics are fenced
    /// and logged; stop never fails the caller.
    pub async fn stop_all(&self) {
        for registration in self.snapshot().into_iter().rev() {
            if AssertUnwindSafe(registration.plugin.stop()).catch_unwind().await.is_err() {
                error!(plugin = %registration.name, "plugin panicked during stop");
            } else {
                info!(plugin = %registration.name, "plugin stopped");
            }
        }
    }

    /// Offer every `WebhookSource` the registrar.
    pub fn register_webhooks(&self, registrar: &mut dyn WebhookRegistrar) {
        for registration in self.snapshot() {
            if let Some(webhook) = &registration.webhook {
                webhook.register_webhook(registrar);
            }
        }
    }

    /// Push the routable subcommands discovered from route config into each
    /// `CommandAware` plugin: routes selecting that plugin as source with a
    /// concrete event type become commands.
    pub fn apply_commands(&self, routes: &[Route]) {
        for registration in self.snapshot() {
            let Some(commands) = &registration.commands else { continue };
            let specs: Vec<CommandSpec> = routes
                .iter()
                .filter(|route| route.source == registration.name && !route.event.is_empty())
                .map(|route| CommandSpec {
                    name: route.event.clone(),
                    description: route.name.clone(),
                })
                .collect();
            commands.set_commands(specs);
        }
    }

    /// All plugins with their discovered capability tags. Plugins that are
    /// neither transform nor sink default to `source`.
    pub fn all(&self) -> Vec<PluginInfo> {
        self.snapshot()
            .iter()
            .map(|registration| {
                let mut kinds = Vec::new();
                if registration.transform.is_some() {
                    kinds.push("transform");
                }
                if registration.sink.is_some() {
                    kinds.push("sink");
                }
                if kinds.is_empty() {
                    kinds.push("source");
                }
                PluginInfo { name: registration.name.clone(), kinds }
            })
            .collect()
    }

    /// Probe every health checker under a per-plugin timeout; plugins
    /// without a checker report ok. One stuck or panicking probe cannot
    /// poison the others.
    pub async fn check_health(&self, per_plugin_timeout: Duration) -> Vec<HealthReport> {
        let mut reports = Vec::new();
        for registration in self.snapshot() {
            let health = match &registration.health {
                None => Health::ok(),
                Some(checker) => {
                    let probe = tokio::time::timeout(per_plugin_timeout, checker.health_check());
                    match AssertUnwindSafe(probe).catch_unwind().await {
                        Ok(Ok(health)) => health,
                        Ok(Err(_)) => {
                            warn!(plugin = %registration.name, "health check timed out");
                            Health::error("health check timed out")
                        }
                        Err(_) => {
                            error!(plugin = %registration.name, "health check panicked");
                            Health::error("health check panicked")
                        }
                    }
                }
            };
            reports.push(HealthReport { plugin: registration.name.clone(), health });
        }
        reports
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
