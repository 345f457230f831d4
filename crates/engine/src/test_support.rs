// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixture plugins for engine tests and workspace specs

use crate::bus::EventBus;
use crate::hub::{DashboardState, StateRenderer};
use crate::plugin::{
    HealthChecker, Plugin, PluginError, Sink, SinkError, StoreAware, Transform, TransformError,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use sb_core::{Event, Health, Payload};
use sb_storage::Store;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Bare plugin that records lifecycle calls into a shared log and can be
/// told to fail init or start.
pub struct ProbePlugin {
    name: String,
    log: Arc<Mutex<Vec<String>>>,
    fail_init: bool,
    fail_start: bool,
}

impl ProbePlugin {
    pub fn new(name: &str, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self { name: name.into(), log, fail_init: false, fail_start: false }
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    fn record(&self, op: &str) {
        self.log.lock().push(format!("{op}:{}", self.name));
    }
}

#[async_trait]
impl Plugin for ProbePlugin {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&self, _config: serde_json::Value) -> Result<(), PluginError> {
        self.record("init");
        if self.fail_init {
            return Err(PluginError::failed("init refused"));
        }
        Ok(())
    }

    async fn start(
        &self,
        _shutdown: CancellationToken,
        _bus: Arc<EventBus>,
    ) -> Result<(), PluginError> {
        self.record("start");
        if self.fail_start {
            return Err(PluginError::failed("start refused"));
        }
        Ok(())
    }

    async fn stop(&self) {
        self.record("stop");
    }
}

impl StoreAware for ProbePlugin {
    fn set_store(&self, _store: Store) {
        self.record("store");
    }
}

/// Sink that records everything it is handed; optionally fails every
/// delivery.
pub struct RecordingSink {
    name: String,
    received: Mutex<Vec<Event>>,
    fail_with: Option<String>,
}

impl RecordingSink {
    pub fn new(name: &str) -> Self {
        Self { name: name.into(), received: Mutex::new(Vec::new()), fail_with: None }
    }

    pub fn failing(name: &str, message: &str) -> Self {
        Self {
            name: name.into(),
            received: Mutex::new(Vec::new()),
            fail_with: Some(message.into()),
        }
    }

    pub fn received(&self) -> Vec<Event> {
        self.received.lock().clone()
    }
}

#[async_trait]
impl Plugin for RecordingSink {
    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Sink for RecordingSink {
    async fn handle_event(
        &self,
        _shutdown: &CancellationToken,
        event: Event,
    ) -> Result<(), SinkError> {
        self.received.lock().push(event);
        match &self.fail_with {
            Some(message) => Err(SinkError::new(message.clone())),
            None => Ok(()),
        }
    }
}

/// Transform that inserts a fixed key/value into the payload.
pub struct InsertTransform {
    name: String,
    key: String,
    value: serde_json::Value,
}

impl InsertTransform {
    pub fn new(name: &str, key: &str, value: serde_json::Value) -> Self {
        Self { name: name.into(), key: key.into(), value }
    }
}

#[async_trait]
impl Plugin for InsertTransform {
    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Transform for InsertTransform {
    async fn transform(
        &self,
        _shutdown: &CancellationToken,
        mut event: Event,
        _action: &str,
        _params: &Payload,
    ) -> Result<Event, TransformError> {
        event.payload.insert(self.key.clone(), self.value.clone());
        Ok(event)
    }
}

/// Transform that always fails with a plain error.
pub struct FailingTransform {
    name: String,
    message: String,
}

impl FailingTransform {
    pub fn new(name: &str, message: &str) -> Self {
        Self { name: name.into(), message: message.into() }
    }
}

#[async_trait]
impl Plugin for FailingTransform {
    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Transform for FailingTransform {
    async fn transform(
        &self,
        _shutdown: &CancellationToken,
        _event: Event,
        _action: &str,
        _params: &Payload,
    ) -> Result<Event, TransformError> {
        Err(TransformError::failed(self.message.clone()))
    }
}

/// Transform that rejects every event on policy grounds.
pub struct DenyingTransform {
    name: String,
    reason: String,
}

impl DenyingTransform {
    pub fn new(name: &str, reason: &str) -> Self {
        Self { name: name.into(), reason: reason.into() }
    }
}

#[async_trait]
impl Plugin for DenyingTransform {
    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Transform for DenyingTransform {
    async fn transform(
        &self,
        _shutdown: &CancellationToken,
        _event: Event,
        _action: &str,
        _params: &Payload,
    ) -> Result<Event, TransformError> {
        Err(TransformError::denied(self.reason.clone()))
    }
}

/// Transform that sleeps before succeeding, for timeout tests.
pub struct SlowTransform {
    name: String,
    delay: Duration,
}

impl SlowTransform {
    pub fn new(name: &str, delay: Duration) -> Self {
        Self { name: name.into(), delay }
    }
}

#[async_trait]
impl Plugin for SlowTransform {
    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Transform for SlowTransform {
    async fn transform(
        &self,
        _shutdown: &CancellationToken,
        event: Event,
        _action: &str,
        _params: &Payload,
    ) -> Result<Event, TransformError> {
        tokio::time::sleep(self.delay).await;
        Ok(event)
    }
}

/// Plugin reporting a fixed health value.
pub struct StaticHealth {
    name: String,
    health: Health,
}

impl StaticHealth {
    pub fn new(name: &str, health: Health) -> Self {
        Self { name: name.into(), health }
    }
}

#[async_trait]
impl Plugin for StaticHealth {
    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl HealthChecker for StaticHealth {
    async fn health_check(&self) -> Health {
        self.health.clone()
    }
}

/// Renderer that counts render calls and emits a trivial frame.
#[derive(Default)]
pub struct CountingRenderer {
    renders: AtomicUsize,
}

impl CountingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

impl StateRenderer for CountingRenderer {
    fn render(&self, state: &DashboardState) -> Vec<u8> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        format!("events={}", state.events.len()).into_bytes()
    }
}
