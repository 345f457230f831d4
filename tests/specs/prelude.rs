// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for scenario specs

pub use sb_core::{Event, Payload, PipelineStep, Route, SinkSpec};
pub use sb_engine::test_support::*;
pub use sb_engine::{EventBus, PluginRegistry, Registration, Router};
pub use sb_storage::{PipelineRunRow, RunStatus, StepStatus, Store};
pub use std::sync::Arc;
pub use std::time::Duration;
pub use tokio_util::sync::CancellationToken;

pub fn step(plugin: &str, action: &str) -> PipelineStep {
    PipelineStep { plugin: plugin.into(), action: action.into(), params: Payload::new() }
}

pub fn route(name: &str, source: &str, pipeline: Vec<PipelineStep>, sink: &str) -> Route {
    Route {
        name: name.into(),
        source: source.into(),
        event: String::new(),
        timeout: String::new(),
        pipeline,
        sink: SinkSpec { plugin: sink.into(), params: Payload::new() },
    }
}

/// Store + bus + router wired the way the daemon wires them. The router
/// lives inside its bus subscription.
pub struct Harness {
    pub store: Store,
    pub bus: Arc<EventBus>,
}

impl Harness {
    pub async fn new(routes: Vec<Route>, registry: Arc<PluginRegistry>) -> Self {
        let store = Store::open_in_memory().await.unwrap();
        let bus = Arc::new(EventBus::new(store.clone()));
        let router = Arc::new(Router::new(
            routes,
            registry,
            store.clone(),
            CancellationToken::new(),
        ));
        bus.subscribe(move |event| router.handle_event(event));
        Self { store, bus }
    }
}

/// Poll until the event has a terminal run, or give up.
pub async fn wait_for_terminal_run(store: &Store, event_id: &str) -> PipelineRunRow {
    for _ in 0..400 {
        let runs = store.runs_for_event(event_id).await.unwrap();
        if let Some(run) = runs.first() {
            if run.status != RunStatus::Running {
                return run.clone();
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("no terminal pipeline run for {event_id}");
}
