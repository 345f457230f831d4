// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::render::JsonRenderer;
use sb_core::Event;
use sb_engine::test_support::{InsertTransform, RecordingSink};
use sb_engine::Registration;
use sb_storage::RunStatus;

fn config_with_route(db_path: &std::path::Path) -> Config {
    let raw = format!(
        r#"
database = "{}"

[[routes]]
name = "annotate"
source = "src"
pipeline = [{{ plugin = "t1", action = "add" }}]
sink = {{ plugin = "out" }}
"#,
        db_path.display()
    );
    Config::parse(&raw).unwrap()
}

#[tokio::test]
async fn startup_routes_events_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_with_route(&dir.path().join("events.db"));

    let registry = Arc::new(PluginRegistry::new());
    let t1 = Arc::new(InsertTransform::new("t1", "a", serde_json::json!(1)));
    let out = Arc::new(RecordingSink::new("out"));
    registry.register(Registration::new(t1.clone()).with_transform(t1.clone())).unwrap();
    registry.register(Registration::new(out.clone()).with_sink(out.clone())).unwrap();

    let state = startup(config, registry, Arc::new(JsonRenderer)).await.unwrap();

    let event = Event::new("src", "push");
    state.bus.emit(event.clone()).await;

    for _ in 0..200 {
        if !out.received().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let received = out.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].payload["a"], 1);

    for _ in 0..200 {
        let runs = state.store.runs_for_event(&event.id).await.unwrap();
        if runs.first().is_some_and(|r| r.status != RunStatus::Running) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let runs = state.store.runs_for_event(&event.id).await.unwrap();
    assert_eq!(runs[0].status, RunStatus::Completed);

    tokio::time::timeout(Duration::from_secs(10), state.shutdown()).await.unwrap();
}

#[tokio::test]
async fn startup_fails_when_a_plugin_refuses_init() {
    use async_trait::async_trait;
    use sb_engine::{Plugin, PluginError};

    struct Refusenik;

    #[async_trait]
    impl Plugin for Refusenik {
        fn name(&self) -> &str {
            "refusenik"
        }

        async fn init(&self, _config: serde_json::Value) -> Result<(), PluginError> {
            Err(PluginError::Config("token required".into()))
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let config = config_with_route(&dir.path().join("events.db"));
    let registry = Arc::new(PluginRegistry::new());
    registry.register(Registration::new(Arc::new(Refusenik))).unwrap();

    let err = startup(config, registry, Arc::new(JsonRenderer)).await.unwrap_err();
    assert!(matches!(err, LifecycleError::Registry(_)));
}

#[tokio::test]
async fn shutdown_is_bounded_with_idle_components() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_with_route(&dir.path().join("events.db"));
    config.supervisor.tasks.push(sb_engine::TaskSpec {
        name: "digest".into(),
        schedule: "1h".into(),
        prompt: "p".into(),
        plugin: None,
    });

    let registry = Arc::new(PluginRegistry::new());
    let t1 = Arc::new(InsertTransform::new("t1", "a", serde_json::json!(1)));
    let out = Arc::new(RecordingSink::new("out"));
    registry.register(Registration::new(t1.clone()).with_transform(t1.clone())).unwrap();
    registry.register(Registration::new(out.clone()).with_sink(out.clone())).unwrap();

    let state = startup(config, registry, Arc::new(JsonRenderer)).await.unwrap();
    tokio::time::timeout(Duration::from_secs(10), state.shutdown()).await.unwrap();
}
