// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Happy-path routing: one match, a two-step pipeline, a sink delivery

use crate::prelude::*;
use serde_json::json;

#[tokio::test]
async fn single_match_two_step_pipeline() {
    let registry = Arc::new(PluginRegistry::new());
    let t1 = Arc::new(InsertTransform::new("t1", "a", json!(1)));
    let t2 = Arc::new(InsertTransform::new("t2", "b", json!(2)));
    let out = Arc::new(RecordingSink::new("out"));
    registry.register(Registration::new(t1.clone()).with_transform(t1.clone())).unwrap();
    registry.register(Registration::new(t2.clone()).with_transform(t2.clone())).unwrap();
    registry.register(Registration::new(out.clone()).with_sink(out.clone())).unwrap();

    let harness = Harness::new(
        vec![route("annotate", "src", vec![step("t1", "add"), step("t2", "add")], "out")],
        registry,
    )
    .await;

    let mut event = Event::new("src", "any");
    event.id = "e1".into();
    harness.bus.emit(event).await;

    let run = wait_for_terminal_run(&harness.store, "e1").await;
    assert_eq!(run.status, RunStatus::Completed);

    let steps = &run.steps.as_ref().unwrap().0;
    assert_eq!(steps.len(), 3);
    assert_eq!(
        steps.iter().map(|s| (s.plugin.as_str(), s.status)).collect::<Vec<_>>(),
        vec![
            ("t1", StepStatus::Completed),
            ("t2", StepStatus::Completed),
            ("out", StepStatus::Completed),
        ]
    );
    assert_eq!(steps[2].action, "sink");

    let received = out.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].payload["a"], 1);
    assert_eq!(received[0].payload["b"], 2);

    let row = harness.store.event_by_id("e1").await.unwrap().unwrap();
    assert_eq!(row.route.as_deref(), Some("annotate"));
}

#[tokio::test]
async fn emit_is_idempotent_by_event_id() {
    let registry = Arc::new(PluginRegistry::new());
    let out = Arc::new(RecordingSink::new("out"));
    registry.register(Registration::new(out.clone()).with_sink(out.clone())).unwrap();

    let harness = Harness::new(vec![], registry).await;
    let mut event = Event::new("src", "any");
    event.id = "dup".into();
    harness.bus.emit(event.clone()).await;
    harness.bus.emit(event).await;

    assert_eq!(harness.store.recent_events(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn run_rows_satisfy_matching_soundness() {
    let registry = Arc::new(PluginRegistry::new());
    let out = Arc::new(RecordingSink::new("out"));
    registry.register(Registration::new(out.clone()).with_sink(out.clone())).unwrap();

    let mut push_only = route("push-only", "src", vec![], "out");
    push_only.event = "push".into();

    let harness = Harness::new(vec![push_only], registry).await;
    let mut push = Event::new("src", "push");
    push.id = "push-1".into();
    let mut pull = Event::new("src", "pull");
    pull.id = "pull-1".into();
    harness.bus.emit(push).await;
    harness.bus.emit(pull).await;

    let run = wait_for_terminal_run(&harness.store, "push-1").await;
    assert_eq!(run.route, "push-only");

    // The non-matching event produced no run at all.
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(harness.store.runs_for_event("pull-1").await.unwrap().is_empty());
}
