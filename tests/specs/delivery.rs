// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure paths: error summaries, missing sinks, access denials

use crate::prelude::*;

#[tokio::test]
async fn transform_failure_delivers_error_summary_once() {
    let registry = Arc::new(PluginRegistry::new());
    let bad = Arc::new(FailingTransform::new("bad", "boom"));
    let out = Arc::new(RecordingSink::new("out"));
    registry.register(Registration::new(bad.clone()).with_transform(bad.clone())).unwrap();
    registry.register(Registration::new(out.clone()).with_sink(out.clone())).unwrap();

    let harness = Harness::new(
        vec![route("alerts", "src", vec![step("bad", "explode")], "out")],
        registry,
    )
    .await;

    let mut event = Event::new("src", "any");
    event.id = "e1".into();
    harness.bus.emit(event).await;

    let run = wait_for_terminal_run(&harness.store, "e1").await;
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.error.as_deref(), Some("boom"));

    let received = out.received();
    assert_eq!(received.len(), 1);
    let summary = received[0].payload["summary"].as_str().unwrap();
    assert!(summary.starts_with("**Error:**"));
    assert_eq!(summary, "**Error:** boom");
}

#[tokio::test]
async fn unresolvable_sink_fails_without_any_delivery() {
    let registry = Arc::new(PluginRegistry::new());
    let witness = Arc::new(RecordingSink::new("witness"));
    registry.register(Registration::new(witness.clone()).with_sink(witness.clone())).unwrap();

    let harness =
        Harness::new(vec![route("alerts", "src", vec![], "unregistered")], registry).await;

    let mut event = Event::new("src", "any");
    event.id = "e1".into();
    harness.bus.emit(event).await;

    let run = wait_for_terminal_run(&harness.store, "e1").await;
    assert_eq!(run.status, RunStatus::Failed);

    let steps = &run.steps.as_ref().unwrap().0;
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].action, "sink");
    assert_eq!(steps[0].status, StepStatus::Failed);
    assert_eq!(steps[0].error.as_deref(), Some("sink plugin not found"));

    // No sink anywhere heard about this event.
    assert!(witness.received().is_empty());
}

#[tokio::test]
async fn access_denied_reaches_no_sink() {
    let registry = Arc::new(PluginRegistry::new());
    let gate = Arc::new(DenyingTransform::new("gate", "not allowed here"));
    let out = Arc::new(RecordingSink::new("out"));
    registry.register(Registration::new(gate.clone()).with_transform(gate.clone())).unwrap();
    registry.register(Registration::new(out.clone()).with_sink(out.clone())).unwrap();

    let harness = Harness::new(
        vec![route("gated", "src", vec![step("gate", "check")], "out")],
        registry,
    )
    .await;

    let mut event = Event::new("src", "any");
    event.id = "e1".into();
    harness.bus.emit(event).await;

    let run = wait_for_terminal_run(&harness.store, "e1").await;
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.error.as_deref(), Some("not allowed here"));
    assert!(out.received().is_empty());
}
