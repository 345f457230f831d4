// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Payload isolation between concurrently matching routes

use crate::prelude::*;
use serde_json::json;

#[tokio::test]
async fn two_routes_one_event_isolated_payloads() {
    let registry = Arc::new(PluginRegistry::new());
    let mark_one = Arc::new(InsertTransform::new("mark-one", "one", json!(true)));
    let mark_two = Arc::new(InsertTransform::new("mark-two", "two", json!(true)));
    let out1 = Arc::new(RecordingSink::new("out1"));
    let out2 = Arc::new(RecordingSink::new("out2"));
    registry
        .register(Registration::new(mark_one.clone()).with_transform(mark_one.clone()))
        .unwrap();
    registry
        .register(Registration::new(mark_two.clone()).with_transform(mark_two.clone()))
        .unwrap();
    registry.register(Registration::new(out1.clone()).with_sink(out1.clone())).unwrap();
    registry.register(Registration::new(out2.clone()).with_sink(out2.clone())).unwrap();

    let harness = Harness::new(
        vec![
            route("r1", "src", vec![step("mark-one", "add")], "out1"),
            route("r2", "src", vec![step("mark-two", "add")], "out2"),
        ],
        registry,
    )
    .await;

    let mut event = Event::new("src", "any");
    event.id = "e1".into();
    harness.bus.emit(event).await;

    for _ in 0..400 {
        if !out1.received().is_empty() && !out2.received().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    // Both runs completed, two rows for the same event.
    let runs = harness.store.runs_for_event("e1").await.unwrap();
    assert_eq!(runs.len(), 2);
    assert!(runs.iter().all(|r| r.status == RunStatus::Completed));

    // Each sink saw only its own route's mutation.
    let first = out1.received();
    let second = out2.received();
    assert_eq!(first[0].payload["one"], true);
    assert!(first[0].payload.get("two").is_none());
    assert_eq!(second[0].payload["two"], true);
    assert!(second[0].payload.get("one").is_none());
}
