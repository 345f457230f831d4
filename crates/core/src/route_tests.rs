// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn route(source: &str, event: &str, timeout: &str) -> Route {
    Route {
        name: "r1".into(),
        source: source.into(),
        event: event.into(),
        timeout: timeout.into(),
        pipeline: vec![],
        sink: SinkSpec { plugin: "out".into(), params: Payload::new() },
    }
}

fn event(source: &str, kind: &str) -> Event {
    Event::new(source, kind)
}

#[parameterized(
    source_and_type = { "src", "push", true },
    wildcard_type = { "src", "other", true },
    wrong_source = { "elsewhere", "push", false },
)]
fn matches_with_empty_event_filter(source: &str, kind: &str, expected: bool) {
    let r = route("src", "", "");
    assert_eq!(r.matches(&event(source, kind)), expected);
}

#[parameterized(
    exact = { "push", true },
    different = { "pull", false },
)]
fn matches_with_event_filter(kind: &str, expected: bool) {
    let r = route("src", "push", "");
    assert_eq!(r.matches(&event("src", kind)), expected);
}

#[test]
fn timeout_defaults_to_thirty_seconds() {
    assert_eq!(route("src", "", "").timeout(), Duration::from_secs(30));
}

#[test]
fn timeout_parses_configured_duration() {
    assert_eq!(route("src", "", "5m").timeout(), Duration::from_secs(300));
}

#[test]
fn timeout_falls_back_on_garbage() {
    assert_eq!(route("src", "", "soon").timeout(), DEFAULT_ROUTE_TIMEOUT);
}

#[test]
fn deserializes_minimal_route() {
    let r: Route = serde_json::from_str(
        r#"{"name": "r", "source": "src", "sink": {"plugin": "out"}}"#,
    )
    .unwrap();
    assert!(r.event.is_empty());
    assert!(r.pipeline.is_empty());
    assert!(r.sink.params.is_empty());
}
