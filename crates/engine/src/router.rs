// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Route matching and pipeline execution with a per-step ledger

use crate::plugin::{SinkError, TransformError};
use crate::registry::PluginRegistry;
use parking_lot::RwLock;
use sb_core::{Clock, Event, Payload, Route, SystemClock};
use sb_storage::{RunStatus, StepResult, Store};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub type NotifyFn = Arc<dyn Fn() + Send + Sync>;

const TRANSFORM_NOT_FOUND: &str = "transform plugin not found";
const SINK_NOT_FOUND: &str = "sink plugin not found";
const TIMEOUT_EXCEEDED: &str = "route timeout exceeded";

/// Matches emitted events against the configured routes and runs each
/// matching pipeline on its own task. Routes are immutable after
/// construction.
pub struct Router<C: Clock = SystemClock> {
    routes: Vec<Route>,
    registry: Arc<PluginRegistry>,
    store: Store,
    clock: C,
    shutdown: CancellationToken,
    notify: RwLock<Option<NotifyFn>>,
}

impl Router<SystemClock> {
    pub fn new(
        routes: Vec<Route>,
        registry: Arc<PluginRegistry>,
        store: Store,
        shutdown: CancellationToken,
    ) -> Self {
        Self::with_clock(routes, registry, store, shutdown, SystemClock)
    }
}

impl<C: Clock> Router<C> {
    pub fn with_clock(
        routes: Vec<Route>,
        registry: Arc<PluginRegistry>,
        store: Store,
        shutdown: CancellationToken,
        clock: C,
    ) -> Self {
        Self {
            routes,
            registry,
            store,
            clock,
            shutdown,
            notify: RwLock::new(None),
        }
    }

    /// Register the post-finalize callback (the hub's live-update ping).
    pub fn set_notify(&self, notify: NotifyFn) {
        *self.notify.write() = Some(notify);
    }

    /// Bus subscriber entry. Matches routes in declaration order and spawns
    /// one task per match; returns without waiting on any of them. Each
    /// spawned task owns a deep copy of the event, so concurrent routes
    /// never observe each other's payload mutations.
    pub fn handle_event(self: &Arc<Self>, event: &Event) {
        for route in &self.routes {
            if !route.matches(event) {
                continue;
            }
            debug!(route = %route.name, event_id = %event.id, "route matched");
            let router = Arc::clone(self);
            let route = route.clone();
            let event = event.clone();
            tokio::spawn(async move { router.execute(&route, event).await });
        }
    }

    async fn execute(&self, route: &Route, event: Event) {
        // Child scope bounded by the route timeout; the timer cancels the
        // whole pipeline, transforms and sink included.
        let cancel = self.shutdown.child_token();
        let deadline = {
            let cancel = cancel.clone();
            let timeout = route.timeout();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                cancel.cancel();
            })
        };
        self.run_pipeline(route, event, &cancel).await;
        deadline.abort();
    }

    async fn run_pipeline(&self, route: &Route, event: Event, cancel: &CancellationToken) {
        let started = self.clock.now();
        let run_id = match self.store.insert_run(&event.id, &route.name, self.clock.epoch_ms()).await
        {
            Ok(id) => Some(id),
            Err(e) => {
                // Accounting is best-effort; the pipeline still runs.
                warn!(route = %route.name, event_id = %event.id, %e, "failed to record pipeline run");
                None
            }
        };

        let mut steps: Vec<StepResult> = Vec::new();
        let mut current = event;

        for step in &route.pipeline {
            let Some(transform) = self.registry.get_transform(&step.plugin) else {
                steps.push(StepResult::failed(&step.plugin, &step.action, 0, TRANSFORM_NOT_FOUND));
                self.deliver_error(route, &current, TRANSFORM_NOT_FOUND, cancel).await;
                self.finalize(run_id, RunStatus::Failed, Some(TRANSFORM_NOT_FOUND), &steps, started)
                    .await;
                return;
            };

            let step_started = self.clock.now();
            let outcome = match cancel
                .run_until_cancelled(transform.transform(cancel, current.clone(), &step.action, &step.params))
                .await
            {
                Some(outcome) => outcome,
                None => Err(TransformError::failed(TIMEOUT_EXCEEDED)),
            };
            let elapsed_ms = elapsed_ms(self.clock.now(), step_started);

            match outcome {
                Ok(next) => {
                    steps.push(StepResult::completed(&step.plugin, &step.action, elapsed_ms));
                    current = next;
                }
                Err(TransformError::AccessDenied(reason)) => {
                    // Denials fail the run but are never surfaced through
                    // the sink.
                    warn!(route = %route.name, plugin = %step.plugin, %reason, "transform denied event");
                    steps.push(StepResult::failed(&step.plugin, &step.action, elapsed_ms, &reason));
                    self.finalize(run_id, RunStatus::Failed, Some(reason.as_str()), &steps, started)
                        .await;
                    return;
                }
                Err(err) => {
                    let message = err.to_string();
                    warn!(route = %route.name, plugin = %step.plugin, error = %message, "transform step failed");
                    steps.push(StepResult::failed(&step.plugin, &step.action, elapsed_ms, &message));
                    self.deliver_error(route, &current, &message, cancel).await;
                    self.finalize(run_id, RunStatus::Failed, Some(message.as_str()), &steps, started)
                        .await;
                    return;
                }
            }
        }

        let Some(sink) = self.registry.get_sink(&route.sink.plugin) else {
            // Nothing to deliver an error summary to either.
            steps.push(StepResult::failed(&route.sink.plugin, "sink", 0, SINK_NOT_FOUND));
            self.finalize(run_id, RunStatus::Failed, Some(SINK_NOT_FOUND), &steps, started).await;
            return;
        };

        // Route-configured sink params override payload keys.
        merge_params(&mut current.payload, &route.sink.params);

        let sink_started = self.clock.now();
        let outcome = match cancel.run_until_cancelled(sink.handle_event(cancel, current.clone())).await
        {
            Some(outcome) => outcome,
            None => Err(SinkError::new(TIMEOUT_EXCEEDED)),
        };
        let elapsed_ms = elapsed_ms(self.clock.now(), sink_started);

        if let Err(err) = outcome {
            let message = err.to_string();
            warn!(route = %route.name, sink = %route.sink.plugin, error = %message, "sink delivery failed");
            steps.push(StepResult::failed(&route.sink.plugin, "sink", elapsed_ms, &message));
            self.finalize(run_id, RunStatus::Failed, Some(message.as_str()), &steps, started).await;
            return;
        }
        steps.push(StepResult::completed(&route.sink.plugin, "sink", elapsed_ms));

        if let Err(e) = self.store.update_event_route(&current.id, &route.name).await {
            warn!(route = %route.name, event_id = %current.id, %e, "failed to update event route");
        }

        self.finalize(run_id, RunStatus::Completed, None, &steps, started).await;
    }

    /// Best-effort error summary through the route's sink, used for
    /// transform failures only. Failures here are logged and swallowed.
    async fn deliver_error(
        &self,
        route: &Route,
        event: &Event,
        message: &str,
        cancel: &CancellationToken,
    ) {
        let Some(sink) = self.registry.get_sink(&route.sink.plugin) else {
            return;
        };
        let mut delivery = event.clone();
        delivery
            .payload
            .insert("summary".into(), serde_json::Value::String(format!("**Error:** {message}")));
        merge_params(&mut delivery.payload, &route.sink.params);

        match cancel.run_until_cancelled(sink.handle_event(cancel, delivery)).await {
            Some(Ok(())) => {}
            Some(Err(e)) => warn!(route = %route.name, %e, "error summary delivery failed"),
            None => warn!(route = %route.name, "error summary delivery cancelled"),
        }
    }

    async fn finalize(
        &self,
        run_id: Option<i64>,
        status: RunStatus,
        error: Option<&str>,
        steps: &[StepResult],
        started: Instant,
    ) {
        if let Some(id) = run_id {
            let duration_ms = elapsed_ms(self.clock.now(), started);
            if let Err(e) = self
                .store
                .finish_run(id, status, self.clock.epoch_ms(), duration_ms, error, steps)
                .await
            {
                warn!(run_id = id, %e, "failed to finalize pipeline run");
            }
        }
        let notify = self.notify.read().clone();
        if let Some(notify) = notify {
            notify();
        }
    }
}

fn merge_params(payload: &mut Payload, params: &Payload) {
    for (key, value) in params {
        payload.insert(key.clone(), value.clone());
    }
}

fn elapsed_ms(now: Instant, earlier: Instant) -> u64 {
    now.saturating_duration_since(earlier).as_millis() as u64
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
