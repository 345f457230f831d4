// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduled event injection: interval tickers and daily clock times

use crate::bus::EventBus;
use sb_core::{next_daily_run, parse_schedule, Clock, Event, Payload, Schedule, SystemClock};
use parking_lot::Mutex;
use sb_storage::Store;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// One scheduled task from config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub name: String,
    /// Interval ("30s", "5m") or the literal `daily@HH:MM` (local time).
    pub schedule: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
}

/// Emits events on timers, exactly as if they came from a source. One
/// spawned task per schedule; all of them parented by the token passed to
/// `start`.
pub struct Supervisor<C: Clock = SystemClock> {
    tasks: Vec<TaskSpec>,
    bus: Arc<EventBus>,
    store: Store,
    clock: C,
    started: AtomicBool,
    cancel: Mutex<Option<CancellationToken>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Supervisor<SystemClock> {
    pub fn new(tasks: Vec<TaskSpec>, bus: Arc<EventBus>, store: Store) -> Self {
        Self::with_clock(tasks, bus, store, SystemClock)
    }
}

impl<C: Clock> Supervisor<C> {
    pub fn with_clock(tasks: Vec<TaskSpec>, bus: Arc<EventBus>, store: Store, clock: C) -> Self {
        Self {
            tasks,
            bus,
            store,
            clock,
            started: AtomicBool::new(false),
            cancel: Mutex::new(None),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawn one task per schedule. Idempotent: a second call is a no-op.
    pub fn start(&self, parent: &CancellationToken) {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("supervisor already started");
            return;
        }
        let cancel = parent.child_token();
        let mut handles = self.handles.lock();
        for task in &self.tasks {
            handles.push(tokio::spawn(run_task(
                task.clone(),
                cancel.clone(),
                Arc::clone(&self.bus),
                self.store.clone(),
                self.clock.clone(),
            )));
        }
        *self.cancel.lock() = Some(cancel);
    }

    /// Cancel all tasks and wait for them to finish. Safe to call before
    /// `start` (no-op) or more than once.
    pub async fn stop(&self) {
        if let Some(cancel) = self.cancel.lock().take() {
            cancel.cancel();
        }
        let handles: Vec<_> = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            let _ = handle.await;
        }
    }
}

async fn run_task<C: Clock>(
    task: TaskSpec,
    cancel: CancellationToken,
    bus: Arc<EventBus>,
    store: Store,
    clock: C,
) {
    let schedule = match parse_schedule(&task.schedule) {
        Ok(schedule) => schedule,
        Err(e) => {
            error!(task = %task.name, schedule = %task.schedule, %e, "unparseable schedule, task will never fire");
            return;
        }
    };

    match schedule {
        Schedule::Interval(period) => {
            if period.is_zero() {
                error!(task = %task.name, "zero interval, task will never fire");
                return;
            }
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately; consume it so the task
            // first fires one full period after start.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => fire(&task, &bus, &store, &clock).await,
                }
            }
        }
        Schedule::Daily { hour, minute } => loop {
            let next = next_daily_run(hour, minute);
            let wait = (next - chrono::Local::now()).to_std().unwrap_or(Duration::ZERO);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => fire(&task, &bus, &store, &clock).await,
            }
        },
    }
}

/// Emit the task's event and append a supervisor_log row. Log failures are
/// not fatal.
async fn fire<C: Clock>(task: &TaskSpec, bus: &EventBus, store: &Store, clock: &C) {
    let mut payload = Payload::new();
    payload.insert("message".into(), serde_json::Value::String(task.prompt.clone()));
    if let Some(plugin) = &task.plugin {
        payload.insert("plugin".into(), serde_json::Value::String(plugin.clone()));
    }
    let event = Event::with_payload("supervisor", &task.name, payload);
    let event_id = event.id.clone();
    debug!(task = %task.name, %event_id, "supervisor task fired");
    bus.emit(event).await;

    let result = format!("emitted {event_id}");
    if let Err(e) = store.append_supervisor_log(&task.name, &result, clock.epoch_ms()).await {
        warn!(task = %task.name, %e, "failed to append supervisor log");
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
