// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process pub/sub with a durable event log

use parking_lot::RwLock;
use sb_core::Event;
use sb_storage::Store;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, warn};

pub type Subscriber = Arc<dyn Fn(&Event) + Send + Sync>;

/// Central fan-out point. Every emitted event is persisted once (by id),
/// then delivered synchronously to each subscriber in subscription order.
pub struct EventBus {
    store: Store,
    subscribers: RwLock<Vec<Subscriber>>,
}

impl EventBus {
    pub fn new(store: Store) -> Self {
        Self { store, subscribers: RwLock::new(Vec::new()) }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Append a subscriber. Callbacks run on the emitter's task and must
    /// return promptly; long work belongs on a spawned task.
    pub fn subscribe(&self, subscriber: impl Fn(&Event) + Send + Sync + 'static) {
        self.subscribers.write().push(Arc::new(subscriber));
    }

    /// Persist the event (insert-or-ignore by id), then invoke every
    /// subscriber. Persistence failures are logged; fan-out proceeds
    /// regardless. The subscriber list is snapshotted before the first
    /// callback, so a subscriber may re-emit without deadlocking, and a
    /// panicking subscriber cannot starve the ones after it.
    pub async fn emit(&self, event: Event) {
        if let Err(e) = self.store.insert_event(&event).await {
            warn!(event_id = %event.id, %e, "failed to persist event");
        }

        let subscribers: Vec<Subscriber> = self.subscribers.read().clone();
        for (index, subscriber) in subscribers.iter().enumerate() {
            if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(|| subscriber(&event))) {
                error!(
                    event_id = %event.id,
                    subscriber = index,
                    panic = panic_message(panic.as_ref()),
                    "subscriber panicked during fan-out"
                );
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
