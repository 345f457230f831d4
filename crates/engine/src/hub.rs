// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket fan-out of coalesced dashboard state

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use sb_core::Event;
use sb_storage::{EventRow, PipelineRunRow, Store};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Events window streamed to the dashboard.
const RECENT_EVENTS: u32 = 50;

/// Per-client write budget; a slow client is dropped, not waited on.
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

const CLIENT_BUFFER: usize = 16;

/// Snapshot handed to the rendering collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardState {
    pub events: Vec<EventRow>,
    pub runs: Vec<PipelineRunRow>,
}

/// Renders dashboard state to the bytes written to every client. The HTML
/// fragment renderer lives with the web layer; tests plug in counters.
pub trait StateRenderer: Send + Sync {
    fn render(&self, state: &DashboardState) -> Vec<u8>;
}

struct Client {
    tx: mpsc::Sender<Message>,
    cancel: CancellationToken,
}

/// Broadcasts coalesced state changes to connected WebSocket clients.
///
/// The dirty signal is a capacity-1 channel: `notify` does a non-blocking
/// send, so any number of rapid notifications collapse into at most one
/// pending broadcast.
pub struct Hub {
    store: Store,
    renderer: Arc<dyn StateRenderer>,
    clients: Mutex<HashMap<u64, Client>>,
    next_client_id: AtomicU64,
    dirty_tx: mpsc::Sender<()>,
    dirty_rx: Mutex<Option<mpsc::Receiver<()>>>,
}

impl Hub {
    pub fn new(store: Store, renderer: Arc<dyn StateRenderer>) -> Self {
        let (dirty_tx, dirty_rx) = mpsc::channel(1);
        Self {
            store,
            renderer,
            clients: Mutex::new(HashMap::new()),
            next_client_id: AtomicU64::new(0),
            dirty_tx,
            dirty_rx: Mutex::new(Some(dirty_rx)),
        }
    }

    /// Mark the state dirty. Never blocks: a full slot means a broadcast is
    /// already pending and this call coalesces into it.
    pub fn notify(&self) {
        let _ = self.dirty_tx.try_send(());
    }

    /// Bus subscriber entry.
    pub fn handle_event(&self, _event: &Event) {
        self.notify();
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Broadcast loop: waits on the dirty signal or cancellation. Each wake
    /// renders the state once and writes it to every client.
    pub async fn run(&self, shutdown: CancellationToken) {
        let receiver = self.dirty_rx.lock().take();
        let Some(mut dirty_rx) = receiver else {
            warn!("hub run loop already started");
            return;
        };
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                signal = dirty_rx.recv() => {
                    if signal.is_none() {
                        break;
                    }
                    self.broadcast().await;
                }
            }
        }
        for (_, client) in self.clients.lock().drain() {
            client.cancel.cancel();
        }
    }

    /// Accept one WebSocket client and serve it until disconnect. Sends the
    /// current rendered state immediately; afterwards the client only
    /// receives broadcast frames.
    pub async fn serve<S>(&self, stream: S)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let ws = match tokio_tungstenite::accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                warn!(%e, "websocket upgrade failed");
                return;
            }
        };
        let (mut ws_tx, mut ws_rx) = ws.split();

        if let Some(buffer) = self.render_state().await {
            if ws_tx.send(Message::binary(buffer)).await.is_err() {
                return;
            }
        }

        let id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel::<Message>(CLIENT_BUFFER);
        self.clients.lock().insert(id, Client { tx, cancel: cancel.clone() });
        info!(client = id, "hub client connected");

        // Writer half: forwards broadcast frames until the client goes away.
        let writer_cancel = cancel.clone();
        let writer = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = writer_cancel.cancelled() => break,
                    frame = rx.recv() => {
                        let Some(frame) = frame else { break };
                        if ws_tx.send(frame).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        // The read loop exists solely to detect disconnect.
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                frame = ws_rx.next() => {
                    match frame {
                        Some(Ok(_)) => continue,
                        _ => break,
                    }
                }
            }
        }

        self.clients.lock().remove(&id);
        cancel.cancel();
        let _ = writer.await;
        info!(client = id, "hub client disconnected");
    }

    async fn broadcast(&self) {
        let Some(buffer) = self.render_state().await else { return };
        let frame = Message::binary(buffer);

        let targets: Vec<(u64, mpsc::Sender<Message>)> = self
            .clients
            .lock()
            .iter()
            .map(|(id, client)| (*id, client.tx.clone()))
            .collect();
        debug!(clients = targets.len(), "hub broadcasting");

        let mut stale = Vec::new();
        for (id, tx) in targets {
            match tokio::time::timeout(WRITE_TIMEOUT, tx.send(frame.clone())).await {
                Ok(Ok(())) => {}
                _ => stale.push(id),
            }
        }

        if !stale.is_empty() {
            let mut clients = self.clients.lock();
            for id in stale {
                if let Some(client) = clients.remove(&id) {
                    client.cancel.cancel();
                    info!(client = id, "hub client dropped after write failure");
                }
            }
        }
    }

    async fn render_state(&self) -> Option<Vec<u8>> {
        let events = match self.store.recent_events(RECENT_EVENTS).await {
            Ok(events) => events,
            Err(e) => {
                warn!(%e, "failed to query events for broadcast");
                return None;
            }
        };
        let runs = match self.store.runs_for_recent_events(RECENT_EVENTS).await {
            Ok(runs) => runs,
            Err(e) => {
                warn!(%e, "failed to query pipeline runs for broadcast");
                return None;
            }
        };
        Some(self.renderer.render(&DashboardState { events, runs }))
    }
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;
