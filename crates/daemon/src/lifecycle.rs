// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup wiring, dashboard listener, shutdown

use crate::config::Config;
use crate::webhooks::HookTable;
use sb_engine::{EventBus, Hub, PluginRegistry, Router, StateRenderer, Supervisor};
use sb_storage::{Store, StoreError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Bounded wait for owned tasks during shutdown.
const SHUTDOWN_WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("plugin lifecycle error: {0}")]
    Registry(#[from] sb_engine::RegistryError),
}

/// Everything the running daemon owns. Long-lived tasks all hang off the
/// root token; `shutdown` tears them down within a bounded wait.
pub struct DaemonState {
    pub config: Config,
    pub store: Store,
    pub bus: Arc<EventBus>,
    pub registry: Arc<PluginRegistry>,
    pub router: Arc<Router>,
    pub supervisor: Arc<Supervisor>,
    pub hub: Arc<Hub>,
    pub hooks: HookTable,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for DaemonState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaemonState").finish_non_exhaustive()
    }
}

/// Wire the core together and bring every component up.
///
/// Order: store, bus, router, hub; then bus subscriptions; then plugin
/// init (store injection first) and start; then supervisor and the hub's
/// broadcast loop.
pub async fn startup(
    config: Config,
    registry: Arc<PluginRegistry>,
    renderer: Arc<dyn StateRenderer>,
) -> Result<DaemonState, LifecycleError> {
    let store = Store::open(&config.database).await?;
    let shutdown = CancellationToken::new();
    let bus = Arc::new(EventBus::new(store.clone()));
    let router = Arc::new(Router::new(
        config.routes.clone(),
        Arc::clone(&registry),
        store.clone(),
        shutdown.child_token(),
    ));
    let hub = Arc::new(Hub::new(store.clone(), renderer));

    // Finalized runs ping the hub; both router and hub listen on the bus.
    {
        let hub = Arc::clone(&hub);
        router.set_notify(Arc::new(move || hub.notify()));
    }
    {
        let router = Arc::clone(&router);
        bus.subscribe(move |event| router.handle_event(event));
    }
    {
        let hub = Arc::clone(&hub);
        bus.subscribe(move |event| hub.handle_event(event));
    }

    registry.init_all(&store, &config.plugin_configs()).await?;
    registry.apply_commands(&config.routes);
    let mut hooks = HookTable::new();
    registry.register_webhooks(&mut hooks);
    registry.start_all(&shutdown, &bus).await?;

    let supervisor = Arc::new(Supervisor::new(
        config.supervisor.tasks.clone(),
        Arc::clone(&bus),
        store.clone(),
    ));
    supervisor.start(&shutdown);

    let mut tasks = Vec::new();
    {
        let hub = Arc::clone(&hub);
        let token = shutdown.child_token();
        tasks.push(tokio::spawn(async move { hub.run(token).await }));
    }

    info!(
        routes = config.routes.len(),
        tasks = config.supervisor.tasks.len(),
        database = %config.database,
        "switchboard started"
    );

    Ok(DaemonState {
        config,
        store,
        bus,
        registry,
        router,
        supervisor,
        hub,
        hooks,
        shutdown,
        tasks,
    })
}

impl DaemonState {
    /// Token for extra tasks (the dashboard listener) that should die with
    /// the daemon.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    /// Graceful teardown: supervisor first, then the root token, plugins in
    /// reverse order, owned tasks under a bounded wait, store last.
    pub async fn shutdown(mut self) {
        info!("shutting down");
        self.supervisor.stop().await;
        self.shutdown.cancel();
        self.registry.stop_all().await;
        for task in self.tasks.drain(..) {
            if tokio::time::timeout(SHUTDOWN_WAIT, task).await.is_err() {
                warn!("task did not stop within the shutdown window");
            }
        }
        self.store.close().await;
        info!("shutdown complete");
    }
}

/// Accept raw WebSocket upgrades for the dashboard until shutdown. Stands
/// in for the web server's `GET /ws` route.
pub async fn serve_dashboard(address: String, hub: Arc<Hub>, shutdown: CancellationToken) {
    let listener = match TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%address, %e, "failed to bind dashboard listener");
            return;
        }
    };
    info!(%address, "dashboard listening");
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "dashboard client connecting");
                    let hub = Arc::clone(&hub);
                    tokio::spawn(async move { hub.serve(stream).await });
                }
                Err(e) => warn!(%e, "dashboard accept failed"),
            }
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
