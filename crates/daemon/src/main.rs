// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! sbd: the Switchboard daemon

use sb_core::LogRing;
use sb_daemon::{lifecycle, logging, Config, JsonRenderer};
use sb_engine::PluginRegistry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

const LOG_RING_CAPACITY: usize = 512;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("sbd: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = parse_args(std::env::args().skip(1))?;

    let ring = Arc::new(LogRing::new(LOG_RING_CAPACITY));
    let _log_guard = logging::init(Path::new("sbd.log"), Arc::clone(&ring))?;

    let config = Config::load(&config_path)?;

    // Plugin implementations are linked in by the embedding build; the bare
    // daemon starts with an empty registry.
    let registry = Arc::new(PluginRegistry::new());

    let address = config.http.address.clone();
    let state = lifecycle::startup(config, registry, Arc::new(JsonRenderer)).await?;
    let dashboard = tokio::spawn(lifecycle::serve_dashboard(
        address,
        Arc::clone(&state.hub),
        state.shutdown_token(),
    ));

    wait_for_signal().await;
    info!("signal received");

    state.shutdown().await;
    dashboard.abort();
    Ok(())
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<PathBuf, String> {
    let mut config = PathBuf::from("switchboard.toml");
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                config = args.next().map(PathBuf::from).ok_or("--config requires a path")?;
            }
            "--help" | "-h" => {
                println!("usage: sbd [--config <path>]");
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(config)
}

async fn wait_for_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(_) => {
                let _ = ctrl_c.await;
                return;
            }
        };
        tokio::select! {
            _ = ctrl_c => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
