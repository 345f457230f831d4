// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coalesced broadcast under bursts

use crate::prelude::*;
use sb_engine::Hub;

#[tokio::test]
async fn burst_of_notifications_coalesces_to_one_pending_broadcast() {
    let store = Store::open_in_memory().await.unwrap();
    let renderer = Arc::new(CountingRenderer::new());
    let hub = Arc::new(Hub::new(store, renderer.clone()));

    // Fill the signal slot first.
    hub.notify();

    // 100 rapid notifications from separate tasks, none of which may block.
    let mut joins = Vec::new();
    for _ in 0..100 {
        let hub = Arc::clone(&hub);
        joins.push(tokio::spawn(async move {
            hub.handle_event(&Event::new("src", "push"));
        }));
    }
    for join in joins {
        tokio::time::timeout(Duration::from_secs(1), join).await.unwrap().unwrap();
    }

    // Exactly one token is queued: the run loop broadcasts once.
    let shutdown = CancellationToken::new();
    let run = {
        let hub = Arc::clone(&hub);
        let shutdown = shutdown.clone();
        tokio::spawn(async move { hub.run(shutdown).await })
    };

    for _ in 0..200 {
        if renderer.renders() >= 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(renderer.renders(), 1);

    shutdown.cancel();
    run.await.unwrap();
}
