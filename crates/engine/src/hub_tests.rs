// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::CountingRenderer;
use sb_core::Event as CoreEvent;
use tokio::task::JoinHandle;

struct Fixture {
    store: Store,
    renderer: Arc<CountingRenderer>,
    hub: Arc<Hub>,
}

async fn fixture() -> Fixture {
    let store = Store::open_in_memory().await.unwrap();
    let renderer = Arc::new(CountingRenderer::new());
    let hub = Arc::new(Hub::new(store.clone(), renderer.clone()));
    Fixture { store, renderer, hub }
}

fn spawn_run(hub: &Arc<Hub>, shutdown: &CancellationToken) -> JoinHandle<()> {
    let hub = Arc::clone(hub);
    let shutdown = shutdown.clone();
    tokio::spawn(async move { hub.run(shutdown).await })
}

async fn wait_for_renders(renderer: &CountingRenderer, at_least: usize) {
    for _ in 0..200 {
        if renderer.renders() >= at_least {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("expected at least {at_least} renders, saw {}", renderer.renders());
}

#[tokio::test]
async fn rapid_notifies_coalesce_into_one_broadcast() {
    let f = fixture().await;
    for _ in 0..100 {
        f.hub.notify();
    }

    let shutdown = CancellationToken::new();
    let run = spawn_run(&f.hub, &shutdown);
    wait_for_renders(&f.renderer, 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(f.renderer.renders(), 1);

    shutdown.cancel();
    run.await.unwrap();
}

#[tokio::test]
async fn handle_event_never_blocks_under_bursts() {
    let f = fixture().await;
    // Fill the slot first; every subsequent call must still return.
    f.hub.notify();

    let mut joins = Vec::new();
    for _ in 0..100 {
        let hub = Arc::clone(&f.hub);
        joins.push(tokio::spawn(async move {
            hub.handle_event(&CoreEvent::new("src", "push"));
        }));
    }
    for join in joins {
        tokio::time::timeout(Duration::from_secs(1), join).await.unwrap().unwrap();
    }

    // At most one token was queued by all of those calls.
    let shutdown = CancellationToken::new();
    let run = spawn_run(&f.hub, &shutdown);
    wait_for_renders(&f.renderer, 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(f.renderer.renders(), 1);

    shutdown.cancel();
    run.await.unwrap();
}

#[tokio::test]
async fn signal_keeps_working_after_each_broadcast() {
    let f = fixture().await;
    let shutdown = CancellationToken::new();
    let run = spawn_run(&f.hub, &shutdown);

    f.hub.notify();
    wait_for_renders(&f.renderer, 1).await;
    f.hub.notify();
    wait_for_renders(&f.renderer, 2).await;

    shutdown.cancel();
    run.await.unwrap();
}

#[tokio::test]
async fn run_exits_on_cancellation() {
    let f = fixture().await;
    let shutdown = CancellationToken::new();
    let run = spawn_run(&f.hub, &shutdown);
    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(1), run).await.unwrap().unwrap();
}

#[tokio::test]
async fn serve_sends_initial_state_then_broadcast_frames() {
    let f = fixture().await;
    let shutdown = CancellationToken::new();
    let run = spawn_run(&f.hub, &shutdown);

    let (server_side, client_side) = tokio::io::duplex(4096);
    let serve = {
        let hub = Arc::clone(&f.hub);
        tokio::spawn(async move { hub.serve(server_side).await })
    };

    let (mut client, _) = tokio_tungstenite::client_async("ws://dashboard/ws", client_side)
        .await
        .unwrap();

    // Connect delivers the current rendered state immediately.
    let first = client.next().await.unwrap().unwrap();
    assert_eq!(first.into_data().as_ref(), b"events=0");

    for _ in 0..200 {
        if f.hub.client_count() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(f.hub.client_count(), 1);

    // A state change pings the hub; the client sees the new render.
    f.store.insert_event(&CoreEvent::new("src", "push")).await.unwrap();
    f.hub.notify();
    let second = client.next().await.unwrap().unwrap();
    assert_eq!(second.into_data().as_ref(), b"events=1");

    // Disconnect prunes the client set.
    drop(client);
    tokio::time::timeout(Duration::from_secs(1), serve).await.unwrap().unwrap();
    assert_eq!(f.hub.client_count(), 0);

    shutdown.cancel();
    run.await.unwrap();
}

#[tokio::test]
async fn second_run_call_returns_immediately() {
    let f = fixture().await;
    let shutdown = CancellationToken::new();
    let run = spawn_run(&f.hub, &shutdown);
    tokio::time::sleep(Duration::from_millis(10)).await;

    // The receiver is already taken; this must not hang.
    tokio::time::timeout(Duration::from_secs(1), f.hub.run(shutdown.child_token()))
        .await
        .unwrap();

    shutdown.cancel();
    run.await.unwrap();
}
