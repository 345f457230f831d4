// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn append_is_append_only() {
    let store = Store::open_in_memory().await.unwrap();
    store.append_supervisor_log("digest", "emitted e1", 1_000).await.unwrap();
    store.append_supervisor_log("digest", "emitted e2", 2_000).await.unwrap();

    let rows = store.recent_supervisor_log(10).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].result, "emitted e2");
    assert_eq!(rows[1].result, "emitted e1");
    assert!(rows[0].id > rows[1].id);
}

#[tokio::test]
async fn recent_limits_results() {
    let store = Store::open_in_memory().await.unwrap();
    for n in 0..5 {
        store
            .append_supervisor_log("digest", &format!("emitted e{n}"), n)
            .await
            .unwrap();
    }
    assert_eq!(store.recent_supervisor_log(2).await.unwrap().len(), 2);
}
