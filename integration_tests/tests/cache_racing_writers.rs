// SPDX-License-Identifier: Apache-2.0 OR MIT
// Integration test: concurrent cache writers for the same number pair.
//
// Two requests for the same NumberPair may race on the cache write. The
// contract is deliberately last-write-wins with no merge and no locking;
// this pins that behavior down.

use anyhow::Result;
use futures::future::join_all;
use shaken_gateway::store::{CacheStore, InMemoryStore};
use std::{sync::Arc, time::Duration};

const CONCURRENCY: usize = 50;

#[tokio::test]
async fn concurrent_writers_never_error_and_one_value_survives() -> Result<()> {
    let store = Arc::new(InMemoryStore::default());
    let key = "orig:15559876543:dest:15551234567";
    let ttl = Duration::from_secs(60);

    let mut handles = Vec::new();
    for i in 0..CONCURRENCY {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .set_with_ttl(key, &format!("batch-{i}"), ttl)
                .await
        }));
    }

    for joined in join_all(handles).await {
        joined.expect("task panicked").expect("write failed");
    }

    // Exactly one of the racing values landed; which one is unspecified.
    let (value, _) = store.entry(key).await.expect("entry exists");
    assert!(
        value.starts_with("batch-"),
        "surviving value must be one of the writers', got {value:?}"
    );
    Ok(())
}

#[tokio::test]
async fn sequential_overwrite_is_last_write_wins() -> Result<()> {
    let store = InMemoryStore::default();
    let key = "orig:1234567:dest:7654321";

    store
        .set_with_ttl(key, "first", Duration::from_secs(60))
        .await?;
    store
        .set_with_ttl(key, "second", Duration::from_secs(30))
        .await?;

    let (value, remaining) = store.entry(key).await.expect("entry exists");
    assert_eq!(value, "second");
    assert!(
        remaining <= Duration::from_secs(30),
        "ttl follows the last write, got {remaining:?}"
    );
    Ok(())
}
