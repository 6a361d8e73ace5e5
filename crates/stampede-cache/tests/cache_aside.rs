//! Cache engine behavior against the in-memory backends.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stampede_cache::{CacheConfig, CacheEngine};
use stampede_core::KeyValue;
use stampede_memory::{MemoryKeyValue, MemoryLockManager};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Shop {
    id: u64,
    name: String,
}

fn shop(id: u64) -> Shop {
    Shop {
        id,
        name: format!("shop-{id}"),
    }
}

fn engine_with(config: CacheConfig) -> (CacheEngine, Arc<MemoryKeyValue>) {
    let kv = Arc::new(MemoryKeyValue::new());
    let locks = Arc::new(MemoryLockManager::new());
    (CacheEngine::new(kv.clone(), locks, config), kv)
}

fn engine() -> (CacheEngine, Arc<MemoryKeyValue>) {
    engine_with(CacheConfig::default())
}

#[tokio::test]
async fn pass_through_caches_the_loaded_value() {
    let (engine, _) = engine();
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..3 {
        let calls = calls.clone();
        let loaded: Option<Shop> = engine
            .read_pass_through("cache:shop:", 1u64, Duration::from_secs(60), move |id| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok(Some(shop(id))) }
            })
            .await
            .unwrap();
        assert_eq!(loaded, Some(shop(1)));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1, "only the first read loads");
}

#[tokio::test]
async fn pass_through_null_marker_contains_penetration() {
    let (engine, _) = engine_with(CacheConfig {
        null_ttl_ms: 60,
        ..CacheConfig::default()
    });
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..5 {
        let calls = calls.clone();
        let loaded: Option<Shop> = engine
            .read_pass_through("cache:shop:", 404u64, Duration::from_secs(60), move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok(None) }
            })
            .await
            .unwrap();
        assert_eq!(loaded, None);
    }
    assert_eq!(
        calls.load(Ordering::SeqCst),
        1,
        "one loader call per null-TTL window, not one per read"
    );

    // After the null-marker expires, the loader is consulted again.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let calls_after = calls.clone();
    let _: Option<Shop> = engine
        .read_pass_through("cache:shop:", 404u64, Duration::from_secs(60), move |_| {
            calls_after.fetch_add(1, Ordering::SeqCst);
            async move { Ok(None) }
        })
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn mutex_read_bounds_concurrent_rebuilds_to_one_loader_call() {
    let (engine, _) = engine();
    let calls = Arc::new(AtomicUsize::new(0));

    let mut readers = Vec::new();
    for _ in 0..50 {
        let engine = engine.clone();
        let calls = calls.clone();
        readers.push(tokio::spawn(async move {
            engine
                .read_mutex("cache:shop:", 7u64, Duration::from_secs(60), move |id| {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        // Slow source of truth: plenty of time to contend.
                        tokio::time::sleep(Duration::from_millis(30)).await;
                        Ok(Some(shop(id)))
                    }
                })
                .await
        }));
    }

    for reader in readers {
        let loaded: Option<Shop> = reader.await.unwrap().unwrap();
        assert_eq!(loaded, Some(shop(7)));
    }
    assert_eq!(
        calls.load(Ordering::SeqCst),
        1,
        "the rebuild mutex admits exactly one loader call"
    );
}

#[tokio::test]
async fn mutex_read_honors_the_null_marker() {
    let (engine, _) = engine();
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..4 {
        let calls = calls.clone();
        let loaded: Option<Shop> = engine
            .read_mutex("cache:shop:", 404u64, Duration::from_secs(60), move |_| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(None)
                }
            })
            .await
            .unwrap();
        assert_eq!(loaded, None);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn logical_round_trip_serves_fresh_value_without_rebuild() {
    let (engine, _) = engine();
    let calls = Arc::new(AtomicUsize::new(0));

    engine
        .write_logical("cache:shop:3", &shop(3), Duration::from_secs(60))
        .await
        .unwrap();

    let calls_in = calls.clone();
    let loaded: Option<Shop> = engine
        .read_logical_expire("cache:shop:", 3u64, Duration::from_secs(60), move |id| {
            calls_in.fetch_add(1, Ordering::SeqCst);
            async move { Ok(Some(shop(id))) }
        })
        .await
        .unwrap();

    assert_eq!(loaded, Some(shop(3)));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0, "fresh entry, no rebuild");
}

#[tokio::test]
async fn logical_read_never_populates_a_cold_miss() {
    let (engine, _) = engine();

    let loaded: Option<Shop> = engine
        .read_logical_expire("cache:shop:", 9u64, Duration::from_secs(60), |id| async move {
            Ok(Some(shop(id)))
        })
        .await
        .unwrap();

    assert_eq!(loaded, None, "logical expiry requires pre-warming");
}

#[tokio::test]
async fn expired_logical_entry_serves_stale_and_rebuilds_once() {
    let (engine, _) = engine();
    let calls = Arc::new(AtomicUsize::new(0));

    let stale = shop(5);
    let fresh = Shop {
        id: 5,
        name: "renovated".into(),
    };

    // Pre-warm with an already-expired envelope.
    engine
        .write_logical("cache:shop:5", &stale, Duration::from_millis(1))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let mut readers = Vec::new();
    for _ in 0..100 {
        let engine = engine.clone();
        let calls = calls.clone();
        let fresh = fresh.clone();
        readers.push(tokio::spawn(async move {
            engine
                .read_logical_expire("cache:shop:", 5u64, Duration::from_secs(60), move |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        tokio::time::sleep(Duration::from_millis(150)).await;
                        Ok(Some(fresh))
                    }
                })
                .await
        }));
    }

    // Every concurrent reader gets the stale value immediately — nobody
    // waits on the slow loader.
    for reader in readers {
        let loaded: Option<Shop> = reader.await.unwrap().unwrap();
        assert_eq!(loaded, Some(stale.clone()));
    }

    // Exactly one background rebuild ran, and it landed the fresh value.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let loaded: Option<Shop> = engine
        .read_logical_expire("cache:shop:", 5u64, Duration::from_secs(60), |_| async move {
            panic!("fresh entry must not trigger the loader")
        })
        .await
        .unwrap();
    assert_eq!(loaded, Some(fresh));
}

#[tokio::test]
async fn corrupt_envelope_is_a_miss_not_a_value() {
    let (engine, kv) = engine();

    kv.set("cache:shop:8", "{not json", None).await.unwrap();

    let loaded: Option<Shop> = engine
        .read_logical_expire("cache:shop:", 8u64, Duration::from_secs(60), |_| async move {
            Ok(None)
        })
        .await
        .unwrap();
    assert_eq!(loaded, None, "corruption is never served");
}

#[tokio::test]
async fn corrupt_cached_value_is_rebuilt_not_served() {
    let (engine, kv) = engine();
    let calls = Arc::new(AtomicUsize::new(0));

    kv.set("cache:shop:21", "{not json", None).await.unwrap();

    let read = |engine: CacheEngine, calls: Arc<AtomicUsize>| async move {
        engine
            .read_pass_through("cache:shop:", 21u64, Duration::from_secs(60), move |id| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok(Some(shop(id))) }
            })
            .await
            .unwrap()
    };

    // The garbage entry is never surfaced; the loader repairs it.
    assert_eq!(read(engine.clone(), calls.clone()).await, Some(shop(21)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // The repaired entry now serves hits without the loader.
    assert_eq!(read(engine.clone(), calls.clone()).await, Some(shop(21)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn mutex_read_overwrites_a_corrupt_entry_under_the_lock() {
    let (engine, kv) = engine();
    let calls = Arc::new(AtomicUsize::new(0));

    kv.set("cache:shop:22", "[truncated", None).await.unwrap();

    let calls_in = calls.clone();
    let loaded: Option<Shop> = engine
        .read_mutex("cache:shop:", 22u64, Duration::from_secs(60), move |id| {
            let calls = calls_in.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Some(shop(id)))
            }
        })
        .await
        .unwrap();

    assert_eq!(loaded, Some(shop(22)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        kv.get("cache:shop:22").await.unwrap(),
        Some(serde_json::to_string(&shop(22)).unwrap()),
        "the corrupt entry was replaced"
    );
}

#[tokio::test]
async fn evict_forces_the_next_read_back_to_the_loader() {
    let (engine, _) = engine();
    let calls = Arc::new(AtomicUsize::new(0));

    let read = |engine: CacheEngine, calls: Arc<AtomicUsize>| async move {
        engine
            .read_pass_through("cache:shop:", 2u64, Duration::from_secs(60), move |id| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok(Some(shop(id))) }
            })
            .await
            .unwrap()
    };

    assert_eq!(read(engine.clone(), calls.clone()).await, Some(shop(2)));
    engine.evict("cache:shop:2").await.unwrap();
    assert_eq!(read(engine.clone(), calls.clone()).await, Some(shop(2)));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
