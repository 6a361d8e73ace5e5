//! Integration tests for the Redis-backed traits.
//!
//! Tests use testcontainers to spin up a real Redis instance, shared
//! across the test binary. They are ignored by default so the suite
//! passes on machines without a container runtime; run them with
//! `cargo test -p stampede-redis -- --ignored`.

use std::time::Duration;

use stampede_core::{
    Admission, InventoryGate, IntentQueue, KeyValue, LockManager, OrderIntent,
};
use stampede_redis::{
    RedisConfig, RedisIntentQueue, RedisInventoryGate, RedisKeyValue, RedisLockManager,
    StreamConfig,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::redis::Redis;
use tokio::sync::OnceCell;

// Shared Redis container for all tests
static SHARED_REDIS: OnceCell<(ContainerAsync<Redis>, String)> = OnceCell::const_new();

async fn get_redis_url() -> String {
    let (_, url) = SHARED_REDIS
        .get_or_init(|| async {
            let container = Redis::default()
                .start()
                .await
                .expect("start redis container");

            let host_port = container.get_host_port_ipv4(6379).await.expect("get port");
            let url = format!("redis://127.0.0.1:{}", host_port);

            (container, url)
        })
        .await;

    url.clone()
}

async fn pool() -> deadpool_redis::Pool {
    let config = RedisConfig {
        url: get_redis_url().await,
        ..RedisConfig::default()
    };
    config.create_pool().expect("create pool")
}

/// Per-test stream names so tests sharing the container do not see
/// each other's messages.
fn streams(tag: &str) -> StreamConfig {
    StreamConfig {
        stream: format!("stream.orders.{tag}"),
        group: "g1".to_string(),
        consumer: "c1".to_string(),
    }
}

#[tokio::test]
#[ignore = "requires a container runtime"]
async fn kv_roundtrip_and_ttl() {
    let kv = RedisKeyValue::new(pool().await);

    kv.set("kv:shop:1", "bistro", Some(Duration::from_millis(200)))
        .await
        .unwrap();
    assert_eq!(kv.get("kv:shop:1").await.unwrap().as_deref(), Some("bistro"));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(kv.get("kv:shop:1").await.unwrap(), None);

    // Null marker survives as an empty string, distinct from absence.
    kv.set("kv:shop:2", "", None).await.unwrap();
    assert_eq!(kv.get("kv:shop:2").await.unwrap().as_deref(), Some(""));
    kv.del("kv:shop:2").await.unwrap();
    assert_eq!(kv.get("kv:shop:2").await.unwrap(), None);
}

#[tokio::test]
#[ignore = "requires a container runtime"]
async fn kv_set_nx_and_incr() {
    let kv = RedisKeyValue::new(pool().await);

    assert!(kv.set_nx("kv:nx", "a", Duration::from_secs(5)).await.unwrap());
    assert!(!kv.set_nx("kv:nx", "b", Duration::from_secs(5)).await.unwrap());
    assert_eq!(kv.get("kv:nx").await.unwrap().as_deref(), Some("a"));

    assert_eq!(kv.incr("kv:counter").await.unwrap(), 1);
    assert_eq!(kv.incr("kv:counter").await.unwrap(), 2);
}

#[tokio::test]
#[ignore = "requires a container runtime"]
async fn lock_release_verifies_the_token() {
    let locks = RedisLockManager::new(pool().await);
    let ttl = Duration::from_secs(5);

    let token = locks
        .try_lock("lock:order:42", ttl)
        .await
        .unwrap()
        .expect("lock");
    assert!(locks.try_lock("lock:order:42", ttl).await.unwrap().is_none());

    // A foreign token must not release the lock.
    let stale = stampede_core::LockToken::new("not-the-owner");
    assert!(!locks.unlock("lock:order:42", &stale).await.unwrap());
    assert!(locks.try_lock("lock:order:42", ttl).await.unwrap().is_none());

    assert!(locks.unlock("lock:order:42", &token).await.unwrap());
    assert!(locks.try_lock("lock:order:42", ttl).await.unwrap().is_some());
}

#[tokio::test]
#[ignore = "requires a container runtime"]
async fn admission_decrements_stock_and_appends_to_the_stream() {
    let pool = pool().await;
    let streams = streams("admit");
    let gate = RedisInventoryGate::new(pool.clone(), &streams);
    let queue = RedisIntentQueue::new(pool, &streams);
    queue.ensure_group().await.unwrap();

    gate.seed_stock(7, 1).await.unwrap();

    let first = gate.admit(7, 1, 100).await.unwrap();
    assert!(matches!(first, Admission::Admitted { order_id: 100 }));

    // Same user again: duplicate, not out-of-stock.
    let dup = gate.admit(7, 1, 101).await.unwrap();
    assert!(matches!(dup, Admission::DuplicatePurchase));

    // Different user: stock is gone.
    let dry = gate.admit(7, 2, 102).await.unwrap();
    assert!(matches!(dry, Admission::NoStock));

    // Only the admitted intent reached the stream.
    let message = queue
        .read_new(Duration::from_millis(200))
        .await
        .unwrap()
        .expect("admitted intent enqueued");
    assert_eq!(message.intent.order_id, 100);
    assert_eq!(message.intent.user_id, 1);
    assert_eq!(message.intent.sku_id, 7);
    queue.ack(&message.id).await.unwrap();

    assert!(queue.read_new(Duration::from_millis(100)).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a container runtime"]
async fn pending_backlog_survives_until_acked() {
    let pool = pool().await;
    let streams = streams("pending");
    let queue = RedisIntentQueue::new(pool, &streams);

    // Idempotent group creation.
    queue.ensure_group().await.unwrap();
    queue.ensure_group().await.unwrap();

    let intent = OrderIntent {
        order_id: 200,
        user_id: 9,
        sku_id: 3,
    };
    queue.enqueue(&intent).await.unwrap();

    let delivered = queue
        .read_new(Duration::from_millis(200))
        .await
        .unwrap()
        .expect("delivered");
    assert_eq!(delivered.intent.order_id, 200);

    // Unacked, so the pending backlog still holds it.
    let pending = queue.read_pending().await.unwrap().expect("pending");
    assert_eq!(pending.id, delivered.id);
    assert_eq!(pending.intent.user_id, 9);

    queue.ack(&pending.id).await.unwrap();
    assert!(queue.read_pending().await.unwrap().is_none());
}
