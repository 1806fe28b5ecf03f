//! Exercises the daily quota against a real Redis instance: the counter is
//! enforced once it reaches the tier limit, and the TTL is set only on the
//! first increment.

use testcontainers_modules::redis::Redis;
use testcontainers_modules::testcontainers::runners::AsyncRunner;
use uuid::Uuid;

use scheduler_core::coordination::RedisCoordinationStore;
use scheduler_core::domain::Tier;
use scheduler_core::ratelimit::{CoordinationRateLimiter, RateLimiter};

#[tokio::test]
async fn pro_tier_quota_blocks_after_ten_executions() {
    let container = Redis::default().start().await.unwrap();
    let port = container.get_host_port_ipv4(6379).await.unwrap();
    let redis_url = format!("redis://127.0.0.1:{port}");

    let store = RedisCoordinationStore::connect(&redis_url).await.unwrap();
    let limiter = CoordinationRateLimiter::new(store);
    let webhook_id = Uuid::new_v4();

    for _ in 0..10 {
        let check = limiter.check_rate_limit(webhook_id, Tier::Pro).await;
        assert!(check.allowed);
        limiter.increment(webhook_id).await.unwrap();
    }

    let check = limiter.check_rate_limit(webhook_id, Tier::Pro).await;
    assert!(!check.allowed);
    assert_eq!(check.limit, 10);
}

#[tokio::test]
async fn unreachable_store_fails_open() {
    // Port 1 is not a Redis instance; connect() itself succeeds (the
    // connection manager reconnects lazily), so failure surfaces on the
    // first command and the rate limiter must treat that as "allow".
    let store = RedisCoordinationStore::connect("redis://127.0.0.1:1")
        .await
        .unwrap();
    let limiter = CoordinationRateLimiter::new(store);

    let check = limiter.check_rate_limit(Uuid::new_v4(), Tier::Free).await;
    assert!(check.allowed);
    assert_eq!(check.limit, 10); // fail-open sentinel is the pro limit
}
