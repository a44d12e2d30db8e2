//! Fixed-window rate limiters
//!
//! Each key gets `max` hits per `window`; the window starts on the first hit.
//! `InMemoryRateLimiter` counts per process. `RedisRateLimiter` shares counts
//! between instances with `INCR` + `EXPIRE`, and counts locally while Redis
//! is unreachable.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use redis::AsyncCommands;
use tracing::warn;

use crate::ports::RateLimiter;

/// Expired windows are swept once the map grows past this many keys.
const SWEEP_THRESHOLD: usize = 10_000;

struct Window { started: Instant, hits: u32 }

#[derive(Clone)]
pub struct InMemoryRateLimiter {
    max: u32,
    window: Duration,
    entries: Arc<DashMap<String, Window>>,
}

impl InMemoryRateLimiter {
    pub fn new(max: u32, window: Duration) -> Self {
        Self { max, window, entries: Arc::new(DashMap::new()) }
    }

    fn allow_at(&self, key: &str, now: Instant) -> bool {
        if self.entries.len() >= SWEEP_THRESHOLD {
            self.entries.retain(|_, w| now.duration_since(w.started) < self.window);
        }

        let mut window = self.entries.entry(key.to_string()).or_insert(Window { started: now, hits: 0 });
        if now.duration_since(window.started) >= self.window {
            *window = Window { started: now, hits: 0 };
        }
        if window.hits >= self.max { return false; }
        window.hits += 1;
        true
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn allow(&self, key: &str) -> bool { self.allow_at(key, Instant::now()) }
}

pub struct RedisRateLimiter {
    client: redis::Client,
    namespace: String,
    max: u32,
    window: Duration,
    fallback: InMemoryRateLimiter,
}

impl RedisRateLimiter {
    pub fn new(client: redis::Client, namespace: impl Into<String>, max: u32, window: Duration) -> Self {
        Self { client, namespace: namespace.into(), max, window, fallback: InMemoryRateLimiter::new(max, window) }
    }

    async fn hits(&self, key: &str) -> redis::RedisResult<i64> {
        let mut conn = self.client.get_async_connection().await?;
        let redis_key = format!("{}:{}", self.namespace, key);
        let window_secs = self.window.as_secs().max(1) as usize;

        let count: i64 = conn.incr(&redis_key, 1).await?;
        if count == 1 {
            let _: () = conn.expire(&redis_key, window_secs).await?;
        } else if conn.ttl::<_, i64>(&redis_key).await.unwrap_or(-1) < 0 {
            // A crash between INCR and EXPIRE would otherwise leave the key forever.
            let _: () = conn.expire(&redis_key, window_secs).await?;
        }
        Ok(count)
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn allow(&self, key: &str) -> bool {
        match self.hits(key).await {
            Ok(count) => count <= i64::from(self.max),
            Err(err) => {
                warn!(error = %err, "Redis rate limit check failed, counting locally");
                self.fallback.allow(key).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_after_max_until_window_expires() {
        let limiter = InMemoryRateLimiter::new(2, Duration::from_secs(60));
        let t0 = Instant::now();
        assert!(limiter.allow_at("guest:a", t0));
        assert!(limiter.allow_at("guest:a", t0));
        assert!(!limiter.allow_at("guest:a", t0 + Duration::from_secs(1)));
        assert!(limiter.allow_at("guest:b", t0 + Duration::from_secs(1)));
        assert!(limiter.allow_at("guest:a", t0 + Duration::from_secs(61)));
    }

    #[test]
    fn test_clones_share_counts() {
        let limiter = InMemoryRateLimiter::new(2, Duration::from_secs(60));
        let other = limiter.clone();
        let t0 = Instant::now();
        assert!(limiter.allow_at("user:1", t0));
        assert!(other.allow_at("user:1", t0));
        assert!(!limiter.allow_at("user:1", t0));
        assert!(!other.allow_at("user:1", t0));
    }

    #[tokio::test]
    async fn test_redis_outage_falls_back_to_local_counts() {
        let client = redis::Client::open("redis://127.0.0.1:1/").unwrap();
        let limiter = RedisRateLimiter::new(client, "coupon_validate", 1, Duration::from_secs(60));
        assert!(limiter.allow("guest:a").await);
        assert!(!limiter.allow("guest:a").await);
    }
}
