//! Per-Host Pacer (C3, §4.3).
//!
//! One `HostBucket` per distinct host, created lazily and retained for
//! the scan's duration. The bucket map is behind a `tokio::sync::RwLock`
//! (many concurrent readers doing a lookup, rare writers adding a new
//! host); each bucket's own mutex both serialises its `next_available`
//! timestamp and enforces "no more than one in-flight request per host"
//! (§5, §4.3): `acquire` holds the bucket's lock for as long as the
//! caller holds the returned `HostPermit`, so a second `acquire` for the
//! same host cannot proceed until the first caller's `release` drops it
//! — not merely until `next_available` has elapsed.

use crate::cancellation::CancellationToken;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::time::Instant as TokioInstant;

struct HostBucket {
    next_available: Instant,
    min_interval: Duration,
}

/// Held for the lifetime of one in-flight request to the host it was
/// acquired for. Dropping it without calling `HostPacer::release` skips
/// the pacing delay for the next caller; callers must always release.
pub struct HostPermit {
    guard: OwnedMutexGuard<HostBucket>,
}

/// Shared, read-mostly map from host to its pacing bucket.
pub struct HostPacer {
    buckets: RwLock<HashMap<String, Arc<Mutex<HostBucket>>>>,
    default_interval: Duration,
    overrides: HashMap<String, Duration>,
}

impl HostPacer {
    pub fn new(default_interval: Duration, overrides: HashMap<String, Duration>) -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            default_interval,
            overrides,
        }
    }

    fn interval_for(&self, host: &str) -> Duration {
        self.overrides
            .get(host)
            .copied()
            .unwrap_or(self.default_interval)
    }

    async fn bucket_for(&self, host: &str) -> Arc<Mutex<HostBucket>> {
        if let Some(existing) = self.buckets.read().await.get(host) {
            return existing.clone();
        }
        let mut write = self.buckets.write().await;
        write
            .entry(host.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(HostBucket {
                    next_available: Instant::now(),
                    min_interval: self.interval_for(host),
                }))
            })
            .clone()
    }

    /// Suspends the caller until `host`'s minimum interval has elapsed
    /// since its previous `release`, then returns a permit that holds
    /// the host exclusively until the caller releases it. Returns early,
    /// without having acquired anything, if `cancellation` fires first.
    pub async fn acquire(&self, host: &str, cancellation: &CancellationToken) -> Result<HostPermit, ()> {
        let bucket = self.bucket_for(host).await;
        let mut guard = bucket.lock_owned().await;
        let now = Instant::now();
        if guard.next_available > now {
            let wait = guard.next_available - now;
            let sleep = tokio::time::sleep_until(TokioInstant::now() + wait);
            tokio::pin!(sleep);
            let cancelled = cancellation.cancelled();
            tokio::pin!(cancelled);
            tokio::select! {
                _ = &mut sleep => {}
                _ = &mut cancelled => return Err(()),
            }
        }
        if cancellation.is_cancelled() {
            return Err(());
        }
        Ok(HostPermit { guard })
    }

    /// Records the completion instant so the next `acquire` for this
    /// host waits out the configured interval from now, then drops the
    /// permit's lock, allowing a waiting `acquire` to proceed.
    pub fn release(&self, mut permit: HostPermit) {
        permit.guard.next_available = Instant::now() + permit.guard.min_interval;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serialises_same_host_requests() {
        let pacer = HostPacer::new(Duration::from_millis(50), HashMap::new());
        let token = CancellationToken::new();

        let t0 = Instant::now();
        let permit = pacer.acquire("a.example", &token).await.unwrap();
        pacer.release(permit);
        pacer.acquire("a.example", &token).await.unwrap();
        let elapsed = t0.elapsed();
        assert!(elapsed >= Duration::from_millis(45));
    }

    #[tokio::test]
    async fn distinct_hosts_do_not_block_each_other() {
        let pacer = HostPacer::new(Duration::from_millis(500), HashMap::new());
        let token = CancellationToken::new();

        let t0 = Instant::now();
        pacer.acquire("a.example", &token).await.unwrap();
        pacer.acquire("b.example", &token).await.unwrap();
        assert!(t0.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn acquire_honours_cancellation() {
        let pacer = Arc::new(HostPacer::new(Duration::from_secs(5), HashMap::new()));
        let token = CancellationToken::new();
        let permit = pacer.acquire("a.example", &token).await.unwrap();
        pacer.release(permit);

        let waiter_token = token.clone();
        let waiter_pacer = pacer.clone();
        let handle = tokio::spawn(async move { waiter_pacer.acquire("a.example", &waiter_token).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
        let result = tokio::time::timeout(Duration::from_millis(200), handle)
            .await
            .expect("acquire should return promptly after cancellation")
            .unwrap();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn per_host_override_interval_applies() {
        let mut overrides = HashMap::new();
        overrides.insert("slow.example".to_string(), Duration::from_millis(200));
        let pacer = HostPacer::new(Duration::from_millis(10), overrides);
        let token = CancellationToken::new();

        let t0 = Instant::now();
        let permit = pacer.acquire("slow.example", &token).await.unwrap();
        pacer.release(permit);
        pacer.acquire("slow.example", &token).await.unwrap();
        assert!(t0.elapsed() >= Duration::from_millis(190));
    }

    /// Two concurrent callers against the same host: the second
    /// `acquire` must not return until the first caller's in-flight
    /// request actually completes (`release`), not merely once the
    /// pacing interval has elapsed. Regression test for a prior bug
    /// where `acquire` dropped its lock before the caller's request
    /// even started, letting both proceed in parallel.
    #[tokio::test]
    async fn second_acquire_waits_for_first_caller_to_release_not_just_for_the_interval() {
        let pacer = Arc::new(HostPacer::new(Duration::from_millis(1), HashMap::new()));
        let token = CancellationToken::new();

        let first = pacer.acquire("a.example", &token).await.unwrap();

        let second_pacer = pacer.clone();
        let second_token = token.clone();
        let handle = tokio::spawn(async move { second_pacer.acquire("a.example", &second_token).await });

        // Give the pacing interval time to elapse and the spawned
        // `acquire` time to run; it must still be blocked on the first
        // permit's lock, not merely waiting out `next_available`.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished(), "second acquire must wait for release, not just the interval");

        pacer.release(first);
        let second = tokio::time::timeout(Duration::from_millis(200), handle)
            .await
            .expect("second acquire should proceed promptly after release")
            .unwrap()
            .unwrap();
        pacer.release(second);
    }
}
