//! Result caching keyed by request fingerprint.
//!
//! The cache itself is a collaborator behind [`WorkflowCache`]; the
//! orchestrator pairs it with a [`SingleFlight`] so that concurrent
//! requests for one fingerprint compute once and share the result.

use crate::request::Fingerprint;
use async_trait::async_trait;
use flowsmith_workflow::Workflow;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Storage for accepted workflows.
#[async_trait]
pub trait WorkflowCache: Send + Sync {
    /// Returns the cached workflow, if present and not expired.
    async fn get(&self, fingerprint: &Fingerprint) -> Option<Workflow>;

    /// Stores a workflow for `ttl`.
    async fn set(&self, fingerprint: &Fingerprint, workflow: Workflow, ttl: Duration);
}

struct Entry {
    expires_at: Instant,
    workflow: Workflow,
}

/// In-process cache with per-entry expiry.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<Fingerprint, Entry>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries. Expired ones count until the next `set`
    /// or a `get` for their fingerprint.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl WorkflowCache for MemoryCache {
    async fn get(&self, fingerprint: &Fingerprint) -> Option<Workflow> {
        let mut entries = self.entries.lock().await;
        let expired = entries
            .get(fingerprint)
            .is_some_and(|entry| Instant::now() >= entry.expires_at);
        if expired {
            debug!(%fingerprint, "cache entry expired");
            entries.remove(fingerprint);
            return None;
        }
        entries.get(fingerprint).map(|entry| entry.workflow.clone())
    }

    async fn set(&self, fingerprint: &Fingerprint, workflow: Workflow, ttl: Duration) {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        let pruned = before - entries.len();
        if pruned > 0 {
            debug!(pruned, "pruned expired cache entries");
        }
        entries.insert(
            fingerprint.clone(),
            Entry {
                expires_at: now + ttl,
                workflow,
            },
        );
    }
}

/// Per-fingerprint async lock.
///
/// Holding the guard marks a computation as in flight; later callers for
/// the same fingerprint wait until it is dropped.
#[derive(Default)]
pub struct SingleFlight {
    locks: Mutex<HashMap<Fingerprint, Arc<Mutex<()>>>>,
}

impl SingleFlight {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for any in-flight computation of `fingerprint` to finish and
    /// claims the slot.
    pub async fn acquire(&self, fingerprint: &Fingerprint) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Idle slots are only referenced by the map.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(fingerprint.clone()).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of slots currently held or awaited.
    pub async fn in_flight(&self) -> usize {
        self.locks
            .lock()
            .await
            .values()
            .filter(|lock| Arc::strong_count(lock) > 1)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{ComplexityTier, GenerationRequest, TriggerKind};

    fn fingerprint(description: &str) -> Fingerprint {
        GenerationRequest::new(description, TriggerKind::Manual, ComplexityTier::Simple)
            .fingerprint()
    }

    #[tokio::test]
    async fn stores_and_expires() {
        let cache = MemoryCache::new();
        let key = fingerprint("sync leads");

        assert!(cache.get(&key).await.is_none());
        cache
            .set(&key, Workflow::new("Sync leads"), Duration::from_secs(60))
            .await;
        let hit = cache.get(&key).await.expect("cached");
        assert_eq!(hit.name(), Some("Sync leads"));

        cache
            .set(&key, Workflow::new("Sync leads"), Duration::ZERO)
            .await;
        assert!(cache.get(&key).await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn set_prunes_expired_entries() {
        let cache = MemoryCache::new();
        for n in 0..500 {
            let key = fingerprint(&format!("request {n}"));
            cache
                .set(&key, Workflow::new("Expired"), Duration::ZERO)
                .await;
        }
        assert!(cache.len().await <= 1, "{}", cache.len().await);

        let live = fingerprint("keep me");
        cache
            .set(&live, Workflow::new("Live"), Duration::from_secs(60))
            .await;
        cache
            .set(&fingerprint("short"), Workflow::new("Short"), Duration::ZERO)
            .await;
        assert_eq!(cache.len().await, 2);
        assert!(cache.get(&live).await.is_some());
    }

    #[tokio::test]
    async fn single_flight_serializes_one_fingerprint() {
        let flights = SingleFlight::new();
        let key = fingerprint("sync leads");
        let other = fingerprint("post to slack");

        let guard = flights.acquire(&key).await;
        assert_eq!(flights.in_flight().await, 1);

        // A different fingerprint is not blocked.
        let other_guard = flights.acquire(&other).await;
        assert_eq!(flights.in_flight().await, 2);
        drop(other_guard);

        let waiter = tokio::time::timeout(Duration::from_millis(20), flights.acquire(&key)).await;
        assert!(waiter.is_err(), "second acquire must wait");

        drop(guard);
        let _again = tokio::time::timeout(Duration::from_secs(1), flights.acquire(&key))
            .await
            .expect("slot released");
    }

    #[tokio::test]
    async fn idle_slots_are_pruned() {
        let flights = SingleFlight::new();
        for description in ["a", "b", "c"] {
            drop(flights.acquire(&fingerprint(description)).await);
        }
        let _held = flights.acquire(&fingerprint("d")).await;
        assert_eq!(flights.in_flight().await, 1);
        assert_eq!(flights.locks.lock().await.len(), 1);
    }
}
