// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Single-flight memoization
//!
//! The first request for a key starts the load; every concurrent request
//! for the same key awaits that same in-flight future. Successful results
//! stay cached until [`SingleFlightCache::clear`]. Failed loads are evicted
//! so a later request retries.

use crate::error::Result;
use futures::future::{BoxFuture, FutureExt, Shared};
use rustc_hash::FxHashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

type SharedLoad<V> = Shared<BoxFuture<'static, Result<V>>>;

pub struct SingleFlightCache<K, V> {
    name: &'static str,
    entries: Mutex<FxHashMap<K, SharedLoad<V>>>,
}

impl<K, V> SingleFlightCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Mutex::new(FxHashMap::default()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, FxHashMap<K, SharedLoad<V>>> {
        // A panicking loader never runs under this lock, so the map is intact
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached or in-flight value for `key`, starting `load` only on a miss
    pub async fn get_or_load<F, Fut>(&self, key: K, load: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let shared = {
            let mut entries = self.entries();
            match entries.get(&key) {
                Some(existing) => {
                    tracing::trace!(cache = self.name, key = ?key, "Cache hit");
                    existing.clone()
                }
                None => {
                    tracing::trace!(cache = self.name, key = ?key, "Cache miss, loading");
                    let shared = load().boxed().shared();
                    entries.insert(key.clone(), shared.clone());
                    shared
                }
            }
        };

        let result = shared.clone().await;

        if result.is_err() {
            let mut entries = self.entries();
            // Only evict our own failed load, never a newer retry
            if entries.get(&key).is_some_and(|current| current.ptr_eq(&shared)) {
                entries.remove(&key);
                tracing::debug!(cache = self.name, key = ?key, "Evicted failed load");
            }
        }

        result
    }

    /// Drop every cached and in-flight entry
    pub fn clear(&self) {
        let mut entries = self.entries();
        let count = entries.len();
        entries.clear();
        tracing::debug!(cache = self.name, count, "Cleared cache");
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_requests_share_one_load() {
        let cache: Arc<SingleFlightCache<String, u32>> = Arc::new(SingleFlightCache::new("test"));
        let calls = Arc::new(AtomicUsize::new(0));

        let request = |cache: Arc<SingleFlightCache<String, u32>>, calls: Arc<AtomicUsize>| async move {
            cache
                .get_or_load("a".to_string(), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(7)
                })
                .await
        };

        let (a, b) = tokio::join!(
            request(cache.clone(), calls.clone()),
            request(cache.clone(), calls.clone())
        );
        assert_eq!(a.unwrap(), 7);
        assert_eq!(b.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_are_evicted() {
        let cache: SingleFlightCache<&'static str, u32> = SingleFlightCache::new("test");

        let first = cache
            .get_or_load("k", || async { Err(LoadError::fetch("u", "offline")) })
            .await;
        assert!(first.is_err());
        assert!(!cache.contains(&"k"));

        let second = cache.get_or_load("k", || async { Ok(3) }).await;
        assert_eq!(second.unwrap(), 3);
        assert!(cache.contains(&"k"));
    }

    #[tokio::test]
    async fn test_clear_forces_reload() {
        let cache: SingleFlightCache<u8, u8> = SingleFlightCache::new("test");
        cache.get_or_load(1, || async { Ok(1) }).await.unwrap();
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get_or_load(1, || async { Ok(2) }).await.unwrap(), 2);
    }
}
