//! Request-deduplicating cache
//!
//! The first caller for a key runs the lookup; every concurrent or later
//! caller for the same key awaits and shares that one result.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

pub struct SingleFlight<K, V> {
    cells: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }

    /// Return the shared result for `key`, running `lookup` only if no
    /// earlier call for this key exists
    pub async fn run<F, Fut>(&self, key: &K, lookup: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let cell = {
            let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
            cells
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };
        cell.get_or_init(lookup).await.clone()
    }

    /// Number of distinct keys seen
    pub fn len(&self) -> usize {
        self.cells
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Default for SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_lookup() {
        let flight: SingleFlight<&str, usize> = SingleFlight::new();
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        let lookup = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            42
        };

        let (a, b, c) = tokio::join!(
            flight.run(&"k", lookup),
            flight.run(&"k", lookup),
            flight.run(&"k", lookup)
        );

        assert_eq!((a, b, c), (42, 42, 42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(flight.len(), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_run_separately() {
        let flight: SingleFlight<u32, u32> = SingleFlight::new();
        assert_eq!(flight.run(&1, || async { 10 }).await, 10);
        assert_eq!(flight.run(&2, || async { 20 }).await, 20);
        assert_eq!(flight.run(&1, || async { 99 }).await, 10);
        assert_eq!(flight.len(), 2);
    }
}
