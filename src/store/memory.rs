//! In-memory entity store
//!
//! Holds records in a map and counts every lookup, so callers can check
//! how many round trips a validation run actually made. Clones share
//! state.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{EntityStore, StoreError};
use crate::models::{EntityKind, EntityRecord, VersionString};

/// Lookup counters recorded by [`MemoryStore`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreCalls {
    /// `(id, version)` of every fetch, in call order
    pub fetches: Vec<(String, VersionString)>,
    /// id of every version listing, in call order
    pub listings: Vec<String>,
}

impl StoreCalls {
    pub fn fetch_count(&self, id: &str, version: &VersionString) -> usize {
        self.fetches
            .iter()
            .filter(|(i, v)| i == id && v == version)
            .count()
    }

    pub fn listing_count(&self, id: &str) -> usize {
        self.listings.iter().filter(|i| *i == id).count()
    }
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    records: HashMap<String, BTreeMap<VersionString, EntityRecord>>,
    failing: HashSet<String>,
    calls: StoreCalls,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every lookup, to keep concurrent lookups in flight together
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn lock(&self) -> MutexGuard<'_, MemoryStoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace a record
    pub fn insert(&self, record: EntityRecord) {
        self.lock()
            .records
            .entry(record.id.clone())
            .or_default()
            .insert(record.version.clone(), record);
    }

    /// Remove one version of a record; returns whether it existed
    pub fn remove_version(&self, id: &str, version: &VersionString) -> bool {
        let mut inner = self.lock();
        let Some(versions) = inner.records.get_mut(id) else {
            return false;
        };
        let removed = versions.remove(version).is_some();
        if versions.is_empty() {
            inner.records.remove(id);
        }
        removed
    }

    /// Make every lookup of `id` fail with a transport error
    pub fn fail_on(&self, id: &str) {
        self.lock().failing.insert(id.to_string());
    }

    pub fn clear_failures(&self) {
        self.lock().failing.clear();
    }

    /// Snapshot of the lookups made so far
    pub fn calls(&self) -> StoreCalls {
        self.lock().calls.clone()
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn fetch(
        &self,
        _kind: EntityKind,
        id: &str,
        version: &VersionString,
    ) -> Result<Option<EntityRecord>, StoreError> {
        let failing = {
            let mut inner = self.lock();
            inner.calls.fetches.push((id.to_string(), version.clone()));
            inner.failing.contains(id)
        };
        self.simulate_latency().await;

        if failing {
            return Err(StoreError::Unavailable(format!("fetch of {id} refused")));
        }

        Ok(self
            .lock()
            .records
            .get(id)
            .and_then(|versions| versions.get(version))
            .cloned())
    }

    async fn list_versions(
        &self,
        _kind: EntityKind,
        id: &str,
    ) -> Result<Vec<VersionString>, StoreError> {
        let failing = {
            let mut inner = self.lock();
            inner.calls.listings.push(id.to_string());
            inner.failing.contains(id)
        };
        self.simulate_latency().await;

        if failing {
            return Err(StoreError::Unavailable(format!("version listing of {id} refused")));
        }

        Ok(self
            .lock()
            .records
            .get(id)
            .map(|versions| versions.keys().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn version(raw: &str) -> VersionString {
        VersionString::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_store_survives_panicking_holder() {
        let store = MemoryStore::new();
        let shared = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = shared.lock();
            panic!("holder panicked");
        })
        .join();

        store.insert(EntityRecord::new(
            EntityKind::Flow,
            "f1",
            version("01.00.000"),
            json!({ "flowDataSet": {} }),
        ));
        let versions = store.list_versions(EntityKind::Flow, "f1").await.unwrap();
        assert_eq!(versions, vec![version("01.00.000")]);
    }

    #[tokio::test]
    async fn test_fetch_and_list() {
        let store = MemoryStore::new();
        store.insert(EntityRecord::new(
            EntityKind::Flow,
            "f1",
            version("01.00.000"),
            json!({ "flowDataSet": {} }),
        ));
        store.insert(EntityRecord::new(
            EntityKind::Flow,
            "f1",
            version("01.00.001"),
            json!({ "flowDataSet": {} }),
        ));

        let found = store
            .fetch(EntityKind::Flow, "f1", &version("01.00.001"))
            .await
            .unwrap();
        assert_eq!(found.unwrap().version, version("01.00.001"));

        let missing = store
            .fetch(EntityKind::Flow, "f1", &version("02.00.000"))
            .await
            .unwrap();
        assert!(missing.is_none());

        let versions = store.list_versions(EntityKind::Flow, "f1").await.unwrap();
        assert_eq!(versions, vec![version("01.00.000"), version("01.00.001")]);

        let calls = store.calls();
        assert_eq!(calls.fetches.len(), 2);
        assert_eq!(calls.listing_count("f1"), 1);
    }

    #[tokio::test]
    async fn test_fail_on_reports_transport_error() {
        let store = MemoryStore::new();
        store.fail_on("broken");

        let result = store.list_versions(EntityKind::Source, "broken").await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));

        store.clear_failures();
        let result = store.list_versions(EntityKind::Source, "broken").await;
        assert_eq!(result, Ok(Vec::new()));
    }

    #[test]
    fn test_remove_version() {
        let store = MemoryStore::new();
        store.insert(EntityRecord::new(
            EntityKind::Contact,
            "c1",
            version("01.00.000"),
            json!({ "contactDataSet": {} }),
        ));

        assert!(store.remove_version("c1", &version("01.00.000")));
        assert!(!store.remove_version("c1", &version("01.00.000")));
    }
}
