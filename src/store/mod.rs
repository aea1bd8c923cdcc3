//! Entity store capability
//!
//! The validation engine never owns dataset persistence. It reads through
//! an [`EntityStore`] per [`EntityKind`], injected as a [`StoreRegistry`].
//! Stores are plain async lookups: a fetch by `(kind, id, version)` and a
//! version index per `(kind, id)`.

mod directory;
mod memory;

pub use directory::DirectoryStore;
pub use memory::{MemoryStore, StoreCalls};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::models::{EntityKind, EntityRecord, VersionString};

/// Transport-level failures of a store lookup.
///
/// A confirmed absence is never an error; stores return `Ok(None)` or an
/// empty version list for that.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("lookup timed out: {0}")]
    Timeout(String),

    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("stored record {path} is not a valid dataset: {message}")]
    Corrupt { path: String, message: String },
}

/// Lookup capability for one or more entity kinds
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Fetch the record stored under `id` at exactly `version`.
    ///
    /// The returned record carries its own kind, which may differ from the
    /// kind that was asked for when several kinds share one store.
    async fn fetch(
        &self,
        kind: EntityKind,
        id: &str,
        version: &VersionString,
    ) -> Result<Option<EntityRecord>, StoreError>;

    /// All versions stored for `id`, in any order
    async fn list_versions(
        &self,
        kind: EntityKind,
        id: &str,
    ) -> Result<Vec<VersionString>, StoreError>;
}

/// Capability map `{ kind -> store }`
#[derive(Clone, Default)]
pub struct StoreRegistry {
    stores: HashMap<EntityKind, Arc<dyn EntityStore>>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one store for every entity kind
    pub fn shared(store: Arc<dyn EntityStore>) -> Self {
        let mut registry = Self::new();
        for kind in EntityKind::ALL {
            registry.register(kind, store.clone());
        }
        registry
    }

    pub fn register(&mut self, kind: EntityKind, store: Arc<dyn EntityStore>) -> &mut Self {
        self.stores.insert(kind, store);
        self
    }

    pub fn get(&self, kind: EntityKind) -> Option<&Arc<dyn EntityStore>> {
        self.stores.get(&kind)
    }
}

impl std::fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.stores.keys().collect();
        kinds.sort();
        f.debug_struct("StoreRegistry").field("kinds", &kinds).finish()
    }
}
