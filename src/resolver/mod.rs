//! Reference resolution against the entity stores
//!
//! A [`Resolver`] lives for exactly one validation run. It memoizes every
//! lookup by key and guarantees at most one in-flight store call per
//! distinct key; duplicates await the first call. Drop it when the run
//! ends so the next run sees the current store state.

mod flight;

pub use flight::SingleFlight;

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{EntityKind, EntityRecord, RefVersion, VersionString};
use crate::store::{EntityStore, StoreError, StoreRegistry};

/// Memo key of one resolution
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolveKey {
    pub kind: EntityKind,
    pub id: String,
    pub version: RefVersion,
}

/// Outcome of a successful resolution call
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found(Arc<EntityRecord>),
    /// No version of the id exists
    NotFound,
    /// The id exists but not at the requested version
    VersionNotFound { latest: Option<VersionString> },
}

/// The resolution call itself failed; says nothing about the stored data
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no store registered for {0} datasets")]
    NoStore(EntityKind),

    #[error(transparent)]
    Store(#[from] StoreError),
}

type LookupResult<T> = Result<T, ResolveError>;

pub struct Resolver {
    stores: StoreRegistry,
    resolutions: SingleFlight<ResolveKey, LookupResult<Resolution>>,
    records: SingleFlight<(EntityKind, String, VersionString), LookupResult<Option<Arc<EntityRecord>>>>,
    versions: SingleFlight<(EntityKind, String), LookupResult<Vec<VersionString>>>,
}

impl Resolver {
    pub fn new(stores: StoreRegistry) -> Self {
        Self {
            stores,
            resolutions: SingleFlight::new(),
            records: SingleFlight::new(),
            versions: SingleFlight::new(),
        }
    }

    /// Resolve `id` at `version` through the store registered for `kind`.
    ///
    /// `latest` picks the maximum stored version first; a failure at either
    /// step surfaces as [`Resolution::NotFound`].
    pub async fn resolve(
        &self,
        kind: EntityKind,
        id: &str,
        version: &RefVersion,
    ) -> LookupResult<Resolution> {
        let key = ResolveKey {
            kind,
            id: id.to_string(),
            version: version.clone(),
        };

        self.resolutions
            .run(&key, move || async move {
                let result = self.resolve_uncached(kind, id, version).await;
                match &result {
                    Ok(resolution) => debug!(
                        "Resolved {kind} {id}@{version}: {}",
                        describe(resolution)
                    ),
                    Err(e) => warn!("Lookup of {kind} {id}@{version} failed: {e}"),
                }
                result
            })
            .await
    }

    /// Number of distinct references resolved by this run
    pub fn distinct_lookups(&self) -> usize {
        self.resolutions.len()
    }

    async fn resolve_uncached(
        &self,
        kind: EntityKind,
        id: &str,
        version: &RefVersion,
    ) -> LookupResult<Resolution> {
        match version {
            RefVersion::Latest => {
                let versions = self.list_versions(kind, id).await?;
                let Some(latest) = versions.into_iter().max() else {
                    return Ok(Resolution::NotFound);
                };
                Ok(match self.fetch(kind, id, &latest).await? {
                    Some(record) => Resolution::Found(record),
                    None => Resolution::NotFound,
                })
            }
            RefVersion::Pinned(pinned) => match self.fetch(kind, id, pinned).await? {
                Some(record) => Ok(Resolution::Found(record)),
                None => self.classify_absent_version(kind, id).await,
            },
            RefVersion::Malformed(_) => self.classify_absent_version(kind, id).await,
        }
    }

    /// The requested version does not exist; tell apart a stale pin from an unknown id
    async fn classify_absent_version(
        &self,
        kind: EntityKind,
        id: &str,
    ) -> LookupResult<Resolution> {
        let versions = self.list_versions(kind, id).await?;
        Ok(match versions.into_iter().max() {
            Some(latest) => Resolution::VersionNotFound {
                latest: Some(latest),
            },
            None => Resolution::NotFound,
        })
    }

    fn store(&self, kind: EntityKind) -> LookupResult<&Arc<dyn EntityStore>> {
        self.stores.get(kind).ok_or(ResolveError::NoStore(kind))
    }

    async fn fetch(
        &self,
        kind: EntityKind,
        id: &str,
        version: &VersionString,
    ) -> LookupResult<Option<Arc<EntityRecord>>> {
        let key = (kind, id.to_string(), version.clone());
        self.records
            .run(&key, move || async move {
                let record = self.store(kind)?.fetch(kind, id, version).await?;
                Ok::<_, ResolveError>(record.map(Arc::new))
            })
            .await
    }

    async fn list_versions(&self, kind: EntityKind, id: &str) -> LookupResult<Vec<VersionString>> {
        let key = (kind, id.to_string());
        self.versions
            .run(&key, move || async move {
                Ok::<_, ResolveError>(self.store(kind)?.list_versions(kind, id).await?)
            })
            .await
    }
}

fn describe(resolution: &Resolution) -> String {
    match resolution {
        Resolution::Found(record) => format!("found {} {}", record.kind, record.version),
        Resolution::NotFound => "not found".to_string(),
        Resolution::VersionNotFound { latest: Some(latest) } => {
            format!("version not found (latest {latest})")
        }
        Resolution::VersionNotFound { latest: None } => "version not found".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn version(raw: &str) -> VersionString {
        VersionString::parse(raw).unwrap()
    }

    fn store_with_flow_versions(versions: &[&str]) -> MemoryStore {
        let store = MemoryStore::new();
        for raw in versions {
            store.insert(EntityRecord::new(
                EntityKind::Flow,
                "flow-1",
                version(raw),
                json!({ "flowDataSet": {} }),
            ));
        }
        store
    }

    fn resolver(store: &MemoryStore) -> Resolver {
        Resolver::new(StoreRegistry::shared(Arc::new(store.clone())))
    }

    #[tokio::test]
    async fn test_latest_resolves_to_max_version() {
        let store = store_with_flow_versions(&["01.00.000", "01.00.001"]);
        let resolution = resolver(&store)
            .resolve(EntityKind::Flow, "flow-1", &RefVersion::Latest)
            .await
            .unwrap();

        match resolution {
            Resolution::Found(record) => assert_eq!(record.version, version("01.00.001")),
            other => panic!("expected found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_pin_with_existing_id_is_version_not_found() {
        let store = store_with_flow_versions(&["01.00.000", "02.00.000"]);
        let resolution = resolver(&store)
            .resolve(
                EntityKind::Flow,
                "flow-1",
                &RefVersion::Pinned(version("01.05.000")),
            )
            .await
            .unwrap();

        assert_eq!(
            resolution,
            Resolution::VersionNotFound {
                latest: Some(version("02.00.000"))
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let store = store_with_flow_versions(&[]);
        let resolver = resolver(&store);

        for requested in [
            RefVersion::Latest,
            RefVersion::Pinned(version("01.00.000")),
            RefVersion::Malformed("v1".to_string()),
        ] {
            let resolution = resolver
                .resolve(EntityKind::Flow, "flow-1", &requested)
                .await
                .unwrap();
            assert_eq!(resolution, Resolution::NotFound);
        }
    }

    #[tokio::test]
    async fn test_repeat_resolution_fetches_once() {
        let store = store_with_flow_versions(&["01.00.000"]);
        let resolver = resolver(&store);
        let pinned = RefVersion::Pinned(version("01.00.000"));

        resolver.resolve(EntityKind::Flow, "flow-1", &pinned).await.unwrap();
        resolver.resolve(EntityKind::Flow, "flow-1", &pinned).await.unwrap();
        // latest lands on the same concrete version and reuses that fetch
        resolver
            .resolve(EntityKind::Flow, "flow-1", &RefVersion::Latest)
            .await
            .unwrap();

        assert_eq!(store.calls().fetch_count("flow-1", &version("01.00.000")), 1);
        assert_eq!(resolver.distinct_lookups(), 2);
    }

    #[tokio::test]
    async fn test_transport_failure_is_error() {
        let store = store_with_flow_versions(&["01.00.000"]);
        store.fail_on("flow-1");

        let result = resolver(&store)
            .resolve(EntityKind::Flow, "flow-1", &RefVersion::Latest)
            .await;
        assert!(matches!(result, Err(ResolveError::Store(StoreError::Unavailable(_)))));
    }

    #[tokio::test]
    async fn test_unregistered_kind_is_error() {
        let resolver = Resolver::new(StoreRegistry::new());
        let result = resolver
            .resolve(EntityKind::Contact, "c1", &RefVersion::Latest)
            .await;
        assert_eq!(result, Err(ResolveError::NoStore(EntityKind::Contact)));
    }
}
