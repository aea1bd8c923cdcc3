//! Directory-backed entity store
//!
//! Indexes every `<id>_<version>.json` file below a root directory. The
//! kind of a record comes from its dataset root key, not from the folder it
//! lives in, so one directory can serve every kind.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use super::{EntityStore, StoreError};
use crate::models::{EntityKind, EntityRecord, VersionString};

#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
    index: HashMap<String, BTreeMap<VersionString, PathBuf>>,
}

impl DirectoryStore {
    /// Scan `root` and index the dataset files found under it
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        if !root.is_dir() {
            return Err(StoreError::Unavailable(format!(
                "store root {} is not a directory",
                root.display()
            )));
        }

        let mut index: HashMap<String, BTreeMap<VersionString, PathBuf>> = HashMap::new();
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry.map_err(|e| StoreError::Io {
                path: root.display().to_string(),
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            match Self::parse_file_name(path) {
                Some((id, version)) => {
                    index.entry(id).or_default().insert(version, path.to_path_buf());
                }
                None => debug!("Skipping {:?}: not named <id>_<version>.json", path),
            }
        }

        debug!(
            "Indexed {} dataset ids under {}",
            index.len(),
            root.display()
        );

        Ok(Self {
            root: root.to_path_buf(),
            index,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Split `<id>_<version>.json` into its id and version
    fn parse_file_name(path: &Path) -> Option<(String, VersionString)> {
        if path.extension()?.to_str()? != "json" {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        let (id, version) = stem.rsplit_once('_')?;
        if id.is_empty() {
            return None;
        }
        Some((id.to_string(), VersionString::parse(version).ok()?))
    }
}

#[async_trait]
impl EntityStore for DirectoryStore {
    async fn fetch(
        &self,
        _kind: EntityKind,
        id: &str,
        version: &VersionString,
    ) -> Result<Option<EntityRecord>, StoreError> {
        let Some(path) = self.index.get(id).and_then(|versions| versions.get(version)) else {
            return Ok(None);
        };

        let display = path.display().to_string();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StoreError::Io {
                path: display.clone(),
                message: e.to_string(),
            })?;
        let body: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
                path: display.clone(),
                message: e.to_string(),
            })?;
        let kind = EntityKind::from_record(&body).ok_or_else(|| StoreError::Corrupt {
            path: display,
            message: "no known dataset root key".to_string(),
        })?;

        Ok(Some(EntityRecord::new(kind, id, version.clone(), body)))
    }

    async fn list_versions(
        &self,
        _kind: EntityKind,
        id: &str,
    ) -> Result<Vec<VersionString>, StoreError> {
        Ok(self
            .index
            .get(id)
            .map(|versions| versions.keys().cloned().collect())
            .unwrap_or_default())
    }
}
