use serde::Serialize;
use serde_json::Value;

use super::kind::EntityKind;
use super::version::VersionString;

/// A canonical stored dataset at one specific version
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRecord {
    pub kind: EntityKind,
    pub id: String,
    pub version: VersionString,
    /// The full dataset JSON, rooted at its dataset key (`processDataSet`, ...)
    pub body: Value,
}

impl EntityRecord {
    pub fn new(kind: EntityKind, id: impl Into<String>, version: VersionString, body: Value) -> Self {
        Self {
            kind,
            id: id.into(),
            version,
            body,
        }
    }

    /// The dataset object under the record's root key
    pub fn dataset(&self) -> Option<&Value> {
        self.body.get(self.kind.dataset_key())
    }
}
