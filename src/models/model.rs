//! On-disk form of a life-cycle-model exchange graph

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use super::document::DocumentError;
use super::process::scalar_string;

/// A life-cycle model as exported by the model editor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelDocument {
    /// Process references, one per node
    #[serde(default)]
    pub nodes: Vec<Map<String, Value>>,
    #[serde(default)]
    pub edges: Vec<EdgeDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeDocument {
    #[serde(rename = "sourceProcess")]
    pub source_process: Map<String, Value>,
    #[serde(rename = "sourceOutputFlowInternalID", deserialize_with = "internal_id")]
    pub source_output_flow_internal_id: String,
    #[serde(rename = "targetProcess")]
    pub target_process: Map<String, Value>,
    #[serde(rename = "targetInputFlowInternalID", deserialize_with = "internal_id")]
    pub target_input_flow_internal_id: String,
}

fn internal_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    scalar_string(&value)
        .ok_or_else(|| D::Error::custom(format!("expected a string or number internal id, got {value}")))
}

impl ModelDocument {
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: display.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| DocumentError::Parse {
            path: display,
            source,
        })
    }
}
