//! Tagged-variant view of a dataset document
//!
//! A raw JSON document is classified once, at load time, into
//! [`DatasetNode`]s. Everything downstream pattern-matches on the variants
//! instead of probing JSON shapes.

use serde_json::Value;
use std::path::Path;
use thiserror::Error;

use super::reference::{EntityReference, ReferenceShape};

#[derive(Error, Debug, miette::Diagnostic)]
pub enum DocumentError {
    #[error("failed to read document {path}")]
    #[diagnostic(code(lcaref::document::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("document {path} is not valid JSON")]
    #[diagnostic(
        code(lcaref::document::parse),
        help("datasets are loaded from their JSON form, e.g. the `json_ordered` column export")
    )]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One node of a dataset document
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetNode {
    /// Strings, numbers, booleans and null
    Scalar(Value),
    Reference(EntityReference),
    Sequence(Vec<DatasetNode>),
    /// Fields in document order
    Mapping(Vec<(String, DatasetNode)>),
}

impl DatasetNode {
    /// Classify a JSON value, recognising references by any of `shapes`
    pub fn from_json(value: &Value, shapes: &[ReferenceShape]) -> Self {
        match value {
            Value::Array(items) => DatasetNode::Sequence(
                items
                    .iter()
                    .map(|item| Self::from_json(item, shapes))
                    .collect(),
            ),
            Value::Object(object) => {
                if let Some(reference) = shapes.iter().find_map(|shape| shape.extract(object)) {
                    return DatasetNode::Reference(reference);
                }
                DatasetNode::Mapping(
                    object
                        .iter()
                        .map(|(key, child)| (key.clone(), Self::from_json(child, shapes)))
                        .collect(),
                )
            }
            scalar => DatasetNode::Scalar(scalar.clone()),
        }
    }

    /// Read and classify a JSON document from disk
    pub fn load(path: &Path, shapes: &[ReferenceShape]) -> Result<Self, DocumentError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: display.clone(),
            source,
        })?;
        let value: Value = serde_json::from_str(&content).map_err(|source| DocumentError::Parse {
            path: display,
            source,
        })?;
        Ok(Self::from_json(&value, shapes))
    }

    /// Look up a direct child field of a mapping
    pub fn get(&self, field: &str) -> Option<&DatasetNode> {
        match self {
            DatasetNode::Mapping(fields) => fields
                .iter()
                .find(|(key, _)| key == field)
                .map(|(_, node)| node),
            _ => None,
        }
    }
}
