//! Finds every reference embedded in a dataset document

use crate::models::{DatasetNode, EntityKind, EntityReference, ValidationPath};

/// A reference occurrence and where it sits in the document
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedReference<'a> {
    pub path: ValidationPath,
    pub reference: &'a EntityReference,
}

impl LocatedReference<'_> {
    pub fn declared_type(&self) -> EntityKind {
        self.reference.ref_type
    }
}

/// Walk `document` depth-first in document order, yielding each reference.
///
/// References are leaves: nothing below a matched reference is visited.
/// The walk is lazy and borrows the document, so calling `locate` again
/// restarts it from the root.
pub fn locate(document: &DatasetNode) -> References<'_> {
    References {
        stack: vec![(ValidationPath::root(), document)],
    }
}

/// Iterator returned by [`locate`]
pub struct References<'a> {
    stack: Vec<(ValidationPath, &'a DatasetNode)>,
}

impl<'a> Iterator for References<'a> {
    type Item = LocatedReference<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((path, node)) = self.stack.pop() {
            match node {
                DatasetNode::Reference(reference) => {
                    return Some(LocatedReference { path, reference });
                }
                DatasetNode::Sequence(items) => {
                    // reversed so the first child is popped first
                    for (index, item) in items.iter().enumerate().rev() {
                        self.stack.push((path.index(index), item));
                    }
                }
                DatasetNode::Mapping(fields) => {
                    for (name, child) in fields.iter().rev() {
                        self.stack.push((path.field(name), child));
                    }
                }
                DatasetNode::Scalar(_) => {}
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReferenceShape;
    use serde_json::json;

    fn node(value: serde_json::Value) -> DatasetNode {
        DatasetNode::from_json(&value, &ReferenceShape::defaults())
    }

    #[test]
    fn test_locates_in_document_order() {
        let document = node(json!({
            "processDataSet": {
                "processInformation": {
                    "dataSetInformation": {
                        "referenceToExternalDocumentation": [
                            { "@refObjectId": "s1", "@type": "source data set" },
                            { "@refObjectId": "s2", "@type": "source data set" }
                        ]
                    }
                },
                "exchanges": { "exchange": [
                    { "@dataSetInternalID": "0", "referenceToFlowDataSet": {
                        "@refObjectId": "f1", "@type": "flow data set" } }
                ]},
                "administrativeInformation": {
                    "dataEntryBy": { "common:referenceToPersonOrEntityEnteringTheData": {
                        "@refObjectId": "c1", "@type": "contact data set" } }
                }
            }
        }));

        let located: Vec<(String, String)> = locate(&document)
            .map(|l| (l.path.to_string(), l.reference.ref_id.clone()))
            .collect();

        assert_eq!(
            located,
            vec![
                (
                    "/processDataSet/processInformation/dataSetInformation/referenceToExternalDocumentation/0".to_string(),
                    "s1".to_string()
                ),
                (
                    "/processDataSet/processInformation/dataSetInformation/referenceToExternalDocumentation/1".to_string(),
                    "s2".to_string()
                ),
                (
                    "/processDataSet/exchanges/exchange/0/referenceToFlowDataSet".to_string(),
                    "f1".to_string()
                ),
                (
                    "/processDataSet/administrativeInformation/dataEntryBy/common:referenceToPersonOrEntityEnteringTheData".to_string(),
                    "c1".to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_does_not_descend_into_references() {
        let document = node(json!({
            "ref": {
                "refId": "outer",
                "refType": "Flow",
                "nested": { "refId": "inner", "refType": "Flow" }
            }
        }));

        let ids: Vec<&str> = locate(&document).map(|l| l.reference.ref_id.as_str()).collect();
        assert_eq!(ids, vec!["outer"]);
    }

    #[test]
    fn test_tolerates_malformed_and_unset_shapes() {
        let document = node(json!({
            "unset": {},
            "nothing": null,
            "mixed": [1, "two", null, [], { "refId": "x" }, { "refId": "y", "refType": "Source" }],
            "untyped": { "@refObjectId": "z" }
        }));

        let located: Vec<String> = locate(&document).map(|l| l.path.to_string()).collect();
        assert_eq!(located, vec!["/mixed/5".to_string()]);
    }

    #[test]
    fn test_locate_is_restartable() {
        let document = node(json!([{ "refId": "a", "refType": "Contact" }]));
        assert_eq!(locate(&document).count(), 1);
        assert_eq!(locate(&document).count(), 1);
        assert_eq!(locate(&document).next().unwrap().declared_type(), EntityKind::Contact);
    }
}
