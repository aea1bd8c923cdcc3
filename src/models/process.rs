//! Exchange lists of process datasets

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

use super::reference::{EntityReference, ReferenceShape};
use super::record::EntityRecord;

/// Exchange direction as declared by the owning process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "input" => Some(Direction::Input),
            "output" => Some(Direction::Output),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => f.write_str("input"),
            Direction::Output => f.write_str("output"),
        }
    }
}

/// One entry of a process's exchange list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    /// `@dataSetInternalID`, unique only within the owning process
    pub internal_id: String,
    /// `None` when the dataset carries an unrecognised direction
    pub direction: Option<Direction>,
    /// The flow this exchange moves
    pub flow: Option<EntityReference>,
    pub mean_amount: Option<f64>,
    pub resulting_amount: Option<f64>,
    pub quantitative_reference: bool,
}

/// Read the exchange list out of a resolved process record.
///
/// Tolerates a single exchange object in place of an array, and skips
/// entries without an internal id.
pub fn exchanges(record: &EntityRecord) -> Vec<Exchange> {
    let Some(dataset) = record.dataset() else {
        return Vec::new();
    };

    let reference_slots = reference_flow_slots(dataset);
    let entries: Vec<&Value> = match dataset.pointer("/exchanges/exchange") {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single @ Value::Object(_)) => vec![single],
        _ => Vec::new(),
    };

    entries
        .into_iter()
        .filter_map(|entry| {
            let internal_id = scalar_string(entry.get("@dataSetInternalID")?)?;
            let direction = entry
                .get("exchangeDirection")
                .and_then(Value::as_str)
                .and_then(Direction::parse);
            let flow = entry
                .get("referenceToFlowDataSet")
                .and_then(Value::as_object)
                .and_then(|object| ReferenceShape::ilcd().extract(object));
            let flagged = entry
                .get("quantitativeReference")
                .and_then(Value::as_bool)
                .unwrap_or(false);

            Some(Exchange {
                quantitative_reference: flagged || reference_slots.contains(&internal_id),
                internal_id,
                direction,
                flow,
                mean_amount: entry.get("meanAmount").and_then(number),
                resulting_amount: entry.get("resultingAmount").and_then(number),
            })
        })
        .collect()
}

/// Find an exchange by its internal slot id
pub fn find_exchange<'a>(exchanges: &'a [Exchange], slot: &str) -> Option<&'a Exchange> {
    exchanges.iter().find(|exchange| exchange.internal_id == slot)
}

/// Slots listed under `processInformation.quantitativeReference.referenceToReferenceFlow`
fn reference_flow_slots(dataset: &Value) -> HashSet<String> {
    match dataset.pointer("/processInformation/quantitativeReference/referenceToReferenceFlow") {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_string).collect(),
        Some(single) => scalar_string(single).into_iter().collect(),
        None => HashSet::new(),
    }
}

/// Internal ids show up as both strings and numbers in exported datasets
pub(crate) fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
