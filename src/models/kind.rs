use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Top-level dataset types that can be referenced from another dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Process,
    Flow,
    FlowProperty,
    UnitGroup,
    Source,
    Contact,
    LifeCycleModel,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Process,
        EntityKind::Flow,
        EntityKind::FlowProperty,
        EntityKind::UnitGroup,
        EntityKind::Source,
        EntityKind::Contact,
        EntityKind::LifeCycleModel,
    ];

    /// The ILCD `@type` phrase, e.g. `"process data set"`
    pub fn ilcd_type(&self) -> &'static str {
        match self {
            EntityKind::Process => "process data set",
            EntityKind::Flow => "flow data set",
            EntityKind::FlowProperty => "flow property data set",
            EntityKind::UnitGroup => "unit group data set",
            EntityKind::Source => "source data set",
            EntityKind::Contact => "contact data set",
            EntityKind::LifeCycleModel => "lifeCycleModel data set",
        }
    }

    /// Root key of a stored record of this kind, e.g. `processDataSet`
    pub fn dataset_key(&self) -> &'static str {
        match self {
            EntityKind::Process => "processDataSet",
            EntityKind::Flow => "flowDataSet",
            EntityKind::FlowProperty => "flowPropertyDataSet",
            EntityKind::UnitGroup => "unitGroupDataSet",
            EntityKind::Source => "sourceDataSet",
            EntityKind::Contact => "contactDataSet",
            EntityKind::LifeCycleModel => "lifeCycleModelDataSet",
        }
    }

    /// Detect the kind of a stored record from its dataset root key
    pub fn from_record(value: &serde_json::Value) -> Option<Self> {
        let object = value.as_object()?;
        Self::ALL
            .into_iter()
            .find(|kind| object.contains_key(kind.dataset_key()))
    }

    fn canonical_name(&self) -> &'static str {
        match self {
            EntityKind::Process => "process",
            EntityKind::Flow => "flow",
            EntityKind::FlowProperty => "flowproperty",
            EntityKind::UnitGroup => "unitgroup",
            EntityKind::Source => "source",
            EntityKind::Contact => "contact",
            EntityKind::LifeCycleModel => "lifecyclemodel",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Process => "Process",
            EntityKind::Flow => "Flow",
            EntityKind::FlowProperty => "FlowProperty",
            EntityKind::UnitGroup => "UnitGroup",
            EntityKind::Source => "Source",
            EntityKind::Contact => "Contact",
            EntityKind::LifeCycleModel => "LifeCycleModel",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown entity kind '{0}'")]
pub struct UnknownKind(pub String);

impl FromStr for EntityKind {
    type Err = UnknownKind;

    /// Accepts `"Process"`, `"process data set"` and `"processDataSet"` alike
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();

        if let Some(stripped) = normalized.strip_suffix("dataset") {
            normalized = stripped.to_string();
        }

        Self::ALL
            .into_iter()
            .find(|kind| kind.canonical_name() == normalized)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}
