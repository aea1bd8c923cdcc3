//! Maps failing reference paths onto editing sections
//!
//! A section owns every path below one of its prefixes. When prefixes of
//! several sections match the same path (nested tabs), all of them are
//! flagged. Failing paths that no section claims land in the unmapped
//! bucket instead of being dropped, so drift between the table and the
//! document shape stays visible.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::iter;

use super::outcome::ValidationOutcome;
use crate::models::{EntityKind, PathPrefix, ValidationPath};

pub type SectionId = String;

/// Name of the catch-all bucket for paths no section claims
pub const UNMAPPED_SECTION: &str = "unmapped";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SectionDefinition {
    pub id: SectionId,
    #[serde(rename = "prefixes", deserialize_with = "deserialize_prefixes")]
    pub path_prefixes: Vec<PathPrefix>,
}

impl SectionDefinition {
    pub fn new(id: &str, prefixes: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            path_prefixes: prefixes.iter().map(|p| PathPrefix::parse(p)).collect(),
        }
    }

    pub fn owns(&self, path: &ValidationPath) -> bool {
        self.path_prefixes.iter().any(|prefix| prefix.matches(path))
    }
}

fn deserialize_prefixes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<PathPrefix>, D::Error> {
    let raw: Vec<String> = Vec::deserialize(deserializer)?;
    Ok(raw.iter().map(|p| PathPrefix::parse(p)).collect())
}

/// Per-section error flags, in section-table order
///
/// Serializes as `{ "sections": { id: flagged, .., "unmapped": flagged }, "unmappedPaths": [..] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionFlags {
    sections: Vec<(SectionId, bool)>,
    unmapped: Vec<ValidationPath>,
}

impl SectionFlags {
    /// Flag of section `id`; [`UNMAPPED_SECTION`] reports whether any path went unclaimed
    pub fn get(&self, id: &str) -> Option<bool> {
        if id == UNMAPPED_SECTION {
            return Some(!self.unmapped.is_empty());
        }
        self.sections
            .iter()
            .find(|(section, _)| section == id)
            .map(|(_, flagged)| *flagged)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.sections.iter().map(|(id, flagged)| (id.as_str(), *flagged))
    }

    /// Sections with at least one failing reference
    pub fn flagged(&self) -> impl Iterator<Item = &str> {
        self.iter().filter(|(_, flagged)| *flagged).map(|(id, _)| id)
    }

    /// Failing paths no section claims
    pub fn unmapped(&self) -> &[ValidationPath] {
        &self.unmapped
    }

    pub fn has_errors(&self) -> bool {
        self.flagged().next().is_some() || !self.unmapped.is_empty()
    }
}

impl Serialize for SectionFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SectionFlags", 2)?;
        state.serialize_field("sections", &SectionMap(self))?;
        state.serialize_field("unmappedPaths", &self.unmapped)?;
        state.end()
    }
}

struct SectionMap<'a>(&'a SectionFlags);

impl Serialize for SectionMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let unmapped = iter::once((UNMAPPED_SECTION, !self.0.unmapped.is_empty()));
        serializer.collect_map(self.0.iter().chain(unmapped))
    }
}

/// Flag each section owning at least one non-valid outcome
pub fn map_to_sections(outcomes: &[ValidationOutcome], definitions: &[SectionDefinition]) -> SectionFlags {
    let mut flags = SectionFlags::default();
    for definition in definitions {
        if flags.get(&definition.id).is_none() {
            flags.sections.push((definition.id.clone(), false));
        }
    }

    for outcome in outcomes.iter().filter(|o| !o.status.is_valid()) {
        let mut claimed = false;
        for definition in definitions.iter().filter(|d| d.owns(&outcome.path)) {
            claimed = true;
            if let Some(entry) = flags.sections.iter_mut().find(|(id, _)| *id == definition.id) {
                entry.1 = true;
            }
        }

        if !claimed && !flags.unmapped.contains(&outcome.path) {
            tracing::warn!("No section owns failing path {}", outcome.path);
            flags.unmapped.push(outcome.path.clone());
        }
    }

    flags
}

/// Editing sections of each dataset type
pub fn default_sections(kind: EntityKind) -> Vec<SectionDefinition> {
    let root = kind.dataset_key();
    let section = |id: &str| SectionDefinition::new(id, &[&format!("/{root}/{id}")]);

    match kind {
        EntityKind::Process => vec![
            section("processInformation"),
            section("modellingAndValidation"),
            section("administrativeInformation"),
            section("exchanges"),
        ],
        EntityKind::Flow => vec![
            section("flowInformation"),
            section("modellingAndValidation"),
            section("administrativeInformation"),
            section("flowProperties"),
        ],
        EntityKind::FlowProperty => vec![
            section("flowPropertiesInformation"),
            section("modellingAndValidation"),
            section("administrativeInformation"),
        ],
        EntityKind::UnitGroup => vec![
            section("unitGroupInformation"),
            section("modellingAndValidation"),
            section("administrativeInformation"),
            section("units"),
        ],
        EntityKind::Source => vec![
            section("sourceInformation"),
            section("administrativeInformation"),
        ],
        EntityKind::Contact => vec![
            section("contactInformation"),
            section("administrativeInformation"),
        ],
        EntityKind::LifeCycleModel => vec![
            section("lifeCycleModelInformation"),
            section("modellingAndValidation"),
            section("administrativeInformation"),
        ],
    }
}
