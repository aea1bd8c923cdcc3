use serde::Serialize;
use std::fmt;

use crate::models::{EntityKind, EntityReference, ValidationPath, VersionString};

/// Classification of one located reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationStatus {
    Valid,
    /// The target id does not exist, or the reference has no id at all
    Dangling,
    /// The target resolved to a different kind than declared
    TypeMismatch,
    /// The target id exists but not at the pinned version
    StaleVersion,
    /// The lookup itself failed; the only status worth retrying
    Unresolvable,
}

impl ValidationStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationStatus::Valid)
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ValidationStatus::Unresolvable)
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ValidationStatus::Valid => "valid",
            ValidationStatus::Dangling => "dangling",
            ValidationStatus::TypeMismatch => "type mismatch",
            ValidationStatus::StaleVersion => "stale version",
            ValidationStatus::Unresolvable => "unresolvable",
        };
        f.write_str(label)
    }
}

/// Result of checking one reference occurrence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    pub path: ValidationPath,
    pub reference: EntityReference,
    pub status: ValidationStatus,
    /// Concrete version the reference resolved to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_version: Option<VersionString>,
    /// Newest stored version, reported on stale pins
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<VersionString>,
    /// Kind actually found, reported on type mismatches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_kind: Option<EntityKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ValidationOutcome {
    pub fn new(path: ValidationPath, reference: EntityReference, status: ValidationStatus) -> Self {
        Self {
            path,
            reference,
            status,
            resolved_version: None,
            latest_version: None,
            actual_kind: None,
            detail: None,
        }
    }

    /// One-line description of what is wrong, if anything
    pub fn summary(&self) -> String {
        let target = format!(
            "{} {}@{}",
            self.reference.ref_type, self.reference.ref_id, self.reference.ref_version
        );
        match self.status {
            ValidationStatus::Valid => match &self.resolved_version {
                Some(version) => format!("{target} resolved to {version}"),
                None => target,
            },
            ValidationStatus::Dangling if self.reference.is_blank() => {
                format!("{} reference has no id", self.reference.ref_type)
            }
            ValidationStatus::Dangling => format!("{target} does not exist"),
            ValidationStatus::TypeMismatch => match self.actual_kind {
                Some(actual) => format!("{target} is a {actual}"),
                None => format!("{target} has the wrong type"),
            },
            ValidationStatus::StaleVersion => match &self.latest_version {
                Some(latest) => format!("{target} no longer exists, latest is {latest}"),
                None => format!("{target} no longer exists"),
            },
            ValidationStatus::Unresolvable => match &self.detail {
                Some(detail) => format!("{target} could not be checked: {detail}"),
                None => format!("{target} could not be checked"),
            },
        }
    }
}

/// Ordered outcomes of one validation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub outcomes: Vec<ValidationOutcome>,
    /// Distinct `(kind, id, version)` lookups the run needed
    pub distinct_lookups: usize,
}

impl ValidationReport {
    pub fn failures(&self) -> impl Iterator<Item = &ValidationOutcome> {
        self.outcomes.iter().filter(|o| !o.status.is_valid())
    }

    /// Outcomes a caller may retry; everything else is an authoritative finding
    pub fn retryable(&self) -> impl Iterator<Item = &ValidationOutcome> {
        self.outcomes.iter().filter(|o| o.status.is_retryable())
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn count(&self, status: ValidationStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}
