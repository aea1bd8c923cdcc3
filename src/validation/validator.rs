use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use super::locator::{LocatedReference, locate};
use super::outcome::{ValidationOutcome, ValidationReport, ValidationStatus};
use crate::models::DatasetNode;
use crate::resolver::{Resolution, Resolver};
use crate::store::StoreRegistry;

pub const DEFAULT_MAX_CONCURRENT_LOOKUPS: usize = 16;

/// Checks every reference in a dataset document against the entity stores
#[derive(Debug, Clone)]
pub struct Validator {
    stores: StoreRegistry,
    max_concurrent_lookups: usize,
}

impl Validator {
    pub fn new(stores: StoreRegistry) -> Self {
        Self {
            stores,
            max_concurrent_lookups: DEFAULT_MAX_CONCURRENT_LOOKUPS,
        }
    }

    /// Cap the number of resolutions in flight at once (minimum 1)
    pub fn with_max_concurrent_lookups(mut self, limit: usize) -> Self {
        self.max_concurrent_lookups = limit.max(1);
        self
    }

    pub fn stores(&self) -> &StoreRegistry {
        &self.stores
    }

    /// Start a run-scoped resolver; its cache is dropped with it
    pub fn resolver(&self) -> Resolver {
        Resolver::new(self.stores.clone())
    }

    /// Validate a document in a fresh run
    pub async fn validate(&self, document: &DatasetNode) -> ValidationReport {
        let resolver = self.resolver();
        self.validate_with(&resolver, document).await
    }

    /// Validate a document using an existing run's resolver.
    ///
    /// Lookups are dispatched concurrently but outcomes come back in
    /// document order, after every lookup has finished.
    pub async fn validate_with(&self, resolver: &Resolver, document: &DatasetNode) -> ValidationReport {
        let located: Vec<LocatedReference<'_>> = locate(document).collect();
        debug!("Located {} references", located.len());

        let outcomes: Vec<ValidationOutcome> = stream::iter(located)
            .map(|reference| classify(resolver, reference))
            .buffered(self.max_concurrent_lookups)
            .collect()
            .await;

        let report = ValidationReport {
            outcomes,
            distinct_lookups: resolver.distinct_lookups(),
        };

        if report.is_clean() {
            info!("✓ All {} references resolved", report.len());
        } else {
            info!(
                "{} of {} references failed validation ({} retryable)",
                report.failures().count(),
                report.len(),
                report.retryable().count()
            );
        }

        report
    }
}

async fn classify(resolver: &Resolver, located: LocatedReference<'_>) -> ValidationOutcome {
    let LocatedReference { path, reference } = located;
    let mut outcome = ValidationOutcome::new(path, reference.clone(), ValidationStatus::Valid);

    // A reference object is only allowed to exist without an id when it is empty
    if reference.is_blank() {
        outcome.status = ValidationStatus::Dangling;
        return outcome;
    }

    let resolution = resolver
        .resolve(reference.ref_type, &reference.ref_id, &reference.ref_version)
        .await;

    match resolution {
        Ok(Resolution::Found(record)) => {
            outcome.resolved_version = Some(record.version.clone());
            if record.kind != reference.ref_type {
                outcome.status = ValidationStatus::TypeMismatch;
                outcome.actual_kind = Some(record.kind);
            }
        }
        Ok(Resolution::NotFound) => outcome.status = ValidationStatus::Dangling,
        Ok(Resolution::VersionNotFound { latest }) => {
            outcome.status = ValidationStatus::StaleVersion;
            outcome.latest_version = latest;
        }
        Err(e) => {
            outcome.status = ValidationStatus::Unresolvable;
            outcome.detail = Some(e.to_string());
        }
    }

    outcome
}
