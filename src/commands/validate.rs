use anyhow::{Result, bail};
use serde_json::json;
use std::path::Path;
use tracing::debug;

use lcaref::models::{DatasetNode, EntityKind};
use lcaref::validation::{SectionFlags, Validator, map_to_sections};

use super::output::print_validation;
use super::{Context, OutputFormat};

pub async fn validate_command(
    context: &Context,
    path: &Path,
    kind: Option<EntityKind>,
    max_concurrent_lookups: Option<usize>,
) -> Result<()> {
    let document = context.load_document(path)?;
    let stores = context.stores()?;

    let kind = kind.or_else(|| detect_kind(&document));
    let limit = max_concurrent_lookups.unwrap_or(context.config.validation.max_concurrent_lookups);

    let validator = Validator::new(stores).with_max_concurrent_lookups(limit);
    let report = validator.validate(&document).await;

    let sections = match kind {
        Some(kind) => {
            debug!("Mapping outcomes onto {kind} sections");
            map_to_sections(&report.outcomes, &context.config.sections_for(kind))
        }
        None => {
            debug!("Dataset kind unknown, skipping section mapping");
            SectionFlags::default()
        }
    };

    match context.format {
        OutputFormat::Json => {
            let output = json!({
                "kind": kind,
                "outcomes": report.outcomes,
                "distinctLookups": report.distinct_lookups,
                "sections": sections,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => print_validation(&report, &sections),
    }

    let failures = report.failures().count();
    if failures > 0 {
        bail!("{failures} reference(s) failed validation");
    }
    Ok(())
}

/// The kind whose dataset key is a top-level field of the document
fn detect_kind(document: &DatasetNode) -> Option<EntityKind> {
    EntityKind::ALL
        .into_iter()
        .find(|kind| document.get(kind.dataset_key()).is_some())
}
