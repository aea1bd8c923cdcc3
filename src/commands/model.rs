use anyhow::{Result, bail};
use std::path::Path;

use lcaref::graph::ExchangeGraph;
use lcaref::models::ModelDocument;

use super::output::print_graph;
use super::{Context, OutputFormat, report_document_error};

pub async fn model_command(context: &Context, path: &Path) -> Result<()> {
    let document = ModelDocument::load(path).map_err(report_document_error)?;
    let mut graph = ExchangeGraph::from_document(&document)?;
    let stores = context.stores()?;

    let report = graph.validate(&stores).await;

    match context.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_graph(&report),
    }

    if report.has_blocking() {
        let broken = report
            .edges
            .iter()
            .filter(|edge| edge.state.is_blocking())
            .count();
        bail!("{broken} edge(s) need repair");
    }
    Ok(())
}
