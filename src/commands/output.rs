use colored::{ColoredString, Colorize};

use lcaref::graph::{EdgeState, GraphReport};
use lcaref::validation::{SectionFlags, UNMAPPED_SECTION, ValidationReport, ValidationStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

fn status_label(status: ValidationStatus) -> ColoredString {
    let label = status.to_string();
    match status {
        ValidationStatus::Valid => label.green(),
        ValidationStatus::Unresolvable => label.yellow(),
        _ => label.red(),
    }
}

fn edge_label(state: EdgeState) -> ColoredString {
    let label = state.to_string();
    match state {
        EdgeState::Valid => label.green(),
        EdgeState::Unvalidated | EdgeState::FlowDescriptorMismatch => label.yellow(),
        EdgeState::EndpointMissing | EdgeState::DirectionMismatch => label.red(),
    }
}

pub fn print_validation(report: &ValidationReport, sections: &SectionFlags) {
    if report.is_empty() {
        println!("No references found");
        return;
    }

    for outcome in &report.outcomes {
        let marker = if outcome.status.is_valid() {
            "✓".green()
        } else {
            "✗".red()
        };
        println!(
            "{marker} {}  [{}] {}",
            outcome.path.to_string().dimmed(),
            status_label(outcome.status),
            outcome.summary()
        );
    }

    println!("\nSections:");
    for (id, flagged) in sections.iter() {
        if flagged {
            println!("  {} {id}", "✗".red());
        } else {
            println!("  {} {id}", "✓".green());
        }
    }
    for path in sections.unmapped() {
        println!("  {} {UNMAPPED_SECTION}: {path}", "✗".red());
    }

    let failures = report.failures().count();
    let summary = format!(
        "\n{} reference(s), {} failed ({} retryable), {} lookup(s)",
        report.len(),
        failures,
        report.retryable().count(),
        report.distinct_lookups
    );
    if failures == 0 {
        println!("{}", summary.green());
    } else {
        println!("{}", summary.red());
    }
}

pub fn print_graph(report: &GraphReport) {
    println!("Edges:");
    if report.edges.is_empty() {
        println!("  (none)");
    }
    for edge in &report.edges {
        println!(
            "  #{} {} -> {}  [{}]",
            edge.id,
            format!("{}/{}", edge.edge.source, edge.edge.source_slot).bold(),
            format!("{}/{}", edge.edge.target, edge.edge.target_slot).bold(),
            edge_label(edge.state)
        );
        if let Some(detail) = &edge.detail {
            println!("      {}", detail.dimmed());
        }
    }

    println!("\nProcesses:");
    for node in &report.nodes {
        let resolved = match &node.resolved_version {
            Some(version) => format!("resolved to {version}").green(),
            None => "unresolved".red(),
        };
        let reference = if node.reference_complete {
            "reference flow declared".green()
        } else {
            "no reference flow".yellow()
        };
        println!("  {}  {resolved}, {reference}", node.process);
    }

    if !report.feedback_loops.is_empty() {
        println!("\nFeedback loops:");
        for processes in &report.feedback_loops {
            let names: Vec<String> = processes.iter().map(|p| p.to_string()).collect();
            println!("  {}", names.join(", "));
        }
    }
}
