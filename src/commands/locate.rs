use anyhow::Result;
use colored::Colorize;
use serde_json::json;
use std::path::Path;

use lcaref::validation::locate;

use super::{Context, OutputFormat};

pub fn locate_command(context: &Context, path: &Path) -> Result<()> {
    let document = context.load_document(path)?;

    match context.format {
        OutputFormat::Json => {
            let references: Vec<_> = locate(&document)
                .map(|located| {
                    json!({
                        "path": located.path,
                        "reference": located.reference,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&references)?);
        }
        OutputFormat::Text => {
            let mut count = 0;
            for located in locate(&document) {
                count += 1;
                let reference = located.reference;
                let id = if reference.is_blank() {
                    "(no id)".red().to_string()
                } else {
                    reference.ref_id.clone()
                };
                println!(
                    "{}  {} {}@{}",
                    located.path.to_string().dimmed(),
                    reference.ref_type.to_string().cyan(),
                    id,
                    reference.ref_version
                );
            }
            println!("\n{count} reference(s) found");
        }
    }

    Ok(())
}
