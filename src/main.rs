use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use lcaref::models::EntityKind;

mod commands;

use commands::{Context, OutputFormat};

#[derive(Parser)]
#[command(
    name = "lcaref",
    about = "Checks references between versioned LCA datasets",
    version,
    author,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory of `<id>_<version>.json` datasets to resolve references against
    #[arg(short, long, env = "LCAREF_STORE", global = true)]
    store: Option<PathBuf>,

    /// Path to the lcaref configuration file (defaults to ./lcaref.yml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    /// Enable verbose output (use -vv for debug output)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List every reference embedded in a dataset document
    Locate {
        /// Dataset document (JSON)
        document: PathBuf,
    },

    /// Resolve and classify every reference in a dataset document
    Validate {
        /// Dataset document (JSON)
        document: PathBuf,

        /// Dataset kind, used to pick the section table (detected from the root key if omitted)
        #[arg(short, long)]
        kind: Option<EntityKind>,

        /// Maximum number of lookups in flight at once
        #[arg(long)]
        max_concurrent_lookups: Option<usize>,
    },

    /// Validate the exchange edges of a life-cycle model
    Model {
        /// Model document (JSON with `nodes` and `edges`)
        model: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbose flag
    init_logging(cli.verbose);

    let context = Context::new(cli.config.as_deref(), cli.store, cli.format)?;

    match cli.command {
        Commands::Locate { document } => commands::locate_command(&context, &document)?,
        Commands::Validate {
            document,
            kind,
            max_concurrent_lookups,
        } => {
            commands::validate_command(&context, &document, kind, max_concurrent_lookups).await?
        }
        Commands::Model { model } => commands::model_command(&context, &model).await?,
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbose {
        0 => EnvFilter::new("lcaref=warn"),
        1 => EnvFilter::new("lcaref=info"),
        _ => EnvFilter::new("lcaref=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
