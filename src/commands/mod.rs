mod locate;
mod model;
mod output;
mod validate;

pub use locate::locate_command;
pub use model::model_command;
pub use output::OutputFormat;
pub use validate::validate_command;

use anyhow::{Context as _, Result, bail};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lcaref::config::Config;
use lcaref::models::{DatasetNode, DocumentError};
use lcaref::store::{DirectoryStore, StoreRegistry};

/// Settings shared by every subcommand
pub struct Context {
    pub config: Config,
    pub store_root: Option<PathBuf>,
    pub format: OutputFormat,
}

impl Context {
    /// Load the config file; a `--store` flag wins over `store.root`
    pub fn new(config_path: Option<&Path>, store: Option<PathBuf>, format: OutputFormat) -> Result<Self> {
        let current_dir = std::env::current_dir()?;
        let config = match Config::discover(config_path, &current_dir) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("{:?}", miette::Report::new(err));
                bail!("Failed to load configuration");
            }
        };

        let store_root = store.or_else(|| config.store.root.clone());
        Ok(Self {
            config,
            store_root,
            format,
        })
    }

    pub fn stores(&self) -> Result<StoreRegistry> {
        let Some(root) = &self.store_root else {
            bail!("No dataset store configured; pass --store, set LCAREF_STORE, or set store.root in lcaref.yml");
        };

        let store = DirectoryStore::open(root)
            .with_context(|| format!("Failed to open dataset store at {}", root.display()))?;
        Ok(StoreRegistry::shared(Arc::new(store)))
    }

    pub fn load_document(&self, path: &Path) -> Result<DatasetNode> {
        DatasetNode::load(path, &self.config.reference_shapes()).map_err(report_document_error)
    }
}

pub fn report_document_error(err: DocumentError) -> anyhow::Error {
    eprintln!("{:?}", miette::Report::new(err));
    anyhow::anyhow!("Failed to load document")
}
