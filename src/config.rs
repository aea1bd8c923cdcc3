//! `lcaref.yml` configuration
//!
//! Every field is optional; a missing file means defaults throughout.
//!
//! ```yaml
//! store:
//!   root: ./datasets
//! validation:
//!   max_concurrent_lookups: 8
//! reference_shapes:
//!   - id_field: "@refObjectId"
//!     type_field: "@type"
//!     version_field: "@version"
//! sections:
//!   process:
//!     - id: exchanges
//!       prefixes: [/processDataSet/exchanges]
//! ```

use miette::{Diagnostic, NamedSource, SourceSpan};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::models::{EntityKind, ReferenceShape};
use crate::validation::{
    DEFAULT_MAX_CONCURRENT_LOOKUPS, SectionDefinition, UNMAPPED_SECTION, default_sections,
};

pub const DEFAULT_CONFIG_FILE: &str = "lcaref.yml";

#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    #[diagnostic(code(lcaref::config::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {path}: {message}")]
    #[diagnostic(code(lcaref::config::parse))]
    Parse {
        path: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: Option<SourceSpan>,
        message: String,
    },

    #[error("invalid configuration in {path}: {message}")]
    #[diagnostic(
        code(lcaref::config::invalid),
        help("every setting is optional; remove a key to fall back to its default")
    )]
    Invalid { path: String, message: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub store: StoreConfig,
    pub validation: ValidationConfig,
    /// Replaces the built-in reference shapes when set
    pub reference_shapes: Option<Vec<ReferenceShape>>,
    /// Per-kind section tables; kinds not listed keep their built-in table
    pub sections: HashMap<EntityKind, Vec<SectionDefinition>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Directory of `<id>_<version>.json` dataset files
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    pub max_concurrent_lookups: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_concurrent_lookups: DEFAULT_MAX_CONCURRENT_LOOKUPS,
        }
    }
}

impl Config {
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Load and check a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;

        let config = Self::from_yaml(&content).map_err(|e| ConfigError::Parse {
            path: display.clone(),
            span: e.location().map(|location| SourceSpan::from(location.index())),
            message: e.to_string(),
            src: NamedSource::new(display.clone(), content.clone()),
        })?;

        config.check(&display)?;
        debug!("✓ Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `explicit` if given, otherwise `lcaref.yml` in `dir` when present
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            debug!("No {DEFAULT_CONFIG_FILE} found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn reference_shapes(&self) -> Vec<ReferenceShape> {
        self.reference_shapes
            .clone()
            .unwrap_or_else(ReferenceShape::defaults)
    }

    pub fn sections_for(&self, kind: EntityKind) -> Vec<SectionDefinition> {
        self.sections
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| default_sections(kind))
    }

    fn check(&self, path: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::Invalid {
            path: path.to_string(),
            message,
        };

        if self.validation.max_concurrent_lookups == 0 {
            return Err(invalid("validation.max_concurrent_lookups must be at least 1".to_string()));
        }

        if let Some(shapes) = &self.reference_shapes {
            if shapes.is_empty() {
                return Err(invalid("reference_shapes must list at least one shape".to_string()));
            }
            if let Some(shape) = shapes
                .iter()
                .find(|shape| shape.id_field.trim().is_empty() || shape.type_field.trim().is_empty())
            {
                return Err(invalid(format!(
                    "reference shape {shape:?} needs both an id_field and a type_field"
                )));
            }
        }

        for (kind, definitions) in &self.sections {
            if let Some(definition) = definitions.iter().find(|d| d.id.trim().is_empty()) {
                return Err(invalid(format!(
                    "a {kind} section with prefixes {:?} has no id",
                    definition
                        .path_prefixes
                        .iter()
                        .map(|p| p.as_str())
                        .collect::<Vec<_>>()
                )));
            }
            if definitions.iter().any(|d| d.id == UNMAPPED_SECTION) {
                return Err(invalid(format!(
                    "'{UNMAPPED_SECTION}' is reserved and cannot name a {kind} section"
                )));
            }
        }

        Ok(())
    }
}
