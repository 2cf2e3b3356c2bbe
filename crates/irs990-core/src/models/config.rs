//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::mapping::{DirectoryMappings, MappingCatalog, DEFAULT_FORMS};

/// Main configuration for the irs990 pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Irs990Config {
    /// Mapping catalog configuration.
    pub mappings: MappingConfig,

    /// Filing selection and storage configuration.
    pub filings: FilingConfig,

    /// Tabular output configuration.
    pub output: OutputConfig,
}

/// Mapping catalog configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Directory of `<family>.json` resources; bundled resources when unset.
    pub directory: Option<PathBuf>,

    /// Forms every mapping resource must declare.
    pub required_forms: Vec<String>,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            required_forms: DEFAULT_FORMS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Filing selection and storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilingConfig {
    /// Primary return type code to extract.
    pub return_type: String,

    /// Legacy index codes accepted as the same return type.
    pub return_type_aliases: Vec<String>,

    /// Suffix appended to an object id to name its document.
    pub document_suffix: String,

    /// Forms extracted when none are requested explicitly.
    pub default_forms: Vec<String>,
}

impl Default for FilingConfig {
    fn default() -> Self {
        Self {
            return_type: "990".to_string(),
            return_type_aliases: vec!["990O".to_string()],
            document_suffix: "_public.xml".to_string(),
            default_forms: vec!["990".to_string()],
        }
    }
}

/// Tabular output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for output files.
    pub directory: PathBuf,

    /// Output file name prefix; files are named `<prefix>-<form>.csv`.
    pub prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            prefix: "irs990".to_string(),
        }
    }
}

impl Irs990Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Build the mapping catalog this configuration describes.
    pub fn catalog(&self) -> MappingCatalog {
        let catalog = match &self.mappings.directory {
            Some(dir) => MappingCatalog::new(DirectoryMappings::new(dir)),
            None => MappingCatalog::embedded(),
        };
        catalog.with_required_forms(self.mappings.required_forms.iter().cloned())
    }

    /// Path of the output file for a form.
    pub fn output_path(&self, form: &str) -> PathBuf {
        self.output
            .directory
            .join(format!("{}-{}.csv", self.output.prefix, form))
    }
}
