//! Where mapping resources come from.

use std::borrow::Cow;
use std::fs;
use std::path::PathBuf;

use super::embedded::{self, EMBEDDED_FAMILIES};
use crate::error::MappingError;

/// File extension of on-disk mapping resources.
const RESOURCE_EXTENSION: &str = "json";

/// A set of mapping resources, one per schema family.
pub trait MappingSource: Send + Sync {
    /// Families with a resource, in ascending order.
    fn families(&self) -> Result<Vec<String>, MappingError>;

    /// Resource text for a family, or `None` if the source has none.
    fn read(&self, family: &str) -> Result<Option<Cow<'_, str>>, MappingError>;
}

/// Resources compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedMappings;

impl MappingSource for EmbeddedMappings {
    fn families(&self) -> Result<Vec<String>, MappingError> {
        Ok(EMBEDDED_FAMILIES.iter().map(|f| f.to_string()).collect())
    }

    fn read(&self, family: &str) -> Result<Option<Cow<'_, str>>, MappingError> {
        Ok(embedded::resource(family).map(Cow::Borrowed))
    }
}

/// Resources stored as `<family>.json` files in a directory.
#[derive(Debug, Clone)]
pub struct DirectoryMappings {
    dir: PathBuf,
}

impl DirectoryMappings {
    /// Create a source reading from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn resource_path(&self, family: &str) -> Option<PathBuf> {
        // Families come from document attributes; never let one escape the directory.
        let safe = !family.is_empty()
            && family
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !family.contains("..");
        safe.then(|| self.dir.join(format!("{family}.{RESOURCE_EXTENSION}")))
    }
}

impl MappingSource for DirectoryMappings {
    fn families(&self) -> Result<Vec<String>, MappingError> {
        let mut families = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let extension = path.extension().and_then(|e| e.to_str());
            if !path.is_file() || extension != Some(RESOURCE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                families.push(stem.to_string());
            }
        }
        families.sort();
        Ok(families)
    }

    fn read(&self, family: &str) -> Result<Option<Cow<'_, str>>, MappingError> {
        let Some(path) = self.resource_path(family) else {
            return Ok(None);
        };
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(Cow::Owned(fs::read_to_string(path)?)))
    }
}
