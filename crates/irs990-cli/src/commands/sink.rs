//! Per-form CSV output.

use std::fs::{self, File};
use std::path::PathBuf;

use anyhow::Context;
use indexmap::IndexMap;
use tracing::debug;

use irs990_core::error::FilingError;
use irs990_core::{FormRecord, Irs990Config, MappingCatalog, RecordSink, COMMON_COLUMNS};

struct FormWriter {
    path: PathBuf,
    header: Vec<String>,
    writer: csv::Writer<File>,
}

/// Writes each form's records to `<prefix>-<form>.csv`.
///
/// The header is the six common columns followed by every field name any
/// mapping resource declares for the form, so files from different batches
/// line up regardless of which schema versions they contained.
pub struct CsvSink {
    writers: IndexMap<String, FormWriter>,
}

impl CsvSink {
    /// Create one output file per form and write its header.
    pub fn create(
        config: &Irs990Config,
        catalog: &MappingCatalog,
        forms: &[String],
    ) -> anyhow::Result<Self> {
        fs::create_dir_all(&config.output.directory)
            .with_context(|| format!("Failed to create {}", config.output.directory.display()))?;

        let mut writers = IndexMap::new();
        for form in forms {
            if writers.contains_key(form) {
                continue;
            }

            let universe = catalog
                .field_name_universe(form)
                .with_context(|| format!("Failed to read field names for {}", form))?;
            if universe.is_empty() {
                anyhow::bail!("No mapping declares form '{}'", form);
            }

            let header = COMMON_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .chain(universe)
                .collect::<Vec<_>>();

            let path = config.output_path(form);
            let mut writer = csv::Writer::from_path(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            writer.write_record(&header)?;
            debug!("Writing {} columns to {}", header.len(), path.display());

            writers.insert(form.clone(), FormWriter { path, header, writer });
        }

        Ok(Self { writers })
    }

    /// Output files, in form order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.writers.values().map(|w| w.path.clone()).collect()
    }
}

impl RecordSink for CsvSink {
    fn write(&mut self, form: &str, record: &FormRecord) -> Result<(), FilingError> {
        let out = self
            .writers
            .get_mut(form)
            .ok_or_else(|| FilingError::Sink(format!("no output opened for form '{}'", form)))?;

        let row = out.header.iter().map(|column| record.get(column).unwrap_or(""));
        out.writer
            .write_record(row)
            .map_err(|e| FilingError::Sink(format!("{}: {}", out.path.display(), e)))
    }

    fn finish(&mut self) -> Result<(), FilingError> {
        for out in self.writers.values_mut() {
            out.writer.flush().map_err(|source| FilingError::Io {
                path: out.path.display().to_string(),
                source,
            })?;
        }
        Ok(())
    }
}
