//! Batch routing of filings to record sinks.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::document::FilingDocument;
use crate::error::FilingError;
use crate::extract::RecordExtractor;
use crate::filing::index::FilingIndex;
use crate::filing::locator::{FilingSource, LocationResolver};
use crate::models::record::FormRecord;

/// A return type code plus the legacy codes accepted as equivalent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnTypeClass {
    primary: String,
    aliases: Vec<String>,
}

impl ReturnTypeClass {
    /// Accept exactly one code.
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            aliases: Vec::new(),
        }
    }

    /// Also accept `alias`.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// The primary code.
    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// Whether an index return type belongs to this class.
    pub fn accepts(&self, code: &str) -> bool {
        let code = code.trim();
        code == self.primary || self.aliases.iter().any(|a| a == code)
    }
}

impl Default for ReturnTypeClass {
    fn default() -> Self {
        Self::new("990").with_alias("990O")
    }
}

/// Destination for extracted records.
pub trait RecordSink {
    /// Accept one record of `form`.
    fn write(&mut self, form: &str, record: &FormRecord) -> Result<(), FilingError>;

    /// Flush buffered output once the batch is done.
    fn finish(&mut self) -> Result<(), FilingError> {
        Ok(())
    }
}

/// Sink that keeps every record in memory, grouped by form.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct MemorySink {
    records: IndexMap<String, Vec<FormRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records of one form, in arrival order.
    pub fn records(&self, form: &str) -> &[FormRecord] {
        self.records.get(form).map(Vec::as_slice).unwrap_or_default()
    }
}

impl RecordSink for MemorySink {
    fn write(&mut self, form: &str, record: &FormRecord) -> Result<(), FilingError> {
        self.records
            .entry(form.to_string())
            .or_default()
            .push(record.clone());
        Ok(())
    }
}

/// One filing that produced no records because it failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilingFailure {
    pub object_id: String,
    pub origin: Option<String>,
    pub reason: String,
}

/// Counters and diagnostics of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Filings examined.
    pub considered: usize,
    /// Filings skipped because of their return type.
    pub skipped_return_type: usize,
    /// Filings no location could supply.
    pub not_found: usize,
    /// Filings extracted successfully.
    pub processed: usize,
    /// Records written per form.
    pub records: IndexMap<String, usize>,
    /// Filings that failed, in processing order.
    pub failures: Vec<FilingFailure>,
}

impl RunSummary {
    /// Total records written across all forms.
    pub fn total_records(&self) -> usize {
        self.records.values().sum()
    }

    fn fail(&mut self, object_id: &str, origin: Option<&str>, reason: impl ToString) {
        let reason = reason.to_string();
        warn!(
            "Skipping filing {} ({}): {}",
            object_id,
            origin.unwrap_or("unknown origin"),
            reason
        );
        self.failures.push(FilingFailure {
            object_id: object_id.to_string(),
            origin: origin.map(str::to_string),
            reason,
        });
    }
}

/// Routes filings from storage through the extractor into a sink.
///
/// A filing that cannot be read, parsed, or mapped is recorded in the
/// [`RunSummary`] and the batch moves on. Only sink failures abort a run.
#[derive(Debug, Clone)]
pub struct FilingRouter {
    extractor: RecordExtractor,
    forms: Vec<String>,
    return_types: ReturnTypeClass,
    limit: Option<usize>,
}

impl FilingRouter {
    /// Create a router extracting `forms` from every accepted filing.
    pub fn new<I, S>(extractor: RecordExtractor, forms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extractor,
            forms: forms.into_iter().map(Into::into).collect(),
            return_types: ReturnTypeClass::default(),
            limit: None,
        }
    }

    /// Restrict index runs to a return type class.
    pub fn with_return_types(mut self, return_types: ReturnTypeClass) -> Self {
        self.return_types = return_types;
        self
    }

    /// Stop after considering `limit` filings.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Forms extracted from each filing.
    pub fn forms(&self) -> &[String] {
        &self.forms
    }

    /// Process every accepted filing in an index, in listing order.
    pub fn run(
        &self,
        index: &FilingIndex,
        locations: &mut LocationResolver,
        sink: &mut dyn RecordSink,
    ) -> Result<RunSummary, FilingError> {
        self.run_with(index, locations, sink, &mut |_| {})
    }

    /// Like [`run`](Self::run), calling `progress` after each filing.
    pub fn run_with(
        &self,
        index: &FilingIndex,
        locations: &mut LocationResolver,
        sink: &mut dyn RecordSink,
        progress: &mut dyn FnMut(&str),
    ) -> Result<RunSummary, FilingError> {
        let mut summary = RunSummary::default();

        for entry in index.iter().take(self.limit.unwrap_or(usize::MAX)) {
            summary.considered += 1;

            if !self.return_types.accepts(&entry.return_type) {
                summary.skipped_return_type += 1;
                progress(&entry.object_id);
                continue;
            }

            match locations.open(&entry.object_id) {
                Ok(Some(source)) => self.process(&source, sink, &mut summary)?,
                Ok(None) => {
                    debug!("Filing {} not found in any location", entry.object_id);
                    summary.not_found += 1;
                }
                Err(e) => summary.fail(&entry.object_id, None, e),
            }
            progress(&entry.object_id);
        }

        sink.finish()?;
        info!(
            "Processed {} of {} filing(s), {} record(s), {} failure(s)",
            summary.processed,
            summary.considered,
            summary.total_records(),
            summary.failures.len()
        );
        Ok(summary)
    }

    /// Process every filing the locations hold, without an index.
    ///
    /// Filings are visited year by year; return types are not filtered
    /// since no index declares them.
    pub fn run_documents(
        &self,
        locations: &mut LocationResolver,
        sink: &mut dyn RecordSink,
        progress: &mut dyn FnMut(&str),
    ) -> Result<RunSummary, FilingError> {
        let mut summary = RunSummary::default();
        let inventory = locations.inventory()?;

        for (year, object_id) in inventory.iter().take(self.limit.unwrap_or(usize::MAX)) {
            summary.considered += 1;

            match locations.open_in(year, object_id) {
                Ok(Some(source)) => self.process(&source, sink, &mut summary)?,
                Ok(None) => summary.not_found += 1,
                Err(e) => summary.fail(object_id, None, e),
            }
            progress(object_id);
        }

        sink.finish()?;
        info!(
            "Processed {} of {} stored filing(s), {} record(s), {} failure(s)",
            summary.processed,
            summary.considered,
            summary.total_records(),
            summary.failures.len()
        );
        Ok(summary)
    }

    /// Extract one filing into the sink.
    ///
    /// Parse and mapping failures are recorded in `summary`; the error
    /// returned is the sink's.
    pub fn process(
        &self,
        source: &FilingSource,
        sink: &mut dyn RecordSink,
        summary: &mut RunSummary,
    ) -> Result<(), FilingError> {
        let origin = Some(source.origin.as_str());

        let document = match FilingDocument::parse(&source.text) {
            Ok(document) => document,
            Err(e) => {
                summary.fail(&source.object_id, origin, e);
                return Ok(());
            }
        };

        let extraction = match self.extractor.extract(&document, &self.forms) {
            Ok(extraction) => extraction,
            Err(e) => {
                summary.fail(&source.object_id, origin, e);
                return Ok(());
            }
        };

        for (form, records) in extraction.into_forms() {
            let mut written = 0usize;
            for record in records {
                sink.write(&form, &record)?;
                written += 1;
            }
            *summary.records.entry(form).or_default() += written;
        }

        summary.processed += 1;
        Ok(())
    }
}
