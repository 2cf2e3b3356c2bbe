//! Record extraction from parsed filings.
//!
//! A filing yields one [`CommonRecord`] and, per requested form, a lazy
//! [`FormRecords`] sequence with one merged record per repeated element.
//! Sequences borrow the document, so they cannot outlive it.

use std::iter::Peekable;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::document::path::{extract_scalar, select_first, Selection};
use crate::document::FilingDocument;
use crate::error::ExtractError;
use crate::mapping::{MappingCatalog, MappingTable};
use crate::models::record::{CommonRecord, FormRecord};

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Extracts records from filings using a shared mapping catalog.
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    catalog: Arc<MappingCatalog>,
}

impl RecordExtractor {
    /// Create an extractor over a catalog.
    pub fn new(catalog: Arc<MappingCatalog>) -> Self {
        Self { catalog }
    }

    /// Extract the common record and one lazy record sequence per form.
    ///
    /// Fails without partial output when the document's schema family has
    /// no mapping or a requested form is not mapped for it.
    pub fn extract<'d, 'input, I, S>(
        &self,
        document: &'d FilingDocument<'input>,
        forms: I,
    ) -> Result<Extraction<'d, 'input>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let version = document.schema_version();
        let table = self.catalog.load(version)?;
        let root = document.root();

        let paths = table.common();
        let common = CommonRecord {
            ein: extract_scalar(root, &paths.ein),
            name: extract_scalar(root, &paths.name),
            return_type: extract_scalar(root, &paths.return_type),
            tax_year: extract_scalar(root, &paths.tax_year),
            tax_period_start: extract_scalar(root, &paths.tax_period_start),
            tax_period_end: extract_scalar(root, &paths.tax_period_end),
        };

        let mut sequences = IndexMap::new();
        for form in forms {
            let form = form.as_ref();
            if sequences.contains_key(form) {
                continue;
            }

            let mapping = table.form(form).ok_or_else(|| ExtractError::UnknownForm {
                form: form.to_string(),
                family: table.family().to_string(),
            })?;
            let elements = select_first(root, mapping.base_path().candidates());

            sequences.insert(
                form.to_string(),
                FormRecords {
                    form: form.to_string(),
                    common: common.clone(),
                    table: Arc::clone(&table),
                    elements,
                },
            );
        }

        debug!(
            "Extracting {} form(s) from {} filing {}",
            sequences.len(),
            version,
            common.ein.as_deref().unwrap_or("<no ein>")
        );

        Ok(Extraction {
            version: version.to_string(),
            table,
            common,
            forms: sequences,
        })
    }
}

/// Everything extracted from one filing.
pub struct Extraction<'d, 'input> {
    version: String,
    table: Arc<MappingTable>,
    common: CommonRecord,
    forms: IndexMap<String, FormRecords<'d, 'input>>,
}

impl<'d, 'input> Extraction<'d, 'input> {
    /// Declared schema version of the filing.
    pub fn schema_version(&self) -> &str {
        &self.version
    }

    /// Mapping table used for the filing.
    pub fn table(&self) -> &Arc<MappingTable> {
        &self.table
    }

    /// Common fields of the filing.
    pub fn common(&self) -> &CommonRecord {
        &self.common
    }

    /// Requested forms, in request order.
    pub fn forms(&self) -> impl Iterator<Item = &str> {
        self.forms.keys().map(String::as_str)
    }

    /// Take the record sequence for a form out of the extraction.
    pub fn take(&mut self, form: &str) -> Option<FormRecords<'d, 'input>> {
        self.forms.shift_remove(form)
    }

    /// Consume the extraction, yielding each form's sequence in request order.
    pub fn into_forms(self) -> impl Iterator<Item = (String, FormRecords<'d, 'input>)> {
        self.forms.into_iter()
    }
}

/// Lazy sequence of records for one form, in document order.
///
/// Elements are visited only as records are pulled; dropping the sequence
/// early leaves the rest of the document untouched.
pub struct FormRecords<'d, 'input> {
    form: String,
    common: CommonRecord,
    table: Arc<MappingTable>,
    elements: Peekable<Selection<'d, 'input>>,
}

impl FormRecords<'_, '_> {
    /// Form these records belong to.
    pub fn form(&self) -> &str {
        &self.form
    }
}

impl Iterator for FormRecords<'_, '_> {
    type Item = FormRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.elements.next()?;
        let mapping = self.table.form(&self.form)?;

        let mut record = FormRecord::from_common(&self.common);
        for (name, spec) in mapping.fields() {
            record.insert(name.as_str(), extract_scalar(element, spec));
        }

        trace!("Produced {} record with {} fields", self.form, record.len());
        Some(record)
    }
}
