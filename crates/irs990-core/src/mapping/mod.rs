//! Versioned field-mapping catalog.
//!
//! Each schema family (the year part of a filing's `returnVersion`) has one
//! mapping resource that locates the six common fields, the base path of each
//! form's repeated elements, and the ordered field list of each form. Tables
//! are loaded lazily, validated once and shared for the catalog's lifetime.

mod embedded;
mod resource;
mod source;

pub use embedded::EMBEDDED_FAMILIES;
pub use source::{DirectoryMappings, EmbeddedMappings, MappingSource};

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexSet;
use tracing::debug;

use crate::document::path::PathExpr;
use crate::error::MappingError;

/// Separator between the family and the revision in a schema version.
pub const VERSION_SEPARATOR: char = 'v';

/// Output names of the six common fields, in column order.
pub const COMMON_COLUMNS: [&str; 6] = [
    "ein",
    "name",
    "returntype",
    "taxyear",
    "taxperiodstart",
    "taxperiodend",
];

/// Forms every bundled resource declares.
pub const DEFAULT_FORMS: [&str; 2] = ["990", "BondIssue"];

/// Derive the schema family from a schema version ("2016v3.1" -> "2016").
///
/// A version without a separator is its own family.
pub fn family_key(version: &str) -> &str {
    match version.rfind(VERSION_SEPARATOR) {
        Some(pos) => &version[..pos],
        None => version,
    }
}

/// Ordered candidate paths for one field; empty means the field does not
/// exist in this schema family.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSpec {
    candidates: Vec<PathExpr>,
}

impl FieldSpec {
    /// Create a spec from compiled candidates.
    pub fn new(candidates: Vec<PathExpr>) -> Self {
        Self { candidates }
    }

    /// Compile a spec from path strings, most specific first.
    pub fn parse<I, S>(paths: I) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let candidates = paths
            .into_iter()
            .map(|p| PathExpr::compile(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(candidates))
    }

    /// Candidate paths in evaluation order.
    pub fn candidates(&self) -> &[PathExpr] {
        &self.candidates
    }

    /// Whether the field is absent from the schema.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// The first candidate as written, if any.
    pub fn primary(&self) -> Option<&str> {
        self.candidates.first().map(PathExpr::as_str)
    }
}

/// Path specs for the six common fields.
#[derive(Debug, Clone)]
pub struct CommonPaths {
    pub ein: FieldSpec,
    pub name: FieldSpec,
    pub return_type: FieldSpec,
    pub tax_year: FieldSpec,
    pub tax_period_start: FieldSpec,
    pub tax_period_end: FieldSpec,
}

impl CommonPaths {
    /// Specs paired with their output column names, in column order.
    pub fn entries(&self) -> [(&'static str, &FieldSpec); 6] {
        [
            (COMMON_COLUMNS[0], &self.ein),
            (COMMON_COLUMNS[1], &self.name),
            (COMMON_COLUMNS[2], &self.return_type),
            (COMMON_COLUMNS[3], &self.tax_year),
            (COMMON_COLUMNS[4], &self.tax_period_start),
            (COMMON_COLUMNS[5], &self.tax_period_end),
        ]
    }
}

/// Mapping for one form: where its elements live and what to read from each.
#[derive(Debug, Clone)]
pub struct FormMapping {
    base_path: FieldSpec,
    fields: Vec<(String, FieldSpec)>,
}

impl FormMapping {
    /// Location of the form's repeated elements, relative to the document root.
    pub fn base_path(&self) -> &FieldSpec {
        &self.base_path
    }

    /// Field specs relative to each element, in declaration order.
    pub fn fields(&self) -> &[(String, FieldSpec)] {
        &self.fields
    }
}

/// Validated mapping table for one schema family.
#[derive(Debug)]
pub struct MappingTable {
    family: String,
    common: CommonPaths,
    forms: indexmap::IndexMap<String, FormMapping>,
}

impl MappingTable {
    /// Schema family this table serves.
    pub fn family(&self) -> &str {
        &self.family
    }

    /// Common field specs.
    pub fn common(&self) -> &CommonPaths {
        &self.common
    }

    /// Mapping for a form, if the family declares it.
    pub fn form(&self, form: &str) -> Option<&FormMapping> {
        self.forms.get(form)
    }

    /// Ordered field list for a form.
    pub fn fields(&self, form: &str) -> Option<&[(String, FieldSpec)]> {
        self.form(form).map(FormMapping::fields)
    }

    /// Base path spec for a form.
    pub fn base_path(&self, form: &str) -> Option<&FieldSpec> {
        self.form(form).map(FormMapping::base_path)
    }

    /// Declared form identifiers, in resource order.
    pub fn forms(&self) -> impl Iterator<Item = &str> {
        self.forms.keys().map(String::as_str)
    }
}

/// Loads, validates and caches mapping tables per schema family.
///
/// The cache is append-only: a table is inserted once per family and never
/// replaced, so every caller asking for the same family shares one `Arc`.
pub struct MappingCatalog {
    source: Box<dyn MappingSource>,
    required_forms: Vec<String>,
    tables: RwLock<HashMap<String, Arc<MappingTable>>>,
}

impl MappingCatalog {
    /// Create a catalog over a resource source.
    pub fn new(source: impl MappingSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            required_forms: DEFAULT_FORMS.iter().map(|f| f.to_string()).collect(),
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Create a catalog over the bundled resources.
    pub fn embedded() -> Self {
        Self::new(EmbeddedMappings)
    }

    /// Set the forms every resource must declare.
    pub fn with_required_forms<I, S>(mut self, forms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_forms = forms.into_iter().map(Into::into).collect();
        self
    }

    /// Forms every resource must declare.
    pub fn required_forms(&self) -> &[String] {
        &self.required_forms
    }

    /// Get the mapping table for a schema version.
    pub fn load(&self, version: &str) -> Result<Arc<MappingTable>, MappingError> {
        let family = family_key(version);

        if let Some(table) = self
            .tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(family)
        {
            return Ok(Arc::clone(table));
        }

        let text = self
            .source
            .read(family)?
            .ok_or_else(|| MappingError::ResourceNotFound {
                family: family.to_string(),
            })?;
        let table = resource::build_table(family, &text, &self.required_forms)?;
        debug!("Loaded mapping table for schema family {}", family);

        // A concurrent load of the same family may have won the race; keep
        // whichever table was inserted first.
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let table = tables
            .entry(family.to_string())
            .or_insert_with(|| Arc::new(table));
        Ok(Arc::clone(table))
    }

    /// Union of the field names declared for `form` across every resource.
    ///
    /// Names keep first-seen order, walking families in ascending order, so
    /// the result is stable for use as an output header.
    pub fn field_name_universe(&self, form: &str) -> Result<IndexSet<String>, MappingError> {
        let mut names = IndexSet::new();
        for family in self.source.families()? {
            let table = self.load(&family)?;
            if let Some(fields) = table.fields(form) {
                names.extend(fields.iter().map(|(name, _)| name.clone()));
            }
        }
        Ok(names)
    }

    /// Number of families currently cached.
    pub fn cached_families(&self) -> usize {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl std::fmt::Debug for MappingCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingCatalog")
            .field("required_forms", &self.required_forms)
            .field("cached_families", &self.cached_families())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_family_key() {
        assert_eq!(family_key("2016v3.1"), "2016");
        assert_eq!(family_key("2013v2.0"), "2013");
        assert_eq!(family_key("2016"), "2016");
        assert_eq!(family_key(""), "");
    }

    #[test]
    fn test_load_shares_table_within_family() {
        let catalog = MappingCatalog::embedded();

        let m2013v20 = catalog.load("2013v2.0").unwrap();
        let m2013v21 = catalog.load("2013v2.1").unwrap();
        let m2016v30 = catalog.load("2016v3.0").unwrap();
        let m2016v31 = catalog.load("2016v3.1").unwrap();
        let m2017v22 = catalog.load("2017v2.2").unwrap();

        assert!(Arc::ptr_eq(&m2013v20, &m2013v21));
        assert!(Arc::ptr_eq(&m2016v30, &m2016v31));
        assert!(!Arc::ptr_eq(&m2016v31, &m2017v22));
        assert_eq!(catalog.cached_families(), 3);
    }

    #[test]
    fn test_mapping_2013() {
        let catalog = MappingCatalog::embedded();
        let m = catalog.load("2013v2.0").unwrap();

        assert_eq!(m.family(), "2013");
        assert_eq!(m.common().ein.primary(), Some("ReturnHeader/Filer/EIN"));
        assert_eq!(
            m.common().name.primary(),
            Some("ReturnHeader/Filer/BusinessName/BusinessNameLine1")
        );
        assert_eq!(m.common().tax_year.primary(), Some("ReturnHeader/TaxYr"));

        let fields = m.fields("990").unwrap();
        let (name, spec) = &fields[0];
        assert_eq!(name, "contributions");
        assert_eq!(spec.primary(), Some("CYContributionsGrantsAmt"));
        assert_eq!(fields.len(), 51);
    }

    #[test]
    fn test_mapping_2016() {
        let catalog = MappingCatalog::embedded();
        let m = catalog.load("2016v3.0").unwrap();

        assert_eq!(
            m.common().name.primary(),
            Some("ReturnHeader/Filer/BusinessName/BusinessNameLine1Txt")
        );
        let fields = m.fields("990").unwrap();
        assert_eq!(fields[0].0, "contributions");
        assert_eq!(fields.len(), 51);
        assert_eq!(
            m.base_path("BondIssue").and_then(FieldSpec::primary),
            Some("ReturnData/IRS990ScheduleK/TaxExemptBondsIssuesGrp")
        );
    }

    #[test]
    fn test_absent_field_has_empty_spec() {
        let catalog = MappingCatalog::embedded();
        let m = catalog.load("2019v5.1").unwrap();
        let fields = m.fields("990").unwrap();

        let (_, spec) = fields
            .iter()
            .find(|(name, _)| name == "permanentlyrestrictednetassets")
            .unwrap();
        assert!(spec.is_empty());
    }

    #[test]
    fn test_every_embedded_family_loads() {
        let catalog = MappingCatalog::embedded();
        for family in EMBEDDED_FAMILIES {
            let table = catalog.load(family).unwrap();
            assert_eq!(table.forms().collect::<Vec<_>>(), vec!["990", "BondIssue"]);
        }
        assert_eq!(catalog.cached_families(), EMBEDDED_FAMILIES.len());
    }

    #[test]
    fn test_unknown_family_is_resource_not_found() {
        let catalog = MappingCatalog::embedded();
        let err = catalog.load("1999v1.0").unwrap_err();
        assert!(matches!(err, MappingError::ResourceNotFound { family } if family == "1999"));
        assert_eq!(catalog.cached_families(), 0);
    }

    #[test]
    fn test_field_name_universe() {
        let catalog = MappingCatalog::embedded();

        let universe = catalog.field_name_universe("990").unwrap();
        assert_eq!(universe.len(), 51);
        assert_eq!(universe.first().map(String::as_str), Some("contributions"));

        let bonds = catalog.field_name_universe("BondIssue").unwrap();
        assert!(bonds.contains("cusip"));
        assert!(catalog.field_name_universe("990T").unwrap().is_empty());
    }
}
