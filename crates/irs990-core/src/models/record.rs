//! Extracted record types.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::mapping::COMMON_COLUMNS;

/// The six identifying fields every filing carries, resolved once per document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonRecord {
    /// Filer employer identification number.
    pub ein: Option<String>,
    /// Filer business name (first line).
    pub name: Option<String>,
    /// Return type code declared in the header.
    pub return_type: Option<String>,
    /// Tax year.
    pub tax_year: Option<String>,
    /// First day of the tax period.
    pub tax_period_start: Option<String>,
    /// Last day of the tax period.
    pub tax_period_end: Option<String>,
}

impl CommonRecord {
    /// Values paired with their output column names, in column order.
    pub fn entries(&self) -> [(&'static str, Option<&str>); 6] {
        [
            (COMMON_COLUMNS[0], self.ein.as_deref()),
            (COMMON_COLUMNS[1], self.name.as_deref()),
            (COMMON_COLUMNS[2], self.return_type.as_deref()),
            (COMMON_COLUMNS[3], self.tax_year.as_deref()),
            (COMMON_COLUMNS[4], self.tax_period_start.as_deref()),
            (COMMON_COLUMNS[5], self.tax_period_end.as_deref()),
        ]
    }
}

/// One output row: the common fields followed by one element's form fields.
///
/// Every field the mapping declares is present as a key; fields the filing
/// does not carry hold `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormRecord {
    values: IndexMap<String, Option<String>>,
}

impl FormRecord {
    /// Start a record from a copy of the common fields.
    pub fn from_common(common: &CommonRecord) -> Self {
        let values = common
            .entries()
            .into_iter()
            .map(|(key, value)| (key.to_string(), value.map(str::to_string)))
            .collect();
        Self { values }
    }

    /// Add a form field.
    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) {
        self.values.insert(key.into(), value);
    }

    /// Value of a field; `None` when missing or unresolved.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_deref())
    }

    /// Whether the record has a column for `key`, resolved or not.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the record has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Column names in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Columns and values in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }
}
