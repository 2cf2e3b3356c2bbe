//! Filing index listings.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FilingError;

/// One filing listed in an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingEntry {
    #[serde(rename = "RETURN_ID", default)]
    pub return_id: Option<String>,

    #[serde(rename = "FILING_TYPE", default)]
    pub filing_type: Option<String>,

    #[serde(rename = "EIN", default)]
    pub ein: Option<String>,

    #[serde(rename = "TAX_PERIOD", default)]
    pub tax_period: Option<String>,

    #[serde(rename = "SUB_DATE", default)]
    pub submitted: Option<String>,

    #[serde(rename = "TAXPAYER_NAME", default)]
    pub taxpayer_name: Option<String>,

    /// Return type code, e.g. "990" or "990EZ".
    #[serde(rename = "RETURN_TYPE")]
    pub return_type: String,

    #[serde(rename = "DLN", default)]
    pub dln: Option<String>,

    /// Object identifier; its first four characters are the filing year.
    #[serde(rename = "OBJECT_ID")]
    pub object_id: String,
}

impl FilingEntry {
    /// Create an entry from the two required columns.
    pub fn new(return_type: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            return_id: None,
            filing_type: None,
            ein: None,
            tax_period: None,
            submitted: None,
            taxpayer_name: None,
            return_type: return_type.into(),
            dln: None,
            object_id: object_id.into(),
        }
    }

    /// Filing year selected by the object identifier.
    pub fn year(&self) -> Option<&str> {
        object_year(&self.object_id)
    }
}

/// Leading four-digit year of an object identifier.
pub fn object_year(object_id: &str) -> Option<&str> {
    object_id
        .get(..4)
        .filter(|prefix| prefix.bytes().all(|b| b.is_ascii_digit()))
}

/// An ordered index of filings.
#[derive(Debug, Clone, Default)]
pub struct FilingIndex {
    entries: Vec<FilingEntry>,
}

impl FilingIndex {
    /// Build an index from entries.
    pub fn new(entries: Vec<FilingEntry>) -> Self {
        Self { entries }
    }

    /// Read a comma-delimited index with a header row.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, FilingError> {
        let mut csv = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let entries = csv
            .deserialize()
            .collect::<Result<Vec<FilingEntry>, _>>()?;

        debug!("Read {} index entries", entries.len());
        Ok(Self { entries })
    }

    /// Read an index file.
    pub fn from_path(path: &Path) -> Result<Self, FilingError> {
        let file = File::open(path).map_err(|source| FilingError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(file)
    }

    /// Entries in listing order.
    pub fn entries(&self) -> &[FilingEntry] {
        &self.entries
    }

    /// Iterate entries in listing order.
    pub fn iter(&self) -> std::slice::Iter<'_, FilingEntry> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a FilingIndex {
    type Item = &'a FilingEntry;
    type IntoIter = std::slice::Iter<'a, FilingEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const INDEX: &str = "\u{feff}RETURN_ID,FILING_TYPE,EIN,TAX_PERIOD,SUB_DATE,TAXPAYER_NAME,RETURN_TYPE,DLN,OBJECT_ID
14046790,EFILE,041234567,201605,2017,HARBORVIEW UNIVERSITY TRUSTEES,990EZ,93493130009056,201731309349300156
14046791,EFILE,550765432,201712,2017,RIDGELINE TRUCKING ASSOCIATION INC,990,93493130009057,201731309349300201
14046792,EFILE,041234568,201612,2017,,990PF,93493130009058,201731309349300302
";

    #[test]
    fn test_read_index() {
        let index = FilingIndex::from_reader(INDEX.as_bytes()).unwrap();
        assert_eq!(index.len(), 3);

        let first = &index.entries()[0];
        assert_eq!(first.return_id.as_deref(), Some("14046790"));
        assert_eq!(first.return_type, "990EZ");
        assert_eq!(first.year(), Some("2017"));

        assert_eq!(index.entries()[2].taxpayer_name, None);
        assert_eq!(index.iter().count(), 3);
        assert_eq!((&index).into_iter().filter(|e| e.return_type == "990").count(), 1);
    }

    #[test]
    fn test_minimal_columns() {
        let listing = "OBJECT_ID,RETURN_TYPE\n201541349349307794,990\n";
        let index = FilingIndex::from_reader(listing.as_bytes()).unwrap();
        assert_eq!(index.entries(), &[FilingEntry::new("990", "201541349349307794")]);
    }

    #[test]
    fn test_missing_required_column_fails() {
        let err = FilingIndex::from_reader("RETURN_TYPE\n990\n".as_bytes()).unwrap_err();
        assert!(matches!(err, FilingError::Index(_)));
    }

    #[test]
    fn test_object_year() {
        assert_eq!(object_year("201541349349307794"), Some("2015"));
        assert_eq!(object_year("20x5"), None);
        assert_eq!(object_year("201"), None);
    }

    #[test]
    fn test_missing_file() {
        let err = FilingIndex::from_path(Path::new("/nonexistent/index.csv")).unwrap_err();
        assert!(matches!(err, FilingError::Io { .. }));
    }
}
