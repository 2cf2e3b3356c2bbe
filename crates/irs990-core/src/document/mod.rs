//! Parsed filing documents.

pub mod path;

pub use path::{PathExpr, Selection};

use roxmltree::{Document, Node};

use crate::error::DocumentError;

/// Root attribute holding the schema version.
pub const VERSION_ATTRIBUTE: &str = "returnVersion";

/// Namespace of IRS e-file documents.
pub const EFILE_NAMESPACE: &str = "http://www.irs.gov/efile";

/// A parsed, read-only filing.
///
/// The document borrows its source text; keep the buffer alive for as long
/// as the document (and any record sequence derived from it) is in use.
pub struct FilingDocument<'input> {
    tree: Document<'input>,
    version: String,
}

impl<'input> FilingDocument<'input> {
    /// Parse a filing and read its declared schema version.
    pub fn parse(text: &'input str) -> Result<Self, DocumentError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let tree = Document::parse(text)?;

        let version = tree
            .root_element()
            .attribute(VERSION_ATTRIBUTE)
            .filter(|v| !v.trim().is_empty())
            .ok_or(DocumentError::MissingVersion(VERSION_ATTRIBUTE))?
            .to_string();

        Ok(Self { tree, version })
    }

    /// Declared schema version, verbatim.
    pub fn schema_version(&self) -> &str {
        &self.version
    }

    /// The root element.
    pub fn root(&self) -> Node<'_, 'input> {
        self.tree.root_element()
    }

    /// Namespace of the root element.
    pub fn namespace(&self) -> Option<&str> {
        self.tree.root_element().tag_name().namespace()
    }
}

impl std::fmt::Debug for FilingDocument<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilingDocument")
            .field("version", &self.version)
            .field("root", &self.root().tag_name().name())
            .finish()
    }
}

/// Decode raw document bytes into an owned text buffer.
pub fn decode(bytes: Vec<u8>) -> Result<String, DocumentError> {
    let mut text = String::from_utf8(bytes)?;
    if text.starts_with('\u{feff}') {
        text.drain(..'\u{feff}'.len_utf8());
    }
    Ok(text)
}
