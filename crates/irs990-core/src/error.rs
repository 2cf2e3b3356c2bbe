//! Error types for the irs990-core library.

use thiserror::Error;

/// Main error type for the irs990 library.
#[derive(Error, Debug)]
pub enum Irs990Error {
    /// Mapping catalog error.
    #[error("mapping error: {0}")]
    Mapping(#[from] MappingError),

    /// Filing document error.
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Record extraction error.
    #[error("extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// Filing index or storage error.
    #[error("filing error: {0}")]
    Filing(#[from] FilingError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while loading mapping resources.
#[derive(Error, Debug)]
pub enum MappingError {
    /// No resource exists for the schema family.
    #[error("no mapping resource for schema family '{family}'")]
    ResourceNotFound { family: String },

    /// The resource exists but does not satisfy the mapping schema.
    #[error("invalid mapping resource for family '{family}': {reason}")]
    Invalid { family: String, reason: String },

    /// The resource is not well-formed JSON or has the wrong shape.
    #[error("failed to decode mapping resource for family '{family}': {source}")]
    Json {
        family: String,
        #[source]
        source: serde_json::Error,
    },

    /// A path string could not be compiled.
    #[error("invalid path '{path}': {reason}")]
    Path { path: String, reason: String },

    /// Reading a resource from disk failed.
    #[error("failed to read mapping resource: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while parsing a filing document.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The document is not well-formed XML.
    #[error("malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    /// The root element carries no schema version attribute.
    #[error("document root has no '{0}' attribute")]
    MissingVersion(&'static str),

    /// The document bytes are not valid UTF-8.
    #[error("document is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Errors raised while extracting records from a parsed document.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The mapping table for the document could not be loaded.
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// A requested form is not declared by the document's mapping table.
    #[error("form '{form}' is not mapped for schema family '{family}'")]
    UnknownForm { form: String, family: String },
}

/// Errors related to the filing index and filing storage.
#[derive(Error, Debug)]
pub enum FilingError {
    /// The index listing could not be read.
    #[error("failed to read index: {0}")]
    Index(#[from] csv::Error),

    /// An archive could not be opened or read.
    #[error("archive '{archive}': {source}")]
    Archive {
        archive: String,
        #[source]
        source: zip::result::ZipError,
    },

    /// A storage location could not be read.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A record sink rejected a record.
    #[error("sink error: {0}")]
    Sink(String),
}

/// Result type for the irs990 library.
pub type Result<T> = std::result::Result<T, Irs990Error>;
