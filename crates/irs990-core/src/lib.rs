//! Core library for IRS Form 990 e-file extraction.
//!
//! This crate provides:
//! - Versioned mapping tables from output fields to document paths
//! - A restricted path language over parsed filings
//! - Record extraction (common fields plus repeated form elements)
//! - Filing indexes, directory and zip archive storage, and batch routing

pub mod error;
pub mod models;
pub mod mapping;
pub mod document;
pub mod extract;
pub mod filing;

pub use error::{Irs990Error, Result};
pub use mapping::{family_key, FieldSpec, MappingCatalog, MappingTable, COMMON_COLUMNS};
pub use document::{FilingDocument, PathExpr};
pub use extract::{Extraction, FormRecords, RecordExtractor};
pub use models::config::Irs990Config;
pub use models::record::{CommonRecord, FormRecord};
pub use filing::{
    FilingIndex, FilingRouter, LocationResolver, RecordSink, ReturnTypeClass, RunSummary,
};
