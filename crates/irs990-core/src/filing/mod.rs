//! Filing indexes, storage locations, and batch routing.

pub mod index;
pub mod locator;
pub mod router;

pub use index::{object_year, FilingEntry, FilingIndex};
pub use locator::{ArchiveSet, FilingSource, Location, LocationResolver};
pub use router::{FilingFailure, FilingRouter, MemorySink, RecordSink, ReturnTypeClass, RunSummary};
