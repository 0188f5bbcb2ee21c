pub mod outcome;
pub mod preview;
pub mod aggregate;
pub mod export;
pub mod reader;

pub use outcome::{RawBatch, RawFailure, RawFileOutcome, RawSuccess};
pub use preview::{truncate_preview, Preview};
pub use aggregate::{
    aggregate, aggregate_batch, AggregateOptions, BatchResult, DocumentOutcome, DocumentRecord,
    DocumentSummary, EntitySample, NOT_AVAILABLE,
};
pub use export::{to_csv, CSV_HEADER};
pub use reader::PayloadReader;
