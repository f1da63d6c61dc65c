//! Data sources and data-driven iteration
//!
//! A data source is an openable/closable sequence of records. The iteration
//! engine maps record fields into an isolated copy of the base context and
//! hands each prepared context to an execute callback, yielding one result
//! per record with a bounded error budget.

pub mod csv_source;
pub mod errors;
pub mod iterate;
pub mod json_source;
pub mod memory;
pub mod source;

pub use csv_source::CsvDataSource;
pub use errors::DataError;
pub use iterate::{
    DataIteration, DataIterationResult, IterationOptions, IterationSummary, RecordOutcome,
};
pub use json_source::JsonDataSource;
pub use memory::InMemoryDataSource;
pub use source::{from_spec, DataSource, Record};
