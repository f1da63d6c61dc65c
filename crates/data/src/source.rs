//! Data source contract

use crate::csv_source::CsvDataSource;
use crate::errors::DataError;
use crate::json_source::JsonDataSource;
use crate::memory::InMemoryDataSource;
use serde_json::{Map, Value};
use stepflow_model::DataSourceSpec;

/// One record: a mapping from field name to raw value
pub type Record = Map<String, Value>;

/// An openable/closable sequence of records.
///
/// Sources must be opened before any read and report [`DataError::NotOpen`]
/// otherwise. Record order is stable and source-defined.
pub trait DataSource {
    /// Acquire the underlying resource and load the record set
    fn open(&mut self) -> Result<(), DataError>;

    /// Release the underlying resource
    fn close(&mut self) -> Result<(), DataError>;

    /// Field names in source order
    fn field_names(&self) -> Result<Vec<String>, DataError>;

    /// Number of records
    fn record_count(&self) -> Result<usize, DataError>;

    /// All records in source order
    fn records(&self) -> Result<Vec<Record>, DataError>;

    /// One record by position
    fn record(&self, index: usize) -> Result<Option<Record>, DataError>;
}

/// Materialize a live source from its serializable description
pub fn from_spec(spec: &DataSourceSpec) -> Box<dyn DataSource> {
    match spec {
        DataSourceSpec::Csv { path, delimiter } => {
            let mut source = CsvDataSource::new(path);
            if let Some(delim) = delimiter {
                source = source.with_delimiter(*delim);
            }
            Box::new(source)
        }
        DataSourceSpec::Json { path } => Box::new(JsonDataSource::new(path)),
        DataSourceSpec::Inline { records } => Box::new(InMemoryDataSource::new(records.clone())),
    }
}
