//! JSON file data source

use crate::errors::DataError;
use crate::source::{DataSource, Record};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// JSON-backed source: a file holding an array of objects.
/// Native JSON value types are preserved.
#[derive(Debug, Clone)]
pub struct JsonDataSource {
    path: PathBuf,
    loaded: Option<Vec<Record>>,
}

impl JsonDataSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            loaded: None,
        }
    }

    fn loaded(&self) -> Result<&Vec<Record>, DataError> {
        self.loaded.as_ref().ok_or(DataError::NotOpen)
    }
}

impl DataSource for JsonDataSource {
    fn open(&mut self) -> Result<(), DataError> {
        let raw = fs::read_to_string(&self.path)
            .map_err(|e| DataError::Open(format!("{}: {e}", self.path.display())))?;
        let value: Value = serde_json::from_str(&raw)?;
        let items = value
            .as_array()
            .ok_or_else(|| DataError::Format("expected a top-level JSON array".into()))?;
        let mut records = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let record = item
                .as_object()
                .ok_or_else(|| DataError::Format(format!("record {i} is not an object")))?;
            records.push(record.clone());
        }
        debug!(
            path = %self.path.display(),
            records = records.len(),
            "opened json data source"
        );
        self.loaded = Some(records);
        Ok(())
    }

    fn close(&mut self) -> Result<(), DataError> {
        self.loaded = None;
        Ok(())
    }

    fn field_names(&self) -> Result<Vec<String>, DataError> {
        let records = self.loaded()?;
        let mut names: Vec<String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !names.iter().any(|n| n == key) {
                    names.push(key.clone());
                }
            }
        }
        Ok(names)
    }

    fn record_count(&self) -> Result<usize, DataError> {
        Ok(self.loaded()?.len())
    }

    fn records(&self) -> Result<Vec<Record>, DataError> {
        Ok(self.loaded()?.clone())
    }

    fn record(&self, index: usize) -> Result<Option<Record>, DataError> {
        Ok(self.loaded()?.get(index).cloned())
    }
}
