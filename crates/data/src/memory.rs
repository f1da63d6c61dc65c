//! In-memory data source

use crate::errors::DataError;
use crate::source::{DataSource, Record};

/// Records held directly in memory; native JSON types preserved
#[derive(Debug, Clone)]
pub struct InMemoryDataSource {
    records: Vec<Record>,
    open: bool,
}

impl InMemoryDataSource {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            open: false,
        }
    }
}

impl DataSource for InMemoryDataSource {
    fn open(&mut self) -> Result<(), DataError> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), DataError> {
        self.open = false;
        Ok(())
    }

    fn field_names(&self) -> Result<Vec<String>, DataError> {
        if !self.open {
            return Err(DataError::NotOpen);
        }
        let mut names: Vec<String> = Vec::new();
        for record in &self.records {
            for key in record.keys() {
                if !names.iter().any(|n| n == key) {
                    names.push(key.clone());
                }
            }
        }
        Ok(names)
    }

    fn record_count(&self) -> Result<usize, DataError> {
        if !self.open {
            return Err(DataError::NotOpen);
        }
        Ok(self.records.len())
    }

    fn records(&self) -> Result<Vec<Record>, DataError> {
        if !self.open {
            return Err(DataError::NotOpen);
        }
        Ok(self.records.clone())
    }

    fn record(&self, index: usize) -> Result<Option<Record>, DataError> {
        if !self.open {
            return Err(DataError::NotOpen);
        }
        Ok(self.records.get(index).cloned())
    }
}
