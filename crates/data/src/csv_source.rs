//! CSV file data source

use crate::errors::DataError;
use crate::source::{DataSource, Record};
use csv::ReaderBuilder;
use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;

/// CSV-backed source; every field value is a string
#[derive(Debug, Clone)]
pub struct CsvDataSource {
    path: PathBuf,
    delimiter: u8,
    loaded: Option<Loaded>,
}

#[derive(Debug, Clone)]
struct Loaded {
    field_names: Vec<String>,
    records: Vec<Record>,
}

impl CsvDataSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
            loaded: None,
        }
    }

    /// Override the field delimiter (defaults to a comma)
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter as u8;
        self
    }

    fn loaded(&self) -> Result<&Loaded, DataError> {
        self.loaded.as_ref().ok_or(DataError::NotOpen)
    }
}

impl DataSource for CsvDataSource {
    fn open(&mut self) -> Result<(), DataError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .from_path(&self.path)
            .map_err(|e| DataError::Open(format!("{}: {e}", self.path.display())))?;
        let field_names: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let mut record = Record::new();
            for (name, value) in field_names.iter().zip(row.iter()) {
                record.insert(name.clone(), Value::String(value.to_string()));
            }
            records.push(record);
        }
        debug!(
            path = %self.path.display(),
            records = records.len(),
            "opened csv data source"
        );
        self.loaded = Some(Loaded {
            field_names,
            records,
        });
        Ok(())
    }

    fn close(&mut self) -> Result<(), DataError> {
        self.loaded = None;
        Ok(())
    }

    fn field_names(&self) -> Result<Vec<String>, DataError> {
        Ok(self.loaded()?.field_names.clone())
    }

    fn record_count(&self) -> Result<usize, DataError> {
        Ok(self.loaded()?.records.len())
    }

    fn records(&self) -> Result<Vec<Record>, DataError> {
        Ok(self.loaded()?.records.clone())
    }

    fn record(&self, index: usize) -> Result<Option<Record>, DataError> {
        Ok(self.loaded()?.records.get(index).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_headers_and_string_records() {
        let file = write_csv("name,age\nalice,30\nbob,41\n");
        let mut source = CsvDataSource::new(file.path());
        source.open().unwrap();
        assert_eq!(source.field_names().unwrap(), vec!["name", "age"]);
        assert_eq!(source.record_count().unwrap(), 2);
        let records = source.records().unwrap();
        // CSV values stay strings
        assert_eq!(records[0]["age"], json!("30"));
        assert_eq!(records[1]["name"], json!("bob"));
    }

    #[test]
    fn custom_delimiter() {
        let file = write_csv("a;b\n1;2\n");
        let mut source = CsvDataSource::new(file.path()).with_delimiter(';');
        source.open().unwrap();
        assert_eq!(source.records().unwrap()[0]["b"], json!("2"));
    }

    #[test]
    fn missing_file_fails_open() {
        let mut source = CsvDataSource::new("/nonexistent/definitely.csv");
        assert!(matches!(source.open(), Err(DataError::Open(_))));
    }

    #[test]
    fn close_releases_records() {
        let file = write_csv("a\n1\n");
        let mut source = CsvDataSource::new(file.path());
        source.open().unwrap();
        source.close().unwrap();
        assert!(matches!(source.records(), Err(DataError::NotOpen)));
    }
}
