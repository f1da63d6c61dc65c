//! Serializable description of a data source
//!
//! `DataDriven` nodes name their source with one of these specs; the
//! embedding application materializes it into a live source at execution
//! time. Inline records travel with the tree itself.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where a data-driven action reads its records from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSourceSpec {
    /// CSV file; every field value is a string
    Csv {
        path: String,
        /// Field delimiter, defaults to a comma
        #[serde(default, skip_serializing_if = "Option::is_none")]
        delimiter: Option<char>,
    },

    /// JSON file holding an array of objects; native JSON types preserved
    Json { path: String },

    /// Records embedded directly in the tree
    Inline { records: Vec<Map<String, Value>> },
}
