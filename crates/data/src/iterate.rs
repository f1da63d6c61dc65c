//! Data-driven iteration engine
//!
//! Drives one execution of a body callback per source record. The source is
//! opened on entry and closed on every exit path, including early
//! termination and drop. Each record runs against an isolated fork of the
//! base context so that mutations never leak between records.

use crate::errors::DataError;
use crate::source::{DataSource, Record};
use serde::{Deserialize, Serialize};
use stepflow_model::{ExecutionContext, FieldMapping};
use tracing::{debug, warn};

/// What the body callback reports for one record
#[derive(Debug, Clone, PartialEq)]
pub struct RecordOutcome {
    pub success: bool,
    pub message: String,
}

impl RecordOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Result of processing one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataIterationResult {
    pub record_index: usize,
    /// Snapshot of the record as read from the source
    pub record: Record,
    pub success: bool,
    pub message: String,
}

/// Aggregated counts over an iteration; the rate is computed, not stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationSummary {
    pub total: usize,
    pub success: usize,
    pub error: usize,
}

impl IterationSummary {
    pub fn from_results(results: &[DataIterationResult]) -> Self {
        let success = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            success,
            error: results.len() - success,
        }
    }

    /// Fraction of successful records, 0.0 when nothing ran
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.success as f64 / self.total as f64
        }
    }
}

/// Error-handling knobs for one iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationOptions {
    /// Keep iterating past failing records
    pub continue_on_error: bool,
    /// Stop once this many records have failed
    pub max_errors: Option<u64>,
}

impl Default for IterationOptions {
    fn default() -> Self {
        Self {
            continue_on_error: true,
            max_errors: None,
        }
    }
}

/// Lazy sequence of per-record results.
///
/// Construction opens the source and loads the record set; an open failure
/// is the caller's problem (there is no per-record recovery for a source
/// that cannot be opened at all). The source is closed exactly once, on
/// exhaustion, early stop, or drop.
pub struct DataIteration<'a, F> {
    source: Box<dyn DataSource>,
    records: std::iter::Enumerate<std::vec::IntoIter<Record>>,
    mappings: &'a [FieldMapping],
    base: &'a ExecutionContext,
    execute: F,
    options: IterationOptions,
    error_count: u64,
    done: bool,
    closed: bool,
}

impl<'a, F> DataIteration<'a, F>
where
    F: FnMut(&mut ExecutionContext) -> RecordOutcome,
{
    pub fn new(
        mut source: Box<dyn DataSource>,
        mappings: &'a [FieldMapping],
        base: &'a ExecutionContext,
        options: IterationOptions,
        execute: F,
    ) -> Result<Self, DataError> {
        source.open()?;
        let records = match source.records() {
            Ok(records) => records,
            Err(e) => {
                // keep the open/close pairing even when the read fails
                if let Err(close_err) = source.close() {
                    warn!(error = %close_err, "failed to close data source after read error");
                }
                return Err(e);
            }
        };
        debug!(records = records.len(), "data iteration started");
        Ok(Self {
            source,
            records: records.into_iter().enumerate(),
            mappings,
            base,
            execute,
            options,
            error_count: 0,
            done: false,
            closed: false,
        })
    }

    /// Errors seen so far
    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    fn finish(&mut self) {
        self.done = true;
        if !self.closed {
            self.closed = true;
            if let Err(e) = self.source.close() {
                warn!(error = %e, "failed to close data source");
            }
        }
    }
}

impl<F> Iterator for DataIteration<'_, F>
where
    F: FnMut(&mut ExecutionContext) -> RecordOutcome,
{
    type Item = DataIterationResult;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let (record_index, record) = match self.records.next() {
            Some(entry) => entry,
            None => {
                self.finish();
                return None;
            }
        };

        // per-record isolation: mapped fields land in a fork of the base
        let mut ctx = self.base.fork();
        let mut warnings = Vec::new();
        for mapping in self.mappings {
            let mapped = mapping.apply(&record);
            if let Some(warning) = mapped.warning {
                warnings.push(warning);
            }
            ctx.set(mapping.target_variable.clone(), mapped.value);
        }

        let outcome = (self.execute)(&mut ctx);
        let mut message = outcome.message;
        if !warnings.is_empty() {
            if !message.is_empty() {
                message.push_str("; ");
            }
            message.push_str(&warnings.join("; "));
        }

        if !outcome.success {
            self.error_count += 1;
            let budget_spent = self
                .options
                .max_errors
                .is_some_and(|max| self.error_count >= max);
            if !self.options.continue_on_error || budget_spent {
                debug!(
                    record_index,
                    errors = self.error_count,
                    "stopping data iteration early"
                );
                self.finish();
            }
        }

        Some(DataIterationResult {
            record_index,
            record,
            success: outcome.success,
            message,
        })
    }
}

impl<F> Drop for DataIteration<'_, F> {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            if let Err(e) = self.source.close() {
                warn!(error = %e, "failed to close data source on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryDataSource;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;
    use stepflow_model::Transform;

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| json!({"idx": i}).as_object().unwrap().clone())
            .collect()
    }

    fn source(n: usize) -> Box<dyn DataSource> {
        Box::new(InMemoryDataSource::new(records(n)))
    }

    fn mappings() -> Vec<FieldMapping> {
        vec![FieldMapping::new("idx", "idx")]
    }

    // fails on records 1 and 3
    fn flaky(ctx: &mut ExecutionContext) -> RecordOutcome {
        let idx = ctx.get("idx").and_then(|v| v.as_i64()).unwrap_or(-1);
        if idx == 1 || idx == 3 {
            RecordOutcome::fail(format!("record {idx} failed"))
        } else {
            RecordOutcome::ok("done")
        }
    }

    #[test]
    fn continue_on_error_processes_all_records() {
        let base = ExecutionContext::new();
        let mappings = mappings();
        let iteration = DataIteration::new(
            source(5),
            &mappings,
            &base,
            IterationOptions::default(),
            flaky,
        )
        .unwrap();
        let results: Vec<_> = iteration.collect();
        let summary = IterationSummary::from_results(&results);
        assert_eq!(summary.total, 5);
        assert_eq!(summary.success, 3);
        assert_eq!(summary.error, 2);
        assert!((summary.success_rate() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn stop_on_first_error() {
        let base = ExecutionContext::new();
        let mappings = mappings();
        let options = IterationOptions {
            continue_on_error: false,
            max_errors: None,
        };
        let results: Vec<_> = DataIteration::new(source(5), &mappings, &base, options, flaky)
            .unwrap()
            .collect();
        // records 0 and 1 processed; the failing record is included
        assert_eq!(results.len(), 2);
        assert!(results[0].success);
        assert!(!results[1].success);
    }

    #[test]
    fn error_budget_stops_iteration() {
        let base = ExecutionContext::new();
        let mappings = mappings();
        let options = IterationOptions {
            continue_on_error: true,
            max_errors: Some(2),
        };
        let results: Vec<_> = DataIteration::new(source(5), &mappings, &base, options, flaky)
            .unwrap()
            .collect();
        // stops after the second failure (record index 3)
        assert_eq!(results.len(), 4);
        assert_eq!(IterationSummary::from_results(&results).error, 2);
    }

    #[test]
    fn record_mutations_do_not_leak() {
        let mut base = ExecutionContext::new();
        base.set("shared", json!("base"));
        let mappings = mappings();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_in_body = seen.clone();
        let execute = move |ctx: &mut ExecutionContext| {
            seen_in_body
                .borrow_mut()
                .push(ctx.get("shared").cloned().unwrap());
            ctx.set("shared", json!("mutated"));
            RecordOutcome::ok("")
        };
        let results: Vec<_> = DataIteration::new(
            source(3),
            &mappings,
            &base,
            IterationOptions::default(),
            execute,
        )
        .unwrap()
        .collect();
        assert_eq!(results.len(), 3);
        // every record started from the base value
        assert_eq!(*seen.borrow(), vec![json!("base"); 3]);
        assert_eq!(base.get("shared"), Some(&json!("base")));
    }

    struct TrackingSource {
        inner: InMemoryDataSource,
        closed: Rc<RefCell<u32>>,
    }

    impl DataSource for TrackingSource {
        fn open(&mut self) -> Result<(), DataError> {
            self.inner.open()
        }
        fn close(&mut self) -> Result<(), DataError> {
            *self.closed.borrow_mut() += 1;
            self.inner.close()
        }
        fn field_names(&self) -> Result<Vec<String>, DataError> {
            self.inner.field_names()
        }
        fn record_count(&self) -> Result<usize, DataError> {
            self.inner.record_count()
        }
        fn records(&self) -> Result<Vec<Record>, DataError> {
            self.inner.records()
        }
        fn record(&self, index: usize) -> Result<Option<Record>, DataError> {
            self.inner.record(index)
        }
    }

    #[test]
    fn source_closed_exactly_once_on_early_drop() {
        let closed = Rc::new(RefCell::new(0));
        let tracking = TrackingSource {
            inner: InMemoryDataSource::new(records(5)),
            closed: closed.clone(),
        };
        let base = ExecutionContext::new();
        let mappings = mappings();
        let mut iteration = DataIteration::new(
            Box::new(tracking),
            &mappings,
            &base,
            IterationOptions::default(),
            |_| RecordOutcome::ok(""),
        )
        .unwrap();
        // consume one record, then abandon the iteration
        let _ = iteration.next();
        drop(iteration);
        assert_eq!(*closed.borrow(), 1);
    }

    #[test]
    fn transform_warning_lands_in_result_message() {
        let base = ExecutionContext::new();
        let mappings = vec![FieldMapping::new("idx", "n")
            .with_transform(Transform::Uppercase)
            .with_default(json!("?"))];
        let results: Vec<_> = DataIteration::new(
            source(1),
            &mappings,
            &base,
            IterationOptions::default(),
            |_| RecordOutcome::ok("body ok"),
        )
        .unwrap()
        .collect();
        assert!(results[0].success);
        assert!(results[0].message.contains("transform failed"));
    }
}
