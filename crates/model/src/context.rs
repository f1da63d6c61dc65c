//! Mutable execution context shared across one tree walk

use serde_json::{Map, Value};
use std::fmt;

/// Optional variable-store capability.
///
/// When installed, assignments go through `set` before the context's own map
/// is updated, letting the embedder layer richer variable semantics (typed
/// variables, change notification) on top of plain key/value storage.
pub trait VariableStore {
    fn set(&mut self, name: &str, value: &Value);
}

/// The variable store for one workflow execution.
///
/// Created by the caller per execution and mutated in place by whichever
/// node is currently executing. Per-record isolation in data-driven
/// iteration is obtained with [`ExecutionContext::fork`].
#[derive(Default)]
pub struct ExecutionContext {
    values: Map<String, Value>,
    store: Option<Box<dyn VariableStore>>,
}

impl ExecutionContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context seeded with initial variables
    pub fn from_map(values: Map<String, Value>) -> Self {
        Self {
            values,
            store: None,
        }
    }

    /// Install a variable-store capability
    pub fn with_store(mut self, store: Box<dyn VariableStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Look up a variable by exact name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Check whether a variable is present
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Assign a variable.
    ///
    /// Routes through the variable-store capability when one is installed;
    /// the context's own map is always updated so expression resolution
    /// keeps a consistent view.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if let Some(store) = self.store.as_mut() {
            store.set(&name, &value);
        }
        self.values.insert(name, value);
    }

    /// Remove a variable, returning its previous value
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    /// The full variable map
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Number of variables
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy the variables into an isolated child context.
    ///
    /// The fork does not carry the variable-store capability; mutations in
    /// the child never reach the parent.
    pub fn fork(&self) -> Self {
        Self {
            values: self.values.clone(),
            store: None,
        }
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("values", &self.values)
            .field("store", &self.store.is_some())
            .finish()
    }
}
