//! Example Store - labeled input/output pairs for one capability
//!
//! Append-only from the runtime's perspective. Appends are serialized behind a
//! lock; readers take a snapshot that later appends never disturb.

use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{Error, Result};
use crate::types::{Datum, Example};

/// In-memory, insertion-ordered example collection
pub struct ExampleStore<I, O> {
    examples: RwLock<Vec<Arc<Example<I, O>>>>,
}

impl<I: Datum, O: Datum> ExampleStore<I, O> {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            examples: RwLock::new(Vec::new()),
        }
    }

    /// Create a store seeded with examples, validating each one
    pub fn with_examples(seed: impl IntoIterator<Item = Example<I, O>>) -> Result<Self> {
        let store = Self::new();
        for example in seed {
            store.add(example)?;
        }
        Ok(store)
    }

    /// Validate and append an example
    pub fn add(&self, example: Example<I, O>) -> Result<()> {
        validate(&example)?;
        self.examples
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(example));
        Ok(())
    }

    /// Snapshot of every stored example, in insertion order
    pub fn all(&self) -> ExampleSnapshot<I, O> {
        let items = self
            .examples
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        ExampleSnapshot { items }
    }

    pub fn len(&self) -> usize {
        self.examples.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every example. Only a context reset uses this.
    pub(crate) fn clear(&self) {
        self.examples.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl<I: Datum, O: Datum> Default for ExampleStore<I, O> {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject examples whose input or output has no value
fn validate<I: Datum, O: Datum>(example: &Example<I, O>) -> Result<()> {
    check_present("input", &example.input)?;
    check_present("output", &example.output)
}

fn check_present<T: serde::Serialize>(field: &str, value: &T) -> Result<()> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::Null) => Err(Error::InvalidExample(format!("{} is null", field))),
        Ok(_) => Ok(()),
        Err(e) => Err(Error::InvalidExample(format!("{} is not serializable: {}", field, e))),
    }
}

/// Read-only view of a store at one point in time.
///
/// Cheap to clone and iterate any number of times.
#[derive(Debug)]
pub struct ExampleSnapshot<I, O> {
    items: Vec<Arc<Example<I, O>>>,
}

impl<I, O> Clone for ExampleSnapshot<I, O> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

impl<I, O> ExampleSnapshot<I, O> {
    /// An empty snapshot, used where no store exists
    pub fn empty() -> Self {
        Self { items: Vec::new() }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Example<I, O>> + '_ {
        self.items.iter().map(|e| e.as_ref())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Example<I, O>> {
        self.items.get(index).map(|e| e.as_ref())
    }

    pub fn last(&self) -> Option<&Example<I, O>> {
        self.items.last().map(|e| e.as_ref())
    }
}

impl<I: Clone, O: Clone> ExampleSnapshot<I, O> {
    pub fn to_vec(&self) -> Vec<Example<I, O>> {
        self.iter().cloned().collect()
    }
}

impl<'a, I, O> IntoIterator for &'a ExampleSnapshot<I, O> {
    type Item = &'a Example<I, O>;
    type IntoIter = Box<dyn Iterator<Item = &'a Example<I, O>> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
