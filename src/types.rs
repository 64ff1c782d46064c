//! Shared types used across modules
//!
//! Examples, inference results, feedback and context identity live here so
//! that the learning, adaptation, explanation and routing modules can depend
//! on them without depending on each other.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Bound for values flowing through a capability (example inputs/outputs,
/// inference results).
pub trait Datum:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> Datum for T where
    T: Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

/// A labeled input/output pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example<I, O> {
    pub input: I,
    pub output: O,
}

impl<I, O> Example<I, O> {
    pub fn new(input: I, output: O) -> Self {
        Self { input, output }
    }
}

/// Result of running an inference strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult<O> {
    pub result: O,
    /// Self-reported confidence, always within [0, 1] once it leaves a
    /// learning context
    pub confidence: f64,
}

impl<O> InferenceResult<O> {
    pub fn new(result: O, confidence: f64) -> Self {
        Self { result, confidence }
    }

    /// Result of a plain procedure, which is fully confident in its output
    pub fn certain(result: O) -> Self {
        Self::new(result, 1.0)
    }

    /// Clamp the confidence into [0, 1].
    ///
    /// Returns the originally reported value when it was out of range.
    /// NaN counts as out of range and becomes 0.0.
    pub fn normalize(&mut self) -> Option<f64> {
        let reported = self.confidence;
        if reported.is_nan() {
            self.confidence = 0.0;
            return Some(reported);
        }
        if !(0.0..=1.0).contains(&reported) {
            self.confidence = reported.clamp(0.0, 1.0);
            return Some(reported);
        }
        None
    }

    pub fn map<P>(self, f: impl FnOnce(O) -> P) -> InferenceResult<P> {
        InferenceResult {
            result: f(self.result),
            confidence: self.confidence,
        }
    }
}

/// Observed outcome for an earlier inference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback<O> {
    /// The output that turned out to be correct
    pub expected: O,
}

impl<O: PartialEq> Feedback<O> {
    pub fn new(expected: O) -> Self {
        Self { expected }
    }

    /// Whether the inference disagreed with the observed outcome
    pub fn disagrees_with(&self, result: &InferenceResult<O>) -> bool {
        self.expected != result.result
    }
}

/// Identity of a learning context (or of a plain enhanced procedure)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId {
    pub name: String,
    pub id: Uuid,
}

impl ContextId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: Uuid::new_v4(),
        }
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.id.simple().to_string();
        write!(f, "{}#{}", self.name, &id[..8])
    }
}
