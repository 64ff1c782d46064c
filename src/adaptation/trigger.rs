//! Adaptation triggers
//!
//! A trigger is a named predicate deciding whether a capability's strategy
//! should be updated. Two families are built in: thresholds over the current
//! result's confidence, and rates over the accumulated outcome history.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::window::{OutcomeWindow, DEFAULT_WINDOW};
use crate::error::{Error, Result};

/// Caller-supplied trigger predicate
pub type TriggerFn = Arc<dyn Fn(&TriggerInput<'_>) -> anyhow::Result<bool> + Send + Sync>;

/// Everything a trigger may look at
#[derive(Debug)]
pub struct TriggerInput<'a> {
    /// Confidence of the result under evaluation
    pub confidence: f64,
    /// Outcome supplied with this evaluation but not yet in `outcomes`
    pub pending_disagreement: Option<bool>,
    /// Recorded outcome history of the context
    pub outcomes: &'a OutcomeWindow,
    /// Examples added since the last retrain request
    pub examples_since_retrain: usize,
}

/// What makes a trigger fire
#[derive(Clone)]
pub enum TriggerCondition {
    /// Current confidence strictly below `threshold`
    ConfidenceBelow { threshold: f64 },
    /// Disagreement rate over the last `window` outcomes strictly above
    /// `rate`, once `min_observations` outcomes exist
    DisagreementAbove {
        rate: f64,
        window: usize,
        min_observations: usize,
    },
    /// At least `count` examples added since the last retrain request
    ExamplesAdded { count: usize },
    Predicate(TriggerFn),
}

impl fmt::Debug for TriggerCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerCondition::ConfidenceBelow { threshold } => {
                f.debug_struct("ConfidenceBelow").field("threshold", threshold).finish()
            }
            TriggerCondition::DisagreementAbove { rate, window, min_observations } => f
                .debug_struct("DisagreementAbove")
                .field("rate", rate)
                .field("window", window)
                .field("min_observations", min_observations)
                .finish(),
            TriggerCondition::ExamplesAdded { count } => {
                f.debug_struct("ExamplesAdded").field("count", count).finish()
            }
            TriggerCondition::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// A named adaptation predicate
#[derive(Debug, Clone)]
pub struct AdaptationTrigger {
    pub name: String,
    pub condition: TriggerCondition,
}

impl AdaptationTrigger {
    pub fn new(name: impl Into<String>, condition: TriggerCondition) -> Self {
        Self {
            name: name.into(),
            condition,
        }
    }

    pub fn confidence_below(name: impl Into<String>, threshold: f64) -> Self {
        Self::new(name, TriggerCondition::ConfidenceBelow { threshold })
    }

    pub fn disagreement_above(name: impl Into<String>, rate: f64, window: usize) -> Self {
        Self::new(
            name,
            TriggerCondition::DisagreementAbove {
                rate,
                window,
                min_observations: 1,
            },
        )
    }

    pub fn examples_added(name: impl Into<String>, count: usize) -> Self {
        Self::new(name, TriggerCondition::ExamplesAdded { count })
    }

    pub fn predicate<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&TriggerInput<'_>) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        Self::new(name, TriggerCondition::Predicate(Arc::new(f)))
    }

    /// Evaluate this trigger on its own
    pub fn fires(&self, input: &TriggerInput<'_>) -> anyhow::Result<bool> {
        match &self.condition {
            TriggerCondition::ConfidenceBelow { threshold } => Ok(input.confidence < *threshold),
            TriggerCondition::DisagreementAbove { rate, window, min_observations } => {
                let (observed, disagreements) =
                    input.outcomes.tally(*window, input.pending_disagreement);
                if observed == 0 || observed < *min_observations {
                    return Ok(false);
                }
                Ok(disagreements as f64 / observed as f64 > *rate)
            }
            TriggerCondition::ExamplesAdded { count } => Ok(input.examples_since_retrain >= *count),
            TriggerCondition::Predicate(f) => f(input),
        }
    }

    /// Outcome history this trigger needs, if any
    pub fn window_len(&self) -> Option<usize> {
        match &self.condition {
            TriggerCondition::DisagreementAbove { window, .. } => Some(*window),
            _ => None,
        }
    }
}

/// Serializable trigger description, as found in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerSpec {
    ConfidenceBelow {
        threshold: f64,
    },
    DisagreementAbove {
        rate: f64,
        #[serde(default = "default_trigger_window")]
        window: usize,
        #[serde(default = "default_min_observations")]
        min_observations: usize,
    },
    ExamplesAdded {
        count: usize,
    },
}

fn default_trigger_window() -> usize {
    DEFAULT_WINDOW
}

fn default_min_observations() -> usize {
    1
}

impl TriggerSpec {
    /// Reject thresholds that could never (or always) fire
    pub fn validate(&self, name: &str) -> Result<()> {
        let problem = match self {
            TriggerSpec::ConfidenceBelow { threshold } if !(0.0..=1.0).contains(threshold) => {
                Some(format!("threshold {} is outside [0, 1]", threshold))
            }
            TriggerSpec::DisagreementAbove { rate, .. } if !(0.0..=1.0).contains(rate) => {
                Some(format!("rate {} is outside [0, 1]", rate))
            }
            TriggerSpec::DisagreementAbove { window: 0, .. } => Some("window must be at least 1".to_string()),
            TriggerSpec::DisagreementAbove { window, min_observations, .. } if min_observations > window => {
                Some(format!("min_observations {} exceeds window {}", min_observations, window))
            }
            TriggerSpec::ExamplesAdded { count: 0 } => Some("count must be at least 1".to_string()),
            _ => None,
        };
        match problem {
            Some(msg) => Err(Error::Config(format!("trigger '{}': {}", name, msg))),
            None => Ok(()),
        }
    }

    /// Validate and turn into a named trigger
    pub fn into_trigger(self, name: impl Into<String>) -> Result<AdaptationTrigger> {
        let name = name.into();
        self.validate(&name)?;
        let condition = match self {
            TriggerSpec::ConfidenceBelow { threshold } => TriggerCondition::ConfidenceBelow { threshold },
            TriggerSpec::DisagreementAbove { rate, window, min_observations } => {
                TriggerCondition::DisagreementAbove { rate, window, min_observations }
            }
            TriggerSpec::ExamplesAdded { count } => TriggerCondition::ExamplesAdded { count },
        };
        Ok(AdaptationTrigger::new(name, condition))
    }
}
