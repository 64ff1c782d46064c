//! Configuration management
//!
//! Runtime settings plus one section per learned capability: seed examples,
//! adaptation triggers, the adaptation gate, requested explanations and the
//! confidence routes.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::adaptation::window::DEFAULT_WINDOW;
use crate::adaptation::TriggerSpec;
use crate::error::Error;
use crate::events::bus::DEFAULT_CAPACITY;
use crate::explain::ExplanationKind;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Adaptation defaults shared by every capability
    #[serde(default)]
    pub adaptation: AdaptationConfig,
    /// Explanation limits
    #[serde(default)]
    pub explanation: ExplanationConfig,
    /// Event channel settings
    #[serde(default)]
    pub events: EventConfig,
    /// Learned capabilities by name
    #[serde(default)]
    pub capabilities: BTreeMap<String, CapabilityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptationConfig {
    /// Outcomes kept per context for accumulated-feedback triggers
    #[serde(default = "default_outcome_window")]
    pub outcome_window: usize,
}

fn default_outcome_window() -> usize {
    DEFAULT_WINDOW
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            outcome_window: default_outcome_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplanationConfig {
    #[serde(default = "default_max_influential_tokens")]
    pub max_influential_tokens: usize,
    #[serde(default = "default_max_counterexamples")]
    pub max_counterexamples: usize,
}

fn default_max_influential_tokens() -> usize {
    10
}

fn default_max_counterexamples() -> usize {
    3
}

impl Default for ExplanationConfig {
    fn default() -> Self {
        Self {
            max_influential_tokens: default_max_influential_tokens(),
            max_counterexamples: default_max_counterexamples(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    /// Broadcast buffer size; slow subscribers lag past this
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

fn default_event_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

/// One learned capability
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapabilityConfig {
    /// Seed examples as `{ input, output }` tables
    #[serde(default)]
    pub examples: Vec<serde_json::Value>,
    /// Named adaptation triggers, evaluated in name order
    #[serde(default)]
    pub adaptation_triggers: BTreeMap<String, TriggerSpec>,
    /// Gate for adaptation; absent means always evaluate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapt_when: Option<AdaptWhenConfig>,
    /// Explanation kinds attached to every result
    #[serde(default)]
    pub explain_with: Vec<String>,
    /// Confidence bands
    #[serde(default)]
    pub routes: Vec<BandConfig>,
    /// Label of the handler used below every band
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_route: Option<String>,
    /// Inference timeout in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Overrides `adaptation.outcome_window`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome_window: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptWhenConfig {
    /// Only adapt when confidence is strictly below this
    pub confidence_below: f64,
}

/// A labelled band firing strictly above `above`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandConfig {
    pub label: String,
    pub above: f64,
}

/// Bands plus default label, as consumed by the router
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingConfig {
    pub bands: Vec<BandConfig>,
    pub default: Option<String>,
}

impl CapabilityConfig {
    pub fn routing(&self) -> RoutingConfig {
        RoutingConfig {
            bands: self.routes.clone(),
            default: self.default_route.clone(),
        }
    }

    /// Validate one capability section
    pub fn validate(&self, name: &str) -> crate::error::Result<()> {
        for (idx, example) in self.examples.iter().enumerate() {
            for field in ["input", "output"] {
                match example.get(field) {
                    Some(v) if !v.is_null() => {}
                    _ => {
                        return Err(Error::InvalidExample(format!(
                            "seed example {} of '{}' has no {}",
                            idx, name, field
                        )))
                    }
                }
            }
        }

        for (trigger, spec) in &self.adaptation_triggers {
            spec.validate(trigger)?;
        }

        if let Some(gate) = &self.adapt_when {
            if gate.confidence_below.is_nan() {
                return Err(Error::Config(format!("'{}': adapt_when.confidence_below is NaN", name)));
            }
        }

        for band in &self.routes {
            if band.label.trim().is_empty() {
                return Err(Error::Config(format!("'{}': route with empty label", name)));
            }
            if band.above.is_nan() {
                return Err(Error::InvalidRouteBound {
                    label: band.label.clone(),
                    bound: band.above,
                });
            }
        }
        if !self.routes.is_empty() && self.default_route.is_none() {
            return Err(Error::Config(format!("'{}': routes need a default_route", name)));
        }

        if self.timeout_ms == Some(0) {
            return Err(Error::Config(format!("'{}': timeout_ms must be positive", name)));
        }
        Ok(())
    }

    /// Requested explanation names that are not known kinds
    pub fn unknown_explanations(&self) -> Vec<&str> {
        self.explain_with
            .iter()
            .map(String::as_str)
            .filter(|k| k.parse::<ExplanationKind>().is_err())
            .collect()
    }
}

impl RuntimeConfig {
    /// Load configuration from the default location, writing defaults on
    /// first use
    pub fn load() -> Result<Self> {
        let config_path = config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = RuntimeConfig::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&contents).with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: RuntimeConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// A capability section with runtime defaults filled in
    pub fn capability(&self, name: &str) -> Option<CapabilityConfig> {
        let mut capability = self.capabilities.get(name)?.clone();
        capability.outcome_window.get_or_insert(self.adaptation.outcome_window);
        Some(capability)
    }

    /// Validate every section, reporting the first problem
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.adaptation.outcome_window == 0 {
            return Err(Error::Config("adaptation.outcome_window must be positive".to_string()));
        }
        if self.events.capacity == 0 {
            return Err(Error::Config("events.capacity must be positive".to_string()));
        }
        for (name, capability) in &self.capabilities {
            capability.validate(name)?;
        }
        Ok(())
    }
}

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "adaptive-context", "adaptive-context")
        .context("Failed to get project directories")?;
    Ok(base.config_dir().join("config.toml"))
}

/// Get default configuration as TOML string
pub fn default_config_toml() -> String {
    let config = RuntimeConfig::default();
    toml::to_string_pretty(&config).unwrap_or_else(|_| "# Default configuration\n".to_string())
}
