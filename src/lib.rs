//! Adaptive Context - example-driven capabilities
//!
//! A runtime for capabilities learned from examples, with:
//! - Example stores and pluggable inference strategies
//! - Adaptation triggers that request retraining
//! - Deterministic explanations of each result
//! - Confidence-band routing
//! - Typed runtime events instead of log output
//!
//! # Example
//!
//! ```ignore
//! use adaptive_context::{EnhanceOptions, EnhancedProcedure, KeywordMatchStrategy, LearningContext};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let context = LearningContext::builder("sentiment", Arc::new(KeywordMatchStrategy))
//!         .example("I love this product!".to_string(), "POSITIVE".to_string())
//!         .example("This is terrible".to_string(), "NEGATIVE".to_string())
//!         .build()?;
//!     let procedure = EnhancedProcedure::learned(
//!         Arc::new(context),
//!         EnhanceOptions::new().explain_with(["confidenceBreakdown"]),
//!     );
//!     let out = procedure.call("I love your product".to_string()).await?;
//!     println!("{:?}", out.result());
//!     Ok(())
//! }
//! ```

// Core modules (order matters for cross-module dependencies)
pub mod types;
pub mod error;
pub mod events;
pub mod config;
pub mod learning;
pub mod adaptation;
pub mod router;
pub mod explain;
pub mod enhance;
pub mod cli;

// Re-export commonly used types for convenience
pub use types::{ContextId, Datum, Example, Feedback, InferenceResult};

pub use error::{Error, Result};

pub use events::{spawn_event_logger, EventBus, EventEnvelope, RuntimeEvent};

pub use config::{CapabilityConfig, RuntimeConfig};

pub use learning::{
    CapabilityRegistry,
    ExampleSnapshot,
    ExampleStore,
    InferenceStrategy,
    KeywordMatchStrategy,
    LearningContext,
};

pub use adaptation::{
    spawn_retrain_dispatcher,
    AdaptationDecision,
    AdaptationEngine,
    AdaptationTrigger,
    TriggerSpec,
};

pub use router::{route, RouteOutcome, RouteTable};

pub use explain::{ExplainabilityGenerator, Explanation, ExplanationKind};

pub use enhance::{enhance, EnhanceOptions, Enhanced, EnhancedProcedure};
