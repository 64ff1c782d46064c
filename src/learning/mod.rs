//! Learned capabilities
//!
//! Example stores, pluggable inference strategies, and the learning
//! contexts that tie them together.

pub mod context;
pub mod registry;
pub mod store;
pub mod strategy;

pub use context::{LearningContext, LearningContextBuilder};
pub use registry::CapabilityRegistry;
pub use store::{ExampleSnapshot, ExampleStore};
pub use strategy::{tokenize, InferenceStrategy, KeywordMatchStrategy};
