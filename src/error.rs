//! Error types for the runtime
//!
//! Out-of-range confidence is not an error: it is clamped and reported on
//! the event channel. Adaptation and explanation problems never surface here
//! either; they degrade inside their own components.

use thiserror::Error;

/// Errors surfaced to callers of the runtime
#[derive(Debug, Error)]
pub enum Error {
    /// Example rejected at the store boundary
    #[error("invalid example: {0}")]
    InvalidExample(String),

    /// The inference strategy (or a plain base procedure) failed or timed out
    #[error("inference failed in '{context}': {cause}")]
    InferenceFailure {
        context: String,
        #[source]
        cause: anyhow::Error,
    },

    /// Router exhausted every band and no default handler is configured
    #[error("no confidence band matched {confidence} and no default handler is configured")]
    NoDefaultHandler { confidence: f64 },

    /// A route table was composed without a default handler
    #[error("route table has no default handler")]
    MissingDefaultHandler,

    /// A band bound that can never be compared against
    #[error("invalid bound {bound} for band '{label}'")]
    InvalidRouteBound { label: String, bound: f64 },

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn inference(context: impl Into<String>, cause: anyhow::Error) -> Self {
        Error::InferenceFailure {
            context: context.into(),
            cause,
        }
    }
}
