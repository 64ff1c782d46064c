//! Adaptation: triggers, outcome history and retrain decisions

pub mod dispatch;
pub mod engine;
pub mod trigger;
pub mod window;

pub use dispatch::spawn_retrain_dispatcher;
pub use engine::{AdaptationDecision, AdaptationEngine};
pub use trigger::{AdaptationTrigger, TriggerCondition, TriggerFn, TriggerInput, TriggerSpec};
pub use window::OutcomeWindow;
