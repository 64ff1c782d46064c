//! Capability registry - capability name to learning context
//!
//! Owned by the composition layer; lets direct callers (adding examples,
//! reporting outcomes) and background tasks reach a context by name.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::context::LearningContext;
use crate::types::{ContextId, Datum};

/// Registered contexts for one input/output type pair
pub struct CapabilityRegistry<I, O> {
    contexts: RwLock<HashMap<String, Arc<LearningContext<I, O>>>>,
}

impl<I: Datum, O: Datum> CapabilityRegistry<I, O> {
    pub fn new() -> Self {
        Self {
            contexts: RwLock::new(HashMap::new()),
        }
    }

    /// Register a context under its name, replacing any previous one
    pub async fn register(&self, context: LearningContext<I, O>) -> Arc<LearningContext<I, O>> {
        let context = Arc::new(context);
        self.insert(context.clone()).await;
        context
    }

    /// Register an already shared context. Returns the one it replaced.
    pub async fn insert(&self, context: Arc<LearningContext<I, O>>) -> Option<Arc<LearningContext<I, O>>> {
        let mut contexts = self.contexts.write().await;
        contexts.insert(context.name().to_string(), context)
    }

    pub async fn get(&self, name: &str) -> Option<Arc<LearningContext<I, O>>> {
        let contexts = self.contexts.read().await;
        contexts.get(name).cloned()
    }

    /// Look up by full identity; a replaced context with the same name
    /// does not match
    pub async fn get_by_id(&self, id: &ContextId) -> Option<Arc<LearningContext<I, O>>> {
        self.get(&id.name).await.filter(|ctx| ctx.id() == id)
    }

    pub async fn remove(&self, name: &str) -> Option<Arc<LearningContext<I, O>>> {
        let mut contexts = self.contexts.write().await;
        contexts.remove(name)
    }

    /// Registered capability names, sorted
    pub async fn names(&self) -> Vec<String> {
        let contexts = self.contexts.read().await;
        let mut names: Vec<String> = contexts.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn len(&self) -> usize {
        self.contexts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<I: Datum, O: Datum> Default for CapabilityRegistry<I, O> {
    fn default() -> Self {
        Self::new()
    }
}
