//! Enhancement wrapper
//!
//! Composes a base procedure or a learning context with adaptation,
//! explanation and routing. The chain always runs in one order:
//! inference, then adaptation, then explanation, then routing.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::adaptation::{AdaptationDecision, AdaptationEngine};
use crate::config::{CapabilityConfig, ExplanationConfig};
use crate::error::{Error, Result};
use crate::events::{EventBus, RuntimeEvent};
use crate::explain::{ExplainabilityGenerator, Explanation};
use crate::learning::LearningContext;
use crate::router::{RouteOutcome, RouteTable};
use crate::types::{ContextId, Datum, Feedback, InferenceResult};

/// A boxed async base procedure
pub type BaseFn<I, O> = Arc<dyn Fn(I) -> BoxFuture<'static, anyhow::Result<O>> + Send + Sync>;

/// Gate deciding whether a result is worth evaluating for adaptation
pub type AdaptGate<O> = Arc<dyn Fn(&InferenceResult<O>) -> bool + Send + Sync>;

const DEFAULT_PROCEDURE_NAME: &str = "procedure";

/// Composition options
pub struct EnhanceOptions<O> {
    pub adapt_when: Option<AdaptGate<O>>,
    pub explain_with: Vec<String>,
    pub timeout: Option<Duration>,
    /// Name reported for a plain base procedure
    pub name: Option<String>,
    /// Bus for a plain base procedure; learned procedures use their context's
    pub events: Option<EventBus>,
    pub explanation: ExplanationConfig,
}

impl<O> Default for EnhanceOptions<O> {
    fn default() -> Self {
        Self {
            adapt_when: None,
            explain_with: Vec::new(),
            timeout: None,
            name: None,
            events: None,
            explanation: ExplanationConfig::default(),
        }
    }
}

impl<O: Datum> EnhanceOptions<O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options from a capability section
    pub fn from_config(config: &CapabilityConfig, explanation: &ExplanationConfig) -> Self {
        let mut options = Self::new()
            .explain_with(config.explain_with.iter().cloned())
            .explanation_limits(explanation.clone());
        if let Some(gate) = config.adapt_when {
            options = options.adapt_when(move |r: &InferenceResult<O>| r.confidence < gate.confidence_below);
        }
        if let Some(ms) = config.timeout_ms {
            options = options.timeout(Duration::from_millis(ms));
        }
        options
    }

    pub fn adapt_when<F>(mut self, gate: F) -> Self
    where
        F: Fn(&InferenceResult<O>) -> bool + Send + Sync + 'static,
    {
        self.adapt_when = Some(Arc::new(gate));
        self
    }

    pub fn explain_with<S: Into<String>>(mut self, kinds: impl IntoIterator<Item = S>) -> Self {
        self.explain_with = kinds.into_iter().map(Into::into).collect();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn explanation_limits(mut self, explanation: ExplanationConfig) -> Self {
        self.explanation = explanation;
        self
    }
}

/// Result of an enhanced call
#[derive(Debug, Clone, PartialEq)]
pub enum Enhanced<O> {
    Plain(InferenceResult<O>),
    Explained {
        result: InferenceResult<O>,
        explanation: Explanation,
    },
}

impl<O> Enhanced<O> {
    pub fn result(&self) -> &InferenceResult<O> {
        match self {
            Enhanced::Plain(result) => result,
            Enhanced::Explained { result, .. } => result,
        }
    }

    pub fn explanation(&self) -> Option<&Explanation> {
        match self {
            Enhanced::Plain(_) => None,
            Enhanced::Explained { explanation, .. } => Some(explanation),
        }
    }

    pub fn into_result(self) -> InferenceResult<O> {
        match self {
            Enhanced::Plain(result) => result,
            Enhanced::Explained { result, .. } => result,
        }
    }
}

enum Source<I, O> {
    Base { id: ContextId, procedure: BaseFn<I, O> },
    Learned(Arc<LearningContext<I, O>>),
}

/// A procedure wrapped with adaptation and explanation
pub struct EnhancedProcedure<I, O> {
    source: Source<I, O>,
    adapt_when: Option<AdaptGate<O>>,
    explain_with: Vec<String>,
    timeout: Option<Duration>,
    engine: AdaptationEngine,
    explainer: ExplainabilityGenerator,
    events: EventBus,
}

/// Wrap an async base procedure. Its output is treated as certain.
pub fn enhance<I, O, F, Fut>(procedure: F, options: EnhanceOptions<O>) -> EnhancedProcedure<I, O>
where
    I: Datum,
    O: Datum,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
{
    let procedure: BaseFn<I, O> = Arc::new(move |input| procedure(input).boxed());
    let id = ContextId::new(options.name.clone().unwrap_or_else(|| DEFAULT_PROCEDURE_NAME.to_string()));
    let events = options.events.clone().unwrap_or_default();
    EnhancedProcedure::assemble(Source::Base { id, procedure }, options, events)
}

impl<I: Datum, O: Datum> EnhancedProcedure<I, O> {
    /// Wrap a learning context
    pub fn learned(context: Arc<LearningContext<I, O>>, options: EnhanceOptions<O>) -> Self {
        let events = context.events().clone();
        Self::assemble(Source::Learned(context), options, events)
    }

    fn assemble(source: Source<I, O>, options: EnhanceOptions<O>, events: EventBus) -> Self {
        Self {
            source,
            adapt_when: options.adapt_when,
            explain_with: options.explain_with,
            timeout: options.timeout,
            engine: AdaptationEngine::new(events.clone()),
            explainer: ExplainabilityGenerator::from_config(&options.explanation, events.clone()),
            events,
        }
    }

    pub fn id(&self) -> &ContextId {
        match &self.source {
            Source::Base { id, .. } => id,
            Source::Learned(context) => context.id(),
        }
    }

    pub fn context(&self) -> Option<&Arc<LearningContext<I, O>>> {
        match &self.source {
            Source::Base { .. } => None,
            Source::Learned(context) => Some(context),
        }
    }

    /// Infer, maybe adapt, maybe explain
    pub async fn call(&self, input: I) -> Result<Enhanced<O>> {
        let result = self.infer(&input).await?;
        self.adapt(&result);
        Ok(self.finish(result, &input))
    }

    /// Like `call`, then hand the result to exactly one route handler
    pub async fn call_and_route<R>(
        &self,
        input: I,
        table: &RouteTable<O, R>,
    ) -> Result<(Enhanced<O>, RouteOutcome<R>)> {
        let enhanced = self.call(input).await?;
        let outcome = table.route(enhanced.result())?;
        Ok((enhanced, outcome))
    }

    /// Feed ground truth for an earlier result back into adaptation.
    ///
    /// The `adapt_when` gate does not apply: every outcome is recorded.
    pub fn report_outcome(&self, result: &InferenceResult<O>, feedback: &Feedback<O>) -> AdaptationDecision {
        match &self.source {
            Source::Learned(context) => self.engine.evaluate(context, result, Some(feedback)),
            Source::Base { .. } => AdaptationDecision::no_change(),
        }
    }

    async fn infer(&self, input: &I) -> Result<InferenceResult<O>> {
        let inference = async {
            match &self.source {
                Source::Learned(context) => context.process(input).await,
                Source::Base { id, procedure } => match procedure(input.clone()).await {
                    Ok(output) => Ok(InferenceResult::certain(output)),
                    Err(cause) => Err(self.failure(id, cause)),
                },
            }
        };

        let Some(limit) = self.timeout else {
            return inference.await;
        };
        match tokio::time::timeout(limit, inference).await {
            Ok(outcome) => outcome,
            Err(_) => Err(self.failure(self.id(), anyhow::anyhow!("timed out after {:?}", limit))),
        }
    }

    fn failure(&self, id: &ContextId, cause: anyhow::Error) -> Error {
        self.events.emit(RuntimeEvent::InferenceFailure {
            context: id.clone(),
            cause: format!("{:#}", cause),
        });
        Error::inference(id.to_string(), cause)
    }

    fn adapt(&self, result: &InferenceResult<O>) {
        let Source::Learned(context) = &self.source else {
            return;
        };
        let gate_open = self.adapt_when.as_ref().map_or(true, |gate| gate(result));
        if gate_open {
            self.engine.evaluate(context, result, None);
        }
    }

    fn finish(&self, result: InferenceResult<O>, input: &I) -> Enhanced<O> {
        if self.explain_with.is_empty() {
            return Enhanced::Plain(result);
        }
        let explanation = self
            .explainer
            .explain(&result, &self.explain_with, input, self.context().map(Arc::as_ref));
        Enhanced::Explained { result, explanation }
    }
}
