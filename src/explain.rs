//! Explainability generator
//!
//! Builds structured, deterministic explanations for inference results.
//! Explanations are advisory: an unsupported or failing kind becomes a
//! "not available" section and never breaks the call that asked for it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::ExplanationConfig;
use crate::events::{EventBus, RuntimeEvent};
use crate::learning::LearningContext;
use crate::types::{Datum, InferenceResult};

/// A fixed-format category of explanation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExplanationKind {
    ConfidenceBreakdown,
    HighlightInfluentialWords,
    ProvideCounterexamples,
}

impl ExplanationKind {
    pub const ALL: [ExplanationKind; 3] = [
        ExplanationKind::ConfidenceBreakdown,
        ExplanationKind::HighlightInfluentialWords,
        ExplanationKind::ProvideCounterexamples,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExplanationKind::ConfidenceBreakdown => "confidenceBreakdown",
            ExplanationKind::HighlightInfluentialWords => "highlightInfluentialWords",
            ExplanationKind::ProvideCounterexamples => "provideCounterexamples",
        }
    }
}

impl fmt::Display for ExplanationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExplanationKind {
    type Err = String;

    /// Accepts camelCase or snake_case names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "confidenceBreakdown" | "confidence_breakdown" => Ok(ExplanationKind::ConfidenceBreakdown),
            "highlightInfluentialWords" | "highlight_influential_words" => {
                Ok(ExplanationKind::HighlightInfluentialWords)
            }
            "provideCounterexamples" | "provide_counterexamples" => Ok(ExplanationKind::ProvideCounterexamples),
            other => Err(format!("unknown explanation kind '{}'", other)),
        }
    }
}

/// Body of one explanation section
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SectionContent {
    ConfidenceBreakdown { percentage: String, raw: f64 },
    InfluentialWords { tokens: Vec<String> },
    Counterexamples { examples: Vec<serde_json::Value> },
    NotAvailable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplanationSection {
    pub kind: ExplanationKind,
    pub content: SectionContent,
}

impl fmt::Display for ExplanationSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.content {
            SectionContent::ConfidenceBreakdown { percentage, raw } => {
                write!(f, "{}: {} (raw {})", self.kind, percentage, raw)
            }
            SectionContent::InfluentialWords { tokens } if tokens.is_empty() => {
                write!(f, "{}: no influential tokens", self.kind)
            }
            SectionContent::InfluentialWords { tokens } => {
                write!(f, "{}: {}", self.kind, tokens.join(", "))
            }
            SectionContent::Counterexamples { examples } => {
                write!(f, "{}:", self.kind)?;
                for example in examples {
                    write!(f, "\n  - {}", example)?;
                }
                Ok(())
            }
            SectionContent::NotAvailable { reason } => {
                write!(f, "{}: not available ({})", self.kind, reason)
            }
        }
    }
}

/// Structured explanation of one result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    /// Requested known kinds, first occurrence order
    pub kinds: Vec<ExplanationKind>,
    /// One section per entry of `kinds`, same order
    pub sections: Vec<ExplanationSection>,
    /// Requested names that are not known kinds
    pub ignored: Vec<String>,
}

impl Explanation {
    pub fn section(&self, kind: ExplanationKind) -> Option<&ExplanationSection> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Human-readable rendering, one section per line block
    pub fn render(&self) -> String {
        self.sections
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Produces explanations, using the context's strategy hooks when present
#[derive(Clone)]
pub struct ExplainabilityGenerator {
    events: EventBus,
    max_influential_tokens: usize,
    max_counterexamples: usize,
}

impl ExplainabilityGenerator {
    pub fn new(events: EventBus) -> Self {
        Self::from_config(&ExplanationConfig::default(), events)
    }

    pub fn from_config(config: &ExplanationConfig, events: EventBus) -> Self {
        Self {
            events,
            max_influential_tokens: config.max_influential_tokens,
            max_counterexamples: config.max_counterexamples,
        }
    }

    /// Explain `result` for the requested kinds, in request order.
    ///
    /// Unknown kind names produce no section; they are listed in
    /// `ignored` and reported as `ExplanationKindsIgnored`.
    pub fn explain<I: Datum, O: Datum, S: AsRef<str>>(
        &self,
        result: &InferenceResult<O>,
        kinds: &[S],
        input: &I,
        context: Option<&LearningContext<I, O>>,
    ) -> Explanation {
        let mut requested = Vec::new();
        let mut ignored = Vec::new();
        for name in kinds {
            match name.as_ref().parse::<ExplanationKind>() {
                Ok(kind) if !requested.contains(&kind) => requested.push(kind),
                Ok(_) => {}
                Err(_) => ignored.push(name.as_ref().to_string()),
            }
        }

        if !ignored.is_empty() {
            self.events.emit(RuntimeEvent::ExplanationKindsIgnored {
                kinds: ignored.clone(),
            });
        }

        let sections = requested
            .iter()
            .map(|&kind| ExplanationSection {
                kind,
                content: match kind {
                    ExplanationKind::ConfidenceBreakdown => confidence_breakdown(result.confidence),
                    ExplanationKind::HighlightInfluentialWords => {
                        self.influential_words(result, input, context)
                    }
                    ExplanationKind::ProvideCounterexamples => self.counterexamples(result, input, context),
                },
            })
            .collect();

        Explanation {
            kinds: requested,
            sections,
            ignored,
        }
    }

    fn influential_words<I: Datum, O: Datum>(
        &self,
        result: &InferenceResult<O>,
        input: &I,
        context: Option<&LearningContext<I, O>>,
    ) -> SectionContent {
        if !matches!(serde_json::to_value(input), Ok(serde_json::Value::String(_))) {
            return not_available("input is not text");
        }
        let Some(context) = context else {
            return SectionContent::InfluentialWords { tokens: Vec::new() };
        };

        match context
            .strategy()
            .influential_tokens(input, result, &context.examples())
        {
            Ok(Some(mut tokens)) => {
                tokens.truncate(self.max_influential_tokens);
                SectionContent::InfluentialWords { tokens }
            }
            Ok(None) => SectionContent::InfluentialWords { tokens: Vec::new() },
            Err(e) => not_available(&format!("strategy error: {}", e)),
        }
    }

    fn counterexamples<I: Datum, O: Datum>(
        &self,
        result: &InferenceResult<O>,
        input: &I,
        context: Option<&LearningContext<I, O>>,
    ) -> SectionContent {
        let Some(context) = context else {
            return not_available("no learning context");
        };
        let strategy = context.strategy();

        let examples = match strategy.nearest_counterexamples(
            input,
            result,
            &context.examples(),
            self.max_counterexamples,
        ) {
            Ok(Some(examples)) => examples,
            Ok(None) => return not_available(&format!("not supported by strategy '{}'", strategy.name())),
            Err(e) => return not_available(&format!("strategy error: {}", e)),
        };

        let rendered: Result<Vec<_>, _> = examples
            .iter()
            .take(self.max_counterexamples)
            .map(serde_json::to_value)
            .collect();
        match rendered {
            Ok(examples) => SectionContent::Counterexamples { examples },
            Err(e) => not_available(&format!("counterexample not serializable: {}", e)),
        }
    }
}

fn confidence_breakdown(confidence: f64) -> SectionContent {
    SectionContent::ConfidenceBreakdown {
        percentage: format!("{}%", (confidence * 100.0).round()),
        raw: confidence,
    }
}

fn not_available(reason: &str) -> SectionContent {
    SectionContent::NotAvailable {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learning::KeywordMatchStrategy;
    use std::sync::Arc;

    fn generator() -> ExplainabilityGenerator {
        ExplainabilityGenerator::new(EventBus::new())
    }

    fn sentiment() -> LearningContext<String, String> {
        LearningContext::builder("sentiment", Arc::new(KeywordMatchStrategy))
            .example("I love this product!".to_string(), "POSITIVE".to_string())
            .example("This is terrible".to_string(), "NEGATIVE".to_string())
            .example("It works as expected".to_string(), "NEUTRAL".to_string())
            .build()
            .unwrap()
    }

    #[test]
    fn test_kind_names() {
        assert_eq!("confidenceBreakdown".parse(), Ok(ExplanationKind::ConfidenceBreakdown));
        assert_eq!("provide_counterexamples".parse(), Ok(ExplanationKind::ProvideCounterexamples));
        assert!("vibes".parse::<ExplanationKind>().is_err());
        assert_eq!(
            serde_json::to_string(&ExplanationKind::HighlightInfluentialWords).unwrap(),
            "\"highlightInfluentialWords\""
        );
    }

    #[test]
    fn test_confidence_breakdown() {
        let result = InferenceResult::new("POSITIVE".to_string(), 0.83);
        let explanation = generator().explain::<String, String, _>(
            &result,
            &["confidenceBreakdown"],
            &"text".to_string(),
            None,
        );
        let section = explanation.section(ExplanationKind::ConfidenceBreakdown).unwrap();
        assert_eq!(
            section.content,
            SectionContent::ConfidenceBreakdown { percentage: "83%".into(), raw: 0.83 }
        );
        let rendered = explanation.render();
        assert!(rendered.contains("83%"));
        assert!(rendered.contains("0.83"));
    }

    #[test]
    fn test_sections_follow_request_order() {
        let ctx = sentiment();
        let input = "I love your product".to_string();
        let result = InferenceResult::new("POSITIVE".to_string(), 0.75);
        let explanation = generator().explain(
            &result,
            &["provideCounterexamples", "sparkle", "confidenceBreakdown", "confidenceBreakdown"],
            &input,
            Some(&ctx),
        );
        assert_eq!(
            explanation.kinds,
            vec![ExplanationKind::ProvideCounterexamples, ExplanationKind::ConfidenceBreakdown]
        );
        assert_eq!(explanation.sections.len(), 2);
        assert_eq!(explanation.sections[0].kind, ExplanationKind::ProvideCounterexamples);
        assert_eq!(explanation.ignored, vec!["sparkle"]);
    }

    #[test]
    fn test_unknown_kinds_are_reported() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let result = InferenceResult::new(1u32, 0.5);
        let explanation = ExplainabilityGenerator::new(bus).explain::<u32, u32, _>(&result, &["mystery"], &3, None);
        assert!(explanation.is_empty());
        assert!(matches!(
            rx.drain().as_slice(),
            [RuntimeEvent::ExplanationKindsIgnored { kinds }] if kinds == &vec!["mystery".to_string()]
        ));
    }

    #[test]
    fn test_influential_words() {
        let ctx = sentiment();
        let input = "I love your product, it's really helping me!".to_string();
        let result = InferenceResult::new("POSITIVE".to_string(), 0.75);
        let explanation = generator().explain(&result, &["highlightInfluentialWords"], &input, Some(&ctx));
        assert_eq!(
            explanation.sections[0].content,
            SectionContent::InfluentialWords { tokens: vec!["i".into(), "love".into(), "product".into()] }
        );
    }

    #[test]
    fn test_influential_words_requires_text() {
        let result = InferenceResult::new(1u32, 0.5);
        let explanation =
            generator().explain::<u32, u32, _>(&result, &["highlightInfluentialWords"], &42, None);
        assert!(matches!(explanation.sections[0].content, SectionContent::NotAvailable { .. }));
    }

    #[test]
    fn test_counterexamples_without_context_not_fabricated() {
        let result = InferenceResult::new("POSITIVE".to_string(), 0.9);
        let explanation =
            generator().explain::<String, String, _>(&result, &["provideCounterexamples"], &"x".to_string(), None);
        assert!(matches!(explanation.sections[0].content, SectionContent::NotAvailable { .. }));
    }

    #[test]
    fn test_counterexamples_from_store() {
        let ctx = sentiment();
        let result = InferenceResult::new("POSITIVE".to_string(), 0.75);
        let explanation =
            generator().explain(&result, &["provideCounterexamples"], &"this works".to_string(), Some(&ctx));
        match &explanation.sections[0].content {
            SectionContent::Counterexamples { examples } => {
                assert_eq!(examples.len(), 2);
                assert_eq!(examples[0]["output"], "NEGATIVE");
            }
            other => panic!("unexpected section: {:?}", other),
        }
    }

    #[test]
    fn test_explanations_are_deterministic() {
        let ctx = sentiment();
        let input = "I love this, it works".to_string();
        let result = InferenceResult::new("POSITIVE".to_string(), 0.5);
        let kinds = ExplanationKind::ALL.map(|k| k.as_str());
        let first = generator().explain(&result, &kinds, &input, Some(&ctx));
        let second = generator().explain(&result, &kinds, &input, Some(&ctx));
        assert_eq!(first, second);
    }
}
