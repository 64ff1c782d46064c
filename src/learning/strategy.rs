//! Inference strategies
//!
//! The runtime never knows how a result is computed. A strategy receives the
//! input plus a snapshot of the context's examples and returns a result with a
//! confidence. Optional hooks let a strategy take part in retraining and in
//! explanations.

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use super::store::ExampleSnapshot;
use crate::types::{Datum, Example, InferenceResult};

/// Pluggable component computing a result and confidence from examples
#[async_trait]
pub trait InferenceStrategy<I: Datum, O: Datum>: Send + Sync {
    /// Infer an output for `input` from the current examples
    async fn infer(&self, input: &I, examples: &ExampleSnapshot<I, O>) -> Result<InferenceResult<O>>;

    /// Update hook, called when the adaptation engine requested a retrain
    async fn update(&self, _examples: &ExampleSnapshot<I, O>, _reasons: &[String]) -> Result<()> {
        Ok(())
    }

    /// Tokens of a text input that drove the result. `None` when unsupported.
    fn influential_tokens(
        &self,
        _input: &I,
        _result: &InferenceResult<O>,
        _examples: &ExampleSnapshot<I, O>,
    ) -> Result<Option<Vec<String>>> {
        Ok(None)
    }

    /// Stored examples closest to the decision boundary that carry a
    /// different output than `result`. `None` when unsupported.
    fn nearest_counterexamples(
        &self,
        _input: &I,
        _result: &InferenceResult<O>,
        _examples: &ExampleSnapshot<I, O>,
        _limit: usize,
    ) -> Result<Option<Vec<Example<I, O>>>> {
        Ok(None)
    }

    fn name(&self) -> &'static str {
        "custom"
    }
}

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").unwrap());

/// Lowercased word tokens, in input order
pub fn tokenize(text: &str) -> Vec<String> {
    WORD.find_iter(text).map(|m| m.as_str().to_lowercase()).collect()
}

/// Reference strategy: keyword containment against stored example inputs.
///
/// The confidence is the fraction of an example's distinct words that also
/// occur in the input; the best-scoring example's output wins. Ties go to
/// the most recently added example, so a superseding example overrides an
/// older one.
#[derive(Debug, Clone, Default)]
pub struct KeywordMatchStrategy;

impl KeywordMatchStrategy {
    pub fn new() -> Self {
        Self
    }

    fn score(input_words: &HashSet<String>, example_input: &str) -> f64 {
        let example_words: HashSet<String> = tokenize(example_input).into_iter().collect();
        if example_words.is_empty() {
            return 0.0;
        }
        let shared = example_words.intersection(input_words).count();
        shared as f64 / example_words.len() as f64
    }

    /// Best match as (index, score)
    fn best_match<O>(input: &str, examples: &ExampleSnapshot<String, O>) -> Option<(usize, f64)> {
        let input_words: HashSet<String> = tokenize(input).into_iter().collect();
        let mut best: Option<(usize, f64)> = None;
        for (idx, example) in examples.iter().enumerate() {
            let score = Self::score(&input_words, &example.input);
            match best {
                Some((_, top)) if score < top => {}
                _ => best = Some((idx, score)),
            }
        }
        best
    }
}

#[async_trait]
impl<O: Datum> InferenceStrategy<String, O> for KeywordMatchStrategy {
    async fn infer(&self, input: &String, examples: &ExampleSnapshot<String, O>) -> Result<InferenceResult<O>> {
        let (idx, score) = Self::best_match(input, examples)
            .ok_or_else(|| anyhow::anyhow!("no examples to match against"))?;
        let example = examples
            .get(idx)
            .ok_or_else(|| anyhow::anyhow!("example {} vanished from snapshot", idx))?;
        Ok(InferenceResult::new(example.output.clone(), score))
    }

    fn influential_tokens(
        &self,
        input: &String,
        _result: &InferenceResult<O>,
        examples: &ExampleSnapshot<String, O>,
    ) -> Result<Option<Vec<String>>> {
        let Some((idx, _)) = Self::best_match(input, examples) else {
            return Ok(Some(Vec::new()));
        };
        let matched: HashSet<String> = examples
            .get(idx)
            .map(|e| tokenize(&e.input).into_iter().collect())
            .unwrap_or_default();

        let mut seen = HashSet::new();
        let tokens = tokenize(input)
            .into_iter()
            .filter(|t| matched.contains(t) && seen.insert(t.clone()))
            .collect();
        Ok(Some(tokens))
    }

    fn nearest_counterexamples(
        &self,
        input: &String,
        result: &InferenceResult<O>,
        examples: &ExampleSnapshot<String, O>,
        limit: usize,
    ) -> Result<Option<Vec<Example<String, O>>>> {
        let input_words: HashSet<String> = tokenize(input).into_iter().collect();
        let mut candidates: Vec<(f64, &Example<String, O>)> = examples
            .iter()
            .filter(|e| e.output != result.result)
            .map(|e| (Self::score(&input_words, &e.input), e))
            .collect();
        // Stable sort keeps insertion order among equal scores
        candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(Some(
            candidates.into_iter().take(limit).map(|(_, e)| e.clone()).collect(),
        ))
    }

    fn name(&self) -> &'static str {
        "keyword_match"
    }
}
