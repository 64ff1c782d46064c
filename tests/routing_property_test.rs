//! Routing and inference properties

use adaptive_context::{InferenceResult, KeywordMatchStrategy, LearningContext, RouteTable};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn expected_label(confidence: f64) -> &'static str {
    if confidence > 0.9 {
        "auto"
    } else if confidence > 0.7 {
        "high"
    } else if confidence > 0.5 {
        "medium"
    } else {
        "default"
    }
}

fn counting_table(calls: &Arc<AtomicUsize>) -> RouteTable<u8, ()> {
    let bump = |calls: &Arc<AtomicUsize>| {
        let calls = calls.clone();
        move |_: &InferenceResult<u8>| {
            calls.fetch_add(1, Ordering::SeqCst);
        }
    };
    RouteTable::builder()
        .band("medium", 0.5, bump(calls))
        .band("auto", 0.9, bump(calls))
        .band("high", 0.7, bump(calls))
        .default(bump(calls))
        .build_strict()
        .unwrap()
}

proptest! {
    #[test]
    fn route_invokes_exactly_the_highest_passing_band(confidence in 0.0f64..=1.0) {
        let calls = Arc::new(AtomicUsize::new(0));
        let table = counting_table(&calls);

        let outcome = table.route(&InferenceResult::new(0u8, confidence)).unwrap();
        prop_assert_eq!(outcome.label.as_str(), expected_label(confidence));
        prop_assert_eq!(table.select(confidence), Some(expected_label(confidence)));
        prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn keyword_strategy_is_deterministic(words in proptest::collection::vec("[a-z]{1,6}", 1..8)) {
        let context: LearningContext<String, String> =
            LearningContext::builder("sentiment", Arc::new(KeywordMatchStrategy))
                .example("I love this product!".to_string(), "POSITIVE".to_string())
                .example("This is terrible".to_string(), "NEGATIVE".to_string())
                .build()
                .unwrap();
        let input = words.join(" ");

        let first = tokio_test::block_on(context.process(&input)).unwrap();
        let second = tokio_test::block_on(context.process(&input)).unwrap();
        prop_assert!((0.0..=1.0).contains(&first.confidence));
        prop_assert_eq!(first, second);
    }
}

#[test]
fn boundary_values_fall_to_the_lower_band() {
    let calls = Arc::new(AtomicUsize::new(0));
    let table = counting_table(&calls);
    assert_eq!(table.select(0.9), Some("high"));
    assert_eq!(table.select(0.7), Some("medium"));
    assert_eq!(table.select(0.5), Some("default"));
    assert_eq!(table.select(0.9000001), Some("auto"));
}
