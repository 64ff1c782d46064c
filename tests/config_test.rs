//! Building a routed capability from a configuration file

use adaptive_context::router::Handler;
use adaptive_context::{
    EnhanceOptions, EnhancedProcedure, EventBus, InferenceResult, KeywordMatchStrategy, LearningContext,
    RouteTable, RuntimeConfig, RuntimeEvent,
};
use std::sync::Arc;

const CONFIG: &str = r#"
[explanation]
max_influential_tokens = 2

[capabilities.sentiment]
examples = [
    { input = "I love this product!", output = "POSITIVE" },
    { input = "This is terrible", output = "NEGATIVE" },
    { input = "It works as expected", output = "NEUTRAL" },
]
explain_with = ["confidenceBreakdown", "highlightInfluentialWords", "tarotReading"]
routes = [
    { label = "auto", above = 0.9 },
    { label = "high", above = 0.7 },
]
default_route = "review"

[capabilities.sentiment.adaptation_triggers.low_confidence]
type = "confidence_below"
threshold = 0.8
"#;

fn label_handler(label: &str) -> Option<Handler<String, String>> {
    let label = label.to_string();
    Some(Box::new(move |_: &InferenceResult<String>| label.clone()))
}

#[tokio::test]
async fn test_capability_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, CONFIG).unwrap();

    let config = RuntimeConfig::load_from(&path).unwrap();
    config.validate().unwrap();
    let capability = config.capability("sentiment").unwrap();

    let bus = EventBus::new();
    let mut rx = bus.subscribe();
    let context: LearningContext<String, String> =
        LearningContext::from_config("sentiment", &capability, Arc::new(KeywordMatchStrategy), bus.clone())
            .unwrap();
    let procedure = EnhancedProcedure::learned(
        Arc::new(context),
        EnhanceOptions::from_config(&capability, &config.explanation),
    );
    let table = RouteTable::from_config(&capability.routing(), label_handler).unwrap();
    table.validate().unwrap();

    let (enhanced, route) = procedure
        .call_and_route("I love your product, it's really helping me!".to_string(), &table)
        .await
        .unwrap();

    assert_eq!(route.output, "high");
    let explanation = enhanced.explanation().unwrap();
    assert_eq!(explanation.sections.len(), 2);
    assert_eq!(explanation.ignored, vec!["tarotReading"]);
    assert!(explanation.render().contains("i, love"));
    assert!(!explanation.render().contains("product"));

    let events = rx.drain();
    assert!(events.iter().any(|e| matches!(e, RuntimeEvent::RetrainRequested { reasons, .. } if reasons == &vec!["low_confidence".to_string()])));
    assert!(events.iter().any(|e| matches!(e, RuntimeEvent::ExplanationKindsIgnored { .. })));
}

#[test]
fn test_broken_config_is_reported_with_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[capabilities.sentiment\nexamples = 3").unwrap();

    let err = RuntimeConfig::load_from(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse config file"));
}
