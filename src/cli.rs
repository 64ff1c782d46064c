//! CLI interface for adaptive-context

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::adaptation::spawn_retrain_dispatcher;
use crate::config::{self, CapabilityConfig, RuntimeConfig};
use crate::enhance::{EnhanceOptions, Enhanced, EnhancedProcedure};
use crate::events::{spawn_event_logger, EventBus};
use crate::learning::{CapabilityRegistry, KeywordMatchStrategy, LearningContext};
use crate::router::{Handler, RouteOutcome, RouteTable};
use crate::types::{Feedback, InferenceResult};

#[derive(Parser)]
#[command(name = "adaptive-context")]
#[command(about = "Example-driven capabilities with adaptation, explanations and confidence routing", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (default: the per-user config.toml)
    #[arg(short, long, global = true, env = "ADAPTIVE_CONTEXT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one input through a configured capability
    Run {
        /// Capability name
        capability: String,
        /// Text input
        input: String,
        /// Expected output, reported back as feedback
        #[arg(short, long)]
        expected: Option<String>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Validate the configuration
    Check,
    /// Print the configuration
    ShowConfig {
        /// Print built-in defaults instead
        #[arg(long)]
        default: bool,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { capability, input, expected, json } => {
            let config = load_config(cli.config.as_deref())?;
            run_capability(&config, &capability, input, expected, json).await?;
        }
        Commands::Check => {
            let config = load_config(cli.config.as_deref())?;
            check_config(&config)?;
        }
        Commands::ShowConfig { default } => {
            if default {
                print!("{}", config::default_config_toml());
            } else {
                let config = load_config(cli.config.as_deref())?;
                print!("{}", toml::to_string_pretty(&config).context("Failed to serialize config")?);
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    match path {
        Some(path) => RuntimeConfig::load_from(path),
        None => RuntimeConfig::load(),
    }
}

/// Route handlers for the CLI just report the band label
fn label_handlers(label: &str) -> Option<Handler<String, String>> {
    let label = label.to_string();
    Some(Box::new(move |_: &InferenceResult<String>| label.clone()))
}

fn route_table(capability: &CapabilityConfig) -> Result<Option<RouteTable<String, String>>> {
    let routing = capability.routing();
    if routing.bands.is_empty() && routing.default.is_none() {
        return Ok(None);
    }
    let table = RouteTable::from_config(&routing, label_handlers)?;
    table.validate()?;
    Ok(Some(table))
}

async fn run_capability(
    config: &RuntimeConfig,
    name: &str,
    input: String,
    expected: Option<String>,
    json: bool,
) -> Result<()> {
    config.validate()?;
    let capability = config
        .capability(name)
        .with_context(|| format!("Unknown capability '{}'", name))?;

    let bus = EventBus::with_capacity(config.events.capacity);
    let logger = spawn_event_logger(&bus);

    let context = LearningContext::from_config(name, &capability, Arc::new(KeywordMatchStrategy), bus.clone())?;
    let registry = Arc::new(CapabilityRegistry::new());
    let context = registry.register(context).await;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let dispatcher = spawn_retrain_dispatcher(&bus, registry.clone(), shutdown_rx);

    let procedure = EnhancedProcedure::learned(
        context.clone(),
        EnhanceOptions::from_config(&capability, &config.explanation),
    );
    let table = route_table(&capability)?;

    let (enhanced, route) = match &table {
        Some(table) => {
            let (enhanced, route) = procedure.call_and_route(input, table).await?;
            (enhanced, Some(route))
        }
        None => (procedure.call(input).await?, None),
    };

    if let Some(expected) = expected {
        let decision = procedure.report_outcome(enhanced.result(), &Feedback::new(expected));
        if decision.should_retrain {
            info!("Feedback requested a retrain: {}", decision.reasons.join(", "));
        }
    }

    print_outcome(&enhanced, route.as_ref(), json)?;

    // The dispatcher handles requests already on the bus before it stops
    let _ = shutdown_tx.send(());
    if let Err(e) = dispatcher.await {
        warn!("Retrain dispatcher ended abnormally: {}", e);
    }
    logger.abort();

    Ok(())
}

fn print_outcome(enhanced: &Enhanced<String>, route: Option<&RouteOutcome<String>>, json: bool) -> Result<()> {
    let result = enhanced.result();
    if json {
        let value = serde_json::json!({
            "result": result.result,
            "confidence": result.confidence,
            "explanation": enhanced.explanation(),
            "route": route.map(|r| &r.label),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Result:     {}", result.result);
    println!("Confidence: {:.2}", result.confidence);
    if let Some(route) = route {
        println!("Route:      {}", route.label);
    }
    if let Some(explanation) = enhanced.explanation() {
        println!("\n{}", explanation.render());
    }
    Ok(())
}

fn check_config(config: &RuntimeConfig) -> Result<()> {
    config.validate()?;

    for (name, capability) in &config.capabilities {
        let context: LearningContext<String, String> =
            LearningContext::from_config(name, capability, Arc::new(KeywordMatchStrategy), EventBus::new())
                .with_context(|| format!("Capability '{}'", name))?;
        route_table(capability).with_context(|| format!("Capability '{}'", name))?;

        for unknown in capability.unknown_explanations() {
            warn!("Capability '{}' requests unknown explanation '{}'; it will be ignored", name, unknown);
        }
        println!(
            "✓ {}: {} examples, {} triggers",
            name,
            context.example_count(),
            context.triggers().len()
        );
    }

    println!("Configuration OK ({} capabilities)", config.capabilities.len());
    Ok(())
}
