use std::sync::Arc;

use anyhow::{Context, Result};
use trading_agent::replay::{load_positions, FileMarketData, ReplayModel};
use trading_agent::{AgentConfig, DecisionCycle, RetryPolicy, RetryingModel};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter()).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter()).init();
    }

    std::panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
        tracing::error!("PANIC: {info}");
    }));

    let config = AgentConfig::from_env()?;
    tracing::info!("Configuration loaded");
    tracing::info!("  Universe: {}", config.universe.symbols().join(","));
    tracing::info!("  Model: {}", config.model_name);
    tracing::info!("  Trend guard min strength: {}", config.trend_guard_min_strength);

    let market = Arc::new(FileMarketData::load(&config.snapshot_file)?);
    if market.is_empty() {
        tracing::warn!("Snapshot file {} holds no symbols", config.snapshot_file);
    }
    let positions = load_positions(config.positions_file.as_deref())?;

    let policy = RetryPolicy::new(config.model_max_retries, config.backoff(), config.backoff_max());
    let model = RetryingModel::new(
        ReplayModel::load(config.model_name.clone(), &config.model_reply_file)?,
        policy,
        &config.reasoning_models,
    );
    if model.expects_reasoning() {
        tracing::info!("  {} is a reasoning model, think blocks expected", config.model_name);
    }

    let cycle = DecisionCycle::new(
        market,
        Arc::new(model),
        config.universe.clone(),
        config.trend_guard_min_strength,
    );
    let outcome = cycle.run(&positions).await;

    if outcome.vetoed() {
        tracing::warn!("Model decision vetoed by trend guard");
    }

    let json = serde_json::to_string_pretty(&outcome).context("Failed to serialize cycle outcome")?;
    println!("{}", json);
    Ok(())
}
