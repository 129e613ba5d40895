use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use signal_core::{ReasoningModels, TradingUniverse};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    // Universe
    pub universe: TradingUniverse,          // BTC,ETH,SOL,BNB,XRP,DOGE

    // Model
    pub model_name: String,                 // deepseek-r1
    pub reasoning_models: ReasoningModels,  // names that emit <think> blocks
    pub model_max_retries: u32,             // 3
    pub model_backoff_ms: u64,              // 500
    pub model_backoff_max_ms: u64,          // 8000

    // Trend guard
    pub trend_guard_min_strength: u8,       // 6

    // Replay inputs
    pub snapshot_file: String,
    pub positions_file: Option<String>,
    pub model_reply_file: String,
}

impl AgentConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let config = Self {
            universe: TradingUniverse::from_csv(&get("TRADABLE_SYMBOLS", "BTC,ETH,SOL,BNB,XRP,DOGE")),

            model_name: get("MODEL_NAME", "deepseek-r1"),
            reasoning_models: match var("REASONING_MODELS") {
                Some(list) => ReasoningModels::from_csv(&list),
                None => ReasoningModels::default(),
            },
            model_max_retries: get("MODEL_MAX_RETRIES", "3")
                .parse()
                .context("MODEL_MAX_RETRIES must be a non-negative integer")?,
            model_backoff_ms: get("MODEL_BACKOFF_MS", "500")
                .parse()
                .context("MODEL_BACKOFF_MS must be milliseconds")?,
            model_backoff_max_ms: get("MODEL_BACKOFF_MAX_MS", "8000")
                .parse()
                .context("MODEL_BACKOFF_MAX_MS must be milliseconds")?,

            trend_guard_min_strength: get("TREND_GUARD_MIN_STRENGTH", "6")
                .parse()
                .context("TREND_GUARD_MIN_STRENGTH must be an integer 1-10")?,

            snapshot_file: get("SNAPSHOT_FILE", "snapshots.json"),
            positions_file: var("POSITIONS_FILE").filter(|s| !s.trim().is_empty()),
            model_reply_file: get("MODEL_REPLY_FILE", "model_reply.txt"),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.universe.symbols().is_empty(), "TRADABLE_SYMBOLS is empty");
        ensure!(
            (1..=10).contains(&self.trend_guard_min_strength),
            "TREND_GUARD_MIN_STRENGTH must be between 1 and 10, got {}",
            self.trend_guard_min_strength
        );
        ensure!(
            self.model_backoff_max_ms >= self.model_backoff_ms,
            "MODEL_BACKOFF_MAX_MS ({}) is below MODEL_BACKOFF_MS ({})",
            self.model_backoff_max_ms,
            self.model_backoff_ms
        );
        Ok(())
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.model_backoff_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.model_backoff_max_ms)
    }
}
