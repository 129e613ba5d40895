//! File-backed boundary implementations used by the replay binary.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use signal_core::{IndicatorSnapshot, LanguageModel, MarketDataProvider, ModelError, OpenPosition, SignalError};

/// Market data served from a JSON array of snapshots
pub struct FileMarketData {
    snapshots: HashMap<String, IndicatorSnapshot>,
}

impl FileMarketData {
    pub fn new(snapshots: Vec<IndicatorSnapshot>) -> Self {
        Self {
            snapshots: snapshots
                .into_iter()
                .map(|s| (s.symbol.to_uppercase(), s))
                .collect(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot file {}", path.display()))?;
        let snapshots: Vec<IndicatorSnapshot> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse snapshots in {}", path.display()))?;
        tracing::info!("Loaded {} snapshots from {}", snapshots.len(), path.display());
        Ok(Self::new(snapshots))
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[async_trait]
impl MarketDataProvider for FileMarketData {
    async fn snapshot(&self, symbol: &str) -> Result<Option<IndicatorSnapshot>, SignalError> {
        Ok(self.snapshots.get(&symbol.to_uppercase()).cloned())
    }
}

/// Answers every prompt with one recorded reply
pub struct ReplayModel {
    name: String,
    reply: String,
}

impl ReplayModel {
    pub fn new(name: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reply: reply.into(),
        }
    }

    pub fn load(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reply = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model reply {}", path.display()))?;
        Ok(Self::new(name, reply))
    }
}

#[async_trait]
impl LanguageModel for ReplayModel {
    async fn complete(&self, _system_prompt: &str, _prompt: &str) -> Result<String, ModelError> {
        Ok(self.reply.clone())
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

/// Open positions from a JSON array; no file means no positions.
pub fn load_positions(path: Option<&str>) -> Result<Vec<OpenPosition>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read positions file {}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse positions in {}", path))
}
