use async_trait::async_trait;
use futures::future::join_all;

use crate::{IndicatorSnapshot, ModelError, SignalError};

/// Source of live per-symbol indicator snapshots
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// `Ok(None)` means the symbol has no data right now.
    async fn snapshot(&self, symbol: &str) -> Result<Option<IndicatorSnapshot>, SignalError>;

    /// Fetch several symbols concurrently, keeping the input order.
    async fn snapshots(
        &self,
        symbols: &[String],
    ) -> Vec<(String, Result<Option<IndicatorSnapshot>, SignalError>)> {
        let fetches = symbols.iter().map(|s| async move { (s.clone(), self.snapshot(s).await) });
        join_all(fetches).await
    }
}

/// Opaque text completion. Implementations own their own transport.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, system_prompt: &str, prompt: &str) -> Result<String, ModelError>;

    fn model_name(&self) -> &str;
}
