use serde::{Deserialize, Serialize};

use crate::error::SignalError;
use crate::types::Direction;

/// Slower-timeframe indicator block (4h in the default setup)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlowTimeframe {
    pub ema20: f64,
    pub ema50: f64,
    pub atr3: f64,
    pub atr14: f64,
    pub current_volume: f64,
    pub average_volume: f64,
}

impl SlowTimeframe {
    /// ATR(3)/ATR(14), 1.0 when ATR(14) is unusable
    pub fn atr_ratio(&self) -> f64 {
        if self.atr14 > 0.0 && self.atr3.is_finite() && self.atr14.is_finite() {
            self.atr3 / self.atr14
        } else {
            1.0
        }
    }

    /// Current/average volume, 1.0 when the average is unusable
    pub fn volume_ratio(&self) -> f64 {
        if self.average_volume > 0.0 && self.current_volume.is_finite() {
            self.current_volume / self.average_volume
        } else {
            1.0
        }
    }
}

/// Per-symbol market snapshot supplied by the market-data collaborator.
///
/// Histories are ordered oldest to newest and end with the current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSnapshot {
    pub symbol: String,
    pub current_price: f64,
    pub ema20: f64,
    #[serde(default)]
    pub macd: f64,
    #[serde(default)]
    pub rsi7: f64,
    #[serde(default)]
    pub rsi14: f64,
    #[serde(default)]
    pub price_history: Vec<f64>,
    #[serde(default)]
    pub ema20_history: Vec<f64>,
    #[serde(default)]
    pub macd_history: Vec<f64>,
    /// Empty means the signal line is derived from `macd_history`
    #[serde(default)]
    pub macd_signal_history: Vec<f64>,
    #[serde(default)]
    pub rsi7_history: Vec<f64>,
    #[serde(default)]
    pub rsi14_history: Vec<f64>,
    #[serde(default)]
    pub slow: SlowTimeframe,
    #[serde(default)]
    pub high_24h: f64,
    #[serde(default)]
    pub low_24h: f64,
    #[serde(default)]
    pub funding_rate: Option<f64>,
    #[serde(default)]
    pub open_interest: Option<f64>,
}

impl IndicatorSnapshot {
    /// Reject snapshots the analyzers cannot say anything useful about.
    pub fn validate(&self) -> Result<(), SignalError> {
        if !self.current_price.is_finite() || self.current_price <= 0.0 {
            return Err(SignalError::InvalidData(format!(
                "{}: current price {} is not a positive number",
                self.symbol, self.current_price
            )));
        }
        if !self.ema20.is_finite() || self.ema20 <= 0.0 {
            return Err(SignalError::InvalidData(format!(
                "{}: EMA20 {} is not a positive number",
                self.symbol, self.ema20
            )));
        }
        let histories = [
            ("price", &self.price_history),
            ("ema20", &self.ema20_history),
            ("macd", &self.macd_history),
            ("rsi14", &self.rsi14_history),
        ];
        for (name, series) in histories {
            if series.iter().any(|v| !v.is_finite()) {
                return Err(SignalError::InvalidData(format!(
                    "{}: {} history contains non-finite values",
                    self.symbol, name
                )));
            }
        }
        Ok(())
    }
}

/// An open position as reported by the execution layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPosition {
    pub symbol: String,
    pub side: Direction,
    pub entry_price: f64,
    #[serde(default)]
    pub mark_price: Option<f64>,
    #[serde(default)]
    pub size_usd: f64,
    #[serde(default = "default_leverage")]
    pub leverage: f64,
    #[serde(default)]
    pub stop_loss: Option<f64>,
    #[serde(default)]
    pub take_profit: Option<f64>,
}

fn default_leverage() -> f64 {
    1.0
}
