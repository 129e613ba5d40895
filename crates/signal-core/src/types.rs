use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of a trade or signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn opposite(&self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendDirection {
    Bullish,
    Bearish,
    Neutral,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Bullish => "BULLISH",
            TrendDirection::Bearish => "BEARISH",
            TrendDirection::Neutral => "NEUTRAL",
        }
    }

    /// True when a trade in `side` would fight this trend.
    pub fn opposes(&self, side: Direction) -> bool {
        matches!(
            (self, side),
            (TrendDirection::Bullish, Direction::Short) | (TrendDirection::Bearish, Direction::Long)
        )
    }

    /// The trade side this trend favours, if any.
    pub fn favoured_side(&self) -> Option<Direction> {
        match self {
            TrendDirection::Bullish => Some(Direction::Long),
            TrendDirection::Bearish => Some(Direction::Short),
            TrendDirection::Neutral => None,
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Momentum {
    Accelerating,
    Steady,
    Decelerating,
}

/// Trend classification for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendAnalysis {
    pub direction: TrendDirection,
    /// 1 to 10
    pub strength: u8,
    pub momentum: Momentum,
    pub timeframe_alignment: bool,
    pub price_vs_ema20_pct: f64,
    pub ema20_vs_ema50_pct: f64,
}

impl TrendAnalysis {
    /// Fixed result for degenerate input.
    pub fn neutral() -> Self {
        Self {
            direction: TrendDirection::Neutral,
            strength: 1,
            momentum: Momentum::Steady,
            timeframe_alignment: false,
            price_vs_ema20_pct: 0.0,
            ema20_vs_ema50_pct: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegimeType {
    Trending,
    Ranging,
    Volatile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Volatility {
    Low,
    Normal,
    High,
    Extreme,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketRegime {
    #[serde(rename = "type")]
    pub regime_type: RegimeType,
    pub volatility: Volatility,
    /// ATR(3) / ATR(14)
    pub atr_ratio: f64,
    /// Current volume / average volume
    pub volume_ratio: f64,
}

/// Support and resistance around the current price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyLevels {
    /// Up to 3 levels strictly above price, nearest first
    pub resistance: Vec<f64>,
    /// Up to 3 levels strictly below price, nearest first
    pub support: Vec<f64>,
    pub high_24h: f64,
    pub low_24h: f64,
    pub pivot: f64,
    pub distance_to_resistance_pct: f64,
    pub distance_to_support_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalStrength {
    Weak,
    Moderate,
    Strong,
}

impl SignalStrength {
    /// Ordering weight, strongest highest
    pub fn rank(&self) -> u8 {
        match self {
            SignalStrength::Weak => 1,
            SignalStrength::Moderate => 2,
            SignalStrength::Strong => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntrySignalType {
    RsiOversoldBounce,
    RsiOverboughtRejection,
    RsiMomentumCross,
    MacdCrossover,
    EmaBreakout,
    HigherLow,
    LowerHigh,
    /// Carries a LONG direction for representation only.
    VolumeSpike,
    BullishDivergence,
    BearishDivergence,
}

/// A discrete directional signal, rebuilt every evaluation cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrySignal {
    #[serde(rename = "type")]
    pub signal_type: EntrySignalType,
    pub strength: SignalStrength,
    pub direction: Direction,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DivergenceType {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DivergenceIndicator {
    Rsi,
    Macd,
}

impl fmt::Display for DivergenceIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DivergenceIndicator::Rsi => f.write_str("RSI"),
            DivergenceIndicator::Macd => f.write_str("MACD"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Divergence {
    #[serde(rename = "type")]
    pub divergence_type: DivergenceType,
    pub indicator: DivergenceIndicator,
    pub strength: SignalStrength,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    /// 1 to 10
    pub score: u8,
    pub factors: Vec<String>,
    pub counter_trend: bool,
    /// One of 1.0, 0.75, 0.5, 0.25
    pub size_multiplier: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    StrongLong,
    Long,
    Neutral,
    Short,
    StrongShort,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::StrongLong => "STRONG_LONG",
            Recommendation::Long => "LONG",
            Recommendation::Neutral => "NEUTRAL",
            Recommendation::Short => "SHORT",
            Recommendation::StrongShort => "STRONG_SHORT",
        }
    }

    pub fn direction(&self) -> Option<Direction> {
        match self {
            Recommendation::StrongLong | Recommendation::Long => Some(Direction::Long),
            Recommendation::StrongShort | Recommendation::Short => Some(Direction::Short),
            Recommendation::Neutral => None,
        }
    }

    pub fn is_strong(&self) -> bool {
        matches!(self, Recommendation::StrongLong | Recommendation::StrongShort)
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything derived for one symbol on one evaluation tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinSignalSummary {
    pub symbol: String,
    pub current_price: f64,
    pub generated_at: DateTime<Utc>,
    pub trend: TrendAnalysis,
    pub regime: MarketRegime,
    pub levels: KeyLevels,
    pub signals: Vec<EntrySignal>,
    pub divergences: Vec<Divergence>,
    pub risk: RiskAssessment,
    pub recommendation: Recommendation,
    pub summary: String,
    #[serde(default)]
    pub funding_rate: Option<f64>,
    #[serde(default)]
    pub open_interest: Option<f64>,
}

/// Derived view of one open position against current signals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSignals {
    pub symbol: String,
    pub side: Direction,
    pub pnl_pct: f64,
    pub trend_invalidated: bool,
    pub signals_invalidated: bool,
    pub risk_invalidated: bool,
    pub invalidation_reasons: Vec<String>,
    pub near_stop: bool,
    pub near_target: bool,
    pub should_close: bool,
    pub close_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketSentiment {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestOpportunity {
    pub symbol: String,
    pub direction: Direction,
    pub recommendation: Recommendation,
    pub risk_score: u8,
}

/// Cross-symbol snapshot of the whole universe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketOverview {
    pub sentiment: MarketSentiment,
    pub bullish_count: usize,
    pub bearish_count: usize,
    pub neutral_count: usize,
    pub high_risk_count: usize,
    pub average_risk: f64,
    pub best_opportunity: Option<BestOpportunity>,
}
