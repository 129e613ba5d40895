use std::sync::Arc;

use decision_parser::TradeDecision;
use serde::{Deserialize, Serialize};
use signal_core::{Direction, MarketDataProvider, TrendAnalysis};
use signal_engine::analyze_snapshot_trend;

/// Default minimum strength for a trend to veto a counter-trend entry
pub const DEFAULT_MIN_STRENGTH: u8 = 6;

/// Outcome of a trend guard check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendVerdict {
    pub allowed: bool,
    pub reason: String,
    /// Fresh trend the verdict was based on, absent when the check was skipped
    pub trend: Option<TrendAnalysis>,
}

impl TrendVerdict {
    fn skipped(reason: String) -> Self {
        Self {
            allowed: true,
            reason,
            trend: None,
        }
    }
}

/// Pure veto rule: block `direction` when it fights a trend of at least
/// `min_strength`.
pub fn evaluate(direction: Direction, trend: &TrendAnalysis, min_strength: u8) -> TrendVerdict {
    let blocked = trend.direction.opposes(direction) && trend.strength >= min_strength;

    let reason = if blocked {
        format!(
            "{} blocked: {} trend strength {}/10 (min {})",
            direction, trend.direction, trend.strength, min_strength
        )
    } else if trend.direction.opposes(direction) {
        format!(
            "{} allowed: {} trend strength {}/10 below veto level {}",
            direction, trend.direction, trend.strength, min_strength
        )
    } else {
        format!(
            "{} allowed: {} trend strength {}/10",
            direction, trend.direction, trend.strength
        )
    };

    TrendVerdict {
        allowed: !blocked,
        reason,
        trend: Some(trend.clone()),
    }
}

/// Last veto before an entry reaches execution. Re-derives the trend from a
/// fresh snapshot instead of trusting the one the model was prompted with.
pub struct TrendGuard {
    provider: Arc<dyn MarketDataProvider>,
    min_strength: u8,
}

impl TrendGuard {
    pub fn new(provider: Arc<dyn MarketDataProvider>, min_strength: u8) -> Self {
        Self {
            provider,
            min_strength,
        }
    }

    pub fn min_strength(&self) -> u8 {
        self.min_strength
    }

    /// Returns `None` for decisions the guard does not apply to (HOLD, CLOSE).
    pub async fn check(&self, decision: &TradeDecision) -> Option<TrendVerdict> {
        let direction = decision.action.direction()?;
        let symbol = decision.symbol()?;

        let verdict = match self.provider.snapshot(symbol).await {
            Ok(Some(snapshot)) => {
                if let Err(e) = snapshot.validate() {
                    let reason = format!("Trend guard skipped (fail-open): invalid market data for {}: {}", symbol, e);
                    tracing::warn!("{}", reason);
                    return Some(TrendVerdict::skipped(reason));
                }
                let trend = analyze_snapshot_trend(&snapshot);
                evaluate(direction, &trend, self.min_strength)
            }
            Ok(None) => {
                let reason = format!("Trend guard skipped (fail-open): no market data for {}", symbol);
                tracing::warn!("{}", reason);
                return Some(TrendVerdict::skipped(reason));
            }
            Err(e) => {
                let reason = format!("Trend guard skipped (fail-open): market data error for {}: {}", symbol, e);
                tracing::warn!("{}", reason);
                return Some(TrendVerdict::skipped(reason));
            }
        };

        if verdict.allowed {
            tracing::debug!("Trend guard {}: {}", symbol, verdict.reason);
        } else {
            tracing::warn!("Trend guard veto on {}: {}", symbol, verdict.reason);
        }
        Some(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use decision_parser::{EntryOrder, TradeAction};
    use signal_core::{IndicatorSnapshot, Momentum, SignalError, SlowTimeframe, TrendDirection};

    fn trend(direction: TrendDirection, strength: u8) -> TrendAnalysis {
        TrendAnalysis {
            direction,
            strength,
            momentum: Momentum::Steady,
            timeframe_alignment: true,
            price_vs_ema20_pct: 0.0,
            ema20_vs_ema50_pct: 0.0,
        }
    }

    #[test]
    fn test_long_against_strong_bearish_blocked() {
        let v = evaluate(Direction::Long, &trend(TrendDirection::Bearish, 7), 6);
        assert!(!v.allowed);
        assert!(v.reason.contains("BEARISH"));
        assert!(v.reason.contains('7'));
    }

    #[test]
    fn test_long_with_bullish_allowed() {
        let v = evaluate(Direction::Long, &trend(TrendDirection::Bullish, 7), 6);
        assert!(v.allowed);
    }

    #[test]
    fn test_threshold_boundary() {
        assert!(!evaluate(Direction::Short, &trend(TrendDirection::Bullish, 6), 6).allowed);
        assert!(evaluate(Direction::Short, &trend(TrendDirection::Bullish, 5), 6).allowed);
        assert!(evaluate(Direction::Short, &trend(TrendDirection::Neutral, 10), 6).allowed);
    }

    struct StubProvider {
        snapshot: Option<IndicatorSnapshot>,
        fail: bool,
    }

    #[async_trait]
    impl MarketDataProvider for StubProvider {
        async fn snapshot(&self, _symbol: &str) -> Result<Option<IndicatorSnapshot>, SignalError> {
            if self.fail {
                return Err(SignalError::MarketData("timeout".into()));
            }
            Ok(self.snapshot.clone())
        }
    }

    // price -5% vs EMA20, slow EMA20 -10% vs EMA50, RSI 44: BEARISH strength 7
    fn bearish_snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot {
            symbol: "BTC".into(),
            current_price: 95.0,
            ema20: 100.0,
            rsi14: 44.0,
            slow: SlowTimeframe {
                ema20: 90.0,
                ema50: 100.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn open_long() -> TradeDecision {
        TradeDecision {
            action: TradeAction::OpenLong(EntryOrder {
                symbol: "BTC".into(),
                leverage: 3.0,
                size_usd: 500.0,
                stop_loss: 90.0,
                take_profit: 110.0,
                risk_reward: None,
            }),
            confidence: 0.8,
            reasoning: "bounce".into(),
            warnings: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_check_vetoes_with_fresh_trend() {
        let guard = TrendGuard::new(
            Arc::new(StubProvider { snapshot: Some(bearish_snapshot()), fail: false }),
            DEFAULT_MIN_STRENGTH,
        );
        let verdict = guard.check(&open_long()).await.unwrap();
        assert!(!verdict.allowed);
        let trend = verdict.trend.unwrap();
        assert_eq!(trend.direction, TrendDirection::Bearish);
        assert_eq!(trend.strength, 7);
    }

    #[tokio::test]
    async fn test_check_fails_open() {
        let missing = TrendGuard::new(Arc::new(StubProvider { snapshot: None, fail: false }), 6);
        let verdict = missing.check(&open_long()).await.unwrap();
        assert!(verdict.allowed);
        assert!(verdict.reason.contains("fail-open"));
        assert!(verdict.trend.is_none());

        let broken = TrendGuard::new(Arc::new(StubProvider { snapshot: None, fail: true }), 6);
        let verdict = broken.check(&open_long()).await.unwrap();
        assert!(verdict.allowed);
        assert!(verdict.reason.contains("market data error"));
    }

    #[tokio::test]
    async fn test_degenerate_snapshot_fails_open() {
        let mut snapshot = bearish_snapshot();
        snapshot.ema20 = 0.0;
        let guard = TrendGuard::new(Arc::new(StubProvider { snapshot: Some(snapshot), fail: false }), 6);

        let verdict = guard.check(&open_long()).await.unwrap();
        assert!(verdict.allowed);
        assert!(verdict.reason.contains("fail-open"));
        assert!(verdict.reason.contains("invalid market data"));
        assert!(verdict.trend.is_none());
    }

    #[tokio::test]
    async fn test_hold_and_close_not_checked() {
        let guard = TrendGuard::new(Arc::new(StubProvider { snapshot: None, fail: true }), 6);
        assert!(guard.check(&TradeDecision::safe_hold("wait")).await.is_none());

        let close = TradeDecision {
            action: TradeAction::Close { symbol: "BTC".into() },
            ..TradeDecision::safe_hold("exit")
        };
        assert!(guard.check(&close).await.is_none());
    }
}
