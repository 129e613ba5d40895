use signal_core::{
    Direction, EntrySignal, KeyLevels, MarketRegime, RiskAssessment, SignalStrength, TrendAnalysis,
};

use crate::trend::TREND_THRESHOLD_PCT;

const BASE_SCORE: f64 = 3.0;

const EXTREME_ATR_RATIO: f64 = 2.0;
const HIGH_ATR_RATIO: f64 = 1.5;
const RSI_EXTREME_HIGH: f64 = 75.0;
const RSI_EXTREME_LOW: f64 = 25.0;
const LOW_VOLUME_RATIO: f64 = 0.7;
const NEAR_LEVEL_PCT: f64 = 1.0;

const W_EXTREME_VOL: f64 = 2.0;
const W_HIGH_VOL: f64 = 1.0;
const W_RSI_EXTREME: f64 = 1.0;
const W_LOW_VOLUME: f64 = 1.0;
const W_COUNTER_TREND: f64 = 1.5;
const W_NEAR_LEVEL: f64 = 0.5;
const W_CONFLICTING: f64 = 1.5;
const W_WEAK_SIGNALS: f64 = 0.5;
const W_OPPOSING_SLOW_TREND: f64 = 1.0;

/// Everything the risk score looks at for one symbol
#[derive(Debug, Clone, Copy)]
pub struct RiskInput<'a> {
    pub trend: &'a TrendAnalysis,
    pub regime: &'a MarketRegime,
    pub levels: &'a KeyLevels,
    pub signals: &'a [EntrySignal],
    pub rsi14: f64,
    /// Side a trade would be taken on, if any
    pub proposed: Option<Direction>,
}

/// Additive risk score on a 1-10 scale with the factors that produced it.
pub fn assess_risk(input: &RiskInput) -> RiskAssessment {
    let mut score = BASE_SCORE;
    let mut factors = Vec::new();
    let mut add = |weight: f64, factor: String| {
        score += weight;
        factors.push(factor);
    };

    let atr_ratio = input.regime.atr_ratio;
    if atr_ratio >= EXTREME_ATR_RATIO {
        add(W_EXTREME_VOL, format!("Extreme volatility (ATR ratio {:.2})", atr_ratio));
    } else if atr_ratio >= HIGH_ATR_RATIO {
        add(W_HIGH_VOL, format!("High volatility (ATR ratio {:.2})", atr_ratio));
    }

    if input.rsi14 >= RSI_EXTREME_HIGH {
        add(W_RSI_EXTREME, format!("RSI overextended ({:.1})", input.rsi14));
    } else if input.rsi14 <= RSI_EXTREME_LOW {
        add(W_RSI_EXTREME, format!("RSI oversold extreme ({:.1})", input.rsi14));
    }

    if input.regime.volume_ratio < LOW_VOLUME_RATIO {
        add(W_LOW_VOLUME, format!("Low volume ({:.2}x average)", input.regime.volume_ratio));
    }

    let counter_trend = input
        .proposed
        .map(|side| input.trend.direction.opposes(side))
        .unwrap_or(false);
    if let (true, Some(side)) = (counter_trend, input.proposed) {
        add(
            W_COUNTER_TREND,
            format!("Counter-trend: {} against {} trend", side, input.trend.direction),
        );
    }

    if input.levels.distance_to_resistance_pct < NEAR_LEVEL_PCT {
        add(
            W_NEAR_LEVEL,
            format!("Near resistance ({:.2}% away)", input.levels.distance_to_resistance_pct),
        );
    }
    if input.levels.distance_to_support_pct < NEAR_LEVEL_PCT {
        add(
            W_NEAR_LEVEL,
            format!("Near support ({:.2}% away)", input.levels.distance_to_support_pct),
        );
    }

    let has_long = input.signals.iter().any(|s| s.direction == Direction::Long);
    let has_short = input.signals.iter().any(|s| s.direction == Direction::Short);
    if has_long && has_short {
        add(W_CONFLICTING, "Conflicting LONG and SHORT signals".to_string());
    }

    if !input.signals.iter().any(|s| s.strength == SignalStrength::Strong) {
        add(W_WEAK_SIGNALS, "No strong signals".to_string());
    }

    if let (Some(side), Some(slow)) = (input.proposed, slow_trend(input.trend.ema20_vs_ema50_pct)) {
        if side != slow {
            add(
                W_OPPOSING_SLOW_TREND,
                format!(
                    "Slow timeframe trend opposes {} (EMA20 vs EMA50 {:+.2}%)",
                    side, input.trend.ema20_vs_ema50_pct
                ),
            );
        }
    }

    let score = score.clamp(1.0, 10.0).round() as u8;

    RiskAssessment {
        score,
        factors,
        counter_trend,
        size_multiplier: size_multiplier(score),
    }
}

/// Position-size scaling for a rounded risk score
pub fn size_multiplier(score: u8) -> f64 {
    match score {
        0..=3 => 1.0,
        4..=5 => 0.75,
        6..=7 => 0.5,
        _ => 0.25,
    }
}

/// Side the slow EMAs point to, if they are separated enough to count
pub fn slow_trend(ema20_vs_ema50_pct: f64) -> Option<Direction> {
    if ema20_vs_ema50_pct > TREND_THRESHOLD_PCT {
        Some(Direction::Long)
    } else if ema20_vs_ema50_pct < -TREND_THRESHOLD_PCT {
        Some(Direction::Short)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_core::{EntrySignalType, Momentum, RegimeType, TrendDirection, Volatility};

    fn trend(direction: TrendDirection, slow_pct: f64) -> TrendAnalysis {
        TrendAnalysis {
            direction,
            strength: 6,
            momentum: Momentum::Steady,
            timeframe_alignment: true,
            price_vs_ema20_pct: slow_pct,
            ema20_vs_ema50_pct: slow_pct,
        }
    }

    fn regime(atr_ratio: f64, volume_ratio: f64) -> MarketRegime {
        MarketRegime {
            regime_type: RegimeType::Trending,
            volatility: Volatility::Normal,
            atr_ratio,
            volume_ratio,
        }
    }

    fn far_levels() -> KeyLevels {
        KeyLevels {
            resistance: vec![110.0],
            support: vec![90.0],
            high_24h: 110.0,
            low_24h: 90.0,
            pivot: 100.0,
            distance_to_resistance_pct: 10.0,
            distance_to_support_pct: 10.0,
        }
    }

    fn strong_long() -> EntrySignal {
        EntrySignal {
            signal_type: EntrySignalType::MacdCrossover,
            strength: SignalStrength::Strong,
            direction: Direction::Long,
            description: "macd".into(),
        }
    }

    #[test]
    fn test_calm_market_scores_base() {
        let t = trend(TrendDirection::Bullish, 2.0);
        let r = regime(1.0, 1.0);
        let l = far_levels();
        let signals = [strong_long()];
        let risk = assess_risk(&RiskInput {
            trend: &t,
            regime: &r,
            levels: &l,
            signals: &signals,
            rsi14: 55.0,
            proposed: Some(Direction::Long),
        });
        assert_eq!(risk.score, 3);
        assert!(risk.factors.is_empty());
        assert!(!risk.counter_trend);
        assert_eq!(risk.size_multiplier, 1.0);
    }

    #[test]
    fn test_counter_trend_and_opposing_slow_trend() {
        let t = trend(TrendDirection::Bullish, 2.0);
        let r = regime(1.0, 1.0);
        let l = far_levels();
        let signals = [strong_long()];
        let risk = assess_risk(&RiskInput {
            trend: &t,
            regime: &r,
            levels: &l,
            signals: &signals,
            rsi14: 55.0,
            proposed: Some(Direction::Short),
        });
        // 3 + 1.5 + 1 = 5.5 rounds to 6
        assert!(risk.counter_trend);
        assert_eq!(risk.score, 6);
        assert_eq!(risk.size_multiplier, 0.5);
        assert_eq!(risk.factors.len(), 2);
    }

    #[test]
    fn test_score_is_clamped() {
        let t = trend(TrendDirection::Bullish, 2.0);
        let r = regime(2.5, 0.3);
        let l = KeyLevels {
            distance_to_resistance_pct: 0.2,
            distance_to_support_pct: 0.4,
            ..far_levels()
        };
        let short = EntrySignal {
            direction: Direction::Short,
            strength: SignalStrength::Weak,
            ..strong_long()
        };
        let weak_long = EntrySignal {
            strength: SignalStrength::Weak,
            ..strong_long()
        };
        let signals = [weak_long, short];
        let risk = assess_risk(&RiskInput {
            trend: &t,
            regime: &r,
            levels: &l,
            signals: &signals,
            rsi14: 85.0,
            proposed: Some(Direction::Short),
        });
        assert_eq!(risk.score, 10);
        assert_eq!(risk.size_multiplier, 0.25);
    }

    #[test]
    fn test_no_proposal_has_no_counter_trend() {
        let t = trend(TrendDirection::Bearish, -2.0);
        let r = regime(1.6, 1.0);
        let l = far_levels();
        let risk = assess_risk(&RiskInput {
            trend: &t,
            regime: &r,
            levels: &l,
            signals: &[],
            rsi14: 50.0,
            proposed: None,
        });
        // 3 + high vol 1 + no strong 0.5 = 4.5 rounds to 5
        assert!(!risk.counter_trend);
        assert_eq!(risk.score, 5);
        assert_eq!(risk.size_multiplier, 0.75);
    }

    #[test]
    fn test_size_multiplier_steps() {
        assert_eq!(size_multiplier(1), 1.0);
        assert_eq!(size_multiplier(3), 1.0);
        assert_eq!(size_multiplier(4), 0.75);
        assert_eq!(size_multiplier(5), 0.75);
        assert_eq!(size_multiplier(7), 0.5);
        assert_eq!(size_multiplier(8), 0.25);
        assert_eq!(size_multiplier(10), 0.25);
    }

    #[test]
    fn test_slow_trend_threshold() {
        assert_eq!(slow_trend(0.6), Some(Direction::Long));
        assert_eq!(slow_trend(-0.6), Some(Direction::Short));
        assert_eq!(slow_trend(0.3), None);
    }
}
