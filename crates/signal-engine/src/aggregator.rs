use chrono::Utc;
use rayon::prelude::*;
use signal_core::{
    CoinSignalSummary, Direction, Divergence, DivergenceType, EntrySignal, EntrySignalType,
    IndicatorSnapshot, KeyLevels, Recommendation, RiskAssessment, SignalResult, TrendAnalysis,
    TrendDirection,
};

use crate::divergence::detect_divergences;
use crate::entry_signals::{detect_entry_signals, sort_by_strength};
use crate::levels::analyze_levels;
use crate::regime::{analyze_regime, classify_regime};
use crate::risk::{assess_risk, size_multiplier, RiskInput};
use crate::trend::{analyze_snapshot_trend, current_rsi};

const NEUTRAL_RISK_SCORE: u8 = 5;
const STRONG_MIN_SIGNALS: usize = 3;
const PLAIN_MIN_SIGNALS: usize = 2;
const STRONG_MAX_RISK: u8 = 5;
const NEAR_LEVEL_PCT: f64 = 1.0;

/// Runs every analyzer for a symbol and folds the results into a
/// [`CoinSignalSummary`]. Stateless; every call starts from scratch.
#[derive(Debug, Clone, Default)]
pub struct SignalAggregator;

impl SignalAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Full analysis, or an error for input that cannot be analysed.
    pub fn try_analyze(&self, snapshot: &IndicatorSnapshot) -> SignalResult<CoinSignalSummary> {
        snapshot.validate()?;

        let trend = analyze_snapshot_trend(snapshot);
        let regime = analyze_regime(snapshot);
        let levels = analyze_levels(snapshot);
        let divergences = detect_divergences(snapshot);

        let mut signals = detect_entry_signals(snapshot);
        signals.extend(divergences.iter().map(divergence_signal));
        sort_by_strength(&mut signals);

        let proposed = proposed_direction(&signals, &trend);
        let risk = assess_risk(&RiskInput {
            trend: &trend,
            regime: &regime,
            levels: &levels,
            signals: &signals,
            rsi14: current_rsi(snapshot.rsi14, &snapshot.rsi14_history),
            proposed,
        });

        let recommendation = recommend(&trend, &signals, &risk);
        let summary = summary_line(recommendation, &trend, &divergences, &risk, &levels);

        Ok(CoinSignalSummary {
            symbol: snapshot.symbol.clone(),
            current_price: snapshot.current_price,
            generated_at: Utc::now(),
            trend,
            regime,
            levels,
            signals,
            divergences,
            risk,
            recommendation,
            summary,
            funding_rate: snapshot.funding_rate,
            open_interest: snapshot.open_interest,
        })
    }

    /// Analysis that never fails: bad input yields the neutral default.
    pub fn analyze_symbol(&self, snapshot: &IndicatorSnapshot) -> CoinSignalSummary {
        match self.try_analyze(snapshot) {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(symbol = %snapshot.symbol, error = %e, "Signal analysis failed, using neutral default");
                neutral_summary(snapshot)
            }
        }
    }

    /// Analyse every snapshot in parallel. Output order matches input order and
    /// one bad symbol never affects the others.
    pub fn analyze_all(&self, snapshots: &[IndicatorSnapshot]) -> Vec<CoinSignalSummary> {
        snapshots
            .par_iter()
            .map(|snapshot| self.analyze_symbol(snapshot))
            .collect()
    }
}

/// Neutral default used whenever a symbol cannot be analysed.
pub fn neutral_summary(snapshot: &IndicatorSnapshot) -> CoinSignalSummary {
    let extreme = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
    let price = extreme(snapshot.current_price);

    CoinSignalSummary {
        symbol: snapshot.symbol.clone(),
        current_price: price,
        generated_at: Utc::now(),
        trend: TrendAnalysis::neutral(),
        regime: classify_regime(1.0, 1.0),
        levels: KeyLevels {
            resistance: vec![],
            support: vec![],
            high_24h: extreme(snapshot.high_24h),
            low_24h: extreme(snapshot.low_24h),
            pivot: 0.0,
            distance_to_resistance_pct: 0.0,
            distance_to_support_pct: 0.0,
        },
        signals: vec![],
        divergences: vec![],
        risk: RiskAssessment {
            score: NEUTRAL_RISK_SCORE,
            factors: vec!["Insufficient market data".to_string()],
            counter_trend: false,
            size_multiplier: size_multiplier(NEUTRAL_RISK_SCORE),
        },
        recommendation: Recommendation::Neutral,
        summary: "NEUTRAL: insufficient market data".to_string(),
        funding_rate: snapshot.funding_rate,
        open_interest: snapshot.open_interest,
    }
}

/// First matching rule wins: strong calls need trend, three signals and
/// moderate risk; plain calls need trend and two signals.
pub fn recommend(trend: &TrendAnalysis, signals: &[EntrySignal], risk: &RiskAssessment) -> Recommendation {
    let longs = count_direction(signals, Direction::Long);
    let shorts = count_direction(signals, Direction::Short);
    let bullish = trend.direction == TrendDirection::Bullish;
    let bearish = trend.direction == TrendDirection::Bearish;

    if bullish && longs >= STRONG_MIN_SIGNALS && risk.score < STRONG_MAX_RISK {
        Recommendation::StrongLong
    } else if bearish && shorts >= STRONG_MIN_SIGNALS && risk.score < STRONG_MAX_RISK {
        Recommendation::StrongShort
    } else if bullish && longs >= PLAIN_MIN_SIGNALS {
        Recommendation::Long
    } else if bearish && shorts >= PLAIN_MIN_SIGNALS {
        Recommendation::Short
    } else {
        Recommendation::Neutral
    }
}

/// Side with more directional signals; a tie follows the trend.
pub fn proposed_direction(signals: &[EntrySignal], trend: &TrendAnalysis) -> Option<Direction> {
    let longs = count_direction(signals, Direction::Long);
    let shorts = count_direction(signals, Direction::Short);
    match longs.cmp(&shorts) {
        std::cmp::Ordering::Greater => Some(Direction::Long),
        std::cmp::Ordering::Less => Some(Direction::Short),
        std::cmp::Ordering::Equal => trend.direction.favoured_side(),
    }
}

/// One-line human summary. Derived from the other fields and never read back.
pub fn summary_line(
    recommendation: Recommendation,
    trend: &TrendAnalysis,
    divergences: &[Divergence],
    risk: &RiskAssessment,
    levels: &KeyLevels,
) -> String {
    let mut parts = vec![match recommendation {
        Recommendation::StrongLong => format!("STRONG LONG setup in {} trend", trend.direction),
        Recommendation::StrongShort => format!("STRONG SHORT setup in {} trend", trend.direction),
        Recommendation::Long => format!("LONG bias, {} trend strength {}", trend.direction, trend.strength),
        Recommendation::Short => format!("SHORT bias, {} trend strength {}", trend.direction, trend.strength),
        Recommendation::Neutral => format!("No clear setup ({} trend)", trend.direction),
    }];

    if !divergences.is_empty() {
        let bullish = divergences
            .iter()
            .filter(|d| d.divergence_type == DivergenceType::Bullish)
            .count();
        parts.push(match (bullish, divergences.len() - bullish) {
            (b, 0) if b > 0 => "bullish divergence".to_string(),
            (0, _) => "bearish divergence".to_string(),
            _ => "mixed divergences".to_string(),
        });
    }

    parts.push(match risk.score {
        0..=3 => format!("low risk {}/10", risk.score),
        4..=6 => format!("moderate risk {}/10", risk.score),
        _ => format!("high risk {}/10", risk.score),
    });

    if !levels.resistance.is_empty() && levels.distance_to_resistance_pct < NEAR_LEVEL_PCT {
        parts.push(format!("near resistance {:.2}% away", levels.distance_to_resistance_pct));
    }
    if !levels.support.is_empty() && levels.distance_to_support_pct < NEAR_LEVEL_PCT {
        parts.push(format!("near support {:.2}% away", levels.distance_to_support_pct));
    }

    parts.join("; ")
}

fn count_direction(signals: &[EntrySignal], direction: Direction) -> usize {
    signals.iter().filter(|s| s.direction == direction).count()
}

fn divergence_signal(divergence: &Divergence) -> EntrySignal {
    let (signal_type, direction) = match divergence.divergence_type {
        DivergenceType::Bullish => (EntrySignalType::BullishDivergence, Direction::Long),
        DivergenceType::Bearish => (EntrySignalType::BearishDivergence, Direction::Short),
    };
    EntrySignal {
        signal_type,
        strength: divergence.strength,
        direction,
        description: divergence.description.clone(),
    }
}
