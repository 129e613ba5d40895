use signal_core::{CoinSignalSummary, Direction, OpenPosition, PositionSignals, SignalStrength};

const TREND_INVALIDATION_STRENGTH: u8 = 6;
const OPPOSING_STRONG_SIGNALS: usize = 2;
const RISK_INVALIDATION_SCORE: u8 = 8;
const NEAR_PCT: f64 = 1.0;

/// Check one open position against the current analysis of its symbol.
///
/// Holding is the default; any invalidation sets `should_close`. Proximity
/// to stop or target is reported but never closes on its own.
pub fn evaluate_position(position: &OpenPosition, summary: &CoinSignalSummary) -> PositionSignals {
    let side = position.side;
    let price = position
        .mark_price
        .filter(|p| p.is_finite() && *p > 0.0)
        .unwrap_or(summary.current_price);

    let mut reasons = Vec::new();

    let trend = &summary.trend;
    let trend_invalidated = trend.direction.opposes(side) && trend.strength >= TREND_INVALIDATION_STRENGTH;
    if trend_invalidated {
        reasons.push(format!(
            "{} trend strength {} opposes {} position",
            trend.direction, trend.strength, side
        ));
    }

    let opposing_strong = summary
        .signals
        .iter()
        .filter(|s| s.direction == side.opposite() && s.strength == SignalStrength::Strong)
        .count();
    let signals_invalidated = opposing_strong >= OPPOSING_STRONG_SIGNALS;
    if signals_invalidated {
        reasons.push(format!("{} strong {} signals", opposing_strong, side.opposite()));
    }

    let risk_invalidated = summary.risk.score >= RISK_INVALIDATION_SCORE;
    if risk_invalidated {
        reasons.push(format!("Risk score {}/10", summary.risk.score));
    }

    let (near_stop, near_target) = proximity(position, summary, price);
    let should_close = trend_invalidated || signals_invalidated || risk_invalidated;

    PositionSignals {
        symbol: position.symbol.clone(),
        side,
        pnl_pct: pnl_pct(side, position.entry_price, price),
        trend_invalidated,
        signals_invalidated,
        risk_invalidated,
        close_reason: should_close.then(|| reasons.join("; ")),
        invalidation_reasons: reasons,
        near_stop,
        near_target,
        should_close,
    }
}

/// Evaluate every position that has a matching summary. Positions without
/// one are skipped.
pub fn evaluate_positions(positions: &[OpenPosition], summaries: &[CoinSignalSummary]) -> Vec<PositionSignals> {
    positions
        .iter()
        .filter_map(|position| {
            let summary = summaries.iter().find(|s| s.symbol == position.symbol);
            if summary.is_none() {
                tracing::warn!(symbol = %position.symbol, "No signal summary for open position");
            }
            summary.map(|s| evaluate_position(position, s))
        })
        .collect()
}

/// Unlevered percentage move in the position's favour
pub fn pnl_pct(side: Direction, entry: f64, price: f64) -> f64 {
    if entry <= 0.0 || !entry.is_finite() {
        return 0.0;
    }
    let change = (price - entry) / entry * 100.0;
    match side {
        Direction::Long => change,
        Direction::Short => -change,
    }
}

/// Explicit stop/target when the position carries them, otherwise the nearest
/// level on the relevant side.
fn proximity(position: &OpenPosition, summary: &CoinSignalSummary, price: f64) -> (bool, bool) {
    let within = |level: f64| price > 0.0 && (level - price).abs() / price * 100.0 < NEAR_PCT;
    let levels = &summary.levels;

    let (stop_side, target_side) = match position.side {
        Direction::Long => (levels.distance_to_support_pct, levels.distance_to_resistance_pct),
        Direction::Short => (levels.distance_to_resistance_pct, levels.distance_to_support_pct),
    };
    let has_stop_level = match position.side {
        Direction::Long => !levels.support.is_empty(),
        Direction::Short => !levels.resistance.is_empty(),
    };
    let has_target_level = match position.side {
        Direction::Long => !levels.resistance.is_empty(),
        Direction::Short => !levels.support.is_empty(),
    };

    let near_stop = match position.stop_loss {
        Some(stop) => within(stop),
        None => has_stop_level && stop_side < NEAR_PCT,
    };
    let near_target = match position.take_profit {
        Some(target) => within(target),
        None => has_target_level && target_side < NEAR_PCT,
    };
    (near_stop, near_target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::neutral_summary;
    use signal_core::{EntrySignal, EntrySignalType, IndicatorSnapshot, TrendDirection};

    fn summary(symbol: &str, price: f64) -> CoinSignalSummary {
        let snapshot = IndicatorSnapshot {
            symbol: symbol.into(),
            ..Default::default()
        };
        let mut s = neutral_summary(&snapshot);
        s.current_price = price;
        s.risk.score = 4;
        s
    }

    fn long(symbol: &str, entry: f64) -> OpenPosition {
        OpenPosition {
            symbol: symbol.into(),
            side: Direction::Long,
            entry_price: entry,
            mark_price: None,
            size_usd: 1000.0,
            leverage: 5.0,
            stop_loss: None,
            take_profit: None,
        }
    }

    #[test]
    fn test_default_is_hold() {
        let signals = evaluate_position(&long("BTC", 100.0), &summary("BTC", 102.0));
        assert!(!signals.should_close);
        assert!(signals.close_reason.is_none());
        assert!(signals.invalidation_reasons.is_empty());
        assert!((signals.pnl_pct - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_opposing_trend_closes() {
        let mut s = summary("BTC", 98.0);
        s.trend.direction = TrendDirection::Bearish;
        s.trend.strength = 7;

        let signals = evaluate_position(&long("BTC", 100.0), &s);
        assert!(signals.trend_invalidated);
        assert!(signals.should_close);
        assert!(signals.close_reason.as_deref().is_some_and(|r| r.contains("BEARISH")));

        s.trend.strength = 5;
        assert!(!evaluate_position(&long("BTC", 100.0), &s).should_close);
    }

    #[test]
    fn test_strong_opposing_signals_and_risk() {
        let mut s = summary("ETH", 100.0);
        let strong_short = EntrySignal {
            signal_type: EntrySignalType::LowerHigh,
            strength: SignalStrength::Strong,
            direction: Direction::Short,
            description: String::new(),
        };
        s.signals = vec![strong_short.clone(), strong_short];
        s.risk.score = 8;

        let signals = evaluate_position(&long("ETH", 100.0), &s);
        assert!(signals.signals_invalidated);
        assert!(signals.risk_invalidated);
        assert_eq!(signals.invalidation_reasons.len(), 2);
    }

    #[test]
    fn test_short_pnl_and_near_stop() {
        let position = OpenPosition {
            side: Direction::Short,
            mark_price: Some(105.0),
            stop_loss: Some(105.5),
            take_profit: Some(90.0),
            ..long("SOL", 100.0)
        };
        let signals = evaluate_position(&position, &summary("SOL", 105.0));
        assert!((signals.pnl_pct + 5.0).abs() < 1e-9);
        assert!(signals.near_stop);
        assert!(!signals.near_target);
        assert!(!signals.should_close);
    }

    #[test]
    fn test_missing_summary_is_skipped() {
        let positions = vec![long("BTC", 100.0), long("DOGE", 0.1)];
        let out = evaluate_positions(&positions, &[summary("BTC", 101.0)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].symbol, "BTC");
    }
}
