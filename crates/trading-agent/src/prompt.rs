use std::fmt::Write;

use signal_core::{
    CoinSignalSummary, MarketOverview, MarketSentiment, PositionSignals, SignalStrength, TradingUniverse,
};
use signal_engine::RegimeLabel;

/// Instructions describing the reply format the parser expects.
pub fn system_prompt(universe: &TradingUniverse) -> String {
    format!(
        "You are a disciplined crypto perpetual-futures trader. You receive per-coin \
         signal summaries, a market overview and the state of open positions.\n\
         \n\
         Trade only these symbols: {symbols}.\n\
         Reply with exactly one JSON object and nothing else:\n\
         {{\n  \"decision\": \"OPEN_LONG\" | \"OPEN_SHORT\" | \"CLOSE\" | \"HOLD\",\n  \
         \"symbol\": one of the symbols above, or null for HOLD,\n  \
         \"leverage\": number >= 1 (OPEN only),\n  \
         \"size_usd\": number (OPEN only),\n  \
         \"stop_loss\": price (OPEN only),\n  \
         \"take_profit\": price (OPEN only),\n  \
         \"confidence\": number between 0 and 1,\n  \
         \"reasoning\": short explanation\n}}\n\
         \n\
         Respect the risk size multiplier. Do not open against a strong trend. \
         Close positions whose thesis is invalidated.",
        symbols = universe.symbols().join(", ")
    )
}

/// Render the cycle's analysis into the user prompt.
pub fn build_prompt(
    summaries: &[CoinSignalSummary],
    overview: &MarketOverview,
    positions: &[PositionSignals],
) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== MARKET OVERVIEW ===");
    let _ = writeln!(
        out,
        "Sentiment: {} ({} bullish / {} bearish / {} neutral), average risk {:.1}, {} high-risk",
        sentiment_label(overview.sentiment),
        overview.bullish_count,
        overview.bearish_count,
        overview.neutral_count,
        overview.average_risk,
        overview.high_risk_count
    );
    match &overview.best_opportunity {
        Some(best) => {
            let _ = writeln!(
                out,
                "Best opportunity: {} {} ({}, risk {}/10)",
                best.symbol, best.direction, best.recommendation, best.risk_score
            );
        }
        None => {
            let _ = writeln!(out, "Best opportunity: none");
        }
    }

    let _ = writeln!(out, "\n=== COINS ===");
    for s in summaries {
        write_coin(&mut out, s);
    }

    let _ = writeln!(out, "\n=== OPEN POSITIONS ===");
    if positions.is_empty() {
        let _ = writeln!(out, "None");
    }
    for p in positions {
        let _ = write!(out, "{} {}: PnL {:+.2}%", p.symbol, p.side, p.pnl_pct);
        if p.near_stop {
            out.push_str(", near stop");
        }
        if p.near_target {
            out.push_str(", near target");
        }
        match &p.close_reason {
            Some(reason) if p.should_close => {
                let _ = writeln!(out, ", CLOSE SUGGESTED: {}", reason);
            }
            _ => out.push('\n'),
        }
    }

    out
}

fn write_coin(out: &mut String, s: &CoinSignalSummary) {
    let _ = writeln!(out, "\n{} @ {} | {}", s.symbol, s.current_price, s.recommendation);
    let _ = writeln!(
        out,
        "  Trend: {} strength {}/10, momentum {:?}, aligned {}",
        s.trend.direction, s.trend.strength, s.trend.momentum, s.trend.timeframe_alignment
    );
    let _ = writeln!(out, "  Regime: {}", s.regime.label());
    if let (Some(r), Some(sup)) = (s.levels.resistance.first(), s.levels.support.first()) {
        let _ = writeln!(
            out,
            "  Levels: resistance {} ({:.2}%), support {} ({:.2}%)",
            r, s.levels.distance_to_resistance_pct, sup, s.levels.distance_to_support_pct
        );
    }
    for signal in &s.signals {
        let marker = match signal.strength {
            SignalStrength::Strong => "!!",
            SignalStrength::Moderate => "!",
            SignalStrength::Weak => "-",
        };
        let _ = writeln!(out, "  {} {} {}", marker, signal.direction, signal.description);
    }
    let _ = writeln!(
        out,
        "  Risk: {}/10, size x{}{}",
        s.risk.score,
        s.risk.size_multiplier,
        if s.risk.counter_trend { ", counter-trend" } else { "" }
    );
    if let Some(funding) = s.funding_rate {
        let _ = writeln!(out, "  Funding: {:.4}%", funding * 100.0);
    }
    let _ = writeln!(out, "  {}", s.summary);
}

fn sentiment_label(sentiment: MarketSentiment) -> &'static str {
    match sentiment {
        MarketSentiment::Bullish => "BULLISH",
        MarketSentiment::Bearish => "BEARISH",
        MarketSentiment::Neutral => "NEUTRAL",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_core::{Direction, IndicatorSnapshot};
    use signal_engine::{market_overview, SignalAggregator};

    #[test]
    fn test_system_prompt_lists_universe() {
        let prompt = system_prompt(&TradingUniverse::from_csv("BTC,ETH"));
        assert!(prompt.contains("BTC, ETH"));
        assert!(prompt.contains("\"decision\""));
    }

    #[test]
    fn test_prompt_sections() {
        let universe = TradingUniverse::default();
        let summary = SignalAggregator::new().analyze_symbol(&IndicatorSnapshot {
            symbol: "SOL".into(),
            ..Default::default()
        });
        let overview = market_overview(std::slice::from_ref(&summary), &universe);
        let position = PositionSignals {
            symbol: "SOL".into(),
            side: Direction::Short,
            pnl_pct: -1.5,
            trend_invalidated: false,
            signals_invalidated: false,
            risk_invalidated: false,
            invalidation_reasons: vec![],
            near_stop: true,
            near_target: false,
            should_close: false,
            close_reason: None,
        };

        let prompt = build_prompt(&[summary], &overview, &[position]);
        assert!(prompt.contains("=== MARKET OVERVIEW ==="));
        assert!(prompt.contains("SOL @ 0 | NEUTRAL"));
        assert!(prompt.contains("Best opportunity: none"));
        assert!(prompt.contains("SOL SHORT: PnL -1.50%, near stop"));
    }
}
