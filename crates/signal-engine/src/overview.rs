use std::cmp::Ordering;

use signal_core::{
    BestOpportunity, CoinSignalSummary, MarketOverview, MarketSentiment, TradingUniverse, TrendDirection,
};

const HIGH_RISK_SCORE: u8 = 7;

/// Cross-symbol view of a batch of summaries.
pub fn market_overview(summaries: &[CoinSignalSummary], universe: &TradingUniverse) -> MarketOverview {
    let count = |d: TrendDirection| summaries.iter().filter(|s| s.trend.direction == d).count();
    let bullish_count = count(TrendDirection::Bullish);
    let bearish_count = count(TrendDirection::Bearish);
    let neutral_count = count(TrendDirection::Neutral);

    let sentiment = match bullish_count.cmp(&bearish_count) {
        Ordering::Greater => MarketSentiment::Bullish,
        Ordering::Less => MarketSentiment::Bearish,
        Ordering::Equal => MarketSentiment::Neutral,
    };

    let average_risk = if summaries.is_empty() {
        0.0
    } else {
        summaries.iter().map(|s| s.risk.score as f64).sum::<f64>() / summaries.len() as f64
    };

    MarketOverview {
        sentiment,
        bullish_count,
        bearish_count,
        neutral_count,
        high_risk_count: summaries.iter().filter(|s| s.risk.score >= HIGH_RISK_SCORE).count(),
        average_risk,
        best_opportunity: best_opportunity(summaries, universe),
    }
}

/// Strong calls first, then lower risk, then stronger trend, then universe order.
fn best_opportunity(summaries: &[CoinSignalSummary], universe: &TradingUniverse) -> Option<BestOpportunity> {
    summaries
        .iter()
        .filter_map(|s| s.recommendation.direction().map(|d| (s, d)))
        .min_by(|(a, _), (b, _)| {
            b.recommendation
                .is_strong()
                .cmp(&a.recommendation.is_strong())
                .then(a.risk.score.cmp(&b.risk.score))
                .then(b.trend.strength.cmp(&a.trend.strength))
                .then(universe.priority(&a.symbol).cmp(&universe.priority(&b.symbol)))
        })
        .map(|(s, direction)| BestOpportunity {
            symbol: s.symbol.clone(),
            direction,
            recommendation: s.recommendation,
            risk_score: s.risk.score,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::neutral_summary;
    use signal_core::{Direction, IndicatorSnapshot, Recommendation};

    fn summary(symbol: &str, direction: TrendDirection, rec: Recommendation, risk: u8, strength: u8) -> CoinSignalSummary {
        let mut s = neutral_summary(&IndicatorSnapshot {
            symbol: symbol.into(),
            ..Default::default()
        });
        s.trend.direction = direction;
        s.trend.strength = strength;
        s.recommendation = rec;
        s.risk.score = risk;
        s
    }

    #[test]
    fn test_counts_and_sentiment() {
        let universe = TradingUniverse::default();
        let summaries = vec![
            summary("BTC", TrendDirection::Bullish, Recommendation::Long, 4, 6),
            summary("ETH", TrendDirection::Bullish, Recommendation::Neutral, 8, 3),
            summary("SOL", TrendDirection::Bearish, Recommendation::Neutral, 6, 5),
        ];
        let overview = market_overview(&summaries, &universe);
        assert_eq!(overview.sentiment, MarketSentiment::Bullish);
        assert_eq!(overview.bullish_count, 2);
        assert_eq!(overview.bearish_count, 1);
        assert_eq!(overview.neutral_count, 0);
        assert_eq!(overview.high_risk_count, 1);
        assert!((overview.average_risk - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_best_opportunity_ordering() {
        let universe = TradingUniverse::default();
        let summaries = vec![
            summary("BTC", TrendDirection::Bullish, Recommendation::Long, 2, 9),
            summary("ETH", TrendDirection::Bearish, Recommendation::StrongShort, 4, 6),
            summary("SOL", TrendDirection::Bullish, Recommendation::StrongLong, 4, 6),
        ];
        let best = market_overview(&summaries, &universe).best_opportunity.unwrap();
        // Strong beats plain; equal risk and strength falls back to universe order
        assert_eq!(best.symbol, "ETH");
        assert_eq!(best.direction, Direction::Short);
        assert_eq!(best.recommendation, Recommendation::StrongShort);
    }

    #[test]
    fn test_no_opportunity_when_all_neutral() {
        let universe = TradingUniverse::default();
        let summaries = vec![summary("BTC", TrendDirection::Neutral, Recommendation::Neutral, 5, 1)];
        let overview = market_overview(&summaries, &universe);
        assert!(overview.best_opportunity.is_none());
        assert_eq!(overview.sentiment, MarketSentiment::Neutral);
    }

    #[test]
    fn test_empty_batch() {
        let overview = market_overview(&[], &TradingUniverse::default());
        assert_eq!(overview.average_risk, 0.0);
        assert_eq!(overview.sentiment, MarketSentiment::Neutral);
    }
}
