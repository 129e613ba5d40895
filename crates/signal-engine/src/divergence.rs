use signal_core::{Divergence, DivergenceIndicator, DivergenceType, IndicatorSnapshot, SignalStrength};

use crate::indicators::{local_peaks, local_troughs, tail};

const MIN_POINTS: usize = 5;
const INDICATOR_WEIGHT: f64 = 0.1;

/// Price/indicator divergence over the common trailing window of both series.
///
/// Bullish: price makes a lower low while the indicator makes a higher low.
/// Bearish: price makes a higher high while the indicator makes a lower high.
pub fn detect_divergence(prices: &[f64], indicator: &[f64], kind: DivergenceIndicator) -> Vec<Divergence> {
    if prices.len() < MIN_POINTS || indicator.len() < MIN_POINTS {
        return vec![];
    }

    let window = prices.len().min(indicator.len());
    let prices = tail(prices, window);
    let indicator = tail(indicator, window);

    let mut found = Vec::new();

    if let (Some((p_prev, p_last)), Some((i_prev, i_last))) =
        (last_two(&local_troughs(prices)), last_two(&local_troughs(indicator)))
    {
        if p_last < p_prev && i_last > i_prev {
            let strength = divergence_strength(prices, indicator);
            found.push(Divergence {
                divergence_type: DivergenceType::Bullish,
                indicator: kind,
                strength,
                description: format!(
                    "Bullish {} divergence: price lower low {:.4} -> {:.4}, {} higher low {:.2} -> {:.2}",
                    kind, p_prev, p_last, kind, i_prev, i_last
                ),
            });
        }
    }

    if let (Some((p_prev, p_last)), Some((i_prev, i_last))) =
        (last_two(&local_peaks(prices)), last_two(&local_peaks(indicator)))
    {
        if p_last > p_prev && i_last < i_prev {
            let strength = divergence_strength(prices, indicator);
            found.push(Divergence {
                divergence_type: DivergenceType::Bearish,
                indicator: kind,
                strength,
                description: format!(
                    "Bearish {} divergence: price higher high {:.4} -> {:.4}, {} lower high {:.2} -> {:.2}",
                    kind, p_prev, p_last, kind, i_prev, i_last
                ),
            });
        }
    }

    found
}

/// RSI14 and MACD checked independently against price; both may fire.
pub fn detect_divergences(snapshot: &IndicatorSnapshot) -> Vec<Divergence> {
    let mut all = detect_divergence(&snapshot.price_history, &snapshot.rsi14_history, DivergenceIndicator::Rsi);
    all.extend(detect_divergence(&snapshot.price_history, &snapshot.macd_history, DivergenceIndicator::Macd));
    all
}

fn last_two(points: &[(usize, f64)]) -> Option<(f64, f64)> {
    match points {
        [.., (_, prev), (_, last)] => Some((*prev, *last)),
        _ => None,
    }
}

/// Percentage price swing plus a tenth of the raw indicator swing.
fn divergence_strength(prices: &[f64], indicator: &[f64]) -> SignalStrength {
    let (p_min, p_max) = min_max(prices);
    let (i_min, i_max) = min_max(indicator);

    let price_swing_pct = if p_min > 0.0 { (p_max - p_min) / p_min * 100.0 } else { 0.0 };
    let score = price_swing_pct + INDICATOR_WEIGHT * (i_max - i_min);

    if score >= 4.0 {
        SignalStrength::Strong
    } else if score >= 2.0 {
        SignalStrength::Moderate
    } else {
        SignalStrength::Weak
    }
}

fn min_max(data: &[f64]) -> (f64, f64) {
    data.iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bullish_rsi_divergence() {
        let prices = [100.0, 96.0, 99.0, 94.0, 97.0];
        let rsi = [40.0, 30.0, 38.0, 34.0, 42.0];
        let divs = detect_divergence(&prices, &rsi, DivergenceIndicator::Rsi);

        assert_eq!(divs.len(), 1);
        assert_eq!(divs[0].divergence_type, DivergenceType::Bullish);
        assert_eq!(divs[0].indicator, DivergenceIndicator::Rsi);
        // 6/94 = 6.4% price swing alone clears the strong band
        assert_eq!(divs[0].strength, SignalStrength::Strong);
    }

    #[test]
    fn test_bearish_macd_divergence() {
        let prices = [100.0, 104.0, 101.0, 105.0, 102.0];
        let macd = [0.0, 2.0, 1.0, 1.5, 0.5];
        let divs = detect_divergence(&prices, &macd, DivergenceIndicator::Macd);

        assert_eq!(divs.len(), 1);
        assert_eq!(divs[0].divergence_type, DivergenceType::Bearish);
        assert_eq!(divs[0].indicator, DivergenceIndicator::Macd);
    }

    #[test]
    fn test_confirming_lows_are_not_divergence() {
        let prices = [100.0, 96.0, 99.0, 94.0, 97.0];
        let rsi = [40.0, 34.0, 38.0, 30.0, 42.0];
        assert!(detect_divergence(&prices, &rsi, DivergenceIndicator::Rsi).is_empty());
    }

    #[test]
    fn test_requires_five_points() {
        let prices = [100.0, 96.0, 99.0, 94.0];
        let rsi = [40.0, 30.0, 38.0, 34.0];
        assert!(detect_divergence(&prices, &rsi, DivergenceIndicator::Rsi).is_empty());
    }

    #[test]
    fn test_weak_divergence_on_small_swing() {
        let prices = [100.0, 99.8, 100.0, 99.7, 99.9];
        let rsi = [50.0, 48.0, 49.0, 48.5, 49.5];
        let divs = detect_divergence(&prices, &rsi, DivergenceIndicator::Rsi);
        assert_eq!(divs.len(), 1);
        assert_eq!(divs[0].strength, SignalStrength::Weak);
    }
}
