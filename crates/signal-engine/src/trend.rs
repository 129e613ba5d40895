use signal_core::stats::{linear_regression_slope, pct_diff, sign};
use signal_core::{IndicatorSnapshot, Momentum, TrendAnalysis, TrendDirection};

/// Both percentage signals must clear this to call a direction
pub const TREND_THRESHOLD_PCT: f64 = 0.5;

/// RSI slope beyond which momentum counts as changing
const MOMENTUM_SLOPE: f64 = 0.5;

/// Inputs to the trend classifier, decoupled from the full snapshot
#[derive(Debug, Clone, Copy)]
pub struct TrendInput<'a> {
    pub price: f64,
    pub ema20: f64,
    pub rsi14: f64,
    pub rsi_history: &'a [f64],
    pub slow_ema20: f64,
    pub slow_ema50: f64,
}

impl<'a> TrendInput<'a> {
    pub fn from_snapshot(snapshot: &'a IndicatorSnapshot) -> Self {
        Self {
            price: snapshot.current_price,
            ema20: snapshot.ema20,
            rsi14: current_rsi(snapshot.rsi14, &snapshot.rsi14_history),
            rsi_history: &snapshot.rsi14_history,
            slow_ema20: snapshot.slow.ema20,
            slow_ema50: snapshot.slow.ema50,
        }
    }

    fn is_degenerate(&self) -> bool {
        [self.price, self.ema20, self.slow_ema20, self.slow_ema50]
            .iter()
            .any(|v| !v.is_finite() || *v <= 0.0)
    }
}

/// RSI reading to use: the reported value if it is in range, else the last
/// history point, else the neutral 50.
pub fn current_rsi(rsi: f64, history: &[f64]) -> f64 {
    if rsi > 0.0 && rsi <= 100.0 {
        return rsi;
    }
    history
        .last()
        .copied()
        .filter(|v| v.is_finite() && (0.0..=100.0).contains(v))
        .unwrap_or(50.0)
}

pub fn analyze_trend(input: &TrendInput) -> TrendAnalysis {
    if input.is_degenerate() {
        return TrendAnalysis::neutral();
    }

    let price_vs_ema20_pct = pct_diff(input.price, input.ema20);
    let ema20_vs_ema50_pct = pct_diff(input.slow_ema20, input.slow_ema50);

    let direction = if price_vs_ema20_pct > TREND_THRESHOLD_PCT && ema20_vs_ema50_pct > TREND_THRESHOLD_PCT {
        TrendDirection::Bullish
    } else if price_vs_ema20_pct < -TREND_THRESHOLD_PCT && ema20_vs_ema50_pct < -TREND_THRESHOLD_PCT {
        TrendDirection::Bearish
    } else {
        TrendDirection::Neutral
    };

    let points = separation_points(ema20_vs_ema50_pct)
        + rsi_confirmation_points(input.rsi14, ema20_vs_ema50_pct)
        + consistency_points(price_vs_ema20_pct, ema20_vs_ema50_pct);
    let strength = points.clamp(1, 10);

    let momentum = momentum_from_rsi(input.rsi_history);

    let timeframe_alignment = sign(price_vs_ema20_pct) == sign(ema20_vs_ema50_pct);

    TrendAnalysis {
        direction,
        strength,
        momentum,
        timeframe_alignment,
        price_vs_ema20_pct,
        ema20_vs_ema50_pct,
    }
}

/// Convenience wrapper over [`analyze_trend`]
pub fn analyze_snapshot_trend(snapshot: &IndicatorSnapshot) -> TrendAnalysis {
    analyze_trend(&TrendInput::from_snapshot(snapshot))
}

/// 0-4 points for how far apart the slow EMAs sit
fn separation_points(ema_pct: f64) -> u8 {
    match ema_pct.abs() {
        s if s >= 3.0 => 4,
        s if s >= 2.0 => 3,
        s if s >= 1.0 => 2,
        s if s >= 0.5 => 1,
        _ => 0,
    }
}

/// 0-3 points when RSI sits on the side of 50 the EMAs point to
fn rsi_confirmation_points(rsi: f64, ema_pct: f64) -> u8 {
    let distance = match sign(ema_pct) {
        1 => rsi - 50.0,
        -1 => 50.0 - rsi,
        _ => return 0,
    };
    match distance {
        d if d >= 20.0 => 3,
        d if d >= 10.0 => 2,
        d if d > 0.0 => 1,
        _ => 0,
    }
}

/// 0-3 points for agreement between the fast and slow percentages
fn consistency_points(fast_pct: f64, slow_pct: f64) -> u8 {
    let (fast_sign, slow_sign) = (sign(fast_pct), sign(slow_pct));
    if fast_sign == 0 || fast_sign != slow_sign {
        return 0;
    }
    let (a, b) = (fast_pct.abs(), slow_pct.abs());
    let ratio = a.min(b) / a.max(b);
    if ratio >= 0.7 {
        3
    } else if ratio >= 0.4 {
        2
    } else {
        1
    }
}

fn momentum_from_rsi(history: &[f64]) -> Momentum {
    let slope = linear_regression_slope(history);
    if slope > MOMENTUM_SLOPE {
        Momentum::Accelerating
    } else if slope < -MOMENTUM_SLOPE {
        Momentum::Decelerating
    } else {
        Momentum::Steady
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(price: f64, ema20: f64, rsi: f64, slow_ema20: f64, slow_ema50: f64) -> TrendInput<'static> {
        TrendInput {
            price,
            ema20,
            rsi14: rsi,
            rsi_history: &[],
            slow_ema20,
            slow_ema50,
        }
    }

    #[test]
    fn test_bullish_example() {
        // +5% over EMA20, slow EMAs +10% apart
        let trend = analyze_trend(&input(105.0, 100.0, 65.0, 110.0, 100.0));
        assert_eq!(trend.direction, TrendDirection::Bullish);
        assert!((trend.price_vs_ema20_pct - 5.0).abs() < 1e-9);
        assert!((trend.ema20_vs_ema50_pct - 10.0).abs() < 1e-9);
        // separation 4 + RSI 15 above 50 gives 2 + ratio 0.5 gives 2
        assert_eq!(trend.strength, 8);
        assert!(trend.timeframe_alignment);

        let again = analyze_trend(&input(105.0, 100.0, 65.0, 110.0, 100.0));
        assert_eq!(trend, again);
    }

    #[test]
    fn test_disagreeing_signs_are_neutral() {
        // +1% fast, -1% slow
        let trend = analyze_trend(&input(101.0, 100.0, 55.0, 99.0, 100.0));
        assert_eq!(trend.direction, TrendDirection::Neutral);
        assert!(!trend.timeframe_alignment);
    }

    #[test]
    fn test_below_threshold_is_neutral() {
        let trend = analyze_trend(&input(100.4, 100.0, 55.0, 110.0, 100.0));
        assert_eq!(trend.direction, TrendDirection::Neutral);
    }

    #[test]
    fn test_bearish_with_contradicting_rsi() {
        let trend = analyze_trend(&input(95.0, 100.0, 70.0, 96.0, 100.0));
        assert_eq!(trend.direction, TrendDirection::Bearish);
        // separation 4 + RSI contradicts 0 + ratio 4/5 gives 3
        assert_eq!(trend.strength, 7);
    }

    #[test]
    fn test_degenerate_input_defaults() {
        assert_eq!(analyze_trend(&input(0.0, 100.0, 50.0, 1.0, 1.0)), TrendAnalysis::neutral());
        assert_eq!(analyze_trend(&input(100.0, 100.0, 50.0, 1.0, 0.0)), TrendAnalysis::neutral());
        assert_eq!(analyze_trend(&input(f64::NAN, 100.0, 50.0, 1.0, 1.0)), TrendAnalysis::neutral());
    }

    #[test]
    fn test_strength_floor_is_one() {
        let trend = analyze_trend(&input(100.0, 100.0, 50.0, 100.0, 100.0));
        assert_eq!(trend.strength, 1);
    }

    #[test]
    fn test_momentum_from_rsi_slope() {
        let rising = [40.0, 44.0, 48.0, 52.0];
        let falling = [60.0, 55.0, 50.0, 45.0];
        let flat = [50.0, 50.2, 49.9, 50.1];
        assert_eq!(momentum_from_rsi(&rising), Momentum::Accelerating);
        assert_eq!(momentum_from_rsi(&falling), Momentum::Decelerating);
        assert_eq!(momentum_from_rsi(&flat), Momentum::Steady);
        assert_eq!(momentum_from_rsi(&[]), Momentum::Steady);
    }

    #[test]
    fn test_current_rsi_fallbacks() {
        assert_eq!(current_rsi(62.0, &[]), 62.0);
        assert_eq!(current_rsi(0.0, &[40.0, 41.0]), 41.0);
        assert_eq!(current_rsi(0.0, &[]), 50.0);
    }
}
