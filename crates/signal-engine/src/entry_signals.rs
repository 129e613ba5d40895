use signal_core::{Direction, EntrySignal, EntrySignalType, IndicatorSnapshot, SignalStrength};

use crate::indicators::{ema, local_peaks, local_troughs, tail};

const RSI_OVERSOLD: f64 = 30.0;
const RSI_OVERBOUGHT: f64 = 70.0;
const RSI_MIDLINE: f64 = 50.0;
const MACD_SIGNAL_PERIOD: usize = 9;
const BREAKOUT_MIN_VOLUME_RATIO: f64 = 1.2;
const VOLUME_SPIKE_RATIO: f64 = 1.5;
const PRICE_ACTION_WINDOW: usize = 5;

/// Run every detector and return the signals strongest first.
///
/// Detectors are independent; the stable sort keeps detector order within a
/// strength band.
pub fn detect_entry_signals(snapshot: &IndicatorSnapshot) -> Vec<EntrySignal> {
    let volume_ratio = snapshot.slow.volume_ratio();

    let mut signals = Vec::new();
    signals.extend(rsi_signals(&snapshot.rsi14_history));
    signals.extend(macd_signals(
        &snapshot.macd_history,
        &snapshot.macd_signal_history,
        snapshot.current_price,
    ));
    signals.extend(ema_signals(&snapshot.price_history, &snapshot.ema20_history, volume_ratio));
    signals.extend(price_action_signals(&snapshot.price_history));
    signals.extend(volume_signals(volume_ratio));

    sort_by_strength(&mut signals);
    signals
}

/// Stable sort STRONG -> MODERATE -> WEAK
pub fn sort_by_strength(signals: &mut [EntrySignal]) {
    signals.sort_by(|a, b| b.strength.rank().cmp(&a.strength.rank()));
}

fn signal(signal_type: EntrySignalType, strength: SignalStrength, direction: Direction, description: String) -> EntrySignal {
    EntrySignal {
        signal_type,
        strength,
        direction,
        description,
    }
}

fn band(value: f64, strong: f64, moderate: f64) -> SignalStrength {
    if value >= strong {
        SignalStrength::Strong
    } else if value >= moderate {
        SignalStrength::Moderate
    } else {
        SignalStrength::Weak
    }
}

pub fn rsi_signals(history: &[f64]) -> Vec<EntrySignal> {
    let mut out = Vec::new();
    let n = history.len();
    if n < 2 {
        return out;
    }
    let curr = history[n - 1];
    let prev = history[n - 2];

    if n >= 3 {
        let before = history[n - 3];
        let rising = curr > prev && prev > before;
        let falling = curr < prev && prev < before;

        if curr < RSI_OVERSOLD && rising {
            out.push(signal(
                EntrySignalType::RsiOversoldBounce,
                band(RSI_OVERSOLD - curr, 10.0, 5.0),
                Direction::Long,
                format!("RSI oversold and turning up ({:.1})", curr),
            ));
        } else if curr > RSI_OVERBOUGHT && falling {
            out.push(signal(
                EntrySignalType::RsiOverboughtRejection,
                band(curr - RSI_OVERBOUGHT, 10.0, 5.0),
                Direction::Short,
                format!("RSI overbought and turning down ({:.1})", curr),
            ));
        }
    }

    if prev < RSI_MIDLINE && curr >= RSI_MIDLINE {
        out.push(signal(
            EntrySignalType::RsiMomentumCross,
            band(curr - RSI_MIDLINE, 5.0, 2.0),
            Direction::Long,
            format!("RSI crossed above 50 ({:.1} -> {:.1})", prev, curr),
        ));
    } else if prev > RSI_MIDLINE && curr <= RSI_MIDLINE {
        out.push(signal(
            EntrySignalType::RsiMomentumCross,
            band(RSI_MIDLINE - curr, 5.0, 2.0),
            Direction::Short,
            format!("RSI crossed below 50 ({:.1} -> {:.1})", prev, curr),
        ));
    }

    out
}

/// MACD line vs signal line crossing. An empty `signal_line` is derived as
/// EMA(9) of the MACD history.
pub fn macd_signals(macd: &[f64], signal_line: &[f64], price: f64) -> Vec<EntrySignal> {
    if macd.len() < 2 || price <= 0.0 {
        return vec![];
    }

    let derived;
    let signal_line = if signal_line.len() >= 2 {
        signal_line
    } else {
        derived = ema(macd, MACD_SIGNAL_PERIOD);
        derived.as_slice()
    };
    if signal_line.len() < 2 {
        return vec![];
    }

    let macd = tail(macd, 2);
    let signal_line = tail(signal_line, 2);
    let prev_diff = macd[0] - signal_line[0];
    let curr_diff = macd[1] - signal_line[1];

    let magnitude_pct = curr_diff.abs() / price * 100.0;
    let strength = band(magnitude_pct, 0.05, 0.02);

    if prev_diff <= 0.0 && curr_diff > 0.0 {
        vec![signal(
            EntrySignalType::MacdCrossover,
            strength,
            Direction::Long,
            format!("MACD crossed above signal (diff {:+.4})", curr_diff),
        )]
    } else if prev_diff >= 0.0 && curr_diff < 0.0 {
        vec![signal(
            EntrySignalType::MacdCrossover,
            strength,
            Direction::Short,
            format!("MACD crossed below signal (diff {:+.4})", curr_diff),
        )]
    } else {
        vec![]
    }
}

/// Price crossing EMA20 on above-average volume
pub fn ema_signals(prices: &[f64], ema20: &[f64], volume_ratio: f64) -> Vec<EntrySignal> {
    if prices.len() < 2 || ema20.len() < 2 || volume_ratio < BREAKOUT_MIN_VOLUME_RATIO {
        return vec![];
    }
    let p = tail(prices, 2);
    let e = tail(ema20, 2);
    if e[1] <= 0.0 {
        return vec![];
    }

    let breakout_pct = (p[1] - e[1]).abs() / e[1] * 100.0;
    let strength = band(breakout_pct, 1.0, 0.5);

    if p[0] <= e[0] && p[1] > e[1] {
        vec![signal(
            EntrySignalType::EmaBreakout,
            strength,
            Direction::Long,
            format!("Price broke above EMA20 by {:.2}% on {:.1}x volume", breakout_pct, volume_ratio),
        )]
    } else if p[0] >= e[0] && p[1] < e[1] {
        vec![signal(
            EntrySignalType::EmaBreakout,
            strength,
            Direction::Short,
            format!("Price broke below EMA20 by {:.2}% on {:.1}x volume", breakout_pct, volume_ratio),
        )]
    } else {
        vec![]
    }
}

/// Higher-low / lower-high formation over the last few closes
pub fn price_action_signals(prices: &[f64]) -> Vec<EntrySignal> {
    let window = tail(prices, PRICE_ACTION_WINDOW);
    if window.len() < PRICE_ACTION_WINDOW {
        return vec![];
    }

    let mut out = Vec::new();

    let lows = local_troughs(window);
    if let [.., (_, prev), (_, last)] = lows.as_slice() {
        if last > prev && *prev > 0.0 {
            let gap = (last - prev) / prev * 100.0;
            out.push(signal(
                EntrySignalType::HigherLow,
                if gap >= 0.5 { SignalStrength::Moderate } else { SignalStrength::Weak },
                Direction::Long,
                format!("Higher low formed ({:.4} -> {:.4})", prev, last),
            ));
        }
    }

    let highs = local_peaks(window);
    if let [.., (_, prev), (_, last)] = highs.as_slice() {
        if last < prev && *prev > 0.0 {
            let gap = (prev - last) / prev * 100.0;
            out.push(signal(
                EntrySignalType::LowerHigh,
                if gap >= 0.5 { SignalStrength::Moderate } else { SignalStrength::Weak },
                Direction::Short,
                format!("Lower high formed ({:.4} -> {:.4})", prev, last),
            ));
        }
    }

    out
}

/// Volume spike. Direction is not implied by volume; LONG is a fixed
/// placeholder so the signal fits the directional shape.
pub fn volume_signals(volume_ratio: f64) -> Vec<EntrySignal> {
    if volume_ratio < VOLUME_SPIKE_RATIO {
        return vec![];
    }
    vec![signal(
        EntrySignalType::VolumeSpike,
        band(volume_ratio, 3.0, 2.0),
        Direction::Long,
        format!("Volume spike {:.1}x average", volume_ratio),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_oversold_bounce() {
        let signals = rsi_signals(&[22.0, 24.0, 27.0]);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].signal_type, EntrySignalType::RsiOversoldBounce);
        assert_eq!(signals[0].direction, Direction::Long);
        assert_eq!(signals[0].strength, SignalStrength::Weak);

        let deep = rsi_signals(&[12.0, 15.0, 18.0]);
        assert_eq!(deep[0].strength, SignalStrength::Strong);
    }

    #[test]
    fn test_rsi_overbought_rejection() {
        let signals = rsi_signals(&[85.0, 82.0, 77.0]);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].signal_type, EntrySignalType::RsiOverboughtRejection);
        assert_eq!(signals[0].direction, Direction::Short);
        assert_eq!(signals[0].strength, SignalStrength::Moderate);
    }

    #[test]
    fn test_rsi_midline_cross() {
        let up = rsi_signals(&[45.0, 48.0, 56.0]);
        assert_eq!(up.len(), 1);
        assert_eq!(up[0].signal_type, EntrySignalType::RsiMomentumCross);
        assert_eq!(up[0].direction, Direction::Long);
        assert_eq!(up[0].strength, SignalStrength::Strong);

        let down = rsi_signals(&[52.0, 49.0]);
        assert_eq!(down[0].direction, Direction::Short);
        assert_eq!(down[0].strength, SignalStrength::Weak);
    }

    #[test]
    fn test_macd_crossover_with_supplied_signal() {
        let macd = [-0.5, 0.4];
        let sig = [0.0, 0.0];
        let signals = macd_signals(&macd, &sig, 100.0);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].direction, Direction::Long);
        // 0.4 / 100 = 0.4% of price
        assert_eq!(signals[0].strength, SignalStrength::Strong);

        let signals = macd_signals(&[0.5, -0.01], &[0.0, 0.0], 100.0);
        assert_eq!(signals[0].direction, Direction::Short);
        assert_eq!(signals[0].strength, SignalStrength::Weak);
    }

    #[test]
    fn test_macd_no_cross() {
        assert!(macd_signals(&[0.2, 0.3], &[0.1, 0.1], 100.0).is_empty());
        assert!(macd_signals(&[0.2], &[], 100.0).is_empty());
    }

    #[test]
    fn test_macd_derived_signal_line() {
        // Long decline then a sharp rise: MACD overtakes its own EMA on the last bar
        let mut macd: Vec<f64> = (0..12).map(|i| -(i as f64) * 0.1).collect();
        macd.push(1.0);
        let signals = macd_signals(&macd, &[], 100.0);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].direction, Direction::Long);
    }

    #[test]
    fn test_ema_breakout_needs_volume() {
        let prices = [99.0, 101.5];
        let ema = [100.0, 100.0];
        assert!(ema_signals(&prices, &ema, 1.0).is_empty());

        let signals = ema_signals(&prices, &ema, 1.3);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].direction, Direction::Long);
        assert_eq!(signals[0].strength, SignalStrength::Strong);

        let signals = ema_signals(&[101.0, 99.7], &ema, 2.0);
        assert_eq!(signals[0].direction, Direction::Short);
        assert_eq!(signals[0].strength, SignalStrength::Weak);
    }

    #[test]
    fn test_price_action_higher_low() {
        let signals = price_action_signals(&[100.0, 95.0, 99.0, 97.0, 101.0]);
        assert!(signals
            .iter()
            .any(|s| s.signal_type == EntrySignalType::HigherLow && s.direction == Direction::Long));
    }

    #[test]
    fn test_price_action_lower_high() {
        let signals = price_action_signals(&[100.0, 106.0, 101.0, 103.0, 99.0]);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].signal_type, EntrySignalType::LowerHigh);
        assert_eq!(signals[0].strength, SignalStrength::Moderate);
    }

    #[test]
    fn test_volume_spike_is_long_placeholder() {
        assert!(volume_signals(1.4).is_empty());
        let s = volume_signals(2.2);
        assert_eq!(s[0].signal_type, EntrySignalType::VolumeSpike);
        assert_eq!(s[0].direction, Direction::Long);
        assert_eq!(s[0].strength, SignalStrength::Moderate);
    }

    #[test]
    fn test_sort_is_stable_by_strength() {
        let mut signals = vec![
            signal(EntrySignalType::HigherLow, SignalStrength::Weak, Direction::Long, "a".into()),
            signal(EntrySignalType::MacdCrossover, SignalStrength::Strong, Direction::Long, "b".into()),
            signal(EntrySignalType::LowerHigh, SignalStrength::Weak, Direction::Short, "c".into()),
            signal(EntrySignalType::VolumeSpike, SignalStrength::Moderate, Direction::Long, "d".into()),
        ];
        sort_by_strength(&mut signals);
        let order: Vec<&str> = signals.iter().map(|s| s.description.as_str()).collect();
        assert_eq!(order, vec!["b", "d", "a", "c"]);
    }
}
