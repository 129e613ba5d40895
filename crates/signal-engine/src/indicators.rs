/// Exponential Moving Average.
///
/// Seeded with the SMA of the first `period` values; the output is aligned to
/// the tail of `data` (`data.len() - period + 1` values). Series shorter than
/// `period` are seeded with their first value instead so short MACD histories
/// still yield a usable signal line.
pub fn ema(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.is_empty() {
        return vec![];
    }

    let multiplier = 2.0 / (period as f64 + 1.0);

    let (seed, start) = if data.len() < period {
        (data[0], 1)
    } else {
        (data[..period].iter().sum::<f64>() / period as f64, period)
    };

    let mut result = Vec::with_capacity(data.len() - start + 1);
    result.push(seed);
    for &value in &data[start..] {
        let prev = result[result.len() - 1];
        result.push((value - prev) * multiplier + prev);
    }
    result
}

/// Values that are strictly greater than every point within `lookback` on both sides.
pub fn swing_highs(data: &[f64], lookback: usize) -> Vec<f64> {
    swing_points(data, lookback, |candidate, other| candidate > other)
}

/// Values that are strictly less than every point within `lookback` on both sides.
pub fn swing_lows(data: &[f64], lookback: usize) -> Vec<f64> {
    swing_points(data, lookback, |candidate, other| candidate < other)
}

fn swing_points(data: &[f64], lookback: usize, beats: impl Fn(f64, f64) -> bool) -> Vec<f64> {
    if lookback == 0 || data.len() < 2 * lookback + 1 {
        return vec![];
    }

    (lookback..data.len() - lookback)
        .filter(|&i| {
            let v = data[i];
            data[i - lookback..i].iter().all(|&o| beats(v, o))
                && data[i + 1..=i + lookback].iter().all(|&o| beats(v, o))
        })
        .map(|i| data[i])
        .collect()
}

/// Simple 3-point local minima as (index, value).
pub fn local_troughs(data: &[f64]) -> Vec<(usize, f64)> {
    if data.len() < 3 {
        return vec![];
    }
    (1..data.len() - 1)
        .filter(|&i| data[i] < data[i - 1] && data[i] < data[i + 1])
        .map(|i| (i, data[i]))
        .collect()
}

/// Simple 3-point local maxima as (index, value).
pub fn local_peaks(data: &[f64]) -> Vec<(usize, f64)> {
    if data.len() < 3 {
        return vec![];
    }
    (1..data.len() - 1)
        .filter(|&i| data[i] > data[i - 1] && data[i] > data[i + 1])
        .map(|i| (i, data[i]))
        .collect()
}

/// Last `n` values (or all of them if shorter).
pub fn tail(data: &[f64], n: usize) -> &[f64] {
    &data[data.len().saturating_sub(n)..]
}
