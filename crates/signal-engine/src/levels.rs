use std::cmp::Ordering;

use signal_core::{IndicatorSnapshot, KeyLevels};

use crate::indicators::{swing_highs, swing_lows};

const SWING_LOOKBACKS: [usize; 2] = [3, 5];
/// Levels closer than this (percent) are the same level
const DEDUP_PCT: f64 = 0.1;
/// Levels closer than this (percent) to a cluster's first member join it
const CLUSTER_PCT: f64 = 0.3;
const MAX_LEVELS_PER_SIDE: usize = 3;

#[derive(Debug, Clone)]
struct Cluster {
    level: f64,
    size: usize,
}

/// Find swing-based support and resistance around `price`.
pub fn detect_levels(price: f64, history: &[f64], high_24h: f64, low_24h: f64) -> KeyLevels {
    let high = effective_extreme(high_24h, history, price, f64::max);
    let low = effective_extreme(low_24h, history, price, f64::min);

    if !price.is_finite() || price <= 0.0 {
        return KeyLevels {
            resistance: vec![],
            support: vec![],
            high_24h: high,
            low_24h: low,
            pivot: 0.0,
            distance_to_resistance_pct: 0.0,
            distance_to_support_pct: 0.0,
        };
    }

    let mut highs: Vec<f64> = Vec::new();
    let mut lows: Vec<f64> = Vec::new();
    for lookback in SWING_LOOKBACKS {
        highs.extend(swing_highs(history, lookback));
        lows.extend(swing_lows(history, lookback));
    }
    highs.push(high);
    lows.push(low);

    let resistance_candidates: Vec<f64> = highs.into_iter().filter(|&l| l > price).collect();
    let support_candidates: Vec<f64> = lows.into_iter().filter(|&l| l < price && l > 0.0).collect();

    let resistance = rank_levels(resistance_candidates, price);
    let support = rank_levels(support_candidates, price);

    let nearest_resistance = resistance.first().copied().unwrap_or(high);
    let nearest_support = support.first().copied().unwrap_or(low);

    KeyLevels {
        pivot: (high + low + price) / 3.0,
        distance_to_resistance_pct: distance_pct(nearest_resistance, price),
        distance_to_support_pct: distance_pct(nearest_support, price),
        resistance,
        support,
        high_24h: high,
        low_24h: low,
    }
}

pub fn analyze_levels(snapshot: &IndicatorSnapshot) -> KeyLevels {
    detect_levels(
        snapshot.current_price,
        &snapshot.price_history,
        snapshot.high_24h,
        snapshot.low_24h,
    )
}

/// |level - price| / price * 100
pub fn distance_pct(level: f64, price: f64) -> f64 {
    if price <= 0.0 {
        return 0.0;
    }
    (level - price).abs() / price * 100.0
}

/// Supplied 24h extreme, or the history/price extreme when it is missing.
fn effective_extreme(supplied: f64, history: &[f64], price: f64, pick: fn(f64, f64) -> f64) -> f64 {
    if supplied.is_finite() && supplied > 0.0 {
        return supplied;
    }
    history
        .iter()
        .copied()
        .filter(|v| v.is_finite() && *v > 0.0)
        .fold(price.max(0.0), pick)
}

/// Dedup, cluster, rank by (size desc, proximity asc), keep the top few and
/// return them nearest first.
fn rank_levels(mut candidates: Vec<f64>, price: f64) -> Vec<f64> {
    candidates.retain(|v| v.is_finite());
    candidates.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let deduped = dedup_levels(&candidates);
    let mut clusters = cluster_levels(&deduped);

    clusters.sort_by(|a, b| {
        b.size.cmp(&a.size).then_with(|| {
            distance_pct(a.level, price)
                .partial_cmp(&distance_pct(b.level, price))
                .unwrap_or(Ordering::Equal)
        })
    });
    clusters.truncate(MAX_LEVELS_PER_SIDE);

    let mut levels: Vec<f64> = clusters.into_iter().map(|c| c.level).collect();
    levels.sort_by(|a, b| {
        distance_pct(*a, price)
            .partial_cmp(&distance_pct(*b, price))
            .unwrap_or(Ordering::Equal)
    });
    levels
}

/// Drop levels within `DEDUP_PCT` of the previously kept one. Input must be sorted.
fn dedup_levels(sorted: &[f64]) -> Vec<f64> {
    let mut kept: Vec<f64> = Vec::with_capacity(sorted.len());
    for &level in sorted {
        match kept.last() {
            Some(&prev) if (level - prev).abs() / prev * 100.0 <= DEDUP_PCT => {}
            _ => kept.push(level),
        }
    }
    kept
}

/// Greedy grouping of sorted levels; each cluster is represented by its mean.
fn cluster_levels(sorted: &[f64]) -> Vec<Cluster> {
    let mut clusters = Vec::new();
    let mut current: Vec<f64> = Vec::new();

    for &level in sorted {
        if let Some(&anchor) = current.first() {
            if (level - anchor) / anchor * 100.0 > CLUSTER_PCT {
                clusters.push(close_cluster(&current));
                current.clear();
            }
        }
        current.push(level);
    }
    if !current.is_empty() {
        clusters.push(close_cluster(&current));
    }
    clusters
}

fn close_cluster(members: &[f64]) -> Cluster {
    Cluster {
        level: members.iter().sum::<f64>() / members.len() as f64,
        size: members.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_respect_price_side() {
        let history = vec![
            100.0, 102.0, 104.0, 106.0, 104.0, 102.0, 100.0, 98.0, 96.0, 98.0, 100.0, 102.0, 101.0,
            100.0, 99.0, 100.0,
        ];
        let levels = detect_levels(100.0, &history, 108.0, 95.0);

        assert!(!levels.resistance.is_empty());
        assert!(!levels.support.is_empty());
        assert!(levels.resistance.iter().all(|&r| r > 100.0));
        assert!(levels.support.iter().all(|&s| s < 100.0));
        assert!(levels.resistance.len() <= 3 && levels.support.len() <= 3);
        assert!((levels.pivot - (108.0 + 95.0 + 100.0) / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_levels_sorted_by_proximity() {
        let history = vec![
            100.0, 103.0, 110.0, 103.0, 100.0, 99.0, 100.0, 104.0, 106.0, 104.0, 101.0, 100.5, 100.0,
            99.5, 100.0,
        ];
        let levels = detect_levels(100.0, &history, 120.0, 90.0);
        let dists: Vec<f64> = levels.resistance.iter().map(|&r| distance_pct(r, 100.0)).collect();
        assert!(dists.windows(2).all(|w| w[0] <= w[1]));
        assert!((levels.distance_to_resistance_pct - dists[0]).abs() < 1e-9);
    }

    #[test]
    fn test_fallback_to_24h_extremes() {
        let levels = detect_levels(100.0, &[], 105.0, 97.0);
        assert_eq!(levels.resistance, vec![105.0]);
        assert_eq!(levels.support, vec![97.0]);
        assert!((levels.distance_to_resistance_pct - 5.0).abs() < 1e-9);
        assert!((levels.distance_to_support_pct - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_level_above_uses_24h_high_distance() {
        // Price sits at the 24h high: nothing strictly above
        let levels = detect_levels(105.0, &[], 105.0, 100.0);
        assert!(levels.resistance.is_empty());
        assert_eq!(levels.distance_to_resistance_pct, 0.0);
    }

    #[test]
    fn test_dedup_and_cluster() {
        let deduped = dedup_levels(&[100.0, 100.05, 100.2, 101.0]);
        assert_eq!(deduped, vec![100.0, 100.2, 101.0]);

        let clusters = cluster_levels(&deduped);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].size, 2);
        assert!((clusters[0].level - 100.1).abs() < 1e-9);
        assert_eq!(clusters[1].size, 1);
    }

    #[test]
    fn test_zero_price_yields_empty_levels() {
        let levels = detect_levels(0.0, &[1.0, 2.0], 0.0, 0.0);
        assert!(levels.resistance.is_empty());
        assert!(levels.support.is_empty());
        assert_eq!(levels.pivot, 0.0);
    }
}
