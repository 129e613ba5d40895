use signal_core::{IndicatorSnapshot, MarketRegime, RegimeType, Volatility};

/// Classify the market state from ATR(3)/ATR(14) and volume ratios.
///
/// The type and the volatility band are independent readings of the same
/// ratios; nothing is carried between calls.
pub fn classify_regime(atr_ratio: f64, volume_ratio: f64) -> MarketRegime {
    let regime_type = if atr_ratio < 1.2 && volume_ratio > 0.8 {
        RegimeType::Trending
    } else if atr_ratio > 1.5 {
        RegimeType::Volatile
    } else {
        RegimeType::Ranging
    };

    let volatility = if atr_ratio < 0.8 {
        Volatility::Low
    } else if atr_ratio < 1.5 {
        Volatility::Normal
    } else if atr_ratio < 2.0 {
        Volatility::High
    } else {
        Volatility::Extreme
    };

    MarketRegime {
        regime_type,
        volatility,
        atr_ratio,
        volume_ratio,
    }
}

pub fn analyze_regime(snapshot: &IndicatorSnapshot) -> MarketRegime {
    classify_regime(snapshot.slow.atr_ratio(), snapshot.slow.volume_ratio())
}

impl RegimeLabel for MarketRegime {
    fn label(&self) -> String {
        let kind = match self.regime_type {
            RegimeType::Trending => "trending",
            RegimeType::Ranging => "ranging",
            RegimeType::Volatile => "volatile",
        };
        let vol = match self.volatility {
            Volatility::Low => "low",
            Volatility::Normal => "normal",
            Volatility::High => "high",
            Volatility::Extreme => "extreme",
        };
        format!("{} ({} volatility, ATR ratio {:.2}, volume {:.2}x)", kind, vol, self.atr_ratio, self.volume_ratio)
    }
}

/// Short human-readable description for prompts and logs
pub trait RegimeLabel {
    fn label(&self) -> String;
}
