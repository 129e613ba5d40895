use serde::{Deserialize, Serialize};

const DEFAULT_SYMBOLS: [&str; 6] = ["BTC", "ETH", "SOL", "BNB", "XRP", "DOGE"];
const DEFAULT_REASONING_MODELS: [&str; 5] = ["deepseek-r1", "deepseek-reasoner", "qwq", "qwen3", "o3"];

/// Contract suffixes a model might append to a base symbol.
const SYMBOL_SUFFIXES: [&str; 6] = ["PERP", "USDT", "USDC", "BUSD", "USD", "PERPETUAL"];

/// The fixed set of symbols the agent may trade.
///
/// Order matters: it is the priority used to break ties between symbols.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingUniverse {
    symbols: Vec<String>,
}

impl TradingUniverse {
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for s in symbols {
            let s = s.as_ref().trim().to_uppercase();
            if !s.is_empty() && !out.contains(&s) {
                out.push(s);
            }
        }
        Self { symbols: out }
    }

    /// Parse a comma-separated list such as `BTC,ETH,SOL`.
    pub fn from_csv(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s == symbol)
    }

    /// Position in the universe, lower is higher priority.
    pub fn priority(&self, symbol: &str) -> usize {
        self.symbols
            .iter()
            .position(|s| s == symbol)
            .unwrap_or(self.symbols.len())
    }

    /// Map loose spellings (`btc`, `BTCUSDT`, `BTC/USDT`, `BTC-PERP`) onto a
    /// tradable symbol. Returns `None` if nothing in the universe matches.
    pub fn normalize(&self, raw: &str) -> Option<String> {
        let upper = raw.trim().to_uppercase();
        if self.contains(&upper) {
            return Some(upper);
        }

        let mut base = upper.as_str();
        loop {
            let trimmed = base.trim_end_matches(['/', '-', '_', ':', ' ']);
            let stripped = SYMBOL_SUFFIXES
                .iter()
                .find_map(|suffix| trimmed.strip_suffix(*suffix).filter(|rest| !rest.is_empty()));
            match stripped {
                Some(rest) => base = rest,
                None => {
                    base = trimmed;
                    break;
                }
            }
        }

        if self.contains(base) {
            Some(base.to_string())
        } else {
            None
        }
    }
}

impl Default for TradingUniverse {
    fn default() -> Self {
        Self::new(DEFAULT_SYMBOLS)
    }
}

/// Model names known to emit a reasoning block before their answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningModels {
    names: Vec<String>,
}

impl ReasoningModels {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn from_csv(list: &str) -> Self {
        Self::new(list.split(','))
    }

    /// Substring match, so `deepseek-r1:14b` counts as `deepseek-r1`.
    pub fn is_reasoning(&self, model: &str) -> bool {
        let model = model.to_lowercase();
        self.names.iter().any(|n| model.contains(n.as_str()))
    }
}

impl Default for ReasoningModels {
    fn default() -> Self {
        Self::new(DEFAULT_REASONING_MODELS)
    }
}
