use std::cmp::Ordering;

use serde_json::{Map, Value};
use signal_core::TradingUniverse;

use crate::extract::{find_objects, split_code_fences, strip_think_blocks};
use crate::repair::repair_json;
use crate::types::{DecisionKind, EntryOrder, ParserWarning, TradeAction, TradeDecision, WarningKind};

const FALLBACK_REASONING: &str = "Could not parse model response";
const DEFAULT_CONFIDENCE: f64 = 0.5;
const PROSE_REASONING_CHARS: usize = 500;

const DECISION_KEYS: &[&str] = &["decision", "action", "signal", "trade_decision"];
const SYMBOL_KEYS: &[&str] = &["symbol", "coin", "asset", "ticker"];
const CONFIDENCE_KEYS: &[&str] = &["confidence", "conf", "certainty"];
const REASONING_KEYS: &[&str] = &["reasoning", "reason", "rationale", "explanation"];
const OVERALL_REASONING_KEYS: &[&str] = &[
    "overall_reasoning",
    "overallReasoning",
    "reasoning",
    "reason",
    "summary",
    "analysis",
];
const LEVERAGE_KEYS: &[&str] = &["leverage", "lev"];
const SIZE_KEYS: &[&str] = &[
    "size_usd",
    "sizeUsd",
    "position_size_usd",
    "positionSizeUsd",
    "position_size",
    "size",
];
const STOP_KEYS: &[&str] = &["stop_loss", "stopLoss", "stop", "sl"];
const TARGET_KEYS: &[&str] = &["take_profit", "takeProfit", "target", "tp"];
const RISK_REWARD_KEYS: &[&str] = &["risk_reward", "riskReward", "risk_reward_ratio", "rr"];
const PER_SYMBOL_KEYS: &[&str] = &["decisions", "per_symbol", "symbol_decisions", "coins"];

/// Turns raw model text into a [`TradeDecision`].
///
/// `parse` never fails and never panics: anything it cannot make sense of
/// becomes a HOLD at confidence 0.5, with the reason recorded as a warning.
#[derive(Debug, Clone)]
pub struct DecisionParser {
    universe: TradingUniverse,
}

/// An object recovered from the reply, with how it was recovered
struct Located {
    map: Map<String, Value>,
    extracted: bool,
    repaired: bool,
    complete: bool,
    /// Text before the object in its source
    prose: Option<String>,
}

enum SymbolField {
    Valid(String),
    Invalid,
    Missing,
}

impl DecisionParser {
    pub fn new(universe: TradingUniverse) -> Self {
        Self { universe }
    }

    pub fn universe(&self) -> &TradingUniverse {
        &self.universe
    }

    pub fn parse(&self, raw: &str) -> TradeDecision {
        let mut warnings = Vec::new();

        let (text, think) = strip_think_blocks(raw);
        let fenced = split_code_fences(&text);
        let text = fenced.unfenced.trim();

        let mut fallback = think.or(fenced.prose);

        // Fenced bodies first, then the whole reply with the fences removed
        let mut sources: Vec<&str> = fenced
            .blocks
            .iter()
            .filter(|b| b.contains('{'))
            .map(String::as_str)
            .collect();
        sources.push(text);

        let decision = match self.locate_object(&sources) {
            Some(found) => {
                if found.extracted {
                    warnings.push(ParserWarning::new(
                        WarningKind::JsonExtracted,
                        "JSON object extracted from surrounding text",
                    ));
                    if fallback.is_none() {
                        fallback = found.prose;
                    }
                }
                if found.repaired {
                    warnings.push(ParserWarning::new(
                        WarningKind::JsonRepaired,
                        if found.complete {
                            "Malformed JSON repaired before parsing"
                        } else {
                            "Truncated JSON closed and repaired before parsing"
                        },
                    ));
                }
                self.interpret_root(&found.map, fallback.as_deref(), &mut warnings)
            }
            None => {
                warnings.push(ParserWarning::new(
                    WarningKind::ParseFailed,
                    "No parseable JSON object in model response; holding",
                ));
                let reasoning = fallback
                    .or_else(|| (!text.is_empty()).then(|| text.chars().take(PROSE_REASONING_CHARS).collect()))
                    .unwrap_or_else(|| FALLBACK_REASONING.to_string());
                TradeDecision::safe_hold(reasoning)
            }
        };

        let decision = TradeDecision { warnings, ..decision };
        for w in &decision.warnings {
            tracing::warn!(kind = ?w.kind, original = ?w.original, corrected = ?w.corrected, "{}", w.message);
        }
        decision
    }

    /// First object that reads as a decision, searching `sources` in order.
    /// Failing that, the first object that parses at all.
    fn locate_object(&self, sources: &[&str]) -> Option<Located> {
        let mut first = None;
        for source in sources {
            for span in find_objects(source) {
                let (value, repaired) = match serde_json::from_str::<Value>(span.text) {
                    Ok(value) => (value, false),
                    Err(_) => match serde_json::from_str::<Value>(&repair_json(span.text)) {
                        Ok(value) => (value, true),
                        Err(_) => continue,
                    },
                };
                let Value::Object(map) = value else {
                    continue;
                };

                let prose = source[..span.start].trim();
                let found = Located {
                    extracted: span.text.len() != source.len(),
                    repaired,
                    complete: span.complete,
                    prose: (!prose.is_empty()).then(|| prose.to_string()),
                    map,
                };
                if self.is_decision_shaped(&found.map) {
                    return Some(found);
                }
                if first.is_none() {
                    first = Some(found);
                }
            }
        }
        first
    }

    fn is_decision_shaped(&self, map: &Map<String, Value>) -> bool {
        DECISION_KEYS.iter().any(|k| map.contains_key(*k)) || self.per_symbol_entries(map).is_some()
    }

    fn interpret_root(
        &self,
        root: &Map<String, Value>,
        fallback: Option<&str>,
        warnings: &mut Vec<ParserWarning>,
    ) -> TradeDecision {
        // {"decision": {...}} wrapper
        if let Some(Value::Object(inner)) = root.get("decision") {
            let outer_reasoning = string_field(root, REASONING_KEYS);
            return self.interpret(inner, None, outer_reasoning.as_deref().or(fallback), warnings);
        }

        match self.per_symbol_entries(root) {
            Some(entries) => self.reduce_per_symbol(root, entries, fallback, warnings),
            None => self.interpret(root, None, fallback, warnings),
        }
    }

    /// Entries of the per-symbol variant, or `None` for a flat decision.
    fn per_symbol_entries<'a>(
        &self,
        root: &'a Map<String, Value>,
    ) -> Option<Vec<(Option<String>, &'a Map<String, Value>)>> {
        if DECISION_KEYS.iter().any(|k| root.contains_key(*k)) {
            return None;
        }

        for key in PER_SYMBOL_KEYS {
            match root.get(*key) {
                Some(Value::Object(by_symbol)) => {
                    return Some(
                        by_symbol
                            .iter()
                            .filter_map(|(sym, v)| v.as_object().map(|o| (Some(sym.clone()), o)))
                            .collect(),
                    );
                }
                Some(Value::Array(items)) => {
                    return Some(items.iter().filter_map(|v| v.as_object().map(|o| (None, o))).collect());
                }
                _ => {}
            }
        }

        // Bare map keyed by symbol
        let entries: Vec<_> = root
            .iter()
            .filter(|(k, _)| self.universe.normalize(k).is_some())
            .filter_map(|(k, v)| v.as_object().map(|o| (Some(k.clone()), o)))
            .collect();
        (!entries.is_empty()).then_some(entries)
    }

    /// Entry decisions beat closes; within a kind the highest confidence
    /// wins and ties go to the symbol listed first in the universe.
    fn reduce_per_symbol(
        &self,
        root: &Map<String, Value>,
        entries: Vec<(Option<String>, &Map<String, Value>)>,
        fallback: Option<&str>,
        warnings: &mut Vec<ParserWarning>,
    ) -> TradeDecision {
        let overall = string_field(root, OVERALL_REASONING_KEYS).or_else(|| fallback.map(str::to_string));

        let candidates: Vec<(TradeDecision, Vec<ParserWarning>)> = entries
            .iter()
            .map(|(key, entry)| {
                let mut entry_warnings = Vec::new();
                let d = self.interpret(entry, key.as_deref(), overall.as_deref(), &mut entry_warnings);
                (d, entry_warnings)
            })
            .collect();

        let best = |wanted: fn(DecisionKind) -> bool| {
            candidates
                .iter()
                .filter(|(d, _)| wanted(d.kind()))
                .min_by(|(a, _), (b, _)| {
                    b.confidence
                        .partial_cmp(&a.confidence)
                        .unwrap_or(Ordering::Equal)
                        .then_with(|| self.symbol_priority(a).cmp(&self.symbol_priority(b)))
                })
        };

        let chosen = best(|k| k.is_open()).or_else(|| best(|k| k == DecisionKind::Close));

        // Corrections made on entries that lost the reduction, labelled by entry
        let unchosen_warnings = || {
            entries
                .iter()
                .zip(&candidates)
                .enumerate()
                .filter(|(_, (_, candidate))| !chosen.is_some_and(|c| std::ptr::eq(c, *candidate)))
                .flat_map(|(i, ((key, _), (_, entry_warnings)))| {
                    let label = key.clone().unwrap_or_else(|| format!("entry {}", i + 1));
                    entry_warnings.iter().map(move |w| ParserWarning {
                        message: format!("{}: {}", label, w.message),
                        ..w.clone()
                    })
                })
                .collect::<Vec<_>>()
        };

        match chosen {
            Some((decision, entry_warnings)) => {
                warnings.push(ParserWarning::new(
                    WarningKind::PerSymbolReduced,
                    format!(
                        "Reduced {} per-symbol decisions to {} {}",
                        candidates.len(),
                        decision.kind(),
                        decision.symbol().unwrap_or("")
                    ),
                ));
                warnings.extend(entry_warnings.iter().cloned());
                warnings.extend(unchosen_warnings());
                decision.clone()
            }
            None => {
                warnings.push(ParserWarning::new(
                    WarningKind::PerSymbolReduced,
                    format!("No entry or close among {} per-symbol decisions; holding", candidates.len()),
                ));
                warnings.extend(unchosen_warnings());
                let confidence = number_value(root, CONFIDENCE_KEYS)
                    .map(|c| c.clamp(0.0, 1.0))
                    .unwrap_or(DEFAULT_CONFIDENCE);
                TradeDecision {
                    confidence,
                    ..TradeDecision::safe_hold(overall.unwrap_or_else(|| FALLBACK_REASONING.to_string()))
                }
            }
        }
    }

    fn symbol_priority(&self, decision: &TradeDecision) -> usize {
        decision
            .symbol()
            .map(|s| self.universe.priority(s))
            .unwrap_or(usize::MAX)
    }

    /// Validate one flat decision object and apply corrections.
    fn interpret(
        &self,
        map: &Map<String, Value>,
        key_symbol: Option<&str>,
        fallback: Option<&str>,
        warnings: &mut Vec<ParserWarning>,
    ) -> TradeDecision {
        let reasoning = string_field(map, REASONING_KEYS)
            .or_else(|| fallback.map(str::to_string))
            .unwrap_or_default();
        let kind = decision_kind(map, warnings);
        let confidence = confidence(map, warnings);
        let symbol = self.symbol(map, key_symbol, warnings);

        let leverage = number_field(map, LEVERAGE_KEYS, warnings).map(|lev| {
            if lev < 1.0 {
                warnings.push(
                    ParserWarning::new(
                        WarningKind::LeverageCorrected,
                        format!("Leverage {} below 1, clamped to 1", lev),
                    )
                    .with_values(lev, 1.0),
                );
                1.0
            } else {
                lev
            }
        });

        let action = match (kind, symbol) {
            (DecisionKind::Hold, _) => TradeAction::Hold,
            (_, SymbolField::Invalid) => TradeAction::Hold,
            (DecisionKind::Close, SymbolField::Valid(symbol)) => TradeAction::Close { symbol },
            (DecisionKind::Close, SymbolField::Missing) => {
                warnings.push(ParserWarning::new(
                    WarningKind::MissingOrderFields,
                    "CLOSE without a symbol; forced to HOLD",
                ));
                TradeAction::Hold
            }
            (open, symbol) => {
                let symbol = match symbol {
                    SymbolField::Valid(s) => Some(s),
                    _ => None,
                };
                self.entry_action(open, symbol, leverage, map, warnings)
            }
        };

        TradeDecision {
            action,
            confidence,
            reasoning,
            warnings: Vec::new(),
        }
    }

    fn entry_action(
        &self,
        kind: DecisionKind,
        symbol: Option<String>,
        leverage: Option<f64>,
        map: &Map<String, Value>,
        warnings: &mut Vec<ParserWarning>,
    ) -> TradeAction {
        let size_usd = number_field(map, SIZE_KEYS, warnings).filter(|v| *v > 0.0);
        let stop_loss = number_field(map, STOP_KEYS, warnings).filter(|v| *v > 0.0);
        let take_profit = number_field(map, TARGET_KEYS, warnings).filter(|v| *v > 0.0);
        let risk_reward = number_field(map, RISK_REWARD_KEYS, warnings).filter(|v| *v > 0.0);

        match (symbol, leverage, size_usd, stop_loss, take_profit) {
            (Some(symbol), Some(leverage), Some(size_usd), Some(stop_loss), Some(take_profit)) => {
                let order = EntryOrder {
                    symbol,
                    leverage,
                    size_usd,
                    stop_loss,
                    take_profit,
                    risk_reward,
                };
                if kind == DecisionKind::OpenShort {
                    TradeAction::OpenShort(order)
                } else {
                    TradeAction::OpenLong(order)
                }
            }
            (symbol, leverage, size_usd, stop_loss, take_profit) => {
                let missing: Vec<&str> = [
                    ("symbol", symbol.is_none()),
                    ("leverage", leverage.is_none()),
                    ("size_usd", size_usd.is_none()),
                    ("stop_loss", stop_loss.is_none()),
                    ("take_profit", take_profit.is_none()),
                ]
                .iter()
                .filter(|(_, absent)| *absent)
                .map(|(name, _)| *name)
                .collect();
                warnings.push(ParserWarning::new(
                    WarningKind::MissingOrderFields,
                    format!("{} missing or invalid {}; forced to HOLD", kind, missing.join(", ")),
                ));
                TradeAction::Hold
            }
        }
    }

    fn symbol(&self, map: &Map<String, Value>, key_symbol: Option<&str>, warnings: &mut Vec<ParserWarning>) -> SymbolField {
        let raw = match string_field(map, SYMBOL_KEYS).or_else(|| key_symbol.map(str::to_string)) {
            Some(raw) => raw,
            None => return SymbolField::Missing,
        };

        match self.universe.normalize(&raw) {
            Some(symbol) => {
                if symbol != raw {
                    warnings.push(
                        ParserWarning::new(
                            WarningKind::SymbolCorrected,
                            format!("Symbol {:?} normalised to {}", raw, symbol),
                        )
                        .with_values(raw.as_str(), symbol.as_str()),
                    );
                }
                SymbolField::Valid(symbol)
            }
            None => {
                warnings.push(
                    ParserWarning::new(
                        WarningKind::SymbolCorrected,
                        format!("Symbol {:?} is not tradable; cleared and forced to HOLD", raw),
                    )
                    .with_values(raw.as_str(), Value::Null),
                );
                SymbolField::Invalid
            }
        }
    }
}

fn decision_kind(map: &Map<String, Value>, warnings: &mut Vec<ParserWarning>) -> DecisionKind {
    let Some(raw) = string_field(map, DECISION_KEYS) else {
        warnings.push(ParserWarning::new(
            WarningKind::UnknownDecision,
            "No decision field; defaulting to HOLD",
        ));
        return DecisionKind::Hold;
    };

    match normalize_verb(&raw) {
        Some(kind) => {
            if kind.as_str() != raw {
                warnings.push(
                    ParserWarning::new(
                        WarningKind::DecisionNormalized,
                        format!("Decision {:?} read as {}", raw, kind),
                    )
                    .with_values(raw.as_str(), kind.as_str()),
                );
            }
            kind
        }
        None => {
            warnings.push(
                ParserWarning::new(
                    WarningKind::UnknownDecision,
                    format!("Unknown decision {:?}; defaulting to HOLD", raw),
                )
                .with_values(raw.as_str(), "HOLD"),
            );
            DecisionKind::Hold
        }
    }
}

/// Map the many ways a model spells a decision onto the four verbs.
pub fn normalize_verb(raw: &str) -> Option<DecisionKind> {
    let canon = raw.trim().to_uppercase().replace([' ', '-', '/'], "_");
    match canon.as_str() {
        "OPEN_LONG" | "LONG" | "BUY" | "GO_LONG" | "ENTER_LONG" => Some(DecisionKind::OpenLong),
        "OPEN_SHORT" | "SHORT" | "GO_SHORT" | "ENTER_SHORT" => Some(DecisionKind::OpenShort),
        "CLOSE" | "EXIT" | "CLOSE_POSITION" | "CLOSE_LONG" | "CLOSE_SHORT" | "EXIT_POSITION" => {
            Some(DecisionKind::Close)
        }
        "HOLD" | "WAIT" | "NONE" | "NO_TRADE" | "NO_ACTION" => Some(DecisionKind::Hold),
        _ => None,
    }
}

fn confidence(map: &Map<String, Value>, warnings: &mut Vec<ParserWarning>) -> f64 {
    let Some(value) = number_field(map, CONFIDENCE_KEYS, warnings) else {
        warnings.push(
            ParserWarning::new(
                WarningKind::ConfidenceCorrected,
                format!("Confidence missing, using {}", DEFAULT_CONFIDENCE),
            )
            .with_values(Value::Null, DEFAULT_CONFIDENCE),
        );
        return DEFAULT_CONFIDENCE;
    };

    let corrected = if (0.0..=1.0).contains(&value) {
        return value;
    } else if value > 1.0 && value <= 100.0 {
        value / 100.0
    } else {
        value.clamp(0.0, 1.0)
    };
    warnings.push(
        ParserWarning::new(
            WarningKind::ConfidenceCorrected,
            format!("Confidence {} out of range, using {}", value, corrected),
        )
        .with_values(value, corrected),
    );
    corrected
}

/// First non-empty string under any of `keys`.
fn string_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .find_map(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// First finite number under any of `keys`, without coercion warnings.
fn number_value(map: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .find_map(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => coerce_number(s),
            _ => None,
        })
        .filter(|v| v.is_finite())
}

/// Like [`number_value`] but records a warning when a string had to be coerced.
fn number_field(map: &Map<String, Value>, keys: &[&str], warnings: &mut Vec<ParserWarning>) -> Option<f64> {
    let (key, value) = keys.iter().find_map(|k| map.get(*k).map(|v| (*k, v)))?;
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => {
            let parsed = coerce_number(s)?;
            warnings.push(
                ParserWarning::new(WarningKind::ValueCoerced, format!("{} {:?} read as {}", key, s, parsed))
                    .with_values(s.as_str(), parsed),
            );
            Some(parsed)
        }
        _ => None,
    }
}

/// `"5x"`, `"$1,000"`, `"80%"`, `" 2.5 "` to numbers.
pub fn coerce_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '_' | ' '))
        .collect();
    let cleaned = cleaned.trim_end_matches(['x', 'X', '%']);
    let cleaned = cleaned
        .strip_suffix("USDT")
        .or_else(|| cleaned.strip_suffix("USD"))
        .unwrap_or(cleaned);
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
