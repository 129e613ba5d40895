use serde::{Deserialize, Serialize};
use serde_json::Value;
use signal_core::Direction;
use std::fmt;

/// Order parameters that every OPEN decision must carry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryOrder {
    pub symbol: String,
    /// Always >= 1
    pub leverage: f64,
    /// Position size in quote currency
    pub size_usd: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_reward: Option<f64>,
}

/// What the model asked for, in a shape that cannot be half-valid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeAction {
    Hold,
    OpenLong(EntryOrder),
    OpenShort(EntryOrder),
    Close { symbol: String },
}

/// Decision verb without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionKind {
    Hold,
    OpenLong,
    OpenShort,
    Close,
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionKind::Hold => "HOLD",
            DecisionKind::OpenLong => "OPEN_LONG",
            DecisionKind::OpenShort => "OPEN_SHORT",
            DecisionKind::Close => "CLOSE",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, DecisionKind::OpenLong | DecisionKind::OpenShort)
    }
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TradeAction {
    pub fn kind(&self) -> DecisionKind {
        match self {
            TradeAction::Hold => DecisionKind::Hold,
            TradeAction::OpenLong(_) => DecisionKind::OpenLong,
            TradeAction::OpenShort(_) => DecisionKind::OpenShort,
            TradeAction::Close { .. } => DecisionKind::Close,
        }
    }

    pub fn symbol(&self) -> Option<&str> {
        match self {
            TradeAction::Hold => None,
            TradeAction::OpenLong(order) | TradeAction::OpenShort(order) => Some(&order.symbol),
            TradeAction::Close { symbol } => Some(symbol),
        }
    }

    /// Entry side for OPEN decisions
    pub fn direction(&self) -> Option<Direction> {
        match self {
            TradeAction::OpenLong(_) => Some(Direction::Long),
            TradeAction::OpenShort(_) => Some(Direction::Short),
            _ => None,
        }
    }

    pub fn order(&self) -> Option<&EntryOrder> {
        match self {
            TradeAction::OpenLong(order) | TradeAction::OpenShort(order) => Some(order),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningKind {
    /// Object had to be cut out of surrounding text
    JsonExtracted,
    JsonRepaired,
    LeverageCorrected,
    SymbolCorrected,
    ConfidenceCorrected,
    DecisionNormalized,
    ValueCoerced,
    MissingOrderFields,
    UnknownDecision,
    PerSymbolReduced,
    ParseFailed,
}

/// One automatic correction, kept for audit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParserWarning {
    #[serde(rename = "type")]
    pub kind: WarningKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected: Option<Value>,
}

impl ParserWarning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            original: None,
            corrected: None,
        }
    }

    pub fn with_values(mut self, original: impl Into<Value>, corrected: impl Into<Value>) -> Self {
        self.original = Some(original.into());
        self.corrected = Some(corrected.into());
        self
    }
}

/// Final output of the parser. Always well-formed, whatever the model wrote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeDecision {
    #[serde(flatten)]
    pub action: TradeAction,
    /// 0.0 to 1.0
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default)]
    pub warnings: Vec<ParserWarning>,
}

impl TradeDecision {
    /// HOLD used whenever nothing usable can be recovered
    pub fn safe_hold(reasoning: impl Into<String>) -> Self {
        Self {
            action: TradeAction::Hold,
            confidence: 0.5,
            reasoning: reasoning.into(),
            warnings: Vec::new(),
        }
    }

    pub fn kind(&self) -> DecisionKind {
        self.action.kind()
    }

    pub fn symbol(&self) -> Option<&str> {
        self.action.symbol()
    }

    pub fn is_hold(&self) -> bool {
        self.kind() == DecisionKind::Hold
    }

    pub fn has_warning(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }

    pub fn warning(&self, kind: WarningKind) -> Option<&ParserWarning> {
        self.warnings.iter().find(|w| w.kind == kind)
    }
}
