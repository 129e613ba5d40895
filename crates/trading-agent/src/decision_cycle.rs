use std::sync::Arc;

use chrono::{DateTime, Utc};
use decision_parser::{DecisionParser, ParserWarning, TradeAction, TradeDecision, WarningKind};
use serde::Serialize;
use signal_core::{
    CoinSignalSummary, IndicatorSnapshot, LanguageModel, MarketDataProvider, MarketOverview, OpenPosition,
    PositionSignals, TradingUniverse,
};
use signal_engine::{evaluate_positions, market_overview, SignalAggregator};

use crate::prompt::{build_prompt, system_prompt};
use crate::trend_guard::{TrendGuard, TrendVerdict};

/// Everything produced by one evaluation tick, kept for audit
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleOutcome {
    pub generated_at: DateTime<Utc>,
    pub summaries: Vec<CoinSignalSummary>,
    pub overview: MarketOverview,
    pub positions: Vec<PositionSignals>,
    /// What goes to execution
    pub decision: TradeDecision,
    /// The model's decision when the guard replaced it
    pub proposed: Option<TradeDecision>,
    pub guard: Option<TrendVerdict>,
    pub model_error: Option<String>,
}

impl CycleOutcome {
    pub fn vetoed(&self) -> bool {
        self.guard.as_ref().is_some_and(|v| !v.allowed)
    }
}

pub struct DecisionCycle {
    provider: Arc<dyn MarketDataProvider>,
    model: Arc<dyn LanguageModel>,
    aggregator: SignalAggregator,
    parser: DecisionParser,
    guard: TrendGuard,
    universe: TradingUniverse,
}

impl DecisionCycle {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        model: Arc<dyn LanguageModel>,
        universe: TradingUniverse,
        guard_min_strength: u8,
    ) -> Self {
        Self {
            guard: TrendGuard::new(provider.clone(), guard_min_strength),
            parser: DecisionParser::new(universe.clone()),
            aggregator: SignalAggregator::new(),
            provider,
            model,
            universe,
        }
    }

    pub async fn run(&self, positions: &[OpenPosition]) -> CycleOutcome {
        let snapshots = self.fetch_snapshots(positions).await;
        tracing::info!("Analyzing {} symbols", snapshots.len());

        let summaries = self.aggregator.analyze_all(&snapshots);
        let position_signals = evaluate_positions(positions, &summaries);
        let overview = market_overview(&summaries, &self.universe);

        for p in position_signals.iter().filter(|p| p.should_close) {
            tracing::info!(
                "{} {} flagged for close: {}",
                p.symbol,
                p.side,
                p.close_reason.as_deref().unwrap_or("")
            );
        }

        let prompt = build_prompt(&summaries, &overview, &position_signals);
        let system = system_prompt(&self.universe);

        let (parsed, model_error) = match self.model.complete(&system, &prompt).await {
            Ok(reply) => (self.parser.parse(&reply), None),
            Err(e) => {
                tracing::error!("Model {} failed: {}", self.model.model_name(), e);
                let mut hold = TradeDecision::safe_hold(format!("Model call failed: {}", e));
                hold.warnings.push(ParserWarning::new(
                    WarningKind::ParseFailed,
                    format!("No model reply to parse: {}", e),
                ));
                (hold, Some(e.to_string()))
            }
        };

        let guard = self.guard.check(&parsed).await;
        let (decision, proposed) = match &guard {
            Some(verdict) if !verdict.allowed => (veto_to_hold(&parsed, verdict), Some(parsed)),
            _ => (parsed, None),
        };

        tracing::info!(
            "Decision: {} {} (confidence {:.2}, {} warnings)",
            decision.kind(),
            decision.symbol().unwrap_or("-"),
            decision.confidence,
            decision.warnings.len()
        );

        CycleOutcome {
            generated_at: Utc::now(),
            summaries,
            overview,
            positions: position_signals,
            decision,
            proposed,
            guard,
            model_error,
        }
    }

    /// Universe symbols first, then any position symbol outside it.
    async fn fetch_snapshots(&self, positions: &[OpenPosition]) -> Vec<IndicatorSnapshot> {
        let mut symbols: Vec<String> = self.universe.symbols().to_vec();
        for p in positions {
            if !symbols.contains(&p.symbol) {
                symbols.push(p.symbol.clone());
            }
        }

        let mut snapshots = Vec::with_capacity(symbols.len());
        for (symbol, result) in self.provider.snapshots(&symbols).await {
            match result {
                Ok(Some(snapshot)) => snapshots.push(snapshot),
                Ok(None) => tracing::warn!("No market data for {}, skipping", symbol),
                Err(e) => tracing::warn!("Market data for {} failed: {}", symbol, e),
            }
        }
        snapshots
    }
}

fn veto_to_hold(decision: &TradeDecision, verdict: &TrendVerdict) -> TradeDecision {
    TradeDecision {
        action: TradeAction::Hold,
        confidence: decision.confidence,
        reasoning: format!("Vetoed by trend guard: {}", verdict.reason),
        warnings: decision.warnings.clone(),
    }
}
