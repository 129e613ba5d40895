//! Orchestration around the signal engine and decision parser: configuration,
//! the model gateway, prompt assembly, the trend guard and the decision cycle.

pub mod config;
pub mod decision_cycle;
pub mod model_gateway;
pub mod prompt;
pub mod replay;
pub mod trend_guard;


pub use config::AgentConfig;
pub use decision_cycle::{CycleOutcome, DecisionCycle};
pub use model_gateway::{RetryPolicy, RetryingModel};
pub use trend_guard::{TrendGuard, TrendVerdict};
