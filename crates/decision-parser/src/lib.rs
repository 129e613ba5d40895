//! Recovery of a typed trade decision from unreliable language-model output.

pub mod extract;
pub mod parser;
pub mod repair;
pub mod types;


pub use parser::DecisionParser;
pub use types::*;
