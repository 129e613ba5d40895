pub mod aggregator;
pub mod divergence;
pub mod entry_signals;
pub mod indicators;
pub mod levels;
pub mod overview;
pub mod positions;
pub mod regime;
pub mod risk;
pub mod trend;


pub use aggregator::*;
pub use divergence::*;
pub use entry_signals::*;
pub use levels::*;
pub use overview::*;
pub use positions::*;
pub use regime::*;
pub use risk::*;
pub use trend::*;
