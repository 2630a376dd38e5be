// 8.0: backtest engine. funding, intent generation, execution and marking for
// one two-venue book, one step per signal timestamp.
// deterministic and sequential with no external I/O.

mod book;
mod core;
mod execution;
mod intents;
mod results;

pub use book::Book;
pub use core::Backtest;
pub use execution::ExecutionSimulator;
pub use intents::{GeneratedIntents, IntentGenerator};
pub use results::{BacktestResult, EngineError, EquityPoint, ExecutionReport, LedgerSummary, StepResult};
