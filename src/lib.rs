// funding-arb: cross-venue funding rate arbitrage backtester.
// one book, two perpetual venues, hedged positions opened on one and closed on
// the other. all computation is deterministic; file I/O lives in data and report.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: Asset, Venue, Side, Price, Quote, SignedSize
//   2.x  trade.rs: single-venue trades and paired cross-venue intents
//   3.x  position.rs: flat/open record, extend/close/flip/reduce transitions
//   5.x  funding.rs: interval modifier, settlement payment, schedule check
//   6.x  risk.rs: pre-trade vetting and excess-risk hooks
//   7.x  config.rs: capital, fees, execution, sizing, report params
//   8.x  engine/: backtest driver, intents, execution simulator, book
//   9.x  data.rs: historical CSV loader, market data provider
//   10.x ledger.rs: per-venue cash, positions, funding and marking
//   11.x events.rs: state transition events for audit
//   12.x market.rs: per-timestamp market snapshots
//   13.x signal.rs: threshold signal, linear sizing, target schedule
//   14.x report.rs: sharpe, drawdown, annualized return, output files

// core modules
pub mod engine;
pub mod events;
pub mod funding;
pub mod ledger;
pub mod market;
pub mod position;
pub mod trade;
pub mod types;

// strategy modules
pub mod risk;
pub mod signal;

// integration modules
pub mod config;
pub mod data;
pub mod report;

// re exports for convenience
pub use engine::*;
pub use events::*;
pub use funding::*;
pub use ledger::*;
pub use market::*;
pub use position::*;
pub use risk::*;
pub use signal::*;
pub use trade::*;
pub use types::*;
pub use config::{ConfigError, StrategyConfig, VenueConfig};
pub use data::{DataError, HistoricalData};
pub use report::{Report, ReportError};
