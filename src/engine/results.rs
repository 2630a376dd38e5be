// 8.0.2: result types and errors for engine operations.

use crate::config::ConfigError;
use crate::ledger::{FillReport, FundingSettlement, LedgerError, VenueLedger};
use crate::market::MarketError;
use crate::position::PositionError;
use crate::signal::SignalError;
use crate::trade::{TradeError, TradeIntent};
use crate::types::{Asset, Price, Quote, Timestamp, Venue};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: Timestamp,
    pub equity: Quote,
}

/// Both legs of one executed intent. A starved intent has no legs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub intent: TradeIntent,
    pub filled_quantity: Decimal,
    pub buy_price: Price,
    pub sell_price: Price,
    pub legs: Option<(FillReport, FillReport)>,
}

impl ExecutionReport {
    pub fn is_filled(&self) -> bool {
        self.legs.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct StepResult {
    pub timestamp: Timestamp,
    pub funding: Vec<FundingSettlement>,
    pub executions: Vec<ExecutionReport>,
    pub excess_executions: Vec<ExecutionReport>,
    pub skipped: Vec<Asset>,
    pub equity: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub venue: Venue,
    pub cash: Quote,
    pub fees_paid: Quote,
    pub realized_pnl: Quote,
    pub funding_received: Quote,
}

impl From<&VenueLedger> for LedgerSummary {
    fn from(ledger: &VenueLedger) -> Self {
        Self {
            venue: ledger.venue,
            cash: ledger.cash,
            fees_paid: ledger.fees_paid,
            realized_pnl: ledger.realized_pnl,
            funding_received: ledger.funding_received,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub equity_curve: Vec<EquityPoint>,
    pub ledgers: [LedgerSummary; 2],
    pub steps: usize,
    pub fills: usize,
    pub funding_settlements: usize,
    pub events_emitted: u64,
}

impl BacktestResult {
    pub fn final_equity(&self) -> Option<Quote> {
        self.equity_curve.last().map(|p| p.equity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("{0}")]
    Ledger(#[from] LedgerError),

    #[error("{0}")]
    Market(#[from] MarketError),

    #[error("{0}")]
    Trade(#[from] TradeError),

    #[error("{0}")]
    Signal(#[from] SignalError),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("invalid input: timestamp {current} does not follow {previous}")]
    NonIncreasingTimestamp { previous: Timestamp, current: Timestamp },

    #[error("invalid input: snapshot for {found} supplied at step {expected}")]
    SnapshotMismatch { expected: Timestamp, found: Timestamp },

    #[error("invalid input: {venue} volume for {asset} is {volume}")]
    NegativeVolume { asset: Asset, venue: Venue, volume: Decimal },

    #[error("invalid input: slippage pushes the {venue} sell price for {asset} to {price}")]
    NonPositiveFillPrice { asset: Asset, venue: Venue, price: Decimal },

    #[error("invalid input: slipped fill price for {asset} buying on {buy_venue} overflows")]
    FillPriceOverflow { asset: Asset, buy_venue: Venue },
}

impl From<PositionError> for EngineError {
    fn from(err: PositionError) -> Self {
        EngineError::Ledger(LedgerError::InvariantViolation(err))
    }
}

impl EngineError {
    pub fn is_missing_market_data(&self) -> bool {
        matches!(
            self,
            EngineError::Market(MarketError::MissingMarketData { .. } | MarketError::MissingTimestamp(_))
                | EngineError::Ledger(LedgerError::Market(
                    MarketError::MissingMarketData { .. } | MarketError::MissingTimestamp(_)
                ))
        )
    }
}
