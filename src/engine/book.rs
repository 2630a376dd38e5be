// 8.4 engine/book.rs: the strategy aggregate. exactly two ledgers plus the
// append-only equity curve. the only thing allowed to mutate either ledger.

use super::results::{EngineError, EquityPoint};
use crate::config::StrategyConfig;
use crate::ledger::{FundingSettlement, VenueLedger};
use crate::market::MarketSnapshot;
use crate::types::{Quote, Timestamp, Venue};

#[derive(Debug, Clone)]
pub struct Book {
    binance: VenueLedger,
    hyperliquid: VenueLedger,
    equity_curve: Vec<EquityPoint>,
}

impl Book {
    pub fn new(binance: VenueLedger, hyperliquid: VenueLedger) -> Self {
        debug_assert_eq!(binance.venue, Venue::Binance);
        debug_assert_eq!(hyperliquid.venue, Venue::Hyperliquid);
        Self {
            binance,
            hyperliquid,
            equity_curve: Vec::new(),
        }
    }

    pub fn from_config(config: &StrategyConfig) -> Self {
        Self::new(
            VenueLedger::from_config(Venue::Binance, config),
            VenueLedger::from_config(Venue::Hyperliquid, config),
        )
    }

    pub fn ledger(&self, venue: Venue) -> &VenueLedger {
        match venue {
            Venue::Binance => &self.binance,
            Venue::Hyperliquid => &self.hyperliquid,
        }
    }

    // (binance, hyperliquid), the argument order every risk hook takes
    pub fn ledgers(&self) -> (&VenueLedger, &VenueLedger) {
        (&self.binance, &self.hyperliquid)
    }

    // both legs of an intent at once. buy and sell are always different venues.
    pub(crate) fn legs_mut(&mut self, buy_venue: Venue) -> (&mut VenueLedger, &mut VenueLedger) {
        match buy_venue {
            Venue::Binance => (&mut self.binance, &mut self.hyperliquid),
            Venue::Hyperliquid => (&mut self.hyperliquid, &mut self.binance),
        }
    }

    // 8.4.1: funding for both venues, reference venue first
    pub fn accrue_funding(
        &mut self,
        timestamp: Timestamp,
        snapshot: &MarketSnapshot,
    ) -> Result<Vec<FundingSettlement>, EngineError> {
        let mut settlements = self.binance.accrue_funding(timestamp, snapshot)?;
        settlements.extend(self.hyperliquid.accrue_funding(timestamp, snapshot)?);
        Ok(settlements)
    }

    pub fn equity(&self, snapshot: &MarketSnapshot) -> Result<(Quote, Quote), EngineError> {
        Ok((
            self.binance.mark_to_market(snapshot)?,
            self.hyperliquid.mark_to_market(snapshot)?,
        ))
    }

    // 8.4.2: marks both ledgers and appends one point. timestamps must strictly increase.
    pub fn mark_to_market(&mut self, timestamp: Timestamp, snapshot: &MarketSnapshot) -> Result<Quote, EngineError> {
        if let Some(last) = self.equity_curve.last() {
            if timestamp <= last.timestamp {
                return Err(EngineError::NonIncreasingTimestamp {
                    previous: last.timestamp,
                    current: timestamp,
                });
            }
        }

        let (binance, hyperliquid) = self.equity(snapshot)?;
        let total = binance.add(hyperliquid);
        self.equity_curve.push(EquityPoint {
            timestamp,
            equity: total,
        });
        Ok(total)
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }
}
