// 13.0: target exposure. the engine consumes one asset -> target notional map per
// step and treats it as authoritative. 13.1 is the reference threshold signal,
// 13.2 the linear sizing rule, 13.3 a precomputed schedule built from market data.

use crate::config::StrategyConfig;
use crate::market::{MarketDataProvider, MarketError};
use crate::types::{Asset, Timestamp};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

// signed target notional on the reference venue, per asset. BTreeMap keeps the
// iteration order, and with it the intent order, reproducible.
pub type TargetNotionals = BTreeMap<Asset, Decimal>;

pub trait TargetProvider {
    /// The signal index. The backtest runs one step per entry.
    fn timestamps(&self) -> Vec<Timestamp>;

    fn targets(&self, timestamp: Timestamp) -> Result<TargetNotionals, SignalError>;
}

// 13.1: +1 long the reference venue when the other venue's funding is richer than
// the edge, -1 when it is cheaper, 0 in between. predicts next spread = last spread.
pub fn threshold_signal(funding_spread: Decimal, edge_threshold: Decimal) -> Decimal {
    if funding_spread > edge_threshold {
        Decimal::ONE
    } else if funding_spread < -edge_threshold {
        Decimal::NEGATIVE_ONE
    } else {
        Decimal::ZERO
    }
}

// 13.2: equal weight per signal, clipped to the position cap
pub fn linear_size(signal: Decimal, notional_per_trade: Decimal, max_position_size: Decimal) -> Decimal {
    (signal * notional_per_trade).max(-max_position_size).min(max_position_size)
}

// 13.3
#[derive(Debug, Clone, Default)]
pub struct SignalSchedule {
    rows: BTreeMap<Timestamp, TargetNotionals>,
}

impl SignalSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, timestamp: Timestamp, targets: TargetNotionals) {
        self.rows.insert(timestamp, targets);
    }

    // threshold signal + linear sizing over every timestamp the market can serve
    pub fn build<M: MarketDataProvider>(market: &M, config: &StrategyConfig) -> Result<Self, MarketError> {
        let mut schedule = Self::new();
        for timestamp in market.timestamps() {
            let snapshot = market.snapshot(timestamp)?;
            let mut targets = TargetNotionals::new();
            for asset in &config.assets {
                let spread = snapshot.asset(asset)?.funding_spread();
                let signal = threshold_signal(spread, config.edge_threshold);
                targets.insert(
                    asset.clone(),
                    linear_size(signal, config.notional_per_trade, config.max_position_size),
                );
            }
            schedule.insert(timestamp, targets);
        }
        Ok(schedule)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl TargetProvider for SignalSchedule {
    fn timestamps(&self) -> Vec<Timestamp> {
        self.rows.keys().copied().collect()
    }

    fn targets(&self, timestamp: Timestamp) -> Result<TargetNotionals, SignalError> {
        self.rows
            .get(&timestamp)
            .cloned()
            .ok_or(SignalError::MissingTargets(timestamp))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignalError {
    #[error("no target notionals for {0}")]
    MissingTargets(Timestamp),
}
