//! Per-venue cash and position ledger.
//!
//! Each venue gets its own ledger holding cash and one position record per
//! tradable asset. Cash moves only through trade settlement (notional, fee and
//! realized PnL) or funding settlement; every other method is a read.

use crate::config::StrategyConfig;
use crate::funding::{calculate_funding_payment, is_settlement_due};
use crate::market::{MarketError, MarketSnapshot};
use crate::position::{apply_fill, PositionError, PositionRecord, PositionUpdate, Transition};
use crate::trade::Trade;
use crate::types::{Asset, Price, Quote, Side, Timestamp, Venue};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueLedger {
    pub venue: Venue,
    pub cash: Quote,
    pub fee_rate: Decimal,
    pub funding_modifier: Decimal,
    positions: BTreeMap<Asset, PositionRecord>,
    // last settled funding point per asset, so a repeated call is a no-op
    last_funding: BTreeMap<Asset, Timestamp>,
    pub fees_paid: Quote,
    pub realized_pnl: Quote,
    pub funding_received: Quote,
}

/// Outcome of one trade applied to a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillReport {
    pub venue: Venue,
    pub asset: Asset,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Price,
    pub fee: Quote,
    pub realized_pnl: Quote,
    pub transition: Transition,
    pub position_after: PositionRecord,
}

/// One funding settlement credited or debited to a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingSettlement {
    pub venue: Venue,
    pub asset: Asset,
    pub timestamp: Timestamp,
    pub funding_rate: Decimal,
    pub payment: Quote,
}

impl VenueLedger {
    pub fn new(venue: Venue, cash: Quote, fee_rate: Decimal, funding_modifier: Decimal, assets: &[Asset]) -> Self {
        Self {
            venue,
            cash,
            fee_rate,
            funding_modifier,
            positions: assets.iter().map(|a| (a.clone(), PositionRecord::Flat)).collect(),
            last_funding: BTreeMap::new(),
            fees_paid: Quote::zero(),
            realized_pnl: Quote::zero(),
            funding_received: Quote::zero(),
        }
    }

    pub fn from_config(venue: Venue, config: &StrategyConfig) -> Self {
        Self::new(
            venue,
            Quote::new(config.capital_per_venue()),
            config.venue(venue).fee_rate,
            config.funding_modifier(venue),
            &config.assets,
        )
    }

    pub fn position(&self, asset: &Asset) -> Option<&PositionRecord> {
        self.positions.get(asset)
    }

    pub fn positions(&self) -> impl Iterator<Item = (&Asset, &PositionRecord)> {
        self.positions.iter()
    }

    // open positions only
    pub fn open_positions(&self) -> impl Iterator<Item = (&Asset, &PositionRecord)> {
        self.positions.iter().filter(|(_, record)| !record.is_flat())
    }

    pub fn fee_for(&self, trade: &Trade) -> Quote {
        trade.notional().mul(self.fee_rate)
    }

    // 10.1: position math for `trade` without touching the ledger
    pub fn preview_trade(&self, trade: &Trade) -> Result<PositionUpdate, LedgerError> {
        let record = self.positions.get(trade.asset()).ok_or_else(|| LedgerError::UnknownAsset {
            venue: self.venue,
            asset: trade.asset().clone(),
        })?;
        Ok(apply_fill(record, trade.side(), trade.quantity(), trade.price())?)
    }

    // 10.2: fee, then signed notional, then realized pnl. the position record is
    // replaced wholesale so a failed preview leaves the ledger untouched.
    pub fn apply_trade(&mut self, trade: &Trade) -> Result<FillReport, LedgerError> {
        let update = self.preview_trade(trade)?;
        Ok(self.commit(trade, update))
    }

    pub(crate) fn commit(&mut self, trade: &Trade, update: PositionUpdate) -> FillReport {
        let fee = self.fee_for(trade);

        self.cash = self.cash.sub(fee);
        self.cash = self.cash.sub(trade.signed_notional());
        self.cash = self.cash.add(update.realized_pnl);

        self.fees_paid = self.fees_paid.add(fee);
        self.realized_pnl = self.realized_pnl.add(update.realized_pnl);
        self.positions.insert(trade.asset().clone(), update.record);

        debug!(
            venue = %self.venue,
            asset = %trade.asset(),
            side = %trade.side(),
            quantity = %trade.quantity(),
            price = %trade.price(),
            fee = %fee,
            realized = %update.realized_pnl,
            transition = ?update.transition,
            "trade applied"
        );

        FillReport {
            venue: self.venue,
            asset: trade.asset().clone(),
            side: trade.side(),
            quantity: trade.quantity(),
            price: trade.price(),
            fee,
            realized_pnl: update.realized_pnl,
            transition: update.transition,
            position_after: update.record,
        }
    }

    // 10.3: settle funding for every open position whose scheduled funding point
    // on this venue is exactly `timestamp`. flat positions never touch the snapshot.
    pub fn accrue_funding(
        &mut self,
        timestamp: Timestamp,
        snapshot: &MarketSnapshot,
    ) -> Result<Vec<FundingSettlement>, LedgerError> {
        let mut settlements = Vec::new();

        for (asset, record) in &self.positions {
            if record.is_flat() {
                continue;
            }

            let quote = snapshot.quote(asset, self.venue)?;
            if !is_settlement_due(timestamp, quote.next_funding_time) {
                continue;
            }
            if self.last_funding.get(asset) == Some(&timestamp) {
                continue;
            }

            let payment = calculate_funding_payment(
                record.size(),
                quote.mark_price,
                quote.funding_rate,
                self.funding_modifier,
            );

            settlements.push(FundingSettlement {
                venue: self.venue,
                asset: asset.clone(),
                timestamp,
                funding_rate: quote.funding_rate,
                payment,
            });
        }

        for settlement in &settlements {
            self.cash = self.cash.add(settlement.payment);
            self.funding_received = self.funding_received.add(settlement.payment);
            self.last_funding.insert(settlement.asset.clone(), timestamp);

            debug!(
                venue = %self.venue,
                asset = %settlement.asset,
                rate = %settlement.funding_rate,
                payment = %settlement.payment,
                "funding settled"
            );
        }

        Ok(settlements)
    }

    // 10.4: cash + sum(quantity * mark). every tracked asset must be priced.
    pub fn mark_to_market(&self, snapshot: &MarketSnapshot) -> Result<Quote, LedgerError> {
        let mut equity = self.cash;
        for (asset, record) in &self.positions {
            let quote = snapshot.quote(asset, self.venue)?;
            equity = equity.add(record.market_value(quote.mark_price));
        }
        Ok(equity)
    }

    pub fn unrealized_pnl(&self, snapshot: &MarketSnapshot) -> Result<Quote, LedgerError> {
        let mut total = Quote::zero();
        for (asset, record) in self.open_positions() {
            let quote = snapshot.quote(asset, self.venue)?;
            total = total.add(record.unrealized_pnl(quote.mark_price));
        }
        Ok(total)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("{0}")]
    InvariantViolation(#[from] PositionError),

    #[error("invalid input: {asset} is not tracked on {venue}")]
    UnknownAsset { venue: Venue, asset: Asset },

    #[error("{0}")]
    Market(#[from] MarketError),
}
