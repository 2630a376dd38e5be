//! Execution simulation.
//!
//! Fills both legs of an intent with the same quantity, capped by a fraction of
//! the thinner venue's traded volume, at slippage-adjusted perp prices. Both
//! legs are previewed before either is committed, so an invariant violation
//! on one leg never leaves the other half-applied.

use super::book::Book;
use super::results::{EngineError, ExecutionReport};
use crate::market::MarketSnapshot;
use crate::trade::{Trade, TradeIntent};
use crate::types::{Price, Side};
use rust_decimal::Decimal;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ExecutionSimulator {
    slippage: Decimal,
    max_participation_rate: Decimal,
}

impl ExecutionSimulator {
    pub fn new(slippage: Decimal, max_participation_rate: Decimal) -> Self {
        Self {
            slippage,
            max_participation_rate,
        }
    }

    // 8.5.1: fill capacity for one intent this step
    pub fn available_quantity(&self, buy_volume: Decimal, sell_volume: Decimal) -> Decimal {
        buy_volume.min(sell_volume) * self.max_participation_rate
    }

    // 8.5.2: both legs pay slippage against the taker. None when a price does not fit
    pub fn fill_prices(&self, buy_price: Price, sell_price: Price) -> Option<(Decimal, Decimal)> {
        Some((
            buy_price.value().checked_mul(Decimal::ONE + self.slippage)?,
            sell_price.value().checked_mul(Decimal::ONE - self.slippage)?,
        ))
    }

    pub fn simulate(
        &self,
        snapshot: &MarketSnapshot,
        intents: &[TradeIntent],
        book: &mut Book,
    ) -> Result<Vec<ExecutionReport>, EngineError> {
        intents
            .iter()
            .map(|intent| self.execute(snapshot, intent, book))
            .collect()
    }

    fn execute(
        &self,
        snapshot: &MarketSnapshot,
        intent: &TradeIntent,
        book: &mut Book,
    ) -> Result<ExecutionReport, EngineError> {
        let asset = intent.asset();
        let buy_quote = snapshot.quote(asset, intent.buy_venue())?;
        let sell_quote = snapshot.quote(asset, intent.sell_venue())?;

        for (venue, volume) in [
            (intent.buy_venue(), buy_quote.volume),
            (intent.sell_venue(), sell_quote.volume),
        ] {
            if volume < Decimal::ZERO {
                return Err(EngineError::NegativeVolume {
                    asset: asset.clone(),
                    venue,
                    volume,
                });
            }
        }

        let available = self.available_quantity(buy_quote.volume, sell_quote.volume);
        let filled_quantity = intent.quantity().min(available);
        let (buy_price, sell_price) = self
            .fill_prices(buy_quote.perp_price, sell_quote.perp_price)
            .ok_or_else(|| EngineError::FillPriceOverflow {
                asset: asset.clone(),
                buy_venue: intent.buy_venue(),
            })?;

        let sell_price = Price::new(sell_price).ok_or_else(|| EngineError::NonPositiveFillPrice {
            asset: asset.clone(),
            venue: intent.sell_venue(),
            price: sell_price,
        })?;
        let buy_price = Price::new_unchecked(buy_price);

        if filled_quantity.is_zero() {
            debug!(
                asset = %asset,
                buy_venue = %intent.buy_venue(),
                sell_venue = %intent.sell_venue(),
                "no volume to fill intent"
            );
            return Ok(ExecutionReport {
                intent: intent.clone(),
                filled_quantity,
                buy_price,
                sell_price,
                legs: None,
            });
        }

        let buy = Trade::new(asset.clone(), filled_quantity, Side::Buy, buy_price.value())?;
        let sell = Trade::new(asset.clone(), filled_quantity, Side::Sell, sell_price.value())?;

        let (buy_ledger, sell_ledger) = book.legs_mut(intent.buy_venue());
        let buy_update = buy_ledger.preview_trade(&buy)?;
        let sell_update = sell_ledger.preview_trade(&sell)?;
        let buy_fill = buy_ledger.commit(&buy, buy_update);
        let sell_fill = sell_ledger.commit(&sell, sell_update);

        Ok(ExecutionReport {
            intent: intent.clone(),
            filled_quantity,
            buy_price,
            sell_price,
            legs: Some((buy_fill, sell_fill)),
        })
    }
}
