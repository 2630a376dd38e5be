// 2.0: trades and trade intents. both are ephemeral: built, applied once, dropped.
// constructors validate so a ledger never sees a zero quantity or a bad price.

use crate::types::{Asset, Price, Quote, Side, SignedSize, Venue};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single-venue fill, applied to exactly one ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    asset: Asset,
    quantity: Decimal,
    side: Side,
    price: Price,
}

impl Trade {
    pub fn new(asset: Asset, quantity: Decimal, side: Side, price: Decimal) -> Result<Self, TradeError> {
        if quantity <= Decimal::ZERO {
            return Err(TradeError::NonPositiveQuantity { asset, quantity });
        }
        let price = Price::new(price).ok_or(TradeError::NonPositivePrice { asset: asset.clone(), price })?;
        // notional() multiplies unchecked, so it has to fit here
        if quantity.checked_mul(price.value()).is_none() {
            return Err(TradeError::NotionalOverflow {
                asset,
                quantity,
                price: price.value(),
            });
        }
        Ok(Self {
            asset,
            quantity,
            side,
            price,
        })
    }

    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn signed_size(&self) -> SignedSize {
        SignedSize::from_side(self.side, self.quantity)
    }

    // 2.1: unsigned quantity * price. fees are charged on this
    pub fn notional(&self) -> Quote {
        Quote::new(self.quantity * self.price.value())
    }

    // what the trade moves out of cash: +notional for a buy, -notional for a sell
    pub fn signed_notional(&self) -> Quote {
        self.notional().mul(self.side.sign())
    }
}

/// 2.2: a paired cross-venue order. always buys on one venue and sells on the other
/// with the same quantity, so the book stays delta neutral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeIntent {
    asset: Asset,
    quantity: Decimal,
    buy_venue: Venue,
    sell_venue: Venue,
}

impl TradeIntent {
    pub fn new(asset: Asset, quantity: Decimal, buy_venue: Venue, sell_venue: Venue) -> Result<Self, TradeError> {
        if quantity <= Decimal::ZERO {
            return Err(TradeError::NonPositiveQuantity { asset, quantity });
        }
        if buy_venue == sell_venue {
            return Err(TradeError::SameVenue { asset, venue: buy_venue });
        }
        Ok(Self {
            asset,
            quantity,
            buy_venue,
            sell_venue,
        })
    }

    // buy `quantity` on `buy_venue`, sell it on the other one
    pub fn buying_on(asset: Asset, quantity: Decimal, buy_venue: Venue) -> Result<Self, TradeError> {
        Self::new(asset, quantity, buy_venue, buy_venue.other())
    }

    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn buy_venue(&self) -> Venue {
        self.buy_venue
    }

    pub fn sell_venue(&self) -> Venue {
        self.sell_venue
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TradeError {
    #[error("invalid input: quantity {quantity} for {asset} must be positive")]
    NonPositiveQuantity { asset: Asset, quantity: Decimal },

    #[error("invalid input: price {price} for {asset} must be positive")]
    NonPositivePrice { asset: Asset, price: Decimal },

    #[error("invalid input: intent for {asset} buys and sells on {venue}")]
    SameVenue { asset: Asset, venue: Venue },

    #[error("invalid input: {quantity} {asset} at {price} overflows the notional")]
    NotionalOverflow { asset: Asset, quantity: Decimal, price: Decimal },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn trade_notional_and_sign() {
        let buy = Trade::new(Asset::from("BTC"), dec!(2), Side::Buy, dec!(100)).unwrap();
        assert_eq!(buy.notional().value(), dec!(200));
        assert_eq!(buy.signed_notional().value(), dec!(200));
        assert_eq!(buy.signed_size().value(), dec!(2));

        let sell = Trade::new(Asset::from("BTC"), dec!(2), Side::Sell, dec!(100)).unwrap();
        assert_eq!(sell.signed_notional().value(), dec!(-200));
        assert_eq!(sell.signed_size().value(), dec!(-2));
    }

    #[test]
    fn trade_rejects_bad_input() {
        let zero = Trade::new(Asset::from("BTC"), dec!(0), Side::Buy, dec!(100));
        assert!(matches!(zero, Err(TradeError::NonPositiveQuantity { .. })));

        let negative = Trade::new(Asset::from("BTC"), dec!(-1), Side::Sell, dec!(100));
        assert!(matches!(negative, Err(TradeError::NonPositiveQuantity { .. })));

        let bad_price = Trade::new(Asset::from("BTC"), dec!(1), Side::Buy, dec!(0));
        assert!(matches!(bad_price, Err(TradeError::NonPositivePrice { .. })));

        let huge = Trade::new(Asset::from("BTC"), dec!(50), Side::Buy, dec!(10000000000000000000000000000));
        assert!(matches!(huge, Err(TradeError::NotionalOverflow { .. })));
    }

    #[test]
    fn intent_spans_both_venues() {
        let intent = TradeIntent::buying_on(Asset::from("ETH"), dec!(1.5), Venue::Hyperliquid).unwrap();
        assert_eq!(intent.buy_venue(), Venue::Hyperliquid);
        assert_eq!(intent.sell_venue(), Venue::Binance);

        let same = TradeIntent::new(Asset::from("ETH"), dec!(1), Venue::Binance, Venue::Binance);
        assert!(matches!(same, Err(TradeError::SameVenue { .. })));
    }
}
