//! Intent generation.
//!
//! Turns per-asset target notionals into paired cross-venue intents. Exposure is
//! measured on the reference venue at the reference spot price; a positive
//! delta buys the reference venue and sells the other one.

use super::results::EngineError;
use crate::events::{IntentSkippedEvent, SkipReason};
use crate::ledger::{LedgerError, VenueLedger};
use crate::market::MarketSnapshot;
use crate::signal::TargetNotionals;
use crate::trade::TradeIntent;
use crate::types::Venue;
use rust_decimal::Decimal;
use tracing::trace;

#[derive(Debug, Clone, Default)]
pub struct GeneratedIntents {
    pub intents: Vec<TradeIntent>,
    pub skipped: Vec<IntentSkippedEvent>,
}

#[derive(Debug, Clone)]
pub struct IntentGenerator {
    dust_threshold: Decimal,
}

impl IntentGenerator {
    pub fn new(dust_threshold: Decimal) -> Self {
        Self { dust_threshold }
    }

    /// One intent per asset whose target moved by more than the dust threshold,
    /// in `targets` order.
    pub fn generate(
        &self,
        snapshot: &MarketSnapshot,
        targets: &TargetNotionals,
        reference: &VenueLedger,
    ) -> Result<GeneratedIntents, EngineError> {
        debug_assert_eq!(reference.venue, Venue::REFERENCE);
        let mut generated = GeneratedIntents::default();

        for (asset, &target) in targets {
            let record = reference.position(asset).ok_or_else(|| LedgerError::UnknownAsset {
                venue: reference.venue,
                asset: asset.clone(),
            })?;
            let market = snapshot.asset(asset)?;
            let spot = market.spot_price.value();

            let current_notional = record.quantity() * spot;
            let delta = target - current_notional;

            let flatten_long = current_notional > Decimal::ZERO && target <= Decimal::ZERO;
            let flatten_short = current_notional < Decimal::ZERO && target >= Decimal::ZERO;

            if flatten_long || flatten_short {
                // keep carrying while the premium spread still pays for the position
                let premium_diff = market.premium_spread();
                if (flatten_long && premium_diff > Decimal::ZERO) || (flatten_short && premium_diff < Decimal::ZERO) {
                    trace!(asset = %asset, %premium_diff, "flattening skipped");
                    generated.skipped.push(IntentSkippedEvent {
                        asset: asset.clone(),
                        requested_quantity: delta.abs() / spot,
                        reason: SkipReason::PremiumStillFavorable,
                    });
                    continue;
                }
            }

            if delta.abs() <= self.dust_threshold {
                continue;
            }

            let buy_venue = if delta > Decimal::ZERO {
                Venue::REFERENCE
            } else {
                Venue::REFERENCE.other()
            };
            generated
                .intents
                .push(TradeIntent::buying_on(asset.clone(), delta.abs() / spot, buy_venue)?);
        }

        Ok(generated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{AssetSnapshot, VenueQuote};
    use crate::trade::Trade;
    use crate::types::{Asset, Price, Quote, Side, Timestamp};
    use rust_decimal_macros::dec;

    fn btc() -> Asset {
        Asset::from("BTC")
    }

    fn snapshot(bn_premium: Decimal, hl_premium: Decimal) -> MarketSnapshot {
        let quote = |premium| VenueQuote {
            perp_price: Price::new_unchecked(dec!(100)),
            mark_price: Price::new_unchecked(dec!(100)),
            premium,
            funding_rate: Decimal::ZERO,
            next_funding_time: Timestamp::from_millis(0),
            volume: dec!(1000),
        };
        MarketSnapshot::new(Timestamp::from_millis(0)).with_asset(
            btc(),
            AssetSnapshot {
                spot_price: Price::new_unchecked(dec!(50)),
                binance: quote(bn_premium),
                hyperliquid: quote(hl_premium),
            },
        )
    }

    fn reference(quantity: Decimal) -> VenueLedger {
        let mut ledger = VenueLedger::new(Venue::Binance, Quote::new(dec!(1000)), Decimal::ZERO, Decimal::ONE, &[btc()]);
        if !quantity.is_zero() {
            let side = if quantity > Decimal::ZERO { Side::Buy } else { Side::Sell };
            ledger.apply_trade(&Trade::new(btc(), quantity.abs(), side, dec!(50)).unwrap()).unwrap();
        }
        ledger
    }

    fn targets(target: Decimal) -> TargetNotionals {
        TargetNotionals::from([(btc(), target)])
    }

    #[test]
    fn positive_delta_buys_reference() {
        let generated = IntentGenerator::new(dec!(0.00000001))
            .generate(&snapshot(Decimal::ZERO, Decimal::ZERO), &targets(dec!(1000)), &reference(Decimal::ZERO))
            .unwrap();
        assert_eq!(generated.intents.len(), 1);
        let intent = &generated.intents[0];
        assert_eq!(intent.quantity(), dec!(20));
        assert_eq!(intent.buy_venue(), Venue::Binance);
        assert_eq!(intent.sell_venue(), Venue::Hyperliquid);
    }

    #[test]
    fn negative_delta_buys_other_venue() {
        let generated = IntentGenerator::new(dec!(0.00000001))
            .generate(&snapshot(Decimal::ZERO, Decimal::ZERO), &targets(dec!(-500)), &reference(Decimal::ZERO))
            .unwrap();
        let intent = &generated.intents[0];
        assert_eq!(intent.quantity(), dec!(10));
        assert_eq!(intent.buy_venue(), Venue::Hyperliquid);
    }

    #[test]
    fn dust_delta_is_ignored() {
        let generated = IntentGenerator::new(dec!(0.00000001))
            .generate(&snapshot(Decimal::ZERO, Decimal::ZERO), &targets(dec!(500.000000001)), &reference(dec!(10)))
            .unwrap();
        assert!(generated.intents.is_empty());
        assert!(generated.skipped.is_empty());
    }

    #[test]
    fn flattening_long_skipped_while_premium_favors_it() {
        // long 10 on the reference venue, target 0, other venue premium still higher
        let generated = IntentGenerator::new(dec!(0.00000001))
            .generate(&snapshot(dec!(0.001), dec!(0.002)), &targets(Decimal::ZERO), &reference(dec!(10)))
            .unwrap();
        assert!(generated.intents.is_empty());
        assert_eq!(generated.skipped.len(), 1);
        assert_eq!(generated.skipped[0].reason, SkipReason::PremiumStillFavorable);
    }

    #[test]
    fn flattening_long_proceeds_once_premium_reverses() {
        let generated = IntentGenerator::new(dec!(0.00000001))
            .generate(&snapshot(dec!(0.002), dec!(0.001)), &targets(Decimal::ZERO), &reference(dec!(10)))
            .unwrap();
        assert_eq!(generated.intents.len(), 1);
        assert_eq!(generated.intents[0].quantity(), dec!(10));
        assert_eq!(generated.intents[0].buy_venue(), Venue::Hyperliquid);
    }

    #[test]
    fn flattening_short_skipped_while_premium_favors_it() {
        let generated = IntentGenerator::new(dec!(0.00000001))
            .generate(&snapshot(dec!(0.002), dec!(0.001)), &targets(dec!(100)), &reference(dec!(-10)))
            .unwrap();
        assert!(generated.intents.is_empty());
        assert_eq!(generated.skipped.len(), 1);
    }

    #[test]
    fn increasing_a_long_is_not_filtered() {
        let generated = IntentGenerator::new(dec!(0.00000001))
            .generate(&snapshot(dec!(0.001), dec!(0.002)), &targets(dec!(1000)), &reference(dec!(10)))
            .unwrap();
        assert_eq!(generated.intents.len(), 1);
        assert_eq!(generated.intents[0].quantity(), dec!(10));
    }

    #[test]
    fn unknown_asset_is_invalid_input() {
        let result = IntentGenerator::new(dec!(0.00000001)).generate(
            &snapshot(Decimal::ZERO, Decimal::ZERO),
            &TargetNotionals::from([(Asset::from("DOGE"), dec!(1))]),
            &reference(Decimal::ZERO),
        );
        assert!(matches!(result, Err(EngineError::Ledger(LedgerError::UnknownAsset { .. }))));
    }
}
