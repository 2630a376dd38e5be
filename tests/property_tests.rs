//! Property-based tests for the ledger, funding and execution math.
//!
//! These tests verify invariants hold under random inputs.

use funding_arb::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// Strategies for generating test data
fn price_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|x| Decimal::new(x, 2)) // $0.01 to $10,000
}

fn size_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..100_000i64).prop_map(|x| Decimal::new(x, 4)) // 0.0001 to 10
}

fn rate_strategy() -> impl Strategy<Value = Decimal> {
    (-100i64..=100i64).prop_map(|x| Decimal::new(x, 5)) // -0.1% to +0.1%
}

fn btc() -> Asset {
    Asset::from("BTC")
}

fn snapshot(t: i64, price: Decimal, rate: Decimal, volume: Decimal) -> MarketSnapshot {
    let quote = VenueQuote {
        perp_price: Price::new_unchecked(price),
        mark_price: Price::new_unchecked(price),
        premium: Decimal::ZERO,
        funding_rate: rate,
        next_funding_time: Timestamp::from_millis(t),
        volume,
    };
    MarketSnapshot::new(Timestamp::from_millis(t)).with_asset(
        btc(),
        AssetSnapshot {
            spot_price: Price::new_unchecked(price),
            binance: quote.clone(),
            hyperliquid: quote,
        },
    )
}

// both venues quote the same price; funding is due at `t` only when `settle` is set
fn priced(t: i64, price: Decimal, rate: Decimal, settle: bool) -> MarketSnapshot {
    let next = if settle { t } else { t + 1 };
    let quote = VenueQuote {
        perp_price: Price::new_unchecked(price),
        mark_price: Price::new_unchecked(price),
        premium: Decimal::ZERO,
        funding_rate: rate,
        next_funding_time: Timestamp::from_millis(next),
        volume: dec!(1_000_000),
    };
    MarketSnapshot::new(Timestamp::from_millis(t)).with_asset(
        btc(),
        AssetSnapshot {
            spot_price: Price::new_unchecked(price),
            binance: quote.clone(),
            hyperliquid: quote,
        },
    )
}

fn frictionless_book() -> Book {
    let mut config = StrategyConfig::default();
    config.assets = vec![btc()];
    config.binance.fee_rate = Decimal::ZERO;
    config.hyperliquid.fee_rate = Decimal::ZERO;
    Book::from_config(&config)
}

fn total_cash(book: &Book) -> Decimal {
    let (binance, hyperliquid) = book.ledgers();
    binance.cash.value() + hyperliquid.cash.value()
}

proptest! {
    /// Same-direction fills leave the volume-weighted average entry as cost basis
    #[test]
    fn cost_basis_is_weighted_average(
        q1 in size_strategy(),
        p1 in price_strategy(),
        q2 in size_strategy(),
        p2 in price_strategy(),
    ) {
        let first = apply_fill(&PositionRecord::Flat, Side::Buy, q1, Price::new_unchecked(p1)).unwrap();
        prop_assert_eq!(first.record.cost_basis(), p1);

        let second = apply_fill(&first.record, Side::Buy, q2, Price::new_unchecked(p2)).unwrap();
        prop_assert_eq!(second.transition, Transition::Extend);
        prop_assert_eq!(second.realized_pnl, Quote::zero());
        prop_assert_eq!(second.record.quantity(), q1 + q2);
        prop_assert_eq!(second.record.cost_basis(), (q1 * p1 + q2 * p2) / (q1 + q2));
    }

    /// A flip is an exact close followed by a fresh open of the remainder
    #[test]
    fn flip_equals_close_then_open(
        existing in size_strategy(),
        extra in size_strategy(),
        basis in price_strategy(),
        fill in price_strategy(),
        short in any::<bool>(),
    ) {
        let (open_side, flip_side) = if short { (Side::Sell, Side::Buy) } else { (Side::Buy, Side::Sell) };
        let record = PositionRecord::open(SignedSize::from_side(open_side, existing), Price::new_unchecked(basis));
        let price = Price::new_unchecked(fill);

        let flipped = apply_fill(&record, flip_side, existing + extra, price).unwrap();
        prop_assert_eq!(flipped.transition, Transition::Flip);

        let closed = apply_fill(&record, flip_side, existing, price).unwrap();
        prop_assert_eq!(closed.transition, Transition::Close);
        prop_assert!(closed.record.is_flat());
        let reopened = apply_fill(&closed.record, flip_side, extra, price).unwrap();

        prop_assert_eq!(flipped.realized_pnl, closed.realized_pnl);
        prop_assert_eq!(flipped.record, reopened.record);
    }

    /// Reducing keeps the cost basis and realizes pnl on the closed slice only
    #[test]
    fn reduce_keeps_basis(
        existing in 2i64..10_000i64,
        basis in price_strategy(),
        fill in price_strategy(),
    ) {
        let existing = Decimal::from(existing);
        let record = PositionRecord::open(SignedSize::new(existing), Price::new_unchecked(basis));
        let update = apply_fill(&record, Side::Sell, Decimal::ONE, Price::new_unchecked(fill)).unwrap();

        prop_assert_eq!(update.transition, Transition::Reduce);
        prop_assert_eq!(update.record.cost_basis(), basis);
        prop_assert_eq!(update.record.quantity(), existing - Decimal::ONE);
        prop_assert_eq!(update.realized_pnl.value(), fill - basis);
    }

    /// Funding flows from longs to shorts when the rate is positive
    #[test]
    fn funding_sign(
        size in size_strategy(),
        mark in price_strategy(),
        rate in rate_strategy(),
    ) {
        let mark = Price::new_unchecked(mark);
        let long = calculate_funding_payment(SignedSize::new(size), mark, rate, Decimal::ONE);
        let short = calculate_funding_payment(SignedSize::new(-size), mark, rate, Decimal::ONE);

        prop_assert_eq!(long.add(short), Quote::zero());
        if rate > Decimal::ZERO {
            prop_assert!(long.is_negative());
        }
    }

    /// Settling funding twice at the same timestamp changes cash once
    #[test]
    fn funding_is_idempotent(
        size in size_strategy(),
        price in price_strategy(),
        rate in rate_strategy(),
    ) {
        let assets = [btc()];
        let mut ledger = VenueLedger::new(Venue::Hyperliquid, Quote::new(dec!(1_000_000)), Decimal::ZERO, dec!(0.125), &assets);
        ledger.apply_trade(&Trade::new(btc(), size, Side::Sell, price).unwrap()).unwrap();

        let snap = snapshot(3_600_000, price, rate, dec!(1));
        let first = ledger.accrue_funding(Timestamp::from_millis(3_600_000), &snap).unwrap();
        let after_first = ledger.cash;
        let second = ledger.accrue_funding(Timestamp::from_millis(3_600_000), &snap).unwrap();

        prop_assert_eq!(first.len(), 1);
        prop_assert!(second.is_empty());
        prop_assert_eq!(ledger.cash, after_first);
        prop_assert_eq!(first[0].payment.value(), size * price * rate * dec!(0.125));
    }

    /// Both legs fill the same quantity, never more than the participation cap
    #[test]
    fn execution_is_capped_and_balanced(
        quantity in size_strategy(),
        bn_volume in 0i64..10_000i64,
        hl_volume in 0i64..10_000i64,
        rate in 1i64..=100i64,
    ) {
        let participation = Decimal::new(rate, 2);
        let simulator = ExecutionSimulator::new(dec!(0.0005), participation);
        let mut book = frictionless_book();
        let mut snap = snapshot(0, dec!(100), Decimal::ZERO, Decimal::ZERO);
        let mut asset = snap.asset(&btc()).unwrap().clone();
        asset.binance.volume = Decimal::from(bn_volume);
        asset.hyperliquid.volume = Decimal::from(hl_volume);
        snap.insert(btc(), asset);

        let intent = TradeIntent::buying_on(btc(), quantity, Venue::Binance).unwrap();
        let reports = simulator.simulate(&snap, &[intent], &mut book).unwrap();
        let cap = Decimal::from(bn_volume.min(hl_volume)) * participation;

        prop_assert_eq!(reports[0].filled_quantity, quantity.min(cap));
        let binance = book.ledger(Venue::Binance).position(&btc()).unwrap().quantity();
        let hyperliquid = book.ledger(Venue::Hyperliquid).position(&btc()).unwrap().quantity();
        prop_assert_eq!(binance, reports[0].filled_quantity);
        prop_assert_eq!(binance + hyperliquid, Decimal::ZERO);
    }

    /// Paired opening fills with no fees or slippage move no money between venues
    #[test]
    fn cash_conserved_without_friction(
        quantities in proptest::collection::vec(size_strategy(), 1..10),
        price in price_strategy(),
    ) {
        let simulator = ExecutionSimulator::new(Decimal::ZERO, Decimal::ONE);
        let mut book = frictionless_book();
        let start = total_cash(&book);
        let snap = snapshot(0, price, Decimal::ZERO, dec!(1_000_000));

        for quantity in quantities {
            let intent = TradeIntent::buying_on(btc(), quantity, Venue::Hyperliquid).unwrap();
            simulator.simulate(&snap, &[intent], &mut book).unwrap();
        }

        prop_assert_eq!(total_cash(&book), start);
        let (binance_equity, hyperliquid_equity) = book.equity(&snap).unwrap();
        prop_assert_eq!(binance_equity.add(hyperliquid_equity).value(), start);
    }

    /// Mixed buys and sells with funding in between: total cash moves by exactly
    /// the realized pnl plus the funding received, whichever transitions occur
    #[test]
    fn cash_moves_only_by_realized_pnl_and_funding(
        steps in proptest::collection::vec(
            (any::<bool>(), size_strategy(), price_strategy(), rate_strategy(), any::<bool>()),
            1..40,
        ),
    ) {
        let simulator = ExecutionSimulator::new(Decimal::ZERO, Decimal::ONE);
        let mut book = frictionless_book();
        let start = total_cash(&book);
        let mut realized = Decimal::ZERO;
        let mut funding = Decimal::ZERO;

        for (i, (buy_hyperliquid, quantity, price, rate, settle)) in steps.into_iter().enumerate() {
            let t = (i as i64 + 1) * 3_600_000;
            let snap = priced(t, price, rate, settle);

            for settlement in book.accrue_funding(Timestamp::from_millis(t), &snap).unwrap() {
                funding += settlement.payment.value();
            }

            let buy_venue = if buy_hyperliquid { Venue::Hyperliquid } else { Venue::Binance };
            let intent = TradeIntent::buying_on(btc(), quantity, buy_venue).unwrap();
            for report in simulator.simulate(&snap, &[intent], &mut book).unwrap() {
                let (buy, sell) = report.legs.expect("deep book fills every intent");
                realized += buy.realized_pnl.value() + sell.realized_pnl.value();
            }
        }

        let tolerance = dec!(0.000001);
        let moved = total_cash(&book) - start;
        let expected = realized + funding;
        prop_assert!((moved - expected).abs() < tolerance, "cash moved {} vs {}", moved, expected);

        let (binance, hyperliquid) = book.ledgers();
        let booked = binance.realized_pnl.value()
            + hyperliquid.realized_pnl.value()
            + binance.funding_received.value()
            + hyperliquid.funding_received.value();
        prop_assert!((moved - booked).abs() < tolerance);
        prop_assert_eq!(binance.fees_paid, Quote::zero());
    }
}

#[test]
fn zero_denominator_is_an_invariant_violation() {
    // an Extend can only reach zero size through a corrupted record
    let record = PositionRecord::Open {
        size: SignedSize::zero(),
        cost_basis: Price::new_unchecked(dec!(100)),
    };
    let result = apply_fill(&record, Side::Buy, Decimal::ZERO, Price::new_unchecked(dec!(100)));
    assert!(matches!(result, Err(PositionError::ZeroDenominator { .. })));
}
