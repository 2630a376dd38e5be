// 5.0: funding settlement math. longs pay shorts when the rate is positive.
// the two venues settle on different clocks (8h vs 1h), so each venue's rate is
// scaled by its interval relative to the reference interval before it hits cash.

use crate::types::{Price, Quote, SignedSize, Timestamp};
use rust_decimal::Decimal;

// 5.1: venue modifier. an hourly venue against an 8h reference gets 1/8
pub fn interval_modifier(venue_interval_hours: Decimal, reference_interval_hours: Decimal) -> Decimal {
    venue_interval_hours / reference_interval_hours
}

// 5.2: cash flow for one settlement, from the holder's side. positive = received.
// -sign(q) * |q| * mark * rate * modifier, which is just -q * mark * rate * modifier
pub fn calculate_funding_payment(
    position_size: SignedSize,
    mark_price: Price,
    funding_rate: Decimal,
    modifier: Decimal,
) -> Quote {
    Quote::new(-position_size.value() * mark_price.value() * funding_rate * modifier)
}

// 5.3: settlement happens only on the scheduled point itself. no tolerance window.
pub fn is_settlement_due(now: Timestamp, scheduled: Timestamp) -> bool {
    now == scheduled
}
