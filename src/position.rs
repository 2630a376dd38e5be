// 3.0: per-asset position state on one venue. a record is either flat or open;
// an open record always has a nonzero size and a positive cost basis.
// 3.1 has the transition classifier and the fill math at the bottom.

use crate::types::{Price, Quote, Side, SignedSize};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PositionRecord {
    #[default]
    Flat,
    Open { size: SignedSize, cost_basis: Price },
}

impl PositionRecord {
    // zero size collapses to Flat so the basis never outlives the position
    pub fn open(size: SignedSize, cost_basis: Price) -> Self {
        if size.is_zero() {
            PositionRecord::Flat
        } else {
            PositionRecord::Open { size, cost_basis }
        }
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, PositionRecord::Flat)
    }

    pub fn size(&self) -> SignedSize {
        match self {
            PositionRecord::Flat => SignedSize::zero(),
            PositionRecord::Open { size, .. } => *size,
        }
    }

    pub fn quantity(&self) -> Decimal {
        self.size().value()
    }

    // 0 when flat
    pub fn cost_basis(&self) -> Decimal {
        match self {
            PositionRecord::Flat => Decimal::ZERO,
            PositionRecord::Open { cost_basis, .. } => cost_basis.value(),
        }
    }

    // signed: what this position contributes to mark-to-market equity
    pub fn market_value(&self, mark_price: Price) -> Quote {
        Quote::new(self.quantity() * mark_price.value())
    }

    pub fn unrealized_pnl(&self, mark_price: Price) -> Quote {
        Quote::new(self.quantity() * (mark_price.value() - self.cost_basis()))
    }
}

// 3.1: the four ways a fill can move a position. computed once, then dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    // same direction as the position (or opening from flat)
    Extend,
    // opposite direction, |existing| == quantity
    Close,
    // opposite direction, |existing| < quantity
    Flip,
    // opposite direction, |existing| > quantity
    Reduce,
}

pub fn classify_transition(existing: SignedSize, side: Side, quantity: Decimal) -> Transition {
    let same_direction = (existing.value() >= Decimal::ZERO && side == Side::Buy)
        || (existing.value() <= Decimal::ZERO && side == Side::Sell);

    if same_direction {
        return Transition::Extend;
    }

    match existing.abs().cmp(&quantity) {
        Ordering::Equal => Transition::Close,
        Ordering::Less => Transition::Flip,
        Ordering::Greater => Transition::Reduce,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionUpdate {
    pub record: PositionRecord,
    pub realized_pnl: Quote,
    pub transition: Transition,
}

// 3.2: realized pnl on the closed slice. (basis - fill) * direction * closed quantity
pub fn calculate_realized_pnl(cost_basis: Decimal, fill_price: Price, side: Side, closed_quantity: Decimal) -> Quote {
    Quote::new((cost_basis - fill_price.value()) * side.sign() * closed_quantity)
}

// 3.3: the new state of `record` after a fill. pure; the ledger commits the result.
pub fn apply_fill(
    record: &PositionRecord,
    side: Side,
    quantity: Decimal,
    fill_price: Price,
) -> Result<PositionUpdate, PositionError> {
    let existing = record.size();
    let cost_basis = record.cost_basis();
    let direction = side.sign();
    let transition = classify_transition(existing, side, quantity);

    let (new_record, realized_pnl) = match transition {
        Transition::Extend => {
            let new_size = existing.add(direction * quantity);
            if new_size.is_zero() {
                return Err(PositionError::ZeroDenominator {
                    existing,
                    delta: direction * quantity,
                });
            }
            // weighted average of the old notional and the new fill
            let weighted = existing.value() * cost_basis + direction * quantity * fill_price.value();
            let basis = weighted / new_size.value();
            let basis = Price::new(basis).ok_or(PositionError::NonPositiveCostBasis(basis))?;
            (PositionRecord::open(new_size, basis), Quote::zero())
        }
        Transition::Close => {
            let pnl = calculate_realized_pnl(cost_basis, fill_price, side, quantity);
            (PositionRecord::Flat, pnl)
        }
        Transition::Flip => {
            let pnl = calculate_realized_pnl(cost_basis, fill_price, side, existing.abs());
            let remainder = SignedSize::from_side(side, quantity - existing.abs());
            (PositionRecord::open(remainder, fill_price), pnl)
        }
        Transition::Reduce => {
            let pnl = calculate_realized_pnl(cost_basis, fill_price, side, quantity);
            let remaining = existing.add(direction * quantity);
            let basis = match record {
                PositionRecord::Open { cost_basis, .. } => *cost_basis,
                PositionRecord::Flat => return Err(PositionError::ReduceFlat),
            };
            (PositionRecord::open(remaining, basis), pnl)
        }
    };

    Ok(PositionUpdate {
        record: new_record,
        realized_pnl,
        transition,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    #[error("invariant violation: extending {existing} by {delta} leaves a zero denominator")]
    ZeroDenominator { existing: SignedSize, delta: Decimal },

    #[error("invariant violation: weighted cost basis {0} is not positive")]
    NonPositiveCostBasis(Decimal),

    #[error("invariant violation: reduce classified against a flat position")]
    ReduceFlat,
}
