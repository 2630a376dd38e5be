//! Risk manager hooks.
//!
//! The engine calls two hooks every step: `vet` sees the generated intents
//! before execution and returns the subset (or modification) it allows, and
//! `excess_risk` looks at the post-trade ledgers and returns extra de-risking
//! intents. The engine executes whatever comes back without second-guessing it.

use crate::ledger::VenueLedger;
use crate::market::MarketSnapshot;
use crate::trade::TradeIntent;

pub trait RiskManager {
    /// Pre-trade vetting. Returns the intents that may execute this step.
    fn vet(
        &mut self,
        snapshot: &MarketSnapshot,
        intents: Vec<TradeIntent>,
        binance: &VenueLedger,
        hyperliquid: &VenueLedger,
    ) -> Vec<TradeIntent>;

    /// Post-trade check. Returns additional intents that reduce risk, usually none.
    fn excess_risk(
        &mut self,
        snapshot: &MarketSnapshot,
        binance: &VenueLedger,
        hyperliquid: &VenueLedger,
    ) -> Vec<TradeIntent>;
}

/// Approves every intent and never asks for de-risking trades.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughRisk;

impl RiskManager for PassThroughRisk {
    fn vet(
        &mut self,
        _snapshot: &MarketSnapshot,
        intents: Vec<TradeIntent>,
        _binance: &VenueLedger,
        _hyperliquid: &VenueLedger,
    ) -> Vec<TradeIntent> {
        intents
    }

    fn excess_risk(
        &mut self,
        _snapshot: &MarketSnapshot,
        _binance: &VenueLedger,
        _hyperliquid: &VenueLedger,
    ) -> Vec<TradeIntent> {
        Vec::new()
    }
}

impl<R: RiskManager + ?Sized> RiskManager for Box<R> {
    fn vet(
        &mut self,
        snapshot: &MarketSnapshot,
        intents: Vec<TradeIntent>,
        binance: &VenueLedger,
        hyperliquid: &VenueLedger,
    ) -> Vec<TradeIntent> {
        (**self).vet(snapshot, intents, binance, hyperliquid)
    }

    fn excess_risk(
        &mut self,
        snapshot: &MarketSnapshot,
        binance: &VenueLedger,
        hyperliquid: &VenueLedger,
    ) -> Vec<TradeIntent> {
        (**self).excess_risk(snapshot, binance, hyperliquid)
    }
}
