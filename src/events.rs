// 11.0: every state change produces an event. used for audit trails and for
// reconstructing what a run did step by step. EventPayload lists all event types.

use crate::ledger::{FillReport, FundingSettlement};
use crate::types::{Asset, Quote, Timestamp, Venue};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{vec_deque, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    // Ledger events
    TradeFilled(FillReport),
    FundingSettled(FundingSettlement),

    // Decision events
    IntentSkipped(IntentSkippedEvent),

    // Book events
    EquityMarked(EquityMarkedEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentSkippedEvent {
    pub asset: Asset,
    pub requested_quantity: Decimal,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    // flattening would give up a premium spread that still pays
    PremiumStillFavorable,
    // neither venue traded anything this step
    NoLiquidity { buy_venue: Venue, sell_venue: Venue },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquityMarkedEvent {
    pub binance_equity: Quote,
    pub hyperliquid_equity: Quote,
    pub total_equity: Quote,
}

// 11.1: bounded in-memory ring. once max_events is hit the oldest event is
// popped for every new one.
#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<Event>,
    next_id: u64,
    max_events: usize,
}

impl EventLog {
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::new(),
            next_id: 1,
            max_events,
        }
    }

    pub fn emit(&mut self, timestamp: Timestamp, payload: EventPayload) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        self.events.push_back(Event::new(id, timestamp, payload));

        while self.events.len() > self.max_events {
            self.events.pop_front();
        }
        id
    }

    // retained events, oldest first
    pub fn events(&self) -> vec_deque::Iter<'_, Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    // total ever emitted, including dropped ones
    pub fn emitted(&self) -> u64 {
        self.next_id - 1
    }
}
