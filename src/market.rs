//! Market state snapshots.
//!
//! A snapshot is the read-only view of both venues for every asset at one
//! timestamp. The engine never interpolates: a snapshot missing an asset is an
//! error for that step, not a gap to skip.

use crate::types::{Asset, Price, Timestamp, Venue};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One venue's perpetual market for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueQuote {
    /// Traded perp price, used for fills.
    pub perp_price: Price,
    /// Mark price, used for funding and mark-to-market.
    pub mark_price: Price,
    /// Relative deviation of the perp from its index.
    pub premium: Decimal,
    /// Last realized funding rate for this venue's settlement interval.
    pub funding_rate: Decimal,
    /// Next scheduled funding settlement.
    pub next_funding_time: Timestamp,
    /// Traded volume in base units over the step.
    pub volume: Decimal,
}

/// Both venues plus the reference spot price for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSnapshot {
    /// Reference venue spot price. Target notionals are converted to quantity with it.
    pub spot_price: Price,
    pub binance: VenueQuote,
    pub hyperliquid: VenueQuote,
}

impl AssetSnapshot {
    pub fn venue(&self, venue: Venue) -> &VenueQuote {
        match venue {
            Venue::Binance => &self.binance,
            Venue::Hyperliquid => &self.hyperliquid,
        }
    }

    // premium of the other venue minus the reference venue's
    pub fn premium_spread(&self) -> Decimal {
        self.venue(Venue::REFERENCE.other()).premium - self.venue(Venue::REFERENCE).premium
    }

    // previous funding of the other venue minus the reference venue's
    pub fn funding_spread(&self) -> Decimal {
        self.venue(Venue::REFERENCE.other()).funding_rate - self.venue(Venue::REFERENCE).funding_rate
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub timestamp: Timestamp,
    assets: BTreeMap<Asset, AssetSnapshot>,
}

impl MarketSnapshot {
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            assets: BTreeMap::new(),
        }
    }

    pub fn with_asset(mut self, asset: Asset, snapshot: AssetSnapshot) -> Self {
        self.insert(asset, snapshot);
        self
    }

    pub fn insert(&mut self, asset: Asset, snapshot: AssetSnapshot) {
        self.assets.insert(asset, snapshot);
    }

    pub fn asset(&self, asset: &Asset) -> Result<&AssetSnapshot, MarketError> {
        self.assets.get(asset).ok_or_else(|| MarketError::MissingMarketData {
            asset: asset.clone(),
            timestamp: self.timestamp,
        })
    }

    pub fn quote(&self, asset: &Asset, venue: Venue) -> Result<&VenueQuote, MarketError> {
        Ok(self.asset(asset)?.venue(venue))
    }

    pub fn assets(&self) -> impl Iterator<Item = (&Asset, &AssetSnapshot)> {
        self.assets.iter()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// Source of per-timestamp market state.
pub trait MarketDataProvider {
    /// Every timestamp the provider can serve, ascending.
    fn timestamps(&self) -> Vec<Timestamp>;

    /// Exactly one record per asset at `timestamp`, or an error.
    fn snapshot(&self, timestamp: Timestamp) -> Result<MarketSnapshot, MarketError>;
}

// in-memory provider: a vector of snapshots is its own data source
impl MarketDataProvider for Vec<MarketSnapshot> {
    fn timestamps(&self) -> Vec<Timestamp> {
        let mut timestamps: Vec<Timestamp> = self.iter().map(|s| s.timestamp).collect();
        timestamps.sort();
        timestamps.dedup();
        timestamps
    }

    fn snapshot(&self, timestamp: Timestamp) -> Result<MarketSnapshot, MarketError> {
        self.iter()
            .find(|s| s.timestamp == timestamp)
            .cloned()
            .ok_or(MarketError::MissingTimestamp(timestamp))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarketError {
    #[error("missing market data for {asset} at {timestamp}")]
    MissingMarketData { asset: Asset, timestamp: Timestamp },

    #[error("missing market data: no snapshot at {0}")]
    MissingTimestamp(Timestamp),

    #[error("invalid input: {field} for {asset} at {timestamp} is {value}")]
    InvalidField {
        asset: Asset,
        timestamp: Timestamp,
        field: &'static str,
        value: Decimal,
    },
}
