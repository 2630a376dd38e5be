//! Historical market data loaded from cleaned per-asset CSV files.
//!
//! Each asset has one file with one row per minute holding both venues' perp
//! price, volume, mark price, premium, last funding rate and next funding time.
//! Numbers may be written plainly or in scientific notation. Empty cells,
//! `NaN` and infinities are rejected at load time.

use crate::market::{AssetSnapshot, MarketDataProvider, MarketError, MarketSnapshot, VenueQuote};
use crate::types::{Asset, Price, Timestamp};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// One row of a cleaned asset file. Columns not named here are ignored.
#[derive(Debug, Clone, Deserialize)]
struct CleanRow {
    #[serde(deserialize_with = "millis_field")]
    t: Timestamp,
    #[serde(deserialize_with = "decimal_field")]
    binance_spot_price: Decimal,
    #[serde(deserialize_with = "decimal_field")]
    binance_perp_price: Decimal,
    #[serde(deserialize_with = "decimal_field")]
    binance_perp_volume: Decimal,
    #[serde(deserialize_with = "decimal_field")]
    binance_mark_price: Decimal,
    #[serde(deserialize_with = "decimal_field")]
    binance_premium: Decimal,
    #[serde(deserialize_with = "decimal_field")]
    binance_funding_prev: Decimal,
    #[serde(deserialize_with = "millis_field")]
    binance_funding_time: Timestamp,
    #[serde(deserialize_with = "decimal_field")]
    hl_perp_price: Decimal,
    #[serde(deserialize_with = "decimal_field")]
    hl_perp_volume: Decimal,
    #[serde(deserialize_with = "decimal_field")]
    hl_mark_price: Decimal,
    #[serde(deserialize_with = "decimal_field")]
    hl_premium: Decimal,
    #[serde(deserialize_with = "decimal_field")]
    hl_funding_prev: Decimal,
    #[serde(deserialize_with = "millis_field")]
    hl_funding_time: Timestamp,
}

/// Parses plain (`0.0001`) or scientific (`1e-4`) notation.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

fn decimal_field<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_decimal(&raw).ok_or_else(|| serde::de::Error::custom(format!("not a finite number: {raw:?}")))
}

// pandas writes integer columns with gaps as floats ("1700000000000.0")
fn millis_field<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_decimal(&raw)
        .filter(|value| value.fract().is_zero())
        .and_then(|value| value.to_i64())
        .map(Timestamp::from_millis)
        .ok_or_else(|| serde::de::Error::custom(format!("not a millisecond timestamp: {raw:?}")))
}

// no listed perp trades anywhere near this. above it, quantity * price can overflow a Decimal
pub const MAX_PRICE: Decimal = dec!(1_000_000_000_000);

fn positive_price(asset: &Asset, timestamp: Timestamp, field: &'static str, value: Decimal) -> Result<Price, MarketError> {
    Price::new(value)
        .filter(|price| price.value() <= MAX_PRICE)
        .ok_or_else(|| MarketError::InvalidField {
            asset: asset.clone(),
            timestamp,
            field,
            value,
        })
}

fn non_negative(asset: &Asset, timestamp: Timestamp, field: &'static str, value: Decimal) -> Result<Decimal, MarketError> {
    if value < Decimal::ZERO {
        return Err(MarketError::InvalidField {
            asset: asset.clone(),
            timestamp,
            field,
            value,
        });
    }
    Ok(value)
}

impl CleanRow {
    fn into_snapshot(self, asset: &Asset) -> Result<AssetSnapshot, MarketError> {
        let t = self.t;
        Ok(AssetSnapshot {
            spot_price: positive_price(asset, t, "binance_spot_price", self.binance_spot_price)?,
            binance: VenueQuote {
                perp_price: positive_price(asset, t, "binance_perp_price", self.binance_perp_price)?,
                mark_price: positive_price(asset, t, "binance_mark_price", self.binance_mark_price)?,
                premium: self.binance_premium,
                funding_rate: self.binance_funding_prev,
                next_funding_time: self.binance_funding_time,
                volume: non_negative(asset, t, "binance_perp_volume", self.binance_perp_volume)?,
            },
            hyperliquid: VenueQuote {
                perp_price: positive_price(asset, t, "hl_perp_price", self.hl_perp_price)?,
                mark_price: positive_price(asset, t, "hl_mark_price", self.hl_mark_price)?,
                premium: self.hl_premium,
                funding_rate: self.hl_funding_prev,
                next_funding_time: self.hl_funding_time,
                volume: non_negative(asset, t, "hl_perp_volume", self.hl_perp_volume)?,
            },
        })
    }
}

type AssetHistory = BTreeMap<Timestamp, AssetSnapshot>;

/// Per-asset history keyed by timestamp.
#[derive(Debug, Clone, Default)]
pub struct HistoricalData {
    series: BTreeMap<Asset, AssetHistory>,
}

impl HistoricalData {
    pub fn new() -> Self {
        Self::default()
    }

    // `<dir>/<ASSET>.csv`, falling back to the `<dir>/<ASSET>/<ASSET>.csv` layout
    pub fn asset_path(dir: &Path, asset: &Asset) -> PathBuf {
        let flat = dir.join(format!("{asset}.csv"));
        if flat.exists() {
            return flat;
        }
        dir.join(asset.as_str()).join(format!("{asset}.csv"))
    }

    pub fn load_dir(dir: &Path, assets: &[Asset]) -> Result<Self, DataError> {
        let mut data = Self::new();
        for asset in assets {
            let path = Self::asset_path(dir, asset);
            let file = std::fs::File::open(&path).map_err(|e| DataError::Io {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            data.load_asset(asset.clone(), file)?;
            info!(asset = %asset, path = %path.display(), rows = data.rows(asset), "loaded market data");
        }
        Ok(data)
    }

    /// Reads one asset's rows from any CSV source with a header line.
    pub fn load_asset<R: Read>(&mut self, asset: Asset, source: R) -> Result<(), DataError> {
        let mut reader = csv::Reader::from_reader(source);
        let mut history = AssetHistory::new();

        for result in reader.deserialize::<CleanRow>() {
            let row = result.map_err(|e| DataError::Csv {
                asset: asset.clone(),
                reason: e.to_string(),
            })?;
            let timestamp = row.t;
            let snapshot = row.into_snapshot(&asset)?;
            if history.insert(timestamp, snapshot).is_some() {
                return Err(DataError::DuplicateTimestamp { asset, timestamp });
            }
        }

        if history.is_empty() {
            return Err(DataError::Empty(asset));
        }
        debug!(asset = %asset, rows = history.len(), "parsed asset history");
        self.series.insert(asset, history);
        Ok(())
    }

    pub fn rows(&self, asset: &Asset) -> usize {
        self.series.get(asset).map_or(0, BTreeMap::len)
    }
}

impl MarketDataProvider for HistoricalData {
    // union across assets. a timestamp one asset lacks fails at snapshot time.
    fn timestamps(&self) -> Vec<Timestamp> {
        let union: BTreeSet<Timestamp> = self.series.values().flat_map(|h| h.keys().copied()).collect();
        union.into_iter().collect()
    }

    fn snapshot(&self, timestamp: Timestamp) -> Result<MarketSnapshot, MarketError> {
        let mut snapshot = MarketSnapshot::new(timestamp);
        for (asset, history) in &self.series {
            let row = history.get(&timestamp).ok_or_else(|| MarketError::MissingMarketData {
                asset: asset.clone(),
                timestamp,
            })?;
            snapshot.insert(asset.clone(), row.clone());
        }
        Ok(snapshot)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataError {
    #[error("could not read {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("bad row in {asset} data: {reason}")]
    Csv { asset: Asset, reason: String },

    #[error("{asset} data has two rows at {timestamp}")]
    DuplicateTimestamp { asset: Asset, timestamp: Timestamp },

    #[error("{0} data has no rows")]
    Empty(Asset),

    #[error("{0}")]
    Market(#[from] MarketError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const HEADER: &str = "t,binance_spot_price,binance_perp_price,binance_perp_volume,binance_mark_price,binance_premium,binance_funding_prev,binance_funding_time,hl_perp_price,hl_perp_volume,hl_mark_price,hl_premium,hl_funding_prev,hl_funding_time,extra\n";

    fn csv(rows: &[&str]) -> String {
        let mut body = HEADER.to_string();
        for row in rows {
            body.push_str(row);
            body.push('\n');
        }
        body
    }

    #[test]
    fn decimal_notation() {
        assert_eq!(parse_decimal("0.0001"), Some(dec!(0.0001)));
        assert_eq!(parse_decimal("1e-4"), Some(dec!(0.0001)));
        assert_eq!(parse_decimal(" 2.5e2 "), Some(dec!(250)));
        assert_eq!(parse_decimal("NaN"), None);
        assert_eq!(parse_decimal("inf"), None);
        assert_eq!(parse_decimal(""), None);
    }

    #[test]
    fn loads_rows_and_ignores_extra_columns() {
        let body = csv(&[
            "60000,100,100.5,12.5,100.4,1.2e-4,0.0001,28800000,100.7,3.0,100.6,0.0002,1.25e-5,3600000,x",
            "120000,101,101.5,10,101.4,0.0001,0.0001,28800000.0,101.7,2,101.6,0.0002,0.00001,3600000,y",
        ]);
        let mut data = HistoricalData::new();
        data.load_asset(Asset::from("BTC"), body.as_bytes()).unwrap();

        assert_eq!(data.rows(&Asset::from("BTC")), 2);
        let snapshot = data.snapshot(Timestamp::from_millis(60000)).unwrap();
        let btc = snapshot.asset(&Asset::from("BTC")).unwrap();
        assert_eq!(btc.spot_price.value(), dec!(100));
        assert_eq!(btc.binance.premium, dec!(0.00012));
        assert_eq!(btc.hyperliquid.funding_rate, dec!(0.0000125));
        assert_eq!(btc.hyperliquid.next_funding_time, Timestamp::from_millis(3600000));
        assert_eq!(
            data.snapshot(Timestamp::from_millis(120000)).unwrap().asset(&Asset::from("BTC")).unwrap().binance.next_funding_time,
            Timestamp::from_millis(28800000)
        );
    }

    #[test]
    fn empty_cell_rejected() {
        let body = csv(&["60000,100,,12.5,100.4,0,0,0,100.7,3,100.6,0,0,0,x"]);
        let result = HistoricalData::new().load_asset(Asset::from("BTC"), body.as_bytes());
        assert!(matches!(result, Err(DataError::Csv { .. })));
    }

    #[test]
    fn non_positive_price_rejected() {
        let body = csv(&["60000,0,100,12.5,100.4,0,0,0,100.7,3,100.6,0,0,0,x"]);
        let result = HistoricalData::new().load_asset(Asset::from("BTC"), body.as_bytes());
        assert!(matches!(
            result,
            Err(DataError::Market(MarketError::InvalidField { field: "binance_spot_price", .. }))
        ));
    }

    #[test]
    fn absurd_price_rejected() {
        let body = csv(&["60000,1,1e28,12.5,100.4,0,0,0,100.7,3,100.6,0,0,0,x"]);
        let result = HistoricalData::new().load_asset(Asset::from("BTC"), body.as_bytes());
        assert!(matches!(
            result,
            Err(DataError::Market(MarketError::InvalidField { field: "binance_perp_price", .. }))
        ));
    }

    #[test]
    fn duplicate_timestamp_rejected() {
        let row = "60000,100,100,1,100,0,0,0,100,1,100,0,0,0,x";
        let result = HistoricalData::new().load_asset(Asset::from("BTC"), csv(&[row, row]).as_bytes());
        assert!(matches!(result, Err(DataError::DuplicateTimestamp { .. })));
    }

    #[test]
    fn misaligned_assets_surface_missing_data() {
        let mut data = HistoricalData::new();
        data.load_asset(Asset::from("BTC"), csv(&["60000,100,100,1,100,0,0,0,100,1,100,0,0,0,x"]).as_bytes())
            .unwrap();
        data.load_asset(Asset::from("ETH"), csv(&["120000,10,10,1,10,0,0,0,10,1,10,0,0,0,x"]).as_bytes())
            .unwrap();

        assert_eq!(
            data.timestamps(),
            vec![Timestamp::from_millis(60000), Timestamp::from_millis(120000)]
        );
        assert!(matches!(
            data.snapshot(Timestamp::from_millis(60000)),
            Err(MarketError::MissingMarketData { .. })
        ));
    }
}
