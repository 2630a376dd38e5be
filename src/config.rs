// 7.0 config.rs: all settings in one place. capital, fees, execution, sizing, report.
// built once at run start, validated, then only ever read.
// 7.1 VenueConfig has the per-venue taker fee and funding interval.

use crate::funding::interval_modifier;
use crate::types::{Asset, Venue};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueConfig {
    // Taker fee as a fraction of notional
    pub fee_rate: Decimal,
    // Hours between funding settlements
    pub funding_interval_hours: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    // Split evenly between the two venues
    pub starting_capital: Decimal,
    // Tradable assets, one position record per asset per venue
    pub assets: Vec<Asset>,
    pub binance: VenueConfig,
    pub hyperliquid: VenueConfig,
    // Funding interval every venue's rate is normalized to
    pub reference_funding_interval_hours: Decimal,
    // Fractional slippage paid by both legs (0.0005 = 5 bps)
    pub slippage: Decimal,
    // Max fraction of the thinner venue's volume one step may fill
    pub max_participation_rate: Decimal,
    // Deltas at or below this notional are float noise, not trades
    pub dust_threshold: Decimal,
    // Funding spread that triggers the threshold signal
    pub edge_threshold: Decimal,
    // Target notional per unit of signal
    pub notional_per_trade: Decimal,
    // Hard cap on |target notional|
    pub max_position_size: Decimal,
    // Annual risk free rate for the Sharpe ratio
    pub risk_free_rate: Decimal,
    // Equity curve steps per year (minute bars = 525600)
    pub periods_per_year: Decimal,
    // Audit log capacity
    pub max_events: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            starting_capital: dec!(100_000),
            assets: vec![Asset::from("BTC"), Asset::from("ETH")],
            binance: VenueConfig {
                fee_rate: dec!(0.0005),
                funding_interval_hours: dec!(8),
            },
            hyperliquid: VenueConfig {
                fee_rate: dec!(0.00045),
                funding_interval_hours: dec!(1),
            },
            reference_funding_interval_hours: dec!(8),
            slippage: dec!(0.0002),
            max_participation_rate: dec!(0.05),
            dust_threshold: dec!(0.00000001),
            edge_threshold: dec!(0.0001),
            notional_per_trade: dec!(10_000),
            max_position_size: dec!(25_000),
            risk_free_rate: dec!(0.04),
            periods_per_year: dec!(525_600),
            max_events: 100_000,
        }
    }
}

impl StrategyConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&raw)
    }

    pub fn venue(&self, venue: Venue) -> &VenueConfig {
        match venue {
            Venue::Binance => &self.binance,
            Venue::Hyperliquid => &self.hyperliquid,
        }
    }

    // each venue ledger starts with half
    pub fn capital_per_venue(&self) -> Decimal {
        self.starting_capital / dec!(2)
    }

    pub fn funding_modifier(&self, venue: Venue) -> Decimal {
        interval_modifier(
            self.venue(venue).funding_interval_hours,
            self.reference_funding_interval_hours,
        )
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.starting_capital <= Decimal::ZERO {
            return Err(ConfigError::Invalid {
                field: "starting_capital",
                reason: "must be positive".to_string(),
            });
        }

        if self.assets.is_empty() {
            return Err(ConfigError::Invalid {
                field: "assets",
                reason: "need at least one asset".to_string(),
            });
        }

        let mut seen = std::collections::BTreeSet::new();
        for asset in &self.assets {
            if !seen.insert(asset) {
                return Err(ConfigError::Invalid {
                    field: "assets",
                    reason: format!("{asset} listed twice"),
                });
            }
        }

        for venue in Venue::ALL {
            let venue_config = self.venue(venue);
            if venue_config.fee_rate < Decimal::ZERO || venue_config.fee_rate >= Decimal::ONE {
                return Err(ConfigError::Invalid {
                    field: "fee_rate",
                    reason: format!("{venue} fee must be in [0, 1)"),
                });
            }
            if venue_config.funding_interval_hours <= Decimal::ZERO {
                return Err(ConfigError::Invalid {
                    field: "funding_interval_hours",
                    reason: format!("{venue} interval must be positive"),
                });
            }
        }

        if self.reference_funding_interval_hours <= Decimal::ZERO {
            return Err(ConfigError::Invalid {
                field: "reference_funding_interval_hours",
                reason: "must be positive".to_string(),
            });
        }

        if self.slippage < Decimal::ZERO || self.slippage >= Decimal::ONE {
            return Err(ConfigError::Invalid {
                field: "slippage",
                reason: "must be in [0, 1)".to_string(),
            });
        }

        if self.max_participation_rate <= Decimal::ZERO || self.max_participation_rate > Decimal::ONE {
            return Err(ConfigError::Invalid {
                field: "max_participation_rate",
                reason: "must be in (0, 1]".to_string(),
            });
        }

        if self.dust_threshold < Decimal::ZERO || self.edge_threshold < Decimal::ZERO {
            return Err(ConfigError::Invalid {
                field: "thresholds",
                reason: "dust and edge thresholds must not be negative".to_string(),
            });
        }

        if self.notional_per_trade < Decimal::ZERO || self.max_position_size < Decimal::ZERO {
            return Err(ConfigError::Invalid {
                field: "sizing",
                reason: "notional per trade and position cap must not be negative".to_string(),
            });
        }

        if self.periods_per_year <= Decimal::ZERO {
            return Err(ConfigError::Invalid {
                field: "periods_per_year",
                reason: "must be positive".to_string(),
            });
        }

        if self.max_events == 0 {
            return Err(ConfigError::Invalid {
                field: "max_events",
                reason: "must keep at least one event".to_string(),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config field {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("could not parse config: {0}")]
    Parse(String),

    #[error("could not read config {path}: {reason}")]
    Io { path: String, reason: String },
}
