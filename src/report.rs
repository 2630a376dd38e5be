// 14.0: performance report over the equity curve. per-step returns, Sharpe on
// excess returns, max drawdown and annualized return. nothing here feeds back
// into the backtest.

use crate::engine::EquityPoint;
use crate::types::Timestamp;
use rust_decimal::{Decimal, MathematicalOps};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

// 14.1: one row of equity.csv
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurveRow {
    pub t: i64,
    #[serde(with = "rust_decimal::serde::str")]
    pub equity: Decimal,
    #[serde(rename = "return", with = "rust_decimal::serde::str")]
    pub step_return: Decimal,
    // ln(1 + return). zero when equity went non-positive
    #[serde(with = "rust_decimal::serde::str")]
    pub log_return: Decimal,
    // equity / starting capital
    #[serde(with = "rust_decimal::serde::str")]
    pub cum_return: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub excess_return: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub drawdown: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub rows: Vec<CurveRow>,
    pub sharpe_ratio: Decimal,
    // most negative equity / running peak - 1
    pub max_drawdown: Decimal,
    // final equity / starting capital, as a ratio
    pub cumulative_return: Decimal,
    // None when the growth rate does not fit in a Decimal
    pub annualized_return: Option<Decimal>,
}

fn mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values.iter().sum::<Decimal>() / Decimal::from(values.len())
}

// sample standard deviation (n - 1)
fn sample_std(values: &[Decimal]) -> Decimal {
    if values.len() < 2 {
        return Decimal::ZERO;
    }
    let m = mean(values);
    let squares: Decimal = values.iter().map(|v| (*v - m) * (*v - m)).sum();
    (squares / Decimal::from(values.len() - 1)).sqrt().unwrap_or(Decimal::ZERO)
}

// 14.2: zero when there is no spread of returns to divide by
pub fn sharpe_ratio(excess: &[Decimal], periods_per_year: Decimal) -> Decimal {
    // identical returns: the mean can round away from them, so don't trust std
    if excess.windows(2).all(|w| w[0] == w[1]) {
        return Decimal::ZERO;
    }
    let std = sample_std(excess);
    if std.is_zero() {
        return Decimal::ZERO;
    }
    let scale = periods_per_year.sqrt().unwrap_or(Decimal::ZERO);
    mean(excess) / std * scale
}

// 14.3
pub fn annualized_return(cumulative: Decimal, start: Timestamp, end: Timestamp) -> Option<Decimal> {
    let days = start.elapsed_days(&end);
    if days <= Decimal::ZERO || cumulative <= Decimal::ZERO || cumulative == Decimal::ONE {
        return Some(Decimal::ZERO);
    }
    let exponent = Decimal::from(365) / days;
    cumulative.checked_powd(exponent).map(|growth| growth - Decimal::ONE)
}

impl Report {
    pub fn from_curve(
        curve: &[EquityPoint],
        starting_capital: Decimal,
        risk_free_rate: Decimal,
        periods_per_year: Decimal,
    ) -> Self {
        let mut rows = Vec::with_capacity(curve.len());
        let mut excess = Vec::with_capacity(curve.len());
        let per_period_rf = risk_free_rate / periods_per_year;
        let mut peak = Decimal::MIN;
        let mut previous: Option<Decimal> = None;

        for point in curve {
            let equity = point.equity.value();
            // first step has no prior equity and counts as a zero return
            let step_return = match previous {
                Some(prev) if !prev.is_zero() => equity / prev - Decimal::ONE,
                _ => Decimal::ZERO,
            };
            peak = peak.max(equity);
            let drawdown = if peak > Decimal::ZERO {
                equity / peak - Decimal::ONE
            } else {
                Decimal::ZERO
            };

            let log_return = if step_return.is_zero() {
                Decimal::ZERO
            } else {
                (Decimal::ONE + step_return).checked_ln().unwrap_or(Decimal::ZERO)
            };
            let excess_return = step_return - per_period_rf;
            let cum_return = if starting_capital.is_zero() {
                Decimal::ONE
            } else {
                equity / starting_capital
            };

            excess.push(excess_return);
            rows.push(CurveRow {
                t: point.timestamp.as_millis(),
                equity,
                step_return,
                log_return,
                cum_return,
                excess_return,
                drawdown,
            });
            previous = Some(equity);
        }

        let max_drawdown = rows.iter().map(|r| r.drawdown).min().unwrap_or(Decimal::ZERO);
        let cumulative_return = rows.last().map_or(Decimal::ONE, |row| row.cum_return);
        let annualized = match (curve.first(), curve.last()) {
            (Some(first), Some(last)) => annualized_return(cumulative_return, first.timestamp, last.timestamp),
            _ => Some(Decimal::ZERO),
        };

        Self {
            sharpe_ratio: sharpe_ratio(&excess, periods_per_year),
            max_drawdown,
            cumulative_return,
            annualized_return: annualized,
            rows,
        }
    }

    /// Writes `summary.txt` and `equity.csv` into `dir`, creating it if needed.
    pub fn write_to(&self, dir: &Path) -> Result<(), ReportError> {
        fs::create_dir_all(dir).map_err(|e| ReportError::io(dir, e))?;

        let summary_path = dir.join("summary.txt");
        fs::write(&summary_path, self.to_string()).map_err(|e| ReportError::io(&summary_path, e))?;

        let curve_path = dir.join("equity.csv");
        let mut writer = csv::Writer::from_path(&curve_path).map_err(|e| ReportError::Csv(e.to_string()))?;
        for row in &self.rows {
            writer.serialize(row).map_err(|e| ReportError::Csv(e.to_string()))?;
        }
        writer.flush().map_err(|e| ReportError::io(&curve_path, e))?;

        if self.annualized_return.is_none() {
            warn!("annualized return overflowed, reported as n/a");
        }
        info!(dir = %dir.display(), rows = self.rows.len(), "report written");
        Ok(())
    }
}

fn percent(value: Decimal) -> String {
    format!("{:.2}%", value * Decimal::ONE_HUNDRED)
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.annualized_return {
            Some(annualized) => writeln!(f, "Annualized Return: {}", percent(annualized))?,
            None => writeln!(f, "Annualized Return: n/a")?,
        }
        writeln!(f, "Sharpe Ratio: {:.2}", self.sharpe_ratio)?;
        writeln!(f, "Max Drawdown: {}", percent(self.max_drawdown))?;
        writeln!(f, "Cumulative Return: {}", percent(self.cumulative_return - Decimal::ONE))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportError {
    #[error("could not write {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("could not write equity curve: {0}")]
    Csv(String),
}

impl ReportError {
    fn io(path: &Path, err: std::io::Error) -> Self {
        ReportError::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }
}
