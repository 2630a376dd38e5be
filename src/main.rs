//! funding-arb: backtest a cross-venue funding rate arbitrage.
//!
//! Loads the strategy config and cleaned per-asset history, builds the
//! threshold signal schedule, runs the backtest and writes the report.
//!
//! ```sh
//! funding-arb --config config.json --data-dir data/historical/clean --output results
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use funding_arb::{Backtest, HistoricalData, PassThroughRisk, Report, SignalSchedule, StrategyConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "funding-arb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Strategy config (JSON). Defaults are used when omitted.
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Directory holding one cleaned `<ASSET>.csv` per asset
    #[arg(long, short = 'd', default_value = "data/historical/clean")]
    data_dir: PathBuf,

    /// Where summary.txt and equity.csv are written
    #[arg(long, short = 'o', default_value = "results")]
    output: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => StrategyConfig::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None => StrategyConfig::default(),
    };

    let data = HistoricalData::load_dir(&cli.data_dir, &config.assets)
        .with_context(|| format!("loading market data from {}", cli.data_dir.display()))?;
    let schedule = SignalSchedule::build(&data, &config).context("building signal schedule")?;

    let mut backtest = Backtest::new(config.clone(), PassThroughRisk).context("invalid strategy config")?;
    let result = backtest.run(&data, &schedule).context("backtest aborted")?;

    let report = Report::from_curve(
        &result.equity_curve,
        config.starting_capital,
        config.risk_free_rate,
        config.periods_per_year,
    );
    report
        .write_to(&cli.output)
        .with_context(|| format!("writing report to {}", cli.output.display()))?;

    for ledger in &result.ledgers {
        info!(
            venue = %ledger.venue,
            cash = %ledger.cash,
            fees = %ledger.fees_paid,
            realized = %ledger.realized_pnl,
            funding = %ledger.funding_received,
            "final ledger"
        );
    }
    print!("{report}");
    Ok(())
}
