// 8.0 engine/core.rs: the backtest driver. owns the book, the risk hooks and the
// audit log, and walks the signal index one step at a time.

use super::book::Book;
use super::execution::ExecutionSimulator;
use super::intents::IntentGenerator;
use super::results::{BacktestResult, EngineError, ExecutionReport, LedgerSummary, StepResult};
use crate::config::StrategyConfig;
use crate::events::{EquityMarkedEvent, EventLog, EventPayload, IntentSkippedEvent, SkipReason};
use crate::market::{MarketDataProvider, MarketSnapshot};
use crate::risk::RiskManager;
use crate::signal::{TargetNotionals, TargetProvider};
use crate::types::{Timestamp, Venue};
use tracing::{info, trace};

/** 8.1: all run state lives here */
#[derive(Debug)]
pub struct Backtest<R: RiskManager> {
    config: StrategyConfig,
    book: Book,
    generator: IntentGenerator,
    simulator: ExecutionSimulator,
    risk: R,
    events: EventLog,
    last_timestamp: Option<Timestamp>,
    steps: usize,
    fills: usize,
    funding_settlements: usize,
}

impl<R: RiskManager> Backtest<R> {
    pub fn new(config: StrategyConfig, risk: R) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            book: Book::from_config(&config),
            generator: IntentGenerator::new(config.dust_threshold),
            simulator: ExecutionSimulator::new(config.slippage, config.max_participation_rate),
            events: EventLog::new(config.max_events),
            risk,
            config,
            last_timestamp: None,
            steps: 0,
            fills: 0,
            funding_settlements: 0,
        })
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn book(&self) -> &Book {
        &self.book
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn risk(&self) -> &R {
        &self.risk
    }

    // 8.2: one step of the pipeline. funding first so a position opened this step
    // does not collect this step's funding.
    pub fn step(
        &mut self,
        timestamp: Timestamp,
        snapshot: &MarketSnapshot,
        targets: &TargetNotionals,
    ) -> Result<StepResult, EngineError> {
        if let Some(previous) = self.last_timestamp {
            if timestamp <= previous {
                return Err(EngineError::NonIncreasingTimestamp {
                    previous,
                    current: timestamp,
                });
            }
        }
        if snapshot.timestamp != timestamp {
            return Err(EngineError::SnapshotMismatch {
                expected: timestamp,
                found: snapshot.timestamp,
            });
        }
        self.last_timestamp = Some(timestamp);

        // 8.2.1: funding
        let funding = self.book.accrue_funding(timestamp, snapshot)?;
        for settlement in &funding {
            self.events.emit(timestamp, EventPayload::FundingSettled(settlement.clone()));
        }

        // 8.2.2: intents
        let generated = self
            .generator
            .generate(snapshot, targets, self.book.ledger(Venue::REFERENCE))?;
        let skipped = generated.skipped.iter().map(|s| s.asset.clone()).collect();
        for skip in generated.skipped {
            self.events.emit(timestamp, EventPayload::IntentSkipped(skip));
        }

        // 8.2.3: vet + execute
        let (binance, hyperliquid) = self.book.ledgers();
        let approved = self.risk.vet(snapshot, generated.intents, binance, hyperliquid);
        let executions = self.simulator.simulate(snapshot, &approved, &mut self.book)?;
        self.record_executions(timestamp, &executions);

        // 8.2.4: post-trade de-risking
        let (binance, hyperliquid) = self.book.ledgers();
        let excess = self.risk.excess_risk(snapshot, binance, hyperliquid);
        let excess_executions = self.simulator.simulate(snapshot, &excess, &mut self.book)?;
        self.record_executions(timestamp, &excess_executions);

        // 8.2.5: mark
        let (binance_equity, hyperliquid_equity) = self.book.equity(snapshot)?;
        let equity = self.book.mark_to_market(timestamp, snapshot)?;
        self.events.emit(
            timestamp,
            EventPayload::EquityMarked(EquityMarkedEvent {
                binance_equity,
                hyperliquid_equity,
                total_equity: equity,
            }),
        );

        self.steps += 1;
        self.funding_settlements += funding.len();
        trace!(
            %timestamp,
            %equity,
            funding = funding.len(),
            fills = executions.iter().filter(|e| e.is_filled()).count(),
            "step complete"
        );

        Ok(StepResult {
            timestamp,
            funding,
            executions,
            excess_executions,
            skipped,
            equity,
        })
    }

    fn record_executions(&mut self, timestamp: Timestamp, executions: &[ExecutionReport]) {
        for execution in executions {
            match &execution.legs {
                Some((buy, sell)) => {
                    self.fills += 1;
                    self.events.emit(timestamp, EventPayload::TradeFilled(buy.clone()));
                    self.events.emit(timestamp, EventPayload::TradeFilled(sell.clone()));
                }
                None => {
                    self.events.emit(
                        timestamp,
                        EventPayload::IntentSkipped(IntentSkippedEvent {
                            asset: execution.intent.asset().clone(),
                            requested_quantity: execution.intent.quantity(),
                            reason: SkipReason::NoLiquidity {
                                buy_venue: execution.intent.buy_venue(),
                                sell_venue: execution.intent.sell_venue(),
                            },
                        }),
                    );
                }
            }
        }
    }

    // 8.3: full run over the signal index. stops at the first error, no rollback.
    pub fn run<M, T>(&mut self, market: &M, signals: &T) -> Result<BacktestResult, EngineError>
    where
        M: MarketDataProvider,
        T: TargetProvider,
    {
        let timestamps = signals.timestamps();
        info!(
            steps = timestamps.len(),
            assets = self.config.assets.len(),
            starting_capital = %self.config.starting_capital,
            "backtest started"
        );

        for &timestamp in &timestamps {
            let snapshot = market.snapshot(timestamp)?;
            let targets = signals.targets(timestamp)?;
            self.step(timestamp, &snapshot, &targets)?;
        }

        let result = self.result();
        info!(
            steps = result.steps,
            fills = result.fills,
            funding_settlements = result.funding_settlements,
            final_equity = %result.final_equity().map(|q| q.value()).unwrap_or(self.config.starting_capital),
            "backtest finished"
        );
        Ok(result)
    }

    pub fn result(&self) -> BacktestResult {
        let (binance, hyperliquid) = self.book.ledgers();
        BacktestResult {
            equity_curve: self.book.equity_curve().to_vec(),
            ledgers: [LedgerSummary::from(binance), LedgerSummary::from(hyperliquid)],
            steps: self.steps,
            fills: self.fills,
            funding_settlements: self.funding_settlements,
            events_emitted: self.events.emitted(),
        }
    }
}
