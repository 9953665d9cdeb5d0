//! Backtest driver: walks one asset's series a day at a time.
//!
//! Day `i` sees only `bars[0..=i]`. Indicators are refreshed on that prefix,
//! the state machine is asked for a signal, and a side-changing signal goes
//! through the capital manager and broker before the held leg is swapped.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use swingindex_core::domain::{Bar, OpenPosition, PositionError, Signal};
use swingindex_core::engine::{
    ConstantsError, EnrichedBar, IncrementalEngine, IndicatorEngine, IndicatorError,
    RecomputeMode, StrategyConstants,
};
use swingindex_core::strategy::{PositionStateMachine, StateMachineParams};

use crate::broker::Broker;
use crate::capital::CapitalManager;
use crate::ledger::TradeLedger;

/// First day the state machine is consulted.
const FIRST_DAY: usize = 2;

/// Why a day produced no trade, or why a run stopped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepError {
    #[error("day {day}: indicator field '{field}' not yet available")]
    WarmupInsufficient { day: usize, field: &'static str },

    #[error(transparent)]
    Indicator(#[from] IndicatorError),

    #[error("order at {price} not filled")]
    OrderRejected { price: f64 },

    #[error("capital manager rejected {shares} shares at {price}")]
    CapitalRejected { shares: f64, price: f64 },

    #[error("ledger inconsistency: {0}")]
    Position(#[from] PositionError),

    #[error("series is empty")]
    EmptySeries,
}

/// Per-run tallies of days that produced no trade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipCounts {
    pub warmup: usize,
    pub degenerate: usize,
    pub order_rejected: usize,
    pub capital_rejected: usize,
}

/// Outcome of driving one asset across its full range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRun {
    pub symbol: String,
    pub bar_count: usize,
    pub ledger: TradeLedger,
    /// The leg still held at the end of the range. Not force-closed.
    pub open_position: OpenPosition,
    pub skips: SkipCounts,
    /// Bar index of the first degenerate swing index, if any.
    pub degenerate_index: Option<usize>,
}

/// Produces the enriched visible prefix for a day.
enum Enricher<'e> {
    Full(&'e IndicatorEngine),
    Incremental(IncrementalEngine),
}

impl Enricher<'_> {
    fn window(&mut self, bars: &[Bar], day: usize) -> Result<Cow<'_, [EnrichedBar]>, IndicatorError> {
        match self {
            Enricher::Full(engine) => Ok(Cow::Owned(engine.compute(&bars[..=day])?)),
            Enricher::Incremental(stream) => {
                while stream.len() <= day {
                    stream.push(bars[stream.len()].clone())?;
                }
                Ok(Cow::Borrowed(&stream.history()[..=day]))
            }
        }
    }
}

/// Drives one asset. Construct one per asset run: the capital manager's
/// state belongs to the run.
pub struct BacktestDriver<'a> {
    engine: IndicatorEngine,
    params: StateMachineParams,
    broker: &'a dyn Broker,
    capital: Option<Box<dyn CapitalManager + 'a>>,
    shares: f64,
    mode: RecomputeMode,
}

impl<'a> BacktestDriver<'a> {
    pub fn new(constants: StrategyConstants, broker: &'a dyn Broker) -> Result<Self, ConstantsError> {
        Ok(Self {
            engine: IndicatorEngine::new(constants)?,
            params: StateMachineParams::from(&constants),
            broker,
            capital: None,
            shares: 1.0,
            mode: RecomputeMode::default(),
        })
    }

    pub fn with_capital(mut self, capital: Box<dyn CapitalManager + 'a>) -> Self {
        self.capital = Some(capital);
        self
    }

    pub fn with_shares(mut self, shares: f64) -> Self {
        self.shares = shares;
        self
    }

    pub fn with_mode(mut self, mode: RecomputeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Run the asset over `bars`, which must be ascending and validated.
    ///
    /// Per-day rejections are counted in [`AssetRun::skips`]; only an empty
    /// series or an inconsistent ledger aborts the run.
    pub fn run(mut self, symbol: &str, bars: &[Bar]) -> Result<AssetRun, StepError> {
        let first = bars.first().ok_or(StepError::EmptySeries)?;

        let mut enricher = match self.mode {
            RecomputeMode::Full => Enricher::Full(&self.engine),
            RecomputeMode::Incremental => Enricher::Incremental(self.engine.incremental()),
        };

        let mut position = OpenPosition::initial(symbol, first.date);
        let mut machine = PositionStateMachine::initial(self.params);
        let mut ledger = TradeLedger::new();
        let mut skips = SkipCounts::default();
        let mut degenerate_index = None;

        for day in FIRST_DAY..bars.len() {
            let signal = match self.evaluate(&mut enricher, &machine, symbol, bars, day) {
                Ok(Some(signal)) => signal,
                Ok(None) => continue,
                Err(StepError::WarmupInsufficient { field, .. }) => {
                    trace!(symbol, day, field, "indicators not ready");
                    skips.warmup += 1;
                    continue;
                }
                Err(StepError::Indicator(IndicatorError::DegenerateRange { index })) => {
                    if degenerate_index.is_none() {
                        warn!(
                            symbol,
                            day,
                            index,
                            "degenerate swing index range, no further trades for this asset"
                        );
                        degenerate_index = Some(index);
                    }
                    skips.degenerate += 1;
                    continue;
                }
                Err(StepError::OrderRejected { price }) => {
                    debug!(symbol, day, price, "order not filled");
                    skips.order_rejected += 1;
                    continue;
                }
                Err(StepError::CapitalRejected { shares, price }) => {
                    debug!(symbol, day, shares, price, "capital manager rejected order");
                    skips.capital_rejected += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let next = match machine.transition(&signal, day) {
                Some(next) => next,
                None => continue,
            };
            let today = &bars[day];
            let price = signal.trigger_price;

            let closed = position.close(price, day, today.date, signal.reason)?;
            let realized = closed.profit_loss();
            ledger.append(closed);
            if let Some(capital) = self.capital.as_mut() {
                capital.apply(self.shares, price, realized);
            }

            info!(
                symbol,
                day,
                price,
                side = %next.side(),
                reason = signal.reason.as_str(),
                realized,
                "position reversed"
            );
            position = OpenPosition::open(symbol, next.side(), price, day, today.date, self.shares);
            machine = next;
        }

        Ok(AssetRun {
            symbol: symbol.to_string(),
            bar_count: bars.len(),
            ledger,
            open_position: position,
            skips,
            degenerate_index,
        })
    }

    /// One day's decision: the accepted side-changing signal, if any.
    fn evaluate(
        &self,
        enricher: &mut Enricher<'_>,
        machine: &PositionStateMachine,
        symbol: &str,
        bars: &[Bar],
        day: usize,
    ) -> Result<Option<Signal>, StepError> {
        let window = enricher.window(bars, day)?;
        if let Some(field) = window.last().and_then(EnrichedBar::missing_field) {
            return Err(StepError::WarmupInsufficient { day, field });
        }

        let signal = machine.signal(&window);
        if !signal.changes_side(machine.side()) {
            return Ok(None);
        }
        let price = signal.trigger_price;

        if let Some(capital) = &self.capital {
            if !capital.check(self.shares, price) {
                return Err(StepError::CapitalRejected {
                    shares: self.shares,
                    price,
                });
            }
        }
        if !self.broker.submit_order(symbol, price, &bars[day]) {
            return Err(StepError::OrderRejected { price });
        }
        Ok(Some(signal))
    }
}
