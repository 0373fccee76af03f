//! Backtest engine and event loop.
//!
//! One iteration per date on the unified timeline. For each strategy symbol
//! with a bar on that date, in strategy order:
//!
//! 1. Mark the symbol's close
//! 2. Skip until the symbol's bar index reaches the strategy warm-up
//! 3. LONG: stop-loss, then take-profit, then the sell signal
//! 4. FLAT: the buy signal, unless the daily trade limit is reached
//!
//! Indicators are recomputed from `bars[..=i]` whenever a signal is
//! evaluated, so a decision at bar `i` never sees later bars. After all
//! symbols, the portfolio is valued and a `DailyReturn` appended.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::condition_eval::evaluate_signal;
use super::error::StratbenchError;
use super::execution::{
    EntryResult, ExecutionConfig, ExitReason, check_triggers, enter_long, exit_position,
};
use super::indicator::compute_indicators;
use super::metrics::{DEFAULT_RISK_FREE_RATE, Metrics};
use super::portfolio::Portfolio;
use super::strategy::Strategy;
use super::symbol_data::{SymbolData, build_unified_timeline};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    /// Percent of execution price charged per share on every fill.
    pub commission_pct: f64,
    /// Percent adverse price adjustment on every fill.
    pub slippage_pct: f64,
    /// Annual percent, used by Sharpe and Sortino.
    pub risk_free_rate: f64,
}

impl BacktestConfig {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, initial_capital: f64) -> Self {
        BacktestConfig {
            start_date,
            end_date,
            initial_capital,
            commission_pct: 0.0,
            slippage_pct: 0.0,
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
        }
    }

    pub fn validate(&self) -> Result<(), StratbenchError> {
        if self.start_date >= self.end_date {
            return Err(StratbenchError::InvalidDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(StratbenchError::config_invalid(
                "backtest",
                "initial_capital",
                format!("must be positive, got {}", self.initial_capital),
            ));
        }
        let percentages = [
            ("commission_pct", self.commission_pct),
            ("slippage_pct", self.slippage_pct),
        ];
        for (key, value) in percentages {
            if !value.is_finite() || value < 0.0 {
                return Err(StratbenchError::config_invalid(
                    "backtest",
                    key,
                    format!("must be non-negative, got {value}"),
                ));
            }
            if value >= 100.0 {
                return Err(StratbenchError::config_invalid(
                    "backtest",
                    key,
                    format!("must be below 100, got {value}"),
                ));
            }
        }
        if !self.risk_free_rate.is_finite() {
            return Err(StratbenchError::config_invalid(
                "backtest",
                "risk_free_rate",
                "must be a finite number",
            ));
        }
        Ok(())
    }

    fn execution(&self) -> ExecutionConfig {
        ExecutionConfig {
            commission_pct: self.commission_pct,
            slippage_pct: self.slippage_pct,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// One fill. `pnl`, `holding_period` and `exit_reason` are set on SELL only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestTrade {
    pub id: String,
    pub symbol: String,
    #[serde(rename = "type")]
    pub side: TradeSide,
    pub quantity: i64,
    /// Execution price, slippage included.
    pub price: f64,
    pub date: NaiveDate,
    pub commission: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pnl: Option<f64>,
    /// Bars held.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holding_period: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_reason: Option<ExitReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReturn {
    pub date: NaiveDate,
    pub portfolio_value: f64,
    /// Percent change from the previous day; 0 on the first day.
    pub daily_return: f64,
    /// Percent change from initial capital.
    pub cumulative_return: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestResult {
    pub strategy_id: String,
    pub strategy_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub final_value: f64,
    #[serde(flatten)]
    pub metrics: Metrics,
    pub trades: Vec<BacktestTrade>,
    pub daily_returns: Vec<DailyReturn>,
}

/// Snapshot handed to the progress callback after each simulated date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub date: NaiveDate,
}

impl Progress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.completed as f64 / self.total as f64 * 100.0
    }
}

pub fn run_backtest(
    data: &[SymbolData],
    strategy: &Strategy,
    config: &BacktestConfig,
) -> Result<BacktestResult, StratbenchError> {
    run_backtest_with_progress(data, strategy, config, |_| {})
}

/// Validate inputs, then simulate. Only validation and missing data fail;
/// the loop itself is infallible.
pub fn run_backtest_with_progress<F>(
    data: &[SymbolData],
    strategy: &Strategy,
    config: &BacktestConfig,
    mut on_progress: F,
) -> Result<BacktestResult, StratbenchError>
where
    F: FnMut(Progress),
{
    strategy.validate()?;
    config.validate()?;

    let mut active: Vec<&SymbolData> = Vec::with_capacity(strategy.symbols.len());
    for symbol in &strategy.symbols {
        match data.iter().find(|sd| &sd.symbol == symbol) {
            Some(sd) if !sd.is_empty() => active.push(sd),
            _ => tracing::warn!(symbol = %symbol, "no price data, skipping symbol"),
        }
    }
    if active.is_empty() {
        return Err(StratbenchError::NoData {
            symbol: strategy.symbols.join(","),
        });
    }

    let specs = strategy.required_indicators();
    let warmup = strategy.warmup();
    let timeline = simulation_timeline(&active, config, warmup);

    tracing::info!(
        strategy = %strategy.id,
        symbols = active.len(),
        warmup,
        days = timeline.len(),
        "starting backtest"
    );
    if timeline.is_empty() {
        tracing::warn!(
            start = %config.start_date,
            end = %config.end_date,
            "no date in range has enough history for the strategy"
        );
    }

    let costs = config.execution();
    let risk = &strategy.risk_management;
    let mut portfolio = Portfolio::new(config.initial_capital);
    let mut trades: Vec<BacktestTrade> = Vec::new();
    let mut daily_returns: Vec<DailyReturn> = Vec::with_capacity(timeline.len());

    for (day, &date) in timeline.iter().enumerate() {
        let mut buys_today: u32 = 0;

        for sd in &active {
            let Some(index) = sd.get_bar_index(date) else {
                continue;
            };
            let bar = &sd.bars[index];
            portfolio.mark(&sd.symbol, bar.close);

            if index < warmup {
                continue;
            }
            let history = &sd.bars[..=index];

            if let Some(position) = portfolio.get_position(&sd.symbol) {
                let reason = check_triggers(position, bar.close, risk).or_else(|| {
                    let indicators = compute_indicators(history, &specs);
                    evaluate_signal(&strategy.sell_conditions, &indicators, index)
                        .then_some(ExitReason::Signal)
                });
                let Some(reason) = reason else {
                    continue;
                };
                tracing::trace!(
                    symbol = %sd.symbol,
                    unrealized = position.unrealized_pnl(bar.close),
                    ?reason,
                    "exit triggered"
                );

                if let Some(exit) = exit_position(&mut portfolio, &sd.symbol, bar.close, index, &costs)
                {
                    tracing::debug!(
                        symbol = %sd.symbol,
                        %date,
                        quantity = exit.quantity,
                        price = exit.exit_price,
                        pnl = exit.pnl,
                        ?reason,
                        "sell"
                    );
                    trades.push(BacktestTrade {
                        id: format!("trade_{}", trades.len() + 1),
                        symbol: sd.symbol.clone(),
                        side: TradeSide::Sell,
                        quantity: exit.quantity,
                        price: exit.exit_price,
                        date,
                        commission: exit.commission,
                        pnl: Some(exit.pnl),
                        holding_period: Some(exit.holding_period),
                        exit_reason: Some(reason),
                    });
                }
                continue;
            }

            if risk.max_daily_trades.is_some_and(|limit| buys_today >= limit) {
                continue;
            }
            let indicators = compute_indicators(history, &specs);
            if !evaluate_signal(&strategy.buy_conditions, &indicators, index) {
                continue;
            }

            match enter_long(
                &mut portfolio,
                &sd.symbol,
                bar.close,
                date,
                index,
                risk.max_position,
                &costs,
            ) {
                EntryResult::Entered {
                    quantity,
                    execution_price,
                    commission,
                } => {
                    buys_today += 1;
                    tracing::debug!(
                        symbol = %sd.symbol,
                        %date,
                        quantity,
                        price = execution_price,
                        "buy"
                    );
                    trades.push(BacktestTrade {
                        id: format!("trade_{}", trades.len() + 1),
                        symbol: sd.symbol.clone(),
                        side: TradeSide::Buy,
                        quantity,
                        price: execution_price,
                        date,
                        commission,
                        pnl: None,
                        holding_period: None,
                        exit_reason: None,
                    });
                }
                EntryResult::InsufficientCapital => {
                    tracing::debug!(
                        symbol = %sd.symbol,
                        %date,
                        cash = portfolio.cash,
                        "buy signal skipped: insufficient capital"
                    );
                }
            }
        }

        let value = portfolio.total_equity();
        let daily_return = match daily_returns.last() {
            Some(prev) if prev.portfolio_value > 0.0 => {
                (value / prev.portfolio_value - 1.0) * 100.0
            }
            _ => 0.0,
        };
        daily_returns.push(DailyReturn {
            date,
            portfolio_value: value,
            daily_return,
            cumulative_return: (value / config.initial_capital - 1.0) * 100.0,
        });

        let progress = Progress {
            completed: day + 1,
            total: timeline.len(),
            date,
        };
        tracing::trace!(date = %date, value, percent = progress.percent(), "bar complete");
        on_progress(progress);
    }

    let final_value = daily_returns
        .last()
        .map(|d| d.portfolio_value)
        .unwrap_or(config.initial_capital);
    let metrics = Metrics::compute(
        &daily_returns,
        &trades,
        config.initial_capital,
        config.risk_free_rate,
    );

    tracing::info!(
        strategy = %strategy.id,
        trades = trades.len(),
        final_value,
        total_return = metrics.total_return,
        "backtest complete"
    );

    Ok(BacktestResult {
        strategy_id: strategy.id.clone(),
        strategy_name: strategy.name.clone(),
        start_date: config.start_date,
        end_date: config.end_date,
        initial_capital: config.initial_capital,
        final_value,
        metrics,
        trades,
        daily_returns,
    })
}

/// Dates in `[start, end]` from the first one on which some symbol has a
/// bar at or past the warm-up index.
fn simulation_timeline(
    active: &[&SymbolData],
    config: &BacktestConfig,
    warmup: usize,
) -> Vec<NaiveDate> {
    let in_range: Vec<NaiveDate> = build_unified_timeline(active)
        .into_iter()
        .filter(|d| *d >= config.start_date && *d <= config.end_date)
        .collect();

    let first_warm = in_range.iter().position(|&date| {
        active
            .iter()
            .any(|sd| sd.get_bar_index(date).is_some_and(|i| i >= warmup))
    });

    match first_warm {
        Some(start) => in_range[start..].to_vec(),
        None => Vec::new(),
    }
}
