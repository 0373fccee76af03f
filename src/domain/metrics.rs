//! Performance metrics and statistics.
//!
//! All percentages are in percent. Daily-return statistics skip the first
//! simulated day, whose return has no previous day to compare against.
//!
//! - Volatility: sample stddev of daily returns × √252
//! - Sharpe: (annualized return - risk-free rate) / volatility
//! - Sortino: as Sharpe, over the sample stddev of negative daily returns
//! - Calmar: annualized return / max drawdown
//!
//! Every ratio returns 0 when its denominator is zero, and no field is ever
//! NaN or infinite.

use serde::Serialize;

use super::backtest::{BacktestTrade, DailyReturn, TradeSide};
use super::indicator::stddev::sample_stddev;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
pub const DEFAULT_RISK_FREE_RATE: f64 = 3.0;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub total_return: f64,
    pub annualized_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub avg_profit: f64,
    pub avg_loss: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
}

impl Metrics {
    pub fn compute(
        daily_returns: &[DailyReturn],
        trades: &[BacktestTrade],
        initial_capital: f64,
        risk_free_rate: f64,
    ) -> Self {
        let (total_return, annualized_return) = compute_returns(daily_returns, initial_capital);

        let daily: Vec<f64> = daily_returns
            .iter()
            .skip(1)
            .map(|d| d.daily_return)
            .collect();
        let volatility = annualize_deviation(&daily);

        let downside: Vec<f64> = daily.iter().copied().filter(|r| *r < 0.0).collect();
        let downside_deviation = annualize_deviation(&downside);

        let max_drawdown = compute_drawdown(daily_returns);

        let excess = annualized_return - risk_free_rate;
        let sharpe_ratio = ratio(excess, volatility);
        let sortino_ratio = ratio(excess, downside_deviation);
        let calmar_ratio = ratio(annualized_return, max_drawdown);

        let mut winning_trades = 0usize;
        let mut losing_trades = 0usize;
        let mut closed = 0usize;
        let mut total_profit = 0.0_f64;
        let mut total_loss = 0.0_f64;

        for trade in trades {
            if trade.side != TradeSide::Sell {
                continue;
            }
            let Some(pnl) = trade.pnl else {
                continue;
            };
            closed += 1;
            if pnl > 0.0 {
                winning_trades += 1;
                total_profit += pnl;
            } else if pnl < 0.0 {
                losing_trades += 1;
                total_loss += pnl.abs();
            }
        }

        let win_rate = ratio(winning_trades as f64, closed as f64) * 100.0;
        let avg_profit = if winning_trades > 0 {
            ratio(total_profit / winning_trades as f64, initial_capital) * 100.0
        } else {
            0.0
        };
        let avg_loss = if losing_trades > 0 {
            ratio(total_loss / losing_trades as f64, initial_capital) * 100.0
        } else {
            0.0
        };

        Metrics {
            total_return,
            annualized_return,
            volatility,
            sharpe_ratio,
            sortino_ratio,
            calmar_ratio,
            max_drawdown,
            win_rate: finite_or_zero(win_rate),
            avg_profit: finite_or_zero(avg_profit),
            avg_loss: finite_or_zero(avg_loss),
            total_trades: trades.len(),
            winning_trades,
            losing_trades,
        }
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    finite_or_zero(numerator / denominator)
}

fn annualize_deviation(daily_pct: &[f64]) -> f64 {
    finite_or_zero(sample_stddev(daily_pct) * TRADING_DAYS_PER_YEAR.sqrt())
}

fn compute_returns(daily_returns: &[DailyReturn], initial_capital: f64) -> (f64, f64) {
    let Some(last) = daily_returns.last() else {
        return (0.0, 0.0);
    };
    if initial_capital <= 0.0 {
        return (0.0, 0.0);
    }

    let growth = last.portfolio_value / initial_capital;
    let total_return = (growth - 1.0) * 100.0;

    let trading_days = daily_returns.len() as f64;
    let annualized_return = if growth >= 0.0 {
        (growth.powf(TRADING_DAYS_PER_YEAR / trading_days) - 1.0) * 100.0
    } else {
        0.0
    };

    (finite_or_zero(total_return), finite_or_zero(annualized_return))
}

/// Largest peak-to-trough decline in percent.
pub fn compute_drawdown(daily_returns: &[DailyReturn]) -> f64 {
    let Some(first) = daily_returns.first() else {
        return 0.0;
    };

    let mut peak = first.portfolio_value;
    let mut max_dd = 0.0_f64;

    for point in daily_returns {
        if point.portfolio_value > peak {
            peak = point.portfolio_value;
        } else if peak > 0.0 {
            let dd = (peak - point.portfolio_value) / peak * 100.0;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }

    finite_or_zero(max_dd)
}
