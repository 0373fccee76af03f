//! Trade execution and fill simulation.
//!
//! Implements entry/exit fills with slippage, whole-share sizing, per-share
//! commissions, position caps, and stop-loss/take-profit trigger checks.
//!
//! - Buy: execution = close × (1 + slippage%), commission = execution ×
//!   commission% per share, shares = floor(cash / (execution + commission))
//! - Sell: execution = close × (1 - slippage%), proceeds = shares ×
//!   (execution - commission), pnl = proceeds - shares × entry price

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::portfolio::Portfolio;
use super::position::Position;
use super::strategy::RiskManagement;

/// Cost parameters shared by every fill in a run.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExecutionConfig {
    pub commission_pct: f64,
    pub slippage_pct: f64,
}

/// Per-share commission at a given execution price.
pub fn calculate_commission(execution_price: f64, config: &ExecutionConfig) -> f64 {
    execution_price * config.commission_pct / 100.0
}

/// Buy execution price: market_price * (1 + slippage_pct / 100)
pub fn apply_slippage_buy(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 + slippage_pct / 100.0)
}

/// Sell execution price: market_price * (1 - slippage_pct / 100)
pub fn apply_slippage_sell(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 - slippage_pct / 100.0)
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    Signal,
    StopLoss,
    TakeProfit,
}

/// Result of an entry attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryResult {
    Entered {
        quantity: i64,
        execution_price: f64,
        commission: f64,
    },
    InsufficientCapital,
}

/// Whole shares affordable with `cash`, optionally capped so that
/// `shares × execution_price` stays within `cap_value`.
pub fn size_order(
    cash: f64,
    execution_price: f64,
    commission_per_share: f64,
    cap_value: Option<f64>,
) -> i64 {
    let unit_cost = execution_price + commission_per_share;
    if unit_cost <= 0.0 || cash <= 0.0 {
        return 0;
    }

    let mut quantity = (cash / unit_cost).floor() as i64;
    if let Some(cap) = cap_value {
        let capped = (cap / execution_price).floor() as i64;
        quantity = quantity.min(capped.max(0));
    }
    while quantity > 0 && quantity as f64 * unit_cost > cash {
        quantity -= 1;
    }
    quantity
}

/// Open a long position in `symbol`.
///
/// `max_position_pct`, when set, caps the position's notional value at
/// that share of the portfolio's current total equity.
pub fn enter_long(
    portfolio: &mut Portfolio,
    symbol: &str,
    market_price: f64,
    date: NaiveDate,
    bar: usize,
    max_position_pct: Option<f64>,
    config: &ExecutionConfig,
) -> EntryResult {
    let execution_price = apply_slippage_buy(market_price, config.slippage_pct);
    let per_share_commission = calculate_commission(execution_price, config);
    let cap = max_position_pct.map(|pct| portfolio.total_equity() * pct / 100.0);

    let quantity = size_order(portfolio.cash, execution_price, per_share_commission, cap);
    if quantity == 0 {
        return EntryResult::InsufficientCapital;
    }

    let commission = quantity as f64 * per_share_commission;
    portfolio.cash -= quantity as f64 * execution_price + commission;

    portfolio.add_position(Position {
        symbol: symbol.to_string(),
        quantity,
        entry_price: execution_price,
        entry_date: date,
        entry_bar: bar,
        entry_commission: commission,
    });

    EntryResult::Entered {
        quantity,
        execution_price,
        commission,
    }
}

/// Result of an exit.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitResult {
    pub quantity: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub proceeds: f64,
    pub commission: f64,
    pub pnl: f64,
    pub holding_period: usize,
}

/// Close the position in `symbol`, crediting the proceeds to cash.
pub fn exit_position(
    portfolio: &mut Portfolio,
    symbol: &str,
    market_price: f64,
    bar: usize,
    config: &ExecutionConfig,
) -> Option<ExitResult> {
    let position = portfolio.remove_position(symbol)?;

    let exit_price = apply_slippage_sell(market_price, config.slippage_pct);
    let per_share_commission = calculate_commission(exit_price, config);
    let shares = position.quantity as f64;
    let proceeds = shares * (exit_price - per_share_commission);

    portfolio.cash += proceeds;

    Some(ExitResult {
        quantity: position.quantity,
        entry_price: position.entry_price,
        exit_price,
        proceeds,
        commission: shares * per_share_commission,
        pnl: proceeds - shares * position.entry_price,
        holding_period: position.bars_held(bar),
    })
}

/// Stop-loss or take-profit breach at `price`, stop-loss first.
pub fn check_triggers(position: &Position, price: f64, risk: &RiskManagement) -> Option<ExitReason> {
    if let Some(pct) = risk.stop_loss {
        if position.stop_loss_hit(pct, price) {
            return Some(ExitReason::StopLoss);
        }
    }
    if let Some(pct) = risk.take_profit {
        if position.take_profit_hit(pct, price) {
            return Some(ExitReason::TakeProfit);
        }
    }
    None
}
