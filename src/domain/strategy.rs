//! Strategy configuration and composition.
//!
//! A strategy is a symbol list, OR'd buy and sell condition groups, and
//! optional risk limits. It is parsed from camelCase JSON or built from a
//! preset, and validated before any simulation starts.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::condition::{ComparisonOperator, Condition, ConditionGroup, IndicatorRef};
use crate::domain::error::StratbenchError;
use crate::domain::indicator::IndicatorSpec;

/// Risk limits, all optional. Percentages are in percent (5.0 = 5%).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskManagement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_position: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_daily_trades: Option<u32>,
}

impl RiskManagement {
    pub fn validate(&self) -> Result<(), StratbenchError> {
        let percentages = [
            ("stopLoss", self.stop_loss),
            ("takeProfit", self.take_profit),
            ("maxPosition", self.max_position),
        ];
        for (name, value) in percentages {
            if let Some(v) = value {
                if !v.is_finite() || v <= 0.0 {
                    return Err(StratbenchError::strategy(format!(
                        "riskManagement.{name} must be a positive percentage, got {v}"
                    )));
                }
            }
        }
        if let Some(max_position) = self.max_position {
            if max_position > 100.0 {
                return Err(StratbenchError::strategy(format!(
                    "riskManagement.maxPosition must not exceed 100, got {max_position}"
                )));
            }
        }
        if self.max_daily_trades == Some(0) {
            return Err(StratbenchError::strategy(
                "riskManagement.maxDailyTrades must be at least 1",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub symbols: Vec<String>,
    #[serde(default)]
    pub buy_conditions: Vec<ConditionGroup>,
    #[serde(default)]
    pub sell_conditions: Vec<ConditionGroup>,
    #[serde(default)]
    pub risk_management: RiskManagement,
}

impl Strategy {
    pub fn from_json(json: &str) -> Result<Self, StratbenchError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, StratbenchError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Golden-cross buy / dead-cross sell on two simple moving averages.
    pub fn sma_crossover(symbols: Vec<String>, fast: usize, slow: usize) -> Self {
        let fast_ma = IndicatorRef::new(IndicatorSpec::Sma { period: fast });
        let slow_ma = IndicatorRef::new(IndicatorSpec::Sma { period: slow });
        Strategy {
            id: format!("sma_crossover_{fast}_{slow}"),
            name: format!("SMA {fast}/{slow} Crossover"),
            description: format!(
                "Buy when SMA({fast}) crosses above SMA({slow}), sell when it crosses below"
            ),
            symbols,
            buy_conditions: vec![ConditionGroup::all(vec![Condition::indicators(
                fast_ma,
                ComparisonOperator::CrossUp,
                slow_ma,
            )])],
            sell_conditions: vec![ConditionGroup::all(vec![Condition::indicators(
                fast_ma,
                ComparisonOperator::CrossDown,
                slow_ma,
            )])],
            risk_management: RiskManagement::default(),
        }
    }

    pub fn validate(&self) -> Result<(), StratbenchError> {
        if self.symbols.is_empty() {
            return Err(StratbenchError::strategy("symbols must not be empty"));
        }
        if let Some(blank) = self.symbols.iter().find(|s| s.trim().is_empty()) {
            return Err(StratbenchError::strategy(format!(
                "symbol {blank:?} is blank"
            )));
        }
        for (i, symbol) in self.symbols.iter().enumerate() {
            if self.symbols[..i].contains(symbol) {
                return Err(StratbenchError::strategy(format!(
                    "symbol {symbol} is listed twice"
                )));
            }
        }
        for group in self.buy_conditions.iter().chain(&self.sell_conditions) {
            group.validate()?;
        }
        self.risk_management.validate()
    }

    /// Distinct indicators referenced by any buy or sell condition, in
    /// first-use order.
    pub fn required_indicators(&self) -> Vec<IndicatorSpec> {
        let mut specs: Vec<IndicatorSpec> = Vec::new();
        let all = self
            .buy_conditions
            .iter()
            .chain(&self.sell_conditions)
            .flat_map(|g| &g.conditions)
            .flat_map(|c| c.indicators_used());
        for spec in all {
            if !specs.contains(&spec) {
                specs.push(spec);
            }
        }
        specs
    }

    /// Bars of history needed before the slowest indicator is defined.
    pub fn warmup(&self) -> usize {
        self.required_indicators()
            .iter()
            .map(IndicatorSpec::lookback)
            .max()
            .unwrap_or(0)
    }
}
