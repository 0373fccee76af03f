//! Portfolio state and equity tracking.
//!
//! Positions and last known closes are kept in ordered maps so that equity
//! sums run in the same order on every run.

use std::collections::BTreeMap;

use super::position::Position;

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    pub positions: BTreeMap<String, Position>,
    last_close: BTreeMap<String, f64>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            cash: initial_capital,
            initial_capital,
            positions: BTreeMap::new(),
            last_close: BTreeMap::new(),
        }
    }

    pub fn add_position(&mut self, position: Position) {
        self.positions.insert(position.symbol.clone(), position);
    }

    pub fn get_position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn remove_position(&mut self, symbol: &str) -> Option<Position> {
        self.positions.remove(symbol)
    }

    /// Record the latest close seen for `symbol`.
    pub fn mark(&mut self, symbol: &str, close: f64) {
        self.last_close.insert(symbol.to_string(), close);
    }

    /// Market value of open positions at their last known close.
    pub fn positions_value(&self) -> f64 {
        self.positions
            .values()
            .map(|pos| {
                let price = self
                    .last_close
                    .get(&pos.symbol)
                    .copied()
                    .unwrap_or(pos.entry_price);
                pos.market_value(price)
            })
            .sum()
    }

    pub fn total_equity(&self) -> f64 {
        self.cash + self.positions_value()
    }
}
