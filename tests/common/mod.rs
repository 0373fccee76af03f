#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::HashMap;
use stratbench::domain::backtest::BacktestConfig;
use stratbench::domain::condition::{ComparisonOperator, Condition, ConditionGroup, IndicatorRef};
use stratbench::domain::error::StratbenchError;
use stratbench::domain::indicator::IndicatorSpec;
pub use stratbench::domain::ohlcv::PriceBar;
use stratbench::domain::strategy::{RiskManagement, Strategy};
use stratbench::domain::symbol_data::SymbolData;
use stratbench::ports::data_port::DataPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, StratbenchError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(StratbenchError::Data {
                reason: reason.clone(),
            });
        }
        match self.data.get(symbol) {
            Some(bars) => Ok(bars
                .iter()
                .filter(|b| b.date >= start_date && b.date <= end_date)
                .cloned()
                .collect()),
            None => Err(StratbenchError::NoData {
                symbol: symbol.to_string(),
            }),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(symbol: &str, date: &str, close: f64) -> PriceBar {
    PriceBar {
        symbol: symbol.to_string(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 1000,
    }
}

/// One bar per calendar day from `start`, closing at each of `closes`.
pub fn bars_from_closes(symbol: &str, start: NaiveDate, closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar {
            symbol: symbol.to_string(),
            date: start + chrono::Duration::days(i as i64),
            open: close,
            high: close + 1.0,
            low: (close - 1.0).max(0.01),
            close,
            volume: 1000 + i as i64,
        })
        .collect()
}

pub fn generate_bars(symbol: &str, start_date: &str, count: usize, start_price: f64) -> Vec<PriceBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    let closes: Vec<f64> = (0..count).map(|i| start_price + i as f64).collect();
    bars_from_closes(symbol, start, &closes)
}

pub fn symbol_data(symbol: &str, bars: Vec<PriceBar>) -> SymbolData {
    SymbolData::new(symbol.to_string(), bars)
}

pub fn price() -> IndicatorRef {
    IndicatorRef::new(IndicatorSpec::Price)
}

pub fn sma(period: usize) -> IndicatorRef {
    IndicatorRef::new(IndicatorSpec::Sma { period })
}

/// Buy when close > `buy_above`, sell when close < `sell_below`.
pub fn threshold_strategy(symbols: &[&str], buy_above: f64, sell_below: f64) -> Strategy {
    Strategy {
        id: "threshold".into(),
        name: "Threshold".into(),
        description: String::new(),
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        buy_conditions: vec![ConditionGroup::all(vec![Condition::threshold(
            price(),
            ComparisonOperator::Gt,
            buy_above,
        )])],
        sell_conditions: vec![ConditionGroup::all(vec![Condition::threshold(
            price(),
            ComparisonOperator::Lt,
            sell_below,
        )])],
        risk_management: RiskManagement::default(),
    }
}

pub fn sample_config(start: NaiveDate, end: NaiveDate) -> BacktestConfig {
    BacktestConfig::new(start, end, 10_000.0)
}
