//! Per-symbol price history and the unified timeline.

use crate::domain::ohlcv::PriceBar;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone)]
pub struct SymbolData {
    pub symbol: String,
    pub bars: Vec<PriceBar>,
    pub date_index: HashMap<NaiveDate, usize>,
}

impl SymbolData {
    /// Bars are sorted by date; a repeated date keeps its first bar.
    pub fn new(symbol: String, mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|bar| bar.date);
        bars.dedup_by_key(|bar| bar.date);
        let date_index = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.date, i))
            .collect();
        Self {
            symbol,
            bars,
            date_index,
        }
    }

    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get_bar(&self, date: NaiveDate) -> Option<&PriceBar> {
        self.date_index.get(&date).map(|&i| &self.bars[i])
    }

    pub fn get_bar_index(&self, date: NaiveDate) -> Option<usize> {
        self.date_index.get(&date).copied()
    }
}

pub fn build_unified_timeline(symbols: &[&SymbolData]) -> Vec<NaiveDate> {
    let unique_dates: BTreeSet<NaiveDate> = symbols
        .iter()
        .flat_map(|sd| sd.bars.iter().map(|bar| bar.date))
        .collect();
    unique_dates.into_iter().collect()
}
