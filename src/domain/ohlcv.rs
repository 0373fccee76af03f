//! Daily price bar.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily observation for a symbol. Produced by a data adapter and
/// consumed read-only by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}
