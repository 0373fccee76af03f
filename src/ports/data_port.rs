//! Price history source port.

use crate::domain::error::StratbenchError;
use crate::domain::ohlcv::PriceBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Daily bars for `symbol` with dates in `[start_date, end_date]`, in
    /// chronological order. A symbol the source knows nothing about is
    /// `StratbenchError::NoData`.
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, StratbenchError>;
}
