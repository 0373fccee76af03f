//! CSV file data adapter.
//!
//! Each symbol lives in `<base_path>/<SYMBOL>.csv` with a header row of
//! `date,open,high,low,close,volume` and ISO dates.

use crate::domain::error::StratbenchError;
use crate::domain::ohlcv::PriceBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: i64,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, StratbenchError> {
        let path = self.csv_path(symbol);
        if !path.is_file() {
            return Err(StratbenchError::NoData {
                symbol: symbol.to_string(),
            });
        }

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|e| StratbenchError::Data {
                reason: format!("failed to read {}: {e}", path.display()),
            })?;

        let mut bars = Vec::new();
        for (line, result) in rdr.deserialize::<CsvRow>().enumerate() {
            let row = result.map_err(|e| StratbenchError::Data {
                reason: format!("{} row {}: {e}", path.display(), line + 1),
            })?;

            if row.date < start_date || row.date > end_date {
                continue;
            }

            bars.push(PriceBar {
                symbol: symbol.to_string(),
                date: row.date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }

        bars.sort_by_key(|b| b.date);
        tracing::debug!(symbol, bars = bars.len(), path = %path.display(), "loaded price history");
        Ok(bars)
    }
}
