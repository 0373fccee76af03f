//! CSV trade log adapter. One row per fill, SELL-only columns left empty
//! on BUY rows.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::backtest::{BacktestResult, BacktestTrade, TradeSide};
use crate::domain::error::StratbenchError;
use crate::domain::execution::ExitReason;
use crate::ports::report_port::ReportPort;

pub struct CsvTradeLogAdapter;

#[derive(Serialize)]
struct TradeRow<'a> {
    id: &'a str,
    date: NaiveDate,
    symbol: &'a str,
    side: TradeSide,
    quantity: i64,
    price: f64,
    commission: f64,
    pnl: Option<f64>,
    holding_period: Option<usize>,
    exit_reason: Option<ExitReason>,
}

impl<'a> From<&'a BacktestTrade> for TradeRow<'a> {
    fn from(trade: &'a BacktestTrade) -> Self {
        TradeRow {
            id: &trade.id,
            date: trade.date,
            symbol: &trade.symbol,
            side: trade.side,
            quantity: trade.quantity,
            price: trade.price,
            commission: trade.commission,
            pnl: trade.pnl,
            holding_period: trade.holding_period,
            exit_reason: trade.exit_reason,
        }
    }
}

fn report_err(e: impl std::fmt::Display) -> StratbenchError {
    StratbenchError::Report {
        reason: format!("trade log: {e}"),
    }
}

impl ReportPort for CsvTradeLogAdapter {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), StratbenchError> {
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut writer = csv::Writer::from_path(output_path).map_err(report_err)?;
        if result.trades.is_empty() {
            // serde headers are only emitted with the first record
            writer
                .write_record([
                    "id",
                    "date",
                    "symbol",
                    "side",
                    "quantity",
                    "price",
                    "commission",
                    "pnl",
                    "holding_period",
                    "exit_reason",
                ])
                .map_err(report_err)?;
        }
        for trade in &result.trades {
            writer.serialize(TradeRow::from(trade)).map_err(report_err)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metrics::Metrics;
    use tempfile::TempDir;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn result_with(trades: Vec<BacktestTrade>) -> BacktestResult {
        BacktestResult {
            strategy_id: "s1".into(),
            strategy_name: "Sample".into(),
            start_date: ymd(2024, 1, 1),
            end_date: ymd(2024, 1, 31),
            initial_capital: 10_000.0,
            final_value: 10_000.0,
            metrics: Metrics::default(),
            trades,
            daily_returns: vec![],
        }
    }

    #[test]
    fn writes_one_row_per_fill() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trades.csv");
        let trades = vec![
            BacktestTrade {
                id: "trade_1".into(),
                symbol: "A".into(),
                side: TradeSide::Buy,
                quantity: 10,
                price: 100.0,
                date: ymd(2024, 1, 2),
                commission: 0.0,
                pnl: None,
                holding_period: None,
                exit_reason: None,
            },
            BacktestTrade {
                id: "trade_2".into(),
                symbol: "A".into(),
                side: TradeSide::Sell,
                quantity: 10,
                price: 110.0,
                date: ymd(2024, 1, 5),
                commission: 0.0,
                pnl: Some(100.0),
                holding_period: Some(3),
                exit_reason: Some(ExitReason::TakeProfit),
            },
        ];

        CsvTradeLogAdapter.write(&result_with(trades), &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("id,date,symbol,side"));
        assert_eq!(lines[1], "trade_1,2024-01-02,A,BUY,10,100.0,0.0,,,");
        assert_eq!(lines[2], "trade_2,2024-01-05,A,SELL,10,110.0,0.0,100.0,3,TAKE_PROFIT");
    }

    #[test]
    fn empty_log_still_has_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trades.csv");
        CsvTradeLogAdapter.write(&result_with(vec![]), &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
