//! JSON report adapter: the full `BacktestResult`, pretty-printed.

use std::fs;
use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::StratbenchError;
use crate::ports::report_port::ReportPort;

pub struct JsonReportAdapter;

impl ReportPort for JsonReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), StratbenchError> {
        let json = serde_json::to_string_pretty(result).map_err(|e| StratbenchError::Report {
            reason: format!("failed to serialize result: {e}"),
        })?;

        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(output_path, json + "\n").map_err(|e| StratbenchError::Report {
            reason: format!("failed to write {}: {e}", output_path.display()),
        })
    }
}
