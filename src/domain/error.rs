//! Domain error types.
//!
//! Everything here is raised before a simulation starts or by the adapters
//! around it. The bar-by-bar loop itself never fails: missing indicator
//! history makes a condition false for that bar instead of erroring.

use chrono::NaiveDate;

/// Top-level error type for stratbench.
#[derive(Debug, thiserror::Error)]
pub enum StratbenchError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid date range: start {start} is not before end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("strategy parse error: {reason}")]
    StrategyParse { reason: String },

    #[error("invalid strategy: {reason}")]
    StrategyInvalid { reason: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no price data for {symbol}")]
    NoData { symbol: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StratbenchError {
    pub(crate) fn strategy(reason: impl Into<String>) -> Self {
        StratbenchError::StrategyInvalid {
            reason: reason.into(),
        }
    }

    pub(crate) fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        StratbenchError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for StratbenchError {
    fn from(err: serde_json::Error) -> Self {
        StratbenchError::StrategyParse {
            reason: err.to_string(),
        }
    }
}

impl From<&StratbenchError> for std::process::ExitCode {
    fn from(err: &StratbenchError) -> Self {
        let code: u8 = match err {
            StratbenchError::Io(_) => 1,
            StratbenchError::ConfigParse { .. }
            | StratbenchError::ConfigMissing { .. }
            | StratbenchError::ConfigInvalid { .. }
            | StratbenchError::InvalidDateRange { .. } => 2,
            StratbenchError::Data { .. } => 3,
            StratbenchError::StrategyParse { .. } | StratbenchError::StrategyInvalid { .. } => 4,
            StratbenchError::NoData { .. } => 5,
            StratbenchError::Report { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
