//! Run configuration validation.
//!
//! Checks every INI field before anything is loaded, so that a typo in a
//! number is reported instead of silently falling back to a default.

use crate::domain::error::StratbenchError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const SMA_CROSSOVER_PRESET: &str = "sma_crossover";

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), StratbenchError> {
    validate_dates(config)?;
    validate_initial_capital(config)?;
    validate_percentage(config, "commission_pct")?;
    validate_percentage(config, "slippage_pct")?;
    check_double(config, "backtest", "risk_free_rate")?;
    Ok(())
}

/// `has_override` is true when the strategy file comes from the command
/// line, in which case the `[strategy]` section may be absent.
pub fn validate_strategy_config(
    config: &dyn ConfigPort,
    has_override: bool,
) -> Result<(), StratbenchError> {
    if has_override || config.get_string("strategy", "file").is_some() {
        return Ok(());
    }

    let Some(preset) = config.get_string("strategy", "preset") else {
        return Err(StratbenchError::ConfigMissing {
            section: "strategy".to_string(),
            key: "file".to_string(),
        });
    };
    if preset != SMA_CROSSOVER_PRESET {
        return Err(StratbenchError::config_invalid(
            "strategy",
            "preset",
            format!("unknown preset '{preset}', expected {SMA_CROSSOVER_PRESET}"),
        ));
    }

    let symbols = config
        .get_string("strategy", "symbols")
        .map(|s| parse_symbol_list(&s))
        .unwrap_or_default();
    if symbols.is_empty() {
        return Err(StratbenchError::ConfigMissing {
            section: "strategy".to_string(),
            key: "symbols".to_string(),
        });
    }

    check_int(config, "strategy", "fast")?;
    check_int(config, "strategy", "slow")?;
    let fast = config.get_int("strategy", "fast", 5);
    let slow = config.get_int("strategy", "slow", 20);
    if fast < 1 {
        return Err(StratbenchError::config_invalid(
            "strategy",
            "fast",
            "fast must be at least 1",
        ));
    }
    if slow <= fast {
        return Err(StratbenchError::config_invalid(
            "strategy",
            "slow",
            format!("slow ({slow}) must be greater than fast ({fast})"),
        ));
    }
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), StratbenchError> {
    if config.get_string("data", "directory").is_none() {
        return Err(StratbenchError::ConfigMissing {
            section: "data".to_string(),
            key: "directory".to_string(),
        });
    }
    check_int(config, "data", "lead_in_days")?;
    if config.get_int("data", "lead_in_days", 0) < 0 {
        return Err(StratbenchError::config_invalid(
            "data",
            "lead_in_days",
            "lead_in_days must be non-negative",
        ));
    }
    Ok(())
}

/// Comma separated symbols, trimmed, blanks dropped.
pub fn parse_symbol_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, StratbenchError> {
    match value {
        None => Err(StratbenchError::ConfigMissing {
            section: "backtest".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
            StratbenchError::config_invalid(
                "backtest",
                field,
                format!("invalid {field} format, expected YYYY-MM-DD"),
            )
        }),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), StratbenchError> {
    let start_str = config.get_string("backtest", "start_date");
    let end_str = config.get_string("backtest", "end_date");

    let start = parse_date(start_str.as_deref(), "start_date")?;
    let end = parse_date(end_str.as_deref(), "end_date")?;

    if start >= end {
        return Err(StratbenchError::InvalidDateRange { start, end });
    }
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), StratbenchError> {
    if config.get_string("backtest", "initial_capital").is_none() {
        return Err(StratbenchError::ConfigMissing {
            section: "backtest".to_string(),
            key: "initial_capital".to_string(),
        });
    }
    check_double(config, "backtest", "initial_capital")?;
    let value = config.get_double("backtest", "initial_capital", 0.0);
    if value <= 0.0 {
        return Err(StratbenchError::config_invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_percentage(config: &dyn ConfigPort, key: &str) -> Result<(), StratbenchError> {
    check_double(config, "backtest", key)?;
    let value = config.get_double("backtest", key, 0.0);
    if !(0.0..100.0).contains(&value) {
        return Err(StratbenchError::config_invalid(
            "backtest",
            key,
            format!("{key} must be in [0, 100)"),
        ));
    }
    Ok(())
}

fn check_double(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), StratbenchError> {
    match config.get_string(section, key) {
        Some(raw) if !raw.parse::<f64>().is_ok_and(f64::is_finite) => Err(
            StratbenchError::config_invalid(section, key, format!("'{raw}' is not a number")),
        ),
        _ => Ok(()),
    }
}

fn check_int(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), StratbenchError> {
    match config.get_string(section, key) {
        Some(raw) if raw.parse::<i64>().is_err() => Err(StratbenchError::config_invalid(
            section,
            key,
            format!("'{raw}' is not an integer"),
        )),
        _ => Ok(()),
    }
}
