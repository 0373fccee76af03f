//! Core domain types and logic.

pub mod backtest;
pub mod condition;
pub mod condition_eval;
pub mod config_validation;
pub mod error;
pub mod execution;
pub mod indicator;
pub mod metrics;
pub mod ohlcv;
pub mod portfolio;
pub mod position;
pub mod strategy;
pub mod symbol_data;
