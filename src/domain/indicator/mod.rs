//! Technical indicator calculations.
//!
//! - `IndicatorSpec`: indicator identity + parameters, as declared in a
//!   strategy (also the key of a computed-indicator map)
//! - `IndicatorField`: which component of a multi-valued indicator to read
//! - `IndicatorValue` / `IndicatorPoint` / `IndicatorSeries`: computed output
//!
//! Every calculator is causal: the point at index `i` depends only on
//! `bars[..=i]`, and a point is `valid` once enough history exists.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod stddev;
pub mod stochastic;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::domain::error::StratbenchError;
use crate::domain::ohlcv::PriceBar;

pub use bollinger::calculate_bollinger;
pub use ema::calculate_ema;
pub use macd::calculate_macd;
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;
pub use stochastic::calculate_stochastic;

const DEFAULT_MA_PERIOD: usize = 20;
const DEFAULT_RSI_PERIOD: usize = 14;
const DEFAULT_BOLLINGER_MULT: f64 = 2.0;
const DEFAULT_STOCH_K: usize = 14;
const DEFAULT_STOCH_D: usize = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IndicatorSpec {
    #[serde(rename = "SMA")]
    Sma {
        #[serde(default = "default_ma_period")]
        period: usize,
    },
    #[serde(rename = "EMA")]
    Ema {
        #[serde(default = "default_ma_period")]
        period: usize,
    },
    #[serde(rename = "RSI")]
    Rsi {
        #[serde(default = "default_rsi_period")]
        period: usize,
    },
    #[serde(rename = "MACD", rename_all = "camelCase")]
    Macd {
        #[serde(default = "default_macd_fast")]
        fast_period: usize,
        #[serde(default = "default_macd_slow")]
        slow_period: usize,
        #[serde(default = "default_macd_signal")]
        signal_period: usize,
    },
    #[serde(rename = "BB", alias = "BOLLINGER", rename_all = "camelCase")]
    Bollinger {
        #[serde(default = "default_ma_period")]
        period: usize,
        #[serde(default = "default_bollinger_mult")]
        std_dev: f64,
    },
    #[serde(rename = "STOCH", alias = "STOCHASTIC", rename_all = "camelCase")]
    Stochastic {
        #[serde(default = "default_stoch_k")]
        k_period: usize,
        #[serde(default = "default_stoch_d")]
        d_period: usize,
    },
    #[serde(rename = "VOLUME")]
    Volume,
    #[serde(rename = "PRICE")]
    Price,
}

fn default_ma_period() -> usize {
    DEFAULT_MA_PERIOD
}

fn default_rsi_period() -> usize {
    DEFAULT_RSI_PERIOD
}

fn default_macd_fast() -> usize {
    macd::DEFAULT_FAST
}

fn default_macd_slow() -> usize {
    macd::DEFAULT_SLOW
}

fn default_macd_signal() -> usize {
    macd::DEFAULT_SIGNAL
}

fn default_bollinger_mult() -> f64 {
    DEFAULT_BOLLINGER_MULT
}

fn default_stoch_k() -> usize {
    DEFAULT_STOCH_K
}

fn default_stoch_d() -> usize {
    DEFAULT_STOCH_D
}

/// Component of an indicator's output that a condition compares.
///
/// `Value` selects the primary component: the MACD line, the Bollinger
/// middle band, or Stochastic %K.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorField {
    #[default]
    Value,
    Signal,
    Histogram,
    Upper,
    Middle,
    Lower,
    K,
    D,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
    Stochastic {
        k: f64,
        d: f64,
    },
}

impl IndicatorValue {
    /// Read one component; `None` when the field does not apply.
    pub fn field(&self, field: IndicatorField) -> Option<f64> {
        match (self, field) {
            (IndicatorValue::Simple(v), IndicatorField::Value) => Some(*v),
            (IndicatorValue::Macd { line, .. }, IndicatorField::Value) => Some(*line),
            (IndicatorValue::Macd { signal, .. }, IndicatorField::Signal) => Some(*signal),
            (IndicatorValue::Macd { histogram, .. }, IndicatorField::Histogram) => {
                Some(*histogram)
            }
            (IndicatorValue::Bollinger { upper, .. }, IndicatorField::Upper) => Some(*upper),
            (
                IndicatorValue::Bollinger { middle, .. },
                IndicatorField::Value | IndicatorField::Middle,
            ) => Some(*middle),
            (IndicatorValue::Bollinger { lower, .. }, IndicatorField::Lower) => Some(*lower),
            (IndicatorValue::Stochastic { k, .. }, IndicatorField::Value | IndicatorField::K) => {
                Some(*k)
            }
            (IndicatorValue::Stochastic { d, .. }, IndicatorField::D) => Some(*d),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub spec: IndicatorSpec,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub(crate) fn empty(spec: IndicatorSpec) -> Self {
        IndicatorSeries {
            spec,
            values: Vec::new(),
        }
    }

    /// Component value at `index`, or `None` if the point is missing or
    /// still in warmup.
    pub fn value_at(&self, index: usize, field: IndicatorField) -> Option<f64> {
        let point = self.values.get(index)?;
        if !point.valid {
            return None;
        }
        point.value.field(field).filter(|v| v.is_finite())
    }

    /// Value at the most recent bar.
    pub fn latest(&self, field: IndicatorField) -> Option<f64> {
        self.values
            .len()
            .checked_sub(1)
            .and_then(|i| self.value_at(i, field))
    }
}

impl IndicatorSpec {
    /// Bars of history needed before the first valid point, i.e. the index
    /// of the first bar at which the indicator can be defined.
    pub fn lookback(&self) -> usize {
        match *self {
            IndicatorSpec::Sma { period }
            | IndicatorSpec::Ema { period }
            | IndicatorSpec::Bollinger { period, .. } => period.saturating_sub(1),
            IndicatorSpec::Rsi { period } => period,
            IndicatorSpec::Macd {
                fast_period,
                slow_period,
                signal_period,
            } => {
                fast_period.max(slow_period).saturating_sub(1) + signal_period.saturating_sub(1)
            }
            IndicatorSpec::Stochastic { k_period, d_period } => {
                k_period.saturating_sub(1) + d_period.saturating_sub(1)
            }
            IndicatorSpec::Volume | IndicatorSpec::Price => 0,
        }
    }

    pub fn supports(&self, field: IndicatorField) -> bool {
        match self {
            IndicatorSpec::Macd { .. } => matches!(
                field,
                IndicatorField::Value | IndicatorField::Signal | IndicatorField::Histogram
            ),
            IndicatorSpec::Bollinger { .. } => matches!(
                field,
                IndicatorField::Value
                    | IndicatorField::Upper
                    | IndicatorField::Middle
                    | IndicatorField::Lower
            ),
            IndicatorSpec::Stochastic { .. } => matches!(
                field,
                IndicatorField::Value | IndicatorField::K | IndicatorField::D
            ),
            _ => field == IndicatorField::Value,
        }
    }

    pub fn validate(&self) -> Result<(), StratbenchError> {
        let zero_period = match *self {
            IndicatorSpec::Sma { period }
            | IndicatorSpec::Ema { period }
            | IndicatorSpec::Rsi { period }
            | IndicatorSpec::Bollinger { period, .. } => period == 0,
            IndicatorSpec::Macd {
                fast_period,
                slow_period,
                signal_period,
            } => fast_period == 0 || slow_period == 0 || signal_period == 0,
            IndicatorSpec::Stochastic { k_period, d_period } => k_period == 0 || d_period == 0,
            IndicatorSpec::Volume | IndicatorSpec::Price => false,
        };
        if zero_period {
            return Err(StratbenchError::strategy(format!(
                "{self}: periods must be positive"
            )));
        }

        if let IndicatorSpec::Macd {
            fast_period,
            slow_period,
            ..
        } = *self
        {
            if fast_period >= slow_period {
                return Err(StratbenchError::strategy(format!(
                    "{self}: fastPeriod must be less than slowPeriod"
                )));
            }
        }

        if let IndicatorSpec::Bollinger { std_dev, .. } = *self {
            if !std_dev.is_finite() || std_dev < 0.0 {
                return Err(StratbenchError::strategy(format!(
                    "{self}: stdDev must be a non-negative number"
                )));
            }
        }

        Ok(())
    }

    pub fn calculate(&self, bars: &[PriceBar]) -> IndicatorSeries {
        match *self {
            IndicatorSpec::Sma { period } => calculate_sma(bars, period),
            IndicatorSpec::Ema { period } => calculate_ema(bars, period),
            IndicatorSpec::Rsi { period } => calculate_rsi(bars, period),
            IndicatorSpec::Macd {
                fast_period,
                slow_period,
                signal_period,
            } => calculate_macd(bars, fast_period, slow_period, signal_period),
            IndicatorSpec::Bollinger { period, std_dev } => {
                calculate_bollinger(bars, period, std_dev)
            }
            IndicatorSpec::Stochastic { k_period, d_period } => {
                calculate_stochastic(bars, k_period, d_period)
            }
            IndicatorSpec::Volume => passthrough(bars, *self, |b| b.volume as f64),
            IndicatorSpec::Price => passthrough(bars, *self, |b| b.close),
        }
    }

    fn identity(&self) -> (u8, usize, usize, usize, u64) {
        match *self {
            IndicatorSpec::Sma { period } => (0, period, 0, 0, 0),
            IndicatorSpec::Ema { period } => (1, period, 0, 0, 0),
            IndicatorSpec::Rsi { period } => (2, period, 0, 0, 0),
            IndicatorSpec::Macd {
                fast_period,
                slow_period,
                signal_period,
            } => (3, fast_period, slow_period, signal_period, 0),
            IndicatorSpec::Bollinger { period, std_dev } => (4, period, 0, 0, std_dev.to_bits()),
            IndicatorSpec::Stochastic { k_period, d_period } => (5, k_period, d_period, 0, 0),
            IndicatorSpec::Volume => (6, 0, 0, 0, 0),
            IndicatorSpec::Price => (7, 0, 0, 0, 0),
        }
    }
}

impl PartialEq for IndicatorSpec {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for IndicatorSpec {}

impl Hash for IndicatorSpec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Display for IndicatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorSpec::Sma { period } => write!(f, "SMA({})", period),
            IndicatorSpec::Ema { period } => write!(f, "EMA({})", period),
            IndicatorSpec::Rsi { period } => write!(f, "RSI({})", period),
            IndicatorSpec::Macd {
                fast_period,
                slow_period,
                signal_period,
            } => write!(f, "MACD({},{},{})", fast_period, slow_period, signal_period),
            IndicatorSpec::Bollinger { period, std_dev } => {
                write!(f, "BB({},{})", period, std_dev)
            }
            IndicatorSpec::Stochastic { k_period, d_period } => {
                write!(f, "STOCH({},{})", k_period, d_period)
            }
            IndicatorSpec::Volume => write!(f, "VOLUME"),
            IndicatorSpec::Price => write!(f, "PRICE"),
        }
    }
}

fn passthrough(bars: &[PriceBar], spec: IndicatorSpec, f: impl Fn(&PriceBar) -> f64) -> IndicatorSeries {
    IndicatorSeries {
        spec,
        values: bars
            .iter()
            .map(|bar| IndicatorPoint {
                date: bar.date,
                valid: true,
                value: IndicatorValue::Simple(f(bar)),
            })
            .collect(),
    }
}

/// Compute every listed indicator over `bars`, one series per distinct spec.
pub fn compute_indicators(
    bars: &[PriceBar],
    specs: &[IndicatorSpec],
) -> HashMap<IndicatorSpec, IndicatorSeries> {
    let mut out = HashMap::with_capacity(specs.len());
    for spec in specs {
        out.entry(*spec).or_insert_with(|| spec.calculate(bars));
    }
    out
}
