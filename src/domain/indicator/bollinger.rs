//! Bollinger Bands.
//!
//! - Middle: SMA over n closes
//! - Upper: Middle + (k × StdDev)
//! - Lower: Middle - (k × StdDev)
//!
//! StdDev is the sample standard deviation of the same window (n - 1
//! denominator), zero for a one-bar window.
//!
//! Warmup: first (n-1) bars are invalid.

use super::stddev::{mean, sample_stddev};
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorSpec, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_bollinger(bars: &[PriceBar], period: usize, mult: f64) -> IndicatorSeries {
    let spec = IndicatorSpec::Bollinger {
        period,
        std_dev: mult,
    };
    if period == 0 {
        return IndicatorSeries::empty(spec);
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let mut values = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        let valid = i + 1 >= period;

        let (upper, middle, lower) = if valid {
            let window = &closes[i + 1 - period..=i];
            let middle = mean(window);
            let band = mult * sample_stddev(window);
            (middle + band, middle, middle - band)
        } else {
            (0.0, 0.0, 0.0)
        };

        values.push(IndicatorPoint {
            date: bar.date,
            valid,
            value: IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            },
        });
    }

    IndicatorSeries { spec, values }
}
