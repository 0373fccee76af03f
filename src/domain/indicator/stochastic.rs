//! Stochastic oscillator.
//!
//! %K = (C - lowest low(k)) / (highest high(k) - lowest low(k)) × 100
//! %D = SMA(%K, d)
//!
//! %K is undefined when the k-bar range is zero; %D is defined only when
//! the last d %K values all are. Warmup: (k-1) + (d-1) bars.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorSpec, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_stochastic(bars: &[PriceBar], k_period: usize, d_period: usize) -> IndicatorSeries {
    let spec = IndicatorSpec::Stochastic { k_period, d_period };
    if k_period == 0 || d_period == 0 {
        return IndicatorSeries::empty(spec);
    }

    let k_values: Vec<Option<f64>> = (0..bars.len())
        .map(|i| {
            if i + 1 < k_period {
                return None;
            }
            let window = &bars[i + 1 - k_period..=i];
            let lowest = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
            let highest = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
            let range = highest - lowest;
            if range <= 0.0 {
                return None;
            }
            Some((bars[i].close - lowest) / range * 100.0)
        })
        .collect();

    let mut values = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let d = if i + 1 >= d_period {
            k_values[i + 1 - d_period..=i]
                .iter()
                .copied()
                .sum::<Option<f64>>()
                .map(|total| total / d_period as f64)
        } else {
            None
        };

        let (valid, k, d) = match (k_values[i], d) {
            (Some(k), Some(d)) => (true, k, d),
            (k, _) => (false, k.unwrap_or(0.0), 0.0),
        };

        values.push(IndicatorPoint {
            date: bar.date,
            valid,
            value: IndicatorValue::Stochastic { k, d },
        });
    }

    IndicatorSeries { spec, values }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::IndicatorField;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn make_bars(hlc: &[(f64, f64, f64)]) -> Vec<PriceBar> {
        hlc.iter()
            .enumerate()
            .map(|(i, &(high, low, close))| PriceBar {
                symbol: "TEST".into(),
                date: NaiveDate::from_ymd_opt(2024, 1, (i + 1) as u32).unwrap(),
                open: close,
                high,
                low,
                close,
                volume: 1000,
            })
            .collect()
    }

    #[test]
    fn stochastic_k_position_in_range() {
        let bars = make_bars(&[(110.0, 90.0, 100.0), (120.0, 95.0, 115.0)]);
        let series = calculate_stochastic(&bars, 2, 1);
        // lowest 90, highest 120, close 115 -> 25/30
        assert_relative_eq!(
            series.latest(IndicatorField::K).unwrap(),
            25.0 / 30.0 * 100.0
        );
    }

    #[test]
    fn stochastic_d_is_mean_of_k() {
        let bars = make_bars(&[
            (10.0, 0.0, 5.0),
            (10.0, 0.0, 10.0),
            (10.0, 0.0, 0.0),
            (10.0, 0.0, 2.5),
        ]);
        let series = calculate_stochastic(&bars, 1, 3);
        // k values: 50, 100, 0, 25
        assert!(!series.values[1].valid);
        assert_relative_eq!(series.value_at(2, IndicatorField::D).unwrap(), 50.0);
        assert_relative_eq!(series.value_at(3, IndicatorField::D).unwrap(), 125.0 / 3.0);
        assert_relative_eq!(series.value_at(3, IndicatorField::Value).unwrap(), 25.0);
    }

    #[test]
    fn stochastic_warmup() {
        let bars: Vec<(f64, f64, f64)> = (0..10)
            .map(|i| (101.0 + i as f64, 99.0 - i as f64, 100.0))
            .collect();
        let series = calculate_stochastic(&make_bars(&bars), 5, 3);
        for i in 0..6 {
            assert!(!series.values[i].valid, "index {} should be invalid", i);
        }
        assert!(series.values[6].valid);
        assert_eq!(series.spec.lookback(), 6);
    }

    #[test]
    fn stochastic_flat_range_is_undefined() {
        let bars = make_bars(&[(50.0, 50.0, 50.0); 4]);
        let series = calculate_stochastic(&bars, 2, 1);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn stochastic_bounded() {
        let bars: Vec<(f64, f64, f64)> = (0..20)
            .map(|i| {
                let c = 100.0 + ((i * 7) % 11) as f64;
                (c + 2.0, c - 2.0, c)
            })
            .collect();
        let series = calculate_stochastic(&make_bars(&bars), 5, 3);
        for i in 6..20 {
            let k = series.value_at(i, IndicatorField::K).unwrap();
            assert!((0.0..=100.0).contains(&k));
        }
    }
}
