//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line, seeded once the line exists
//! Histogram = MACD Line - Signal Line
//!
//! Warmup: slow - 1 + signal - 1 bars (the point is valid once the signal is).

use crate::domain::indicator::ema::ema_of;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorSpec, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub fn calculate_macd(
    bars: &[PriceBar],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let spec = IndicatorSpec::Macd {
        fast_period: fast,
        slow_period: slow,
        signal_period,
    };
    if fast == 0 || slow == 0 || signal_period == 0 {
        return IndicatorSeries::empty(spec);
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let ema_fast = ema_of(&closes, fast);
    let ema_slow = ema_of(&closes, slow);

    let line: Vec<Option<f64>> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();

    // The signal EMA runs over the defined part of the line only.
    let line_start = line.iter().position(Option::is_some).unwrap_or(line.len());
    let defined: Vec<f64> = line[line_start..].iter().flatten().copied().collect();
    let mut signal = vec![None; line_start];
    signal.extend(ema_of(&defined, signal_period));

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| match (line[i], signal[i]) {
            (Some(l), Some(s)) => IndicatorPoint {
                date: bar.date,
                valid: true,
                value: IndicatorValue::Macd {
                    line: l,
                    signal: s,
                    histogram: l - s,
                },
            },
            (l, _) => IndicatorPoint {
                date: bar.date,
                valid: false,
                value: IndicatorValue::Macd {
                    line: l.unwrap_or(0.0),
                    signal: 0.0,
                    histogram: 0.0,
                },
            },
        })
        .collect();

    IndicatorSeries { spec, values }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::from_closes;
    use crate::domain::indicator::IndicatorField;
    use approx::assert_relative_eq;

    fn rising(n: usize) -> Vec<PriceBar> {
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        from_closes(&closes)
    }

    #[test]
    fn macd_warmup_default() {
        let series = calculate_macd(&rising(40), DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL);

        let warmup = DEFAULT_SLOW - 1 + DEFAULT_SIGNAL - 1;
        for i in 0..warmup {
            assert!(!series.values[i].valid, "index {} should not be valid", i);
        }
        assert!(series.values[warmup].valid);
        assert_eq!(series.spec.lookback(), warmup);
    }

    #[test]
    fn macd_histogram_equals_line_minus_signal() {
        let series = calculate_macd(&rising(40), 3, 6, 4);
        for i in 0..40 {
            if let (Some(line), Some(signal), Some(hist)) = (
                series.value_at(i, IndicatorField::Value),
                series.value_at(i, IndicatorField::Signal),
                series.value_at(i, IndicatorField::Histogram),
            ) {
                assert_relative_eq!(hist, line - signal);
            }
        }
    }

    #[test]
    fn macd_line_is_ema_fast_minus_ema_slow() {
        let bars = from_closes(&[10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0]);
        let series = calculate_macd(&bars, 3, 5, 2);

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let fast = ema_of(&closes, 3);
        let slow = ema_of(&closes, 5);

        for i in 5..10 {
            let expected = fast[i].unwrap() - slow[i].unwrap();
            assert_relative_eq!(series.value_at(i, IndicatorField::Value).unwrap(), expected);
        }
    }

    #[test]
    fn macd_signal_seeded_by_mean_of_first_lines() {
        let bars = from_closes(&[10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0]);
        let series = calculate_macd(&bars, 2, 3, 2);

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let fast = ema_of(&closes, 2);
        let slow = ema_of(&closes, 3);
        let l2 = fast[2].unwrap() - slow[2].unwrap();
        let l3 = fast[3].unwrap() - slow[3].unwrap();

        assert!(!series.values[2].valid);
        assert_relative_eq!(
            series.value_at(3, IndicatorField::Signal).unwrap(),
            (l2 + l3) / 2.0
        );
    }

    #[test]
    fn macd_constant_prices_are_zero() {
        let series = calculate_macd(&from_closes(&[50.0; 40]), 12, 26, 9);
        assert!(series.latest(IndicatorField::Value).unwrap().abs() < 1e-9);
        assert!(series.latest(IndicatorField::Signal).unwrap().abs() < 1e-9);
    }

    #[test]
    fn macd_zero_period() {
        let bars = from_closes(&[100.0, 101.0, 102.0]);
        assert!(calculate_macd(&bars, 0, 26, 9).values.is_empty());
        assert!(calculate_macd(&bars, 12, 26, 0).values.is_empty());
    }

    #[test]
    fn macd_short_history_is_invalid() {
        let series = calculate_macd(&rising(10), 12, 26, 9);
        assert_eq!(series.values.len(), 10);
        assert!(series.values.iter().all(|p| !p.valid));
    }
}
