//! Exponential Moving Average.
//!
//! alpha = 2/(n+1). Seeded with the SMA of the first n closes, then
//! EMA[i] = C[i]*alpha + EMA[i-1]*(1-alpha). Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorSpec, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_ema(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let spec = IndicatorSpec::Ema { period };
    if period == 0 {
        return IndicatorSeries::empty(spec);
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let values = ema_of(&closes, period)
        .into_iter()
        .zip(bars)
        .map(|(ema, bar)| IndicatorPoint {
            date: bar.date,
            valid: ema.is_some(),
            value: IndicatorValue::Simple(ema.unwrap_or(0.0)),
        })
        .collect();

    IndicatorSeries { spec, values }
}

/// EMA over a raw value sequence; `None` during warmup. Shared with MACD,
/// which smooths its own line with the same recurrence.
pub(crate) fn ema_of(input: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(input.len());
    if period == 0 {
        out.resize(input.len(), None);
        return out;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut ema = 0.0;

    for (i, &x) in input.iter().enumerate() {
        if i + 1 < period {
            out.push(None);
        } else if i + 1 == period {
            ema = input[..period].iter().sum::<f64>() / period as f64;
            out.push(Some(ema));
        } else {
            ema = x * alpha + ema * (1.0 - alpha);
            out.push(Some(ema));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::from_closes;
    use crate::domain::indicator::IndicatorField;
    use approx::assert_relative_eq;

    #[test]
    fn ema_warmup() {
        let series = calculate_ema(&from_closes(&[10.0, 20.0, 30.0, 40.0, 50.0]), 3);

        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        assert!(series.values[4].valid);
    }

    #[test]
    fn ema_seed_is_sma() {
        let series = calculate_ema(&from_closes(&[10.0, 20.0, 30.0]), 3);
        assert_relative_eq!(series.latest(IndicatorField::Value).unwrap(), 20.0);
    }

    #[test]
    fn ema_recursive_calculation() {
        let series = calculate_ema(&from_closes(&[10.0, 20.0, 30.0, 40.0, 50.0]), 3);

        let alpha = 2.0 / 4.0;
        let seed = 20.0;
        let ema_3 = 40.0 * alpha + seed * (1.0 - alpha);
        let ema_4 = 50.0 * alpha + ema_3 * (1.0 - alpha);

        assert_relative_eq!(series.value_at(3, IndicatorField::Value).unwrap(), ema_3);
        assert_relative_eq!(series.value_at(4, IndicatorField::Value).unwrap(), ema_4);
    }

    #[test]
    fn ema_period_1_tracks_close() {
        let series = calculate_ema(&from_closes(&[10.0, 20.0, 30.0]), 1);
        assert_relative_eq!(series.value_at(0, IndicatorField::Value).unwrap(), 10.0);
        assert_relative_eq!(series.value_at(2, IndicatorField::Value).unwrap(), 30.0);
    }

    #[test]
    fn ema_equal_prices() {
        let series = calculate_ema(&from_closes(&[100.0; 6]), 3);
        for i in 2..6 {
            assert_relative_eq!(
                series.value_at(i, IndicatorField::Value).unwrap(),
                100.0,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn ema_empty_and_zero_period() {
        assert!(calculate_ema(&[], 3).values.is_empty());
        assert!(calculate_ema(&from_closes(&[1.0, 2.0]), 0).values.is_empty());
    }
}
