//! RSI (Relative Strength Index).
//!
//! Average gain and average loss are the simple means of the last n
//! close-to-close changes (losses as positive magnitudes).
//!
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss); RSI = 100 when avg_loss == 0.
//!
//! Warmup: first n bars are invalid (n changes need n + 1 closes).

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorSpec, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_rsi(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let spec = IndicatorSpec::Rsi { period };
    let mut values = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        let rsi = if period > 0 && i >= period {
            Some(rsi_at(&bars[i - period..=i]))
        } else {
            None
        };
        values.push(IndicatorPoint {
            date: bar.date,
            valid: rsi.is_some(),
            value: IndicatorValue::Simple(rsi.unwrap_or(0.0)),
        });
    }

    IndicatorSeries { spec, values }
}

/// RSI over a window of n + 1 bars (n changes).
fn rsi_at(window: &[PriceBar]) -> f64 {
    let n = (window.len() - 1) as f64;
    let (gains, losses) = window
        .windows(2)
        .map(|w| w[1].close - w[0].close)
        .fold((0.0, 0.0), |(g, l), change| {
            if change > 0.0 {
                (g + change, l)
            } else {
                (g, l - change)
            }
        });

    let avg_gain = gains / n;
    let avg_loss = losses / n;
    if avg_loss == 0.0 {
        return 100.0;
    }
    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}
