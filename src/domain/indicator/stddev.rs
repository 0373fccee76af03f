//! Mean and sample standard deviation helpers.
//!
//! Shared by Bollinger Bands and the performance metrics. Sample deviation
//! divides by (n - 1); a single observation has zero deviation.

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn sample_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mean_basic() {
        assert_relative_eq!(mean(&[1.0, 2.0, 3.0, 4.0]), 2.5);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn sample_stddev_known_values() {
        // mean 5, squared deviations sum 32, /7
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(sample_stddev(&values), (32.0_f64 / 7.0).sqrt());
    }

    #[test]
    fn sample_stddev_constant_is_zero() {
        assert_eq!(sample_stddev(&[3.0, 3.0, 3.0]), 0.0);
    }

    #[test]
    fn sample_stddev_short_input_is_zero() {
        assert_eq!(sample_stddev(&[]), 0.0);
        assert_eq!(sample_stddev(&[42.0]), 0.0);
    }
}
