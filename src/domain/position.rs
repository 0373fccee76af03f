//! Open position tracking.
//!
//! Long-only: a symbol is either FLAT (no `Position`) or LONG with a
//! positive share count.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub quantity: i64,
    /// Execution price of the entry fill, slippage included.
    pub entry_price: f64,
    pub entry_date: NaiveDate,
    /// Index of the entry bar in the symbol's own bar series.
    pub entry_bar: usize,
    pub entry_commission: f64,
}

impl Position {
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity as f64 * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.quantity as f64 * (price - self.entry_price)
    }

    /// True when `price` has fallen `pct` percent or more below entry.
    pub fn stop_loss_hit(&self, pct: f64, price: f64) -> bool {
        price <= self.entry_price * (1.0 - pct / 100.0)
    }

    /// True when `price` has risen `pct` percent or more above entry.
    pub fn take_profit_hit(&self, pct: f64, price: f64) -> bool {
        price >= self.entry_price * (1.0 + pct / 100.0)
    }

    /// Bars held if the position were closed at `bar`.
    pub fn bars_held(&self, bar: usize) -> usize {
        bar.saturating_sub(self.entry_bar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_position() -> Position {
        Position {
            symbol: "005930".into(),
            quantity: 100,
            entry_price: 50.0,
            entry_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            entry_bar: 30,
            entry_commission: 0.0,
        }
    }

    #[test]
    fn market_value() {
        let pos = sample_position();
        assert!((pos.market_value(55.0) - 5500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unrealized_pnl() {
        let pos = sample_position();
        assert!((pos.unrealized_pnl(55.0) - 500.0).abs() < f64::EPSILON);
        assert!((pos.unrealized_pnl(45.0) - (-500.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn stop_loss_threshold() {
        let pos = sample_position();
        // 10% below 50 = 45
        assert!(!pos.stop_loss_hit(10.0, 45.5));
        assert!(pos.stop_loss_hit(10.0, 45.0));
        assert!(pos.stop_loss_hit(10.0, 40.0));
    }

    #[test]
    fn take_profit_threshold() {
        let pos = sample_position();
        // 20% above 50 = 60
        assert!(!pos.take_profit_hit(20.0, 59.9));
        assert!(pos.take_profit_hit(20.0, 60.0));
    }

    #[test]
    fn bars_held() {
        let pos = sample_position();
        assert_eq!(pos.bars_held(30), 0);
        assert_eq!(pos.bars_held(42), 12);
    }
}
