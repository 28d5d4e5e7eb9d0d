use anyhow::{Result, bail};
use serde::Deserialize;

use crate::types::price::Price;

/// Exchange constraints for one pair. Fetched once when a worker starts.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize)]
pub struct MarketLimits {
    /// Minimum order size in base currency.
    pub min_amount: f64,

    /// Minimum order value in quote currency.
    pub min_notional: f64,

    /// Amount precision, as the smallest base increment (e.g. 0.1 ADA).
    pub amount_step: f64,

    /// Price precision, as the smallest quote increment (e.g. 0.0001 USDT).
    pub price_tick: f64,
}

impl MarketLimits {
    /// Truncates a base amount to the amount step, like the exchange does.
    pub fn round_amount(&self, amount: f64) -> f64 {
        round_down_to_step(amount, self.amount_step)
    }

    /// Smallest multiple of the amount step that is at least `amount`.
    pub fn round_amount_up(&self, amount: f64) -> f64 {
        round_up_to_step(amount, self.amount_step)
    }

    pub fn round_price(&self, price: f64) -> Price {
        Price::new(round_to_step(price, self.price_tick).max(0.0))
    }

    /// Highest tick at or below `price`.
    pub fn floor_price(&self, price: f64) -> Price {
        Price::new(round_down_to_step(price, self.price_tick).max(0.0))
    }

    /// Lowest tick at or above `price`.
    pub fn ceil_price(&self, price: f64) -> Price {
        Price::new(round_up_to_step(price, self.price_tick).max(0.0))
    }

    pub fn quantity_from_notional(&self, notional: f64, price: f64) -> f64 {
        if price <= 0.0 || !price.is_finite() {
            return 0.0;
        }

        self.round_amount(notional / price)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_amount < 0.0 {
            bail!("min_amount must be >= 0");
        }
        if self.min_notional < 0.0 {
            bail!("min_notional must be >= 0");
        }
        if self.amount_step <= 0.0 {
            bail!("amount_step must be > 0");
        }
        if self.price_tick <= 0.0 {
            bail!("price_tick must be > 0");
        }
        Ok(())
    }
}

fn round_down_to_step(value: f64, step: f64) -> f64 {
    if step <= 0.0 || !value.is_finite() || !step.is_finite() {
        return value;
    }

    // nudge so that 0.3 / 0.1 = 2.9999999999999996 still floors to 3
    let steps = (value / step + 1e-9).floor();
    snap_to_step_decimals(steps * step, step)
}

fn round_up_to_step(value: f64, step: f64) -> f64 {
    if step <= 0.0 || !value.is_finite() || !step.is_finite() {
        return value;
    }

    let steps = (value / step - 1e-9).ceil();
    snap_to_step_decimals(steps * step, step)
}

fn round_to_step(value: f64, step: f64) -> f64 {
    if step <= 0.0 || !value.is_finite() || !step.is_finite() {
        return value;
    }

    snap_to_step_decimals((value / step).round() * step, step)
}

fn snap_to_step_decimals(value: f64, step: f64) -> f64 {
    // fewest decimals that represent the step exactly, so 0.00025 keeps five
    let decimals = (0..15)
        .find(|&d| {
            let scaled = step * 10f64.powi(d);
            (scaled - scaled.round()).abs() < 1e-9 * scaled.max(1.0)
        })
        .unwrap_or(15);
    let scale = 10f64.powi(decimals);

    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> MarketLimits {
        MarketLimits {
            min_amount: 1.0,
            min_notional: 5.0,
            amount_step: 0.1,
            price_tick: 0.0001,
        }
    }

    #[test]
    fn amounts_are_truncated_to_step() {
        let limits = limits();

        assert_eq!(limits.round_amount(12.39), 12.3);
        assert_eq!(limits.round_amount(0.3), 0.3);
        assert_eq!(limits.round_amount(0.09), 0.0);
    }

    #[test]
    fn prices_are_rounded_to_nearest_tick() {
        let limits = limits();

        assert_eq!(limits.round_price(0.35678).as_f64(), 0.3568);
        assert_eq!(limits.round_price(0.35672).as_f64(), 0.3567);
    }

    #[test]
    fn directed_rounding_stays_on_the_requested_side() {
        let limits = limits();

        assert_eq!(limits.floor_price(0.35678).as_f64(), 0.3567);
        assert_eq!(limits.ceil_price(0.35672).as_f64(), 0.3568);
        assert_eq!(limits.ceil_price(0.3567).as_f64(), 0.3567);
        assert_eq!(limits.round_amount_up(0.31), 0.4);
        assert_eq!(limits.round_amount_up(0.3), 0.3);
    }

    #[test]
    fn ticks_that_are_not_powers_of_ten_keep_their_grid() {
        let limits = MarketLimits {
            price_tick: 0.00025,
            ..limits()
        };

        assert_eq!(limits.floor_price(0.0008).as_f64(), 0.00075);
        assert_eq!(limits.ceil_price(0.0008).as_f64(), 0.001);
    }

    #[test]
    fn quantity_from_notional_rejects_bad_prices() {
        let limits = limits();

        assert_eq!(limits.quantity_from_notional(6.0, 0.0), 0.0);
        assert_eq!(limits.quantity_from_notional(6.0, f64::NAN), 0.0);
        assert_eq!(limits.quantity_from_notional(6.0, 0.5), 12.0);
    }

    #[test]
    fn validate_rejects_zero_steps() {
        let mut limits = limits();
        limits.amount_step = 0.0;

        assert!(limits.validate().is_err());
    }
}
