use crate::config::pair_config::SizingMode;
use crate::error::StrategyError;
use crate::types::{balance::Balance, market_limits::MarketLimits};

/// Turns a sizing intent into an order size that the exchange will accept.
///
/// The result is already truncated to the amount step. Fixed-notional and
/// fixed-amount sizing refuse to go below the exchange floor: the operator has
/// to raise the trade value. Balance-fraction sizing is bumped up to the floor
/// instead, with one extra amount step when needed so that rounding can never
/// leave the notional under the minimum.
pub fn size_order(
    mode: SizingMode,
    balance: &Balance,
    price: f64,
    limits: &MarketLimits,
) -> Result<f64, StrategyError> {
    if !(price.is_finite() && price > 0.0) {
        return Err(StrategyError::SizingFailed(format!("price must be > 0, got {price}")));
    }
    if !(balance.free.is_finite() && balance.free > 0.0) {
        return Err(StrategyError::SizingFailed(format!(
            "free balance must be > 0, got {}",
            balance.free
        )));
    }

    match mode {
        SizingMode::FixedNotional(value) => {
            let size = limits.quantity_from_notional(value, price);
            ensure_above_floor(size, price, limits)
        }
        SizingMode::FixedAmount(amount) => {
            let size = limits.round_amount(amount);
            ensure_above_floor(size, price, limits)
        }
        SizingMode::BalanceFraction(fraction) => {
            let mut size = limits.quantity_from_notional(balance.free * fraction, price);

            if size < limits.min_amount {
                tracing::debug!(size, min_amount = limits.min_amount, "raising size to minimum");
                size = limits.round_amount(limits.min_amount);
                if size < limits.min_amount {
                    size += limits.amount_step;
                }
            }

            if size * price < limits.min_notional {
                let raised = limits.round_amount(limits.min_notional / price + limits.amount_step);
                tracing::debug!(
                    size,
                    raised,
                    min_notional = limits.min_notional,
                    "raising size to clear minimum notional"
                );
                size = raised;
            }

            Ok(size)
        }
    }
}

fn ensure_above_floor(size: f64, price: f64, limits: &MarketLimits) -> Result<f64, StrategyError> {
    let notional = size * price;

    if size <= 0.0 || size < limits.min_amount || notional < limits.min_notional {
        return Err(StrategyError::InsufficientNotional {
            size,
            notional,
            min_amount: limits.min_amount,
            min_notional: limits.min_notional,
        });
    }

    Ok(size)
}

/// Rejects sizing that can never clear the exchange floor, whatever the price.
///
/// Only the fixed modes can be checked up front; balance-fraction sizing is
/// raised to the floor on every order instead.
pub fn validate_sizing(mode: SizingMode, limits: &MarketLimits) -> Result<(), StrategyError> {
    match mode {
        SizingMode::FixedNotional(value) if value < limits.min_notional => {
            Err(StrategyError::Configuration(format!(
                "fixed trade value {value} is below the minimum notional {}; increase the trade value",
                limits.min_notional
            )))
        }
        SizingMode::FixedAmount(amount) if limits.round_amount(amount) < limits.min_amount => {
            Err(StrategyError::Configuration(format!(
                "fixed trade amount {amount} is below the minimum order size {}",
                limits.min_amount
            )))
        }
        _ => Ok(()),
    }
}

/// Smallest buy whose proceeds after a base-currency fee can still be sold at
/// `exit_price` without breaking the amount or notional floor.
pub fn sellable_floor(fee_rate: f64, exit_price: f64, limits: &MarketLimits) -> f64 {
    if !(exit_price.is_finite() && exit_price > 0.0) || fee_rate >= 1.0 {
        return limits.min_amount;
    }

    let net = limits.round_amount_up(limits.min_amount.max(limits.min_notional / exit_price));
    let mut gross = limits.round_amount_up(net / (1.0 - fee_rate));

    if limits.round_amount(gross * (1.0 - fee_rate)) < net {
        gross = limits.round_amount(gross + limits.amount_step);
    }

    gross
}
