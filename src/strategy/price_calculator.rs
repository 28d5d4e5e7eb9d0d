use crate::error::StrategyError;
use crate::types::{market_limits::MarketLimits, price::Price};

/// Buy and sell limit prices around `price`.
///
/// The fee is added to the spread on both sides so a filled buy followed by a
/// filled sell stays profitable after paying the fee twice. The buy rounds down
/// and the sell rounds up, each at least one tick away from `price`, so neither
/// quote can be marketable on a coarse tick.
pub fn quote_prices(price: Price, spread: f64, fee_rate: f64, limits: &MarketLimits) -> (Price, Price) {
    let offset = spread + fee_rate;
    let current = price.as_f64();
    let tick = limits.price_tick;

    let buy = limits.floor_price((current * (1.0 - offset)).min(current - tick));
    let sell = limits.ceil_price((current * (1.0 + offset)).max(current + tick));

    (buy, sell)
}

/// A spread narrower than two fees loses money on every round trip.
pub fn validate_spread(spread: f64, fee_rate: f64) -> Result<(), StrategyError> {
    let required = 2.0 * fee_rate;

    if spread < required {
        return Err(StrategyError::Configuration(format!(
            "spread {spread} is too low to cover trading fees ({required}); increase the spread"
        )));
    }

    Ok(())
}
