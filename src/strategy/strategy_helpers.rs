use crate::{
    error::StrategyError,
    execution::order_action::Side,
    strategy::{
        instrument_context::WithContext,
        position_sizer::{sellable_floor, size_order},
        price_calculator::quote_prices,
    },
    types::{
        balance::Balance, price::Price, quote::Quote, quote_target::QuoteTarget,
    },
};

pub trait StrategyHelpers: WithContext {
    fn order_size(&self, balance: &Balance, price: Price) -> Result<f64, StrategyError> {
        let ctx = self.ctx();

        size_order(ctx.config().sizing, balance, price.as_f64(), ctx.limits())
    }

    /// Scalp buy size: the configured size, raised when needed so that the
    /// amount left after the fee can still be sold at the stop-loss price.
    fn scalp_entry_size(&self, balance: &Balance, price: Price) -> Result<f64, StrategyError> {
        let ctx = self.ctx();
        let config = ctx.config();

        let size = self.order_size(balance, price)?;
        let stop_price = price.as_f64() * (1.0 - config.stop_loss_fraction);
        let floor = sellable_floor(config.fee_rate, stop_price, ctx.limits());

        if size < floor {
            tracing::debug!(size, floor, %price, "raising scalp size so the exit clears the floor");
            return Ok(floor);
        }

        Ok(size)
    }

    fn quote_target(&self, price: Price, quantity: f64) -> QuoteTarget {
        let config = self.ctx().config();
        let (buy, sell) = quote_prices(price, config.spread, config.fee_rate, self.ctx().limits());

        QuoteTarget {
            bid: Quote {
                side: Side::Buy,
                price: buy,
                quantity,
            },
            ask: Quote {
                side: Side::Sell,
                price: sell,
                quantity,
            },
        }
    }

    /// Base amount that can be sold back after buying `filled`, with the fee
    /// taken out of the base currency.
    fn sellable_amount(&self, filled: f64) -> f64 {
        let ctx = self.ctx();

        ctx.limits().round_amount(filled * (1.0 - ctx.config().fee_rate))
    }
}

impl<T: WithContext> StrategyHelpers for T {}
