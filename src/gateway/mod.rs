pub mod binance;
pub mod dry_run;
#[cfg(test)]
pub mod fake;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::execution::order_action::Side;
use crate::execution::types::{OpenOrder, OrderStatus};
use crate::types::{
    balance::Balance, instrument::Instrument, market_limits::MarketLimits,
    market_snapshot::MarketSnapshot, price::Price,
};

pub type GatewayResult<T> = Result<T, GatewayError>;

pub type DynamicGateway = Arc<dyn ExchangeGateway + Send + Sync>;

/// Result of a market order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketFill {
    /// Average fill price.
    pub price: Price,
    /// Filled base amount.
    pub quantity: f64,
    /// Quote spent or received.
    pub cost: f64,
}

/// Market data and order management for a spot exchange.
///
/// Shared by every pair worker; implementations handle their own rate limits.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    async fn snapshot(&self, instrument: &Instrument) -> GatewayResult<MarketSnapshot>;

    /// Closing prices of the most recent `count` candles, oldest first.
    async fn closes(
        &self,
        instrument: &Instrument,
        timeframe: &str,
        count: usize,
    ) -> GatewayResult<Vec<f64>>;

    async fn balance(&self, instrument: &Instrument) -> GatewayResult<Balance>;

    async fn market_limits(&self, instrument: &Instrument) -> GatewayResult<MarketLimits>;

    async fn open_orders(&self, instrument: &Instrument) -> GatewayResult<Vec<OpenOrder>>;

    async fn order_status(&self, instrument: &Instrument, order_id: &str)
    -> GatewayResult<OrderStatus>;

    async fn place_limit_order(
        &self,
        instrument: &Instrument,
        side: Side,
        price: Price,
        quantity: f64,
        client_order_id: &str,
    ) -> GatewayResult<OpenOrder>;

    async fn place_market_order(
        &self,
        instrument: &Instrument,
        side: Side,
        quantity: f64,
    ) -> GatewayResult<MarketFill>;

    async fn cancel_order(&self, instrument: &Instrument, order_id: &str) -> GatewayResult<()>;
}
