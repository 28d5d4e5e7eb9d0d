use anyhow::anyhow;
use async_trait::async_trait;

use crate::{
    error::GatewayError,
    execution::{
        order_action::Side,
        types::{OpenOrder, OrderStatus},
    },
    gateway::{
        ExchangeGateway, GatewayResult, MarketFill,
        binance::{
            binance_client::{BinanceClient, OrderResult, SymbolFilter},
            binance_config::BinanceConfig,
        },
    },
    types::{
        balance::Balance, instrument::Instrument, market_limits::MarketLimits,
        market_snapshot::MarketSnapshot, price::Price,
    },
};

#[derive(Debug, Clone)]
pub struct BinanceGateway {
    client: BinanceClient,
}

impl BinanceGateway {
    pub fn new(config: BinanceConfig) -> anyhow::Result<Self> {
        tracing::info!(sandbox = config.sandbox, "connecting to binance spot");

        Ok(Self {
            client: BinanceClient::new(config)?,
        })
    }
}

fn status_from(raw: &str) -> OrderStatus {
    match raw {
        "NEW" | "PARTIALLY_FILLED" => OrderStatus::Open,
        "FILLED" => OrderStatus::Closed,
        _ => OrderStatus::Canceled,
    }
}

fn side_from(raw: &str) -> GatewayResult<Side> {
    match raw {
        "BUY" => Ok(Side::Buy),
        "SELL" => Ok(Side::Sell),
        other => Err(GatewayError::msg(format!("unknown order side {other}"))),
    }
}

fn open_order_from(result: &OrderResult) -> GatewayResult<OpenOrder> {
    Ok(OpenOrder {
        order_id: result.order_id.to_string(),
        side: side_from(&result.side)?,
        price: Price::new(result.price),
        quantity: result.orig_qty,
        status: status_from(&result.status),
    })
}

fn limits_from(filters: &[SymbolFilter]) -> GatewayResult<MarketLimits> {
    let mut lot = None;
    let mut tick = None;
    let mut min_notional = 0.0;

    for filter in filters {
        match filter {
            SymbolFilter::LotSize { min_qty, step_size } => lot = Some((*min_qty, *step_size)),
            SymbolFilter::PriceFilter { tick_size } => tick = Some(*tick_size),
            SymbolFilter::Notional {
                min_notional: value,
            } => min_notional = *value,
            SymbolFilter::Other => {}
        }
    }

    let (min_amount, amount_step) = lot.ok_or_else(|| anyhow!("LOT_SIZE filter missing"))?;
    let price_tick = tick.ok_or_else(|| anyhow!("PRICE_FILTER filter missing"))?;

    Ok(MarketLimits {
        min_amount,
        min_notional,
        amount_step,
        price_tick,
    })
}

#[async_trait]
impl ExchangeGateway for BinanceGateway {
    async fn snapshot(&self, instrument: &Instrument) -> GatewayResult<MarketSnapshot> {
        let ticker = self.client.ticker(instrument).await?;

        Ok(MarketSnapshot::new(
            Price::new(ticker.last_price),
            Price::new(ticker.bid_price),
            Price::new(ticker.ask_price),
        ))
    }

    async fn closes(
        &self,
        instrument: &Instrument,
        timeframe: &str,
        count: usize,
    ) -> GatewayResult<Vec<f64>> {
        Ok(self.client.closes(instrument, timeframe, count).await?)
    }

    async fn balance(&self, instrument: &Instrument) -> GatewayResult<Balance> {
        let account = self.client.account().await?;

        let balance = account
            .balances
            .iter()
            .find(|balance| balance.asset == instrument.quote())
            .map(|balance| Balance::new(balance.free, balance.locked))
            .unwrap_or_default();

        Ok(balance)
    }

    async fn market_limits(&self, instrument: &Instrument) -> GatewayResult<MarketLimits> {
        let info = self.client.exchange_info(instrument).await?;

        limits_from(&info.filters)
    }

    async fn open_orders(&self, instrument: &Instrument) -> GatewayResult<Vec<OpenOrder>> {
        self.client
            .open_orders(instrument)
            .await?
            .iter()
            .map(open_order_from)
            .collect()
    }

    async fn order_status(
        &self,
        instrument: &Instrument,
        order_id: &str,
    ) -> GatewayResult<OrderStatus> {
        let result = self.client.order(instrument, order_id).await?;

        Ok(status_from(&result.status))
    }

    async fn place_limit_order(
        &self,
        instrument: &Instrument,
        side: Side,
        price: Price,
        quantity: f64,
        client_order_id: &str,
    ) -> GatewayResult<OpenOrder> {
        let result = self
            .client
            .limit_order(instrument, side, price, quantity, client_order_id)
            .await?;

        tracing::info!(order_id = result.order_id, client_order_id, status = %result.status, "limit order placed");

        open_order_from(&result)
    }

    async fn place_market_order(
        &self,
        instrument: &Instrument,
        side: Side,
        quantity: f64,
    ) -> GatewayResult<MarketFill> {
        let result = self.client.market_order(instrument, side, quantity).await?;

        let price = if result.executed_qty > 0.0 {
            result.cummulative_quote_qty / result.executed_qty
        } else {
            0.0
        };

        Ok(MarketFill {
            price: Price::new(price),
            quantity: result.executed_qty,
            cost: result.cummulative_quote_qty,
        })
    }

    async fn cancel_order(&self, instrument: &Instrument, order_id: &str) -> GatewayResult<()> {
        self.client.cancel_order(instrument, order_id).await?;

        Ok(())
    }
}
