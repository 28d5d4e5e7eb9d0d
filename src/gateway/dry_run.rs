use std::collections::{HashMap, VecDeque};

use anyhow::{Result, bail};
use async_trait::async_trait;
use rand::Rng;
use tokio::sync::Mutex;
use tracing::info;

use crate::{
    config::settings::parse_or,
    error::GatewayError,
    execution::{
        order_action::Side,
        types::{OpenOrder, OrderStatus},
    },
    gateway::{ExchangeGateway, GatewayResult, MarketFill},
    types::{
        balance::Balance, instrument::Instrument, market_limits::MarketLimits,
        market_snapshot::MarketSnapshot, price::Price,
    },
};

const HISTORY_LEN: usize = 500;
/// Filled and canceled orders kept per market so their status stays queryable.
const RESOLVED_RETENTION: usize = 200;

#[derive(Debug, Clone)]
pub struct DryRunConfig {
    pub start_price: f64,
    pub quote_balance: f64,
    /// Largest relative move of one random-walk step.
    pub volatility: f64,
    pub fee_rate: f64,
    pub limits: MarketLimits,
}

impl DryRunConfig {
    pub fn from_env() -> Result<Self> {
        let lookup = |key: &str| std::env::var(key).ok();

        let config = Self {
            start_price: parse_or(&lookup, "DRY_RUN_START_PRICE", 100.0)?,
            quote_balance: parse_or(&lookup, "DRY_RUN_QUOTE_BALANCE", 1_000.0)?,
            volatility: parse_or(&lookup, "DRY_RUN_VOLATILITY", 0.002)?,
            fee_rate: parse_or(&lookup, "TRADING_FEE", 0.001)?,
            limits: MarketLimits {
                min_amount: 0.01,
                min_notional: 5.0,
                amount_step: 0.01,
                price_tick: 0.0001,
            },
        };

        if !(config.start_price > 0.0) {
            bail!("DRY_RUN_START_PRICE must be > 0");
        }
        if !(0.0..0.5).contains(&config.volatility) {
            bail!("DRY_RUN_VOLATILITY must be in [0, 0.5)");
        }

        Ok(config)
    }
}

#[derive(Debug)]
struct PaperMarket {
    price: f64,
    closes: VecDeque<f64>,
    orders: Vec<OpenOrder>,
}

impl PaperMarket {
    /// Drops the oldest resolved orders beyond the retention window. Open
    /// orders are always kept.
    fn prune_resolved(&mut self) {
        let resolved = self.orders.iter().filter(|order| !order.is_open()).count();
        let mut excess = resolved.saturating_sub(RESOLVED_RETENTION);
        if excess == 0 {
            return;
        }

        self.orders.retain(|order| {
            if excess > 0 && !order.is_open() {
                excess -= 1;
                false
            } else {
                true
            }
        });
    }
}

#[derive(Debug, Default)]
struct PaperBook {
    markets: HashMap<Instrument, PaperMarket>,
    /// Free and locked amount per asset.
    assets: HashMap<String, Balance>,
    next_id: u64,
}

/// Paper exchange: prices follow a random walk, resting limit orders fill
/// once the walk crosses them and market orders fill at the last price.
///
/// Every snapshot advances the walk by one step and records it as a close.
#[derive(Debug)]
pub struct DryRunGateway {
    config: DryRunConfig,
    book: Mutex<PaperBook>,
}

impl DryRunGateway {
    pub fn new(config: DryRunConfig) -> Self {
        info!(
            start_price = config.start_price,
            quote_balance = config.quote_balance,
            "dry run: no orders reach an exchange"
        );

        Self {
            config,
            book: Mutex::new(PaperBook::default()),
        }
    }

    fn market<'a>(&self, book: &'a mut PaperBook, instrument: &Instrument) -> &'a mut PaperMarket {
        book.markets
            .entry(instrument.clone())
            .or_insert_with(|| PaperMarket {
                price: self.config.start_price,
                closes: std::iter::repeat_n(self.config.start_price, 50).collect(),
                orders: Vec::new(),
            })
    }

    fn asset<'a>(&self, book: &'a mut PaperBook, asset: &str, instrument: &Instrument) -> &'a mut Balance {
        let starting = if asset == instrument.quote() {
            self.config.quote_balance
        } else {
            0.0
        };

        book.assets
            .entry(asset.to_string())
            .or_insert_with(|| Balance::new(starting, 0.0))
    }

    fn step(&self, book: &mut PaperBook, instrument: &Instrument) -> f64 {
        let change = if self.config.volatility > 0.0 {
            rand::rng().random_range(-self.config.volatility..=self.config.volatility)
        } else {
            0.0
        };

        let market = self.market(book, instrument);
        market.price = (market.price * (1.0 + change)).max(f64::EPSILON);
        market.closes.push_back(market.price);
        if market.closes.len() > HISTORY_LEN {
            market.closes.pop_front();
        }

        let price = market.price;
        self.fill_crossed(book, instrument, price);

        price
    }

    fn fill_crossed(&self, book: &mut PaperBook, instrument: &Instrument, price: f64) {
        let market = self.market(book, instrument);
        let mut filled = Vec::new();

        for order in market.orders.iter_mut().filter(|o| o.is_open()) {
            let crossed = match order.side {
                Side::Buy => price <= order.price.as_f64(),
                Side::Sell => price >= order.price.as_f64(),
            };

            if crossed {
                order.status = OrderStatus::Closed;
                filled.push(order.clone());
            }
        }
        if !filled.is_empty() {
            market.prune_resolved();
        }

        for order in filled {
            let notional = order.price.as_f64() * order.quantity;
            let fee = notional * self.config.fee_rate;

            match order.side {
                Side::Buy => {
                    self.asset(book, instrument.quote(), instrument).locked -= notional;
                    self.asset(book, instrument.base(), instrument).free += order.quantity;
                }
                Side::Sell => {
                    self.asset(book, instrument.base(), instrument).locked -= order.quantity;
                    self.asset(book, instrument.quote(), instrument).free += notional - fee;
                }
            }

            info!(order_id = %order.order_id, side = %order.side, price = %order.price, "dry run fill");
        }
    }

    fn next_id(book: &mut PaperBook) -> String {
        book.next_id += 1;
        format!("dry-{}", book.next_id)
    }
}

#[async_trait]
impl ExchangeGateway for DryRunGateway {
    async fn snapshot(&self, instrument: &Instrument) -> GatewayResult<MarketSnapshot> {
        let mut book = self.book.lock().await;
        let last = self.step(&mut book, instrument);
        let half_tick = self.config.limits.price_tick / 2.0;

        Ok(MarketSnapshot::new(
            Price::new(last),
            Price::new(last - half_tick),
            Price::new(last + half_tick),
        ))
    }

    async fn closes(
        &self,
        instrument: &Instrument,
        _timeframe: &str,
        count: usize,
    ) -> GatewayResult<Vec<f64>> {
        let mut book = self.book.lock().await;
        let closes = &self.market(&mut book, instrument).closes;
        let skip = closes.len().saturating_sub(count);

        Ok(closes.iter().skip(skip).copied().collect())
    }

    async fn balance(&self, instrument: &Instrument) -> GatewayResult<Balance> {
        let mut book = self.book.lock().await;

        Ok(*self.asset(&mut book, instrument.quote(), instrument))
    }

    async fn market_limits(&self, _instrument: &Instrument) -> GatewayResult<MarketLimits> {
        Ok(self.config.limits)
    }

    async fn open_orders(&self, instrument: &Instrument) -> GatewayResult<Vec<OpenOrder>> {
        let mut book = self.book.lock().await;

        Ok(self
            .market(&mut book, instrument)
            .orders
            .iter()
            .filter(|order| order.is_open())
            .cloned()
            .collect())
    }

    async fn order_status(
        &self,
        instrument: &Instrument,
        order_id: &str,
    ) -> GatewayResult<OrderStatus> {
        let mut book = self.book.lock().await;

        self.market(&mut book, instrument)
            .orders
            .iter()
            .find(|order| order.order_id == order_id)
            .map(|order| order.status)
            .ok_or_else(|| GatewayError::msg(format!("unknown order {order_id}")))
    }

    async fn place_limit_order(
        &self,
        instrument: &Instrument,
        side: Side,
        price: Price,
        quantity: f64,
        client_order_id: &str,
    ) -> GatewayResult<OpenOrder> {
        let mut book = self.book.lock().await;

        match side {
            Side::Buy => {
                let notional = price.as_f64() * quantity;
                let quote = self.asset(&mut book, instrument.quote(), instrument);
                if quote.free < notional {
                    return Err(GatewayError::msg(format!(
                        "insufficient {}: {:.4} free, {notional:.4} required",
                        instrument.quote(),
                        quote.free
                    )));
                }
                quote.free -= notional;
                quote.locked += notional;
            }
            // base inventory is not enforced, the paper account may go short
            Side::Sell => {
                let base = self.asset(&mut book, instrument.base(), instrument);
                base.free -= quantity;
                base.locked += quantity;
            }
        }

        let order = OpenOrder {
            order_id: Self::next_id(&mut book),
            side,
            price,
            quantity,
            status: OrderStatus::Open,
        };
        info!(order_id = %order.order_id, client_order_id, %side, %price, quantity, "dry run order placed");

        self.market(&mut book, instrument).orders.push(order.clone());

        Ok(order)
    }

    async fn place_market_order(
        &self,
        instrument: &Instrument,
        side: Side,
        quantity: f64,
    ) -> GatewayResult<MarketFill> {
        let mut book = self.book.lock().await;
        let price = self.market(&mut book, instrument).price;
        let cost = price * quantity;

        match side {
            Side::Buy => {
                let quote = self.asset(&mut book, instrument.quote(), instrument);
                if quote.free < cost {
                    return Err(GatewayError::msg(format!(
                        "insufficient {}: {:.4} free, {cost:.4} required",
                        instrument.quote(),
                        quote.free
                    )));
                }
                quote.free -= cost;
                self.asset(&mut book, instrument.base(), instrument).free +=
                    quantity * (1.0 - self.config.fee_rate);
            }
            Side::Sell => {
                self.asset(&mut book, instrument.base(), instrument).free -= quantity;
                self.asset(&mut book, instrument.quote(), instrument).free +=
                    cost * (1.0 - self.config.fee_rate);
            }
        }

        info!(%side, price, quantity, "dry run market fill");

        Ok(MarketFill {
            price: Price::new(price),
            quantity,
            cost,
        })
    }

    async fn cancel_order(&self, instrument: &Instrument, order_id: &str) -> GatewayResult<()> {
        let mut book = self.book.lock().await;

        let market = self.market(&mut book, instrument);
        let Some(order) = market
            .orders
            .iter_mut()
            .find(|order| order.order_id == order_id && order.is_open())
        else {
            return Err(GatewayError::msg(format!("order {order_id} is not open")));
        };
        order.status = OrderStatus::Canceled;
        let order = order.clone();
        market.prune_resolved();

        match order.side {
            Side::Buy => {
                let notional = order.price.as_f64() * order.quantity;
                let quote = self.asset(&mut book, instrument.quote(), instrument);
                quote.locked -= notional;
                quote.free += notional;
            }
            Side::Sell => {
                let base = self.asset(&mut book, instrument.base(), instrument);
                base.locked -= order.quantity;
                base.free += order.quantity;
            }
        }

        Ok(())
    }
}
