//! In-memory gateway for tests. Records every call and lets tests script
//! prices, candles and failures.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::execution::order_action::Side;
use crate::execution::types::{OpenOrder, OrderStatus};
use crate::gateway::{ExchangeGateway, GatewayResult, MarketFill};
use crate::types::{
    balance::Balance, instrument::Instrument, market_limits::MarketLimits,
    market_snapshot::MarketSnapshot, price::Price,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Snapshot,
    Closes,
    Balance,
    MarketLimits,
    OpenOrders,
    OrderStatus(String),
    PlaceLimit { side: Side, price: f64, quantity: f64 },
    PlaceMarket { side: Side, quantity: f64 },
    Cancel(String),
}

#[derive(Debug)]
struct FakeState {
    prices: VecDeque<f64>,
    last_price: f64,
    closes: Vec<f64>,
    balance: Balance,
    limits: MarketLimits,
    orders: Vec<OpenOrder>,
    status_overrides: Vec<(String, OrderStatus)>,
    failing: HashSet<&'static str>,
    calls: Vec<Call>,
    next_id: u64,
}

#[derive(Debug)]
pub struct FakeGateway {
    state: Mutex<FakeState>,
}

impl FakeGateway {
    pub fn new(price: f64) -> Self {
        Self {
            state: Mutex::new(FakeState {
                prices: VecDeque::new(),
                last_price: price,
                closes: vec![price; 5],
                balance: Balance::new(1_000.0, 0.0),
                limits: MarketLimits {
                    min_amount: 0.01,
                    min_notional: 5.0,
                    amount_step: 0.01,
                    price_tick: 0.01,
                },
                orders: Vec::new(),
                status_overrides: Vec::new(),
                failing: HashSet::new(),
                calls: Vec::new(),
                next_id: 1,
            }),
        }
    }

    /// Changes the limits reported from now on, as an exchange updating its filters.
    pub fn set_limits(&self, limits: MarketLimits) {
        self.state.lock().unwrap().limits = limits;
    }

    pub fn with_balance(self, free: f64) -> Self {
        self.state.lock().unwrap().balance = Balance::new(free, 0.0);
        self
    }

    pub fn with_closes(self, closes: Vec<f64>) -> Self {
        self.state.lock().unwrap().closes = closes;
        self
    }

    /// Prices returned by successive snapshots; the last one repeats.
    pub fn with_price_path(self, prices: Vec<f64>) -> Self {
        self.state.lock().unwrap().prices = prices.into();
        self
    }

    pub fn with_order(self, order: OpenOrder) -> Self {
        self.state.lock().unwrap().orders.push(order);
        self
    }

    pub fn override_status(&self, order_id: &str, status: OrderStatus) {
        self.state
            .lock()
            .unwrap()
            .status_overrides
            .push((order_id.to_string(), status));
    }

    /// Makes every call to `method` fail until [`FakeGateway::recover`].
    pub fn fail(&self, method: &'static str) {
        self.state.lock().unwrap().failing.insert(method);
    }

    pub fn recover(&self, method: &'static str) {
        self.state.lock().unwrap().failing.remove(method);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn placements(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, Call::PlaceLimit { .. } | Call::PlaceMarket { .. }))
            .collect()
    }

    pub fn orders(&self) -> Vec<OpenOrder> {
        self.state.lock().unwrap().orders.clone()
    }

    fn record(&self, method: &'static str, call: Call) -> GatewayResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);

        if state.failing.contains(method) {
            return Err(GatewayError::msg(format!("{method} unavailable")));
        }

        Ok(())
    }
}

#[async_trait]
impl ExchangeGateway for FakeGateway {
    async fn snapshot(&self, _instrument: &Instrument) -> GatewayResult<MarketSnapshot> {
        self.record("snapshot", Call::Snapshot)?;

        let mut state = self.state.lock().unwrap();
        if let Some(price) = state.prices.pop_front() {
            state.last_price = price;
        }
        let last = state.last_price;

        Ok(MarketSnapshot::new(
            Price::new(last),
            Price::new(last * 0.999),
            Price::new(last * 1.001),
        ))
    }

    async fn closes(
        &self,
        _instrument: &Instrument,
        _timeframe: &str,
        count: usize,
    ) -> GatewayResult<Vec<f64>> {
        self.record("closes", Call::Closes)?;

        let closes = self.state.lock().unwrap().closes.clone();
        let skip = closes.len().saturating_sub(count);

        Ok(closes.into_iter().skip(skip).collect())
    }

    async fn balance(&self, _instrument: &Instrument) -> GatewayResult<Balance> {
        self.record("balance", Call::Balance)?;

        Ok(self.state.lock().unwrap().balance)
    }

    async fn market_limits(&self, _instrument: &Instrument) -> GatewayResult<MarketLimits> {
        self.record("market_limits", Call::MarketLimits)?;

        Ok(self.state.lock().unwrap().limits)
    }

    async fn open_orders(&self, _instrument: &Instrument) -> GatewayResult<Vec<OpenOrder>> {
        self.record("open_orders", Call::OpenOrders)?;

        Ok(self.state.lock().unwrap().orders.clone())
    }

    async fn order_status(
        &self,
        _instrument: &Instrument,
        order_id: &str,
    ) -> GatewayResult<OrderStatus> {
        self.record("order_status", Call::OrderStatus(order_id.to_string()))?;

        let state = self.state.lock().unwrap();
        let status = state
            .status_overrides
            .iter()
            .find(|(id, _)| id == order_id)
            .map(|(_, status)| *status)
            .or_else(|| {
                state
                    .orders
                    .iter()
                    .find(|order| order.order_id == order_id)
                    .map(|order| order.status)
            })
            .unwrap_or(OrderStatus::Canceled);

        Ok(status)
    }

    async fn place_limit_order(
        &self,
        _instrument: &Instrument,
        side: Side,
        price: Price,
        quantity: f64,
        _client_order_id: &str,
    ) -> GatewayResult<OpenOrder> {
        self.record(
            "place_limit_order",
            Call::PlaceLimit {
                side,
                price: price.as_f64(),
                quantity,
            },
        )?;

        let mut state = self.state.lock().unwrap();
        let order = OpenOrder {
            order_id: format!("fake-{}", state.next_id),
            side,
            price,
            quantity,
            status: OrderStatus::Open,
        };
        state.next_id += 1;
        state.orders.push(order.clone());

        Ok(order)
    }

    async fn place_market_order(
        &self,
        _instrument: &Instrument,
        side: Side,
        quantity: f64,
    ) -> GatewayResult<MarketFill> {
        self.record("place_market_order", Call::PlaceMarket { side, quantity })?;

        let price = self.state.lock().unwrap().last_price;

        Ok(MarketFill {
            price: Price::new(price),
            quantity,
            cost: price * quantity,
        })
    }

    async fn cancel_order(&self, _instrument: &Instrument, order_id: &str) -> GatewayResult<()> {
        self.record("cancel_order", Call::Cancel(order_id.to_string()))?;

        self.state
            .lock()
            .unwrap()
            .orders
            .retain(|order| order.order_id != order_id);

        Ok(())
    }
}
