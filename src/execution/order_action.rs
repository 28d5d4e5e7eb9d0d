use std::fmt;

use crate::types::{instrument::Instrument, price::Price};

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Side {
    #[default]
    Buy,
    Sell,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Buy, Side::Sell];
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    /// Good-till-cancelled limit order.
    Limit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub client_order_id: String,
    pub instrument: Instrument,
    pub side: Side,
    pub price: Price,
    pub quantity: f64,
    pub order_type: OrderType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderAction {
    Cancel {
        order_id: String,
        instrument: Instrument,
        side: Side,
    },
    Place(Order),
}

impl OrderAction {
    pub fn side(&self) -> Side {
        match self {
            OrderAction::Cancel { side, .. } => *side,
            OrderAction::Place(order) => order.side,
        }
    }

    pub fn is_place(&self) -> bool {
        matches!(self, OrderAction::Place(_))
    }
}
