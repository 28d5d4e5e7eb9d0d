use std::fmt;

use crate::execution::order_action::Side;
use crate::types::{price::Price, quote::Quote};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Open,
    Closed,
    Canceled,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Open => write!(f, "open"),
            OrderStatus::Closed => write!(f, "closed"),
            OrderStatus::Canceled => write!(f, "canceled"),
        }
    }
}

/// An order as the exchange reports it. Owned by the exchange; only observed here.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenOrder {
    pub order_id: String,
    pub side: Side,
    pub price: Price,
    pub quantity: f64,
    pub status: OrderStatus,
}

impl OpenOrder {
    pub fn is_open(&self) -> bool {
        self.status == OrderStatus::Open
    }
}

/// Per-side outcome of comparing the resting order with the desired quote.
#[derive(Debug, Clone, PartialEq)]
pub enum SidePlan {
    NoAction,
    Place { desired: Quote },
    Replace { old_order_id: String, desired: Quote },
}
