use crate::execution::order_action::Side;
use crate::types::price::Price;

/// A desired resting order for one side of the book.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Quote {
    pub side: Side,
    pub price: Price,
    pub quantity: f64,
}

impl Quote {
    pub fn notional(&self) -> f64 {
        self.price.as_f64() * self.quantity
    }
}
