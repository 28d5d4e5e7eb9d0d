use crate::types::price::Price;

#[derive(Debug, Clone, Copy)]
pub struct MarketSnapshot {
    pub last: Price,
    pub best_bid: Price,
    pub best_ask: Price,
}

impl MarketSnapshot {
    pub fn new(last: Price, best_bid: Price, best_ask: Price) -> Self {
        Self {
            last,
            best_bid,
            best_ask,
        }
    }

    /// Top-of-book spread in quote currency.
    pub fn spread(&self) -> f64 {
        self.best_ask - self.best_bid
    }
}
