use crate::execution::order_action::Side;
use crate::types::instrument::Instrument;
use crate::types::price::Price;

/// Outcome of one applied order action.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderReport {
    Placed {
        order_id: String,
        instrument: Instrument,
        side: Side,
        price: Price,
        quantity: f64,
    },

    Cancelled {
        order_id: String,
        instrument: Instrument,
        side: Side,
    },
}

impl OrderReport {
    pub fn is_placed(&self) -> bool {
        matches!(self, OrderReport::Placed { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, OrderReport::Cancelled { .. })
    }
}
