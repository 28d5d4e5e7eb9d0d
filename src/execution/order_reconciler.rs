use uuid::Uuid;

use crate::{
    execution::{
        order_action::{Order, OrderAction, OrderType, Side},
        types::{OpenOrder, SidePlan},
    },
    types::{instrument::Instrument, price::Price, quote::Quote, quote_target::QuoteTarget},
};

/// Re-quote only when the resting price is further than this fraction of the
/// current price from the desired price.
pub const DEFAULT_PRICE_TOLERANCE: f64 = 0.001;

/// Converges the exchange's open orders for one pair towards a [`QuoteTarget`].
///
/// Pure: it never talks to the exchange, it only emits [`OrderAction`]s. For
/// each side all cancellations come before that side's placement, and the buy
/// side is emitted before the sell side.
#[derive(Debug, Clone)]
pub struct OrderReconciler {
    instrument: Instrument,
    tolerance_fraction: f64,
}

impl OrderReconciler {
    pub fn new(instrument: Instrument, tolerance_fraction: f64) -> Self {
        Self {
            instrument,
            tolerance_fraction,
        }
    }

    pub fn for_instrument(instrument: &Instrument) -> Self {
        Self::new(instrument.clone(), DEFAULT_PRICE_TOLERANCE)
    }

    pub fn tolerance(&self, current_price: Price) -> f64 {
        current_price.as_f64() * self.tolerance_fraction
    }

    pub fn reconcile(
        &self,
        open_orders: &[OpenOrder],
        target: &QuoteTarget,
        current_price: Price,
    ) -> Vec<OrderAction> {
        let tolerance = self.tolerance(current_price);

        let mut actions = Vec::new();
        actions.extend(self.reconcile_side(open_orders, &target.bid, tolerance));
        actions.extend(self.reconcile_side(open_orders, &target.ask, tolerance));

        actions
    }

    /// Cancels every order that is still open, used to step away from the book.
    pub fn cancel_all(&self, open_orders: &[OpenOrder]) -> Vec<OrderAction> {
        open_orders
            .iter()
            .filter(|order| order.is_open())
            .map(|order| self.cancel_action(order))
            .collect()
    }

    fn reconcile_side(
        &self,
        open_orders: &[OpenOrder],
        desired: &Quote,
        tolerance: f64,
    ) -> Vec<OrderAction> {
        let side = desired.side;
        let mut resting = open_orders
            .iter()
            .filter(|order| order.side == side && order.is_open());

        let kept = resting.next();

        let mut actions: Vec<OrderAction> = resting
            .map(|redundant| {
                tracing::info!(
                    pair = %self.instrument,
                    %side,
                    order_id = %redundant.order_id,
                    "cancelling redundant order"
                );
                self.cancel_action(redundant)
            })
            .collect();

        match self.plan(kept, desired, tolerance) {
            SidePlan::NoAction => {}
            SidePlan::Place { desired } => actions.push(self.place_action(&desired)),
            SidePlan::Replace {
                old_order_id,
                desired,
            } => {
                actions.push(OrderAction::Cancel {
                    order_id: old_order_id,
                    instrument: self.instrument.clone(),
                    side,
                });
                actions.push(self.place_action(&desired));
            }
        }

        actions
    }

    fn plan(&self, kept: Option<&OpenOrder>, desired: &Quote, tolerance: f64) -> SidePlan {
        match kept {
            None => SidePlan::Place { desired: *desired },
            Some(existing) => {
                let drift = existing.price.distance(desired.price);

                if drift > tolerance {
                    tracing::info!(
                        pair = %self.instrument,
                        side = %desired.side,
                        order_id = %existing.order_id,
                        existing = %existing.price,
                        desired = %desired.price,
                        drift,
                        tolerance,
                        "quote drifted past tolerance"
                    );

                    SidePlan::Replace {
                        old_order_id: existing.order_id.clone(),
                        desired: *desired,
                    }
                } else {
                    SidePlan::NoAction
                }
            }
        }
    }

    fn place_action(&self, desired: &Quote) -> OrderAction {
        OrderAction::Place(Order {
            client_order_id: generate_client_order_id(),
            instrument: self.instrument.clone(),
            side: desired.side,
            price: desired.price,
            quantity: desired.quantity,
            order_type: OrderType::Limit,
        })
    }

    fn cancel_action(&self, order: &OpenOrder) -> OrderAction {
        OrderAction::Cancel {
            order_id: order.order_id.clone(),
            instrument: self.instrument.clone(),
            side: order.side,
        }
    }
}

fn generate_client_order_id() -> String {
    Uuid::new_v4().simple().to_string()
}
