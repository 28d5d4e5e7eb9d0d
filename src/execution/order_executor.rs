use tracing::{info, warn};

use crate::{
    error::GatewayError,
    execution::{
        order_action::{OrderAction, OrderType},
        order_report::OrderReport,
        types::OpenOrder,
    },
    gateway::DynamicGateway,
    types::instrument::Instrument,
};

/// Applies reconciler output through the gateway, strictly in order.
#[derive(Clone)]
pub struct OrderExecutor {
    gateway: DynamicGateway,
}

impl OrderExecutor {
    pub fn new(gateway: DynamicGateway) -> Self {
        Self { gateway }
    }

    /// Lists open orders and refreshes each one's status, so orders that filled
    /// since the listing are not treated as resting.
    pub async fn fetch_open_orders(
        &self,
        instrument: &Instrument,
    ) -> Result<Vec<OpenOrder>, GatewayError> {
        let mut orders = self.gateway.open_orders(instrument).await?;

        for order in orders.iter_mut() {
            let status = self
                .gateway
                .order_status(instrument, &order.order_id)
                .await?;

            if status != order.status {
                info!(
                    pair = %instrument,
                    order_id = %order.order_id,
                    side = %order.side,
                    %status,
                    "order resolved since listing"
                );
            }
            order.status = status;
        }

        Ok(orders)
    }

    /// Stops at the first failure: a side's placement never goes out unless its
    /// cancellations were acknowledged.
    pub async fn execute(&self, actions: &[OrderAction]) -> Result<Vec<OrderReport>, GatewayError> {
        let mut reports = Vec::with_capacity(actions.len());

        for action in actions {
            let report = match action {
                OrderAction::Cancel {
                    order_id,
                    instrument,
                    side,
                } => {
                    self.gateway
                        .cancel_order(instrument, order_id)
                        .await
                        .inspect_err(|error| {
                            warn!(pair = %instrument, %side, %order_id, %error, "cancel failed")
                        })?;

                    info!(pair = %instrument, %side, %order_id, "order cancelled");

                    OrderReport::Cancelled {
                        order_id: order_id.clone(),
                        instrument: instrument.clone(),
                        side: *side,
                    }
                }

                OrderAction::Place(place) => {
                    let placed = match place.order_type {
                        OrderType::Limit => {
                            self.gateway
                                .place_limit_order(
                                    &place.instrument,
                                    place.side,
                                    place.price,
                                    place.quantity,
                                    &place.client_order_id,
                                )
                                .await
                        }
                    }
                    .inspect_err(|error| {
                        warn!(
                            pair = %place.instrument,
                            side = %place.side,
                            price = %place.price,
                            quantity = place.quantity,
                            %error,
                            "order placement failed"
                        )
                    })?;

                    info!(
                        pair = %place.instrument,
                        side = %place.side,
                        order_id = %placed.order_id,
                        price = %place.price,
                        quantity = place.quantity,
                        "order placed"
                    );

                    OrderReport::Placed {
                        order_id: placed.order_id,
                        instrument: place.instrument.clone(),
                        side: place.side,
                        price: place.price,
                        quantity: place.quantity,
                    }
                }
            };

            reports.push(report);
        }

        Ok(reports)
    }
}
