use std::sync::Arc;

use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::{Conflict, ServiceError};
use crate::models::{Order, OrderRecord};
use crate::store::{ClaimOutcome, CompleteOutcome, OrderStore};

/// Hands READY orders to drivers and closes deliveries.
///
/// A driver holds at most one undelivered order and an order is held by at
/// most one driver. Both rules are enforced by the store's atomic claim, the
/// early busy check here only spares a write.
#[derive(Clone)]
pub struct DispatchCoordinator {
    store: Arc<dyn OrderStore>,
    clock: Arc<dyn Clock>,
}

impl DispatchCoordinator {
    pub fn new(store: Arc<dyn OrderStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// READY orders nobody has claimed yet, newest first.
    pub async fn list_ready_orders(&self) -> Result<Vec<OrderRecord>, ServiceError> {
        Ok(self.store.list_ready_orders().await?)
    }

    pub async fn claim_order(&self, driver_id: i32, order_id: i32) -> Result<Order, ServiceError> {
        if self.store.has_active_delivery(driver_id).await? {
            debug!(driver_id, order_id, "claim refused: driver busy");
            return Err(Conflict::DriverBusy.into());
        }

        match self
            .store
            .claim_order(driver_id, order_id, self.clock.now())
            .await?
        {
            ClaimOutcome::Claimed(order) => {
                info!(driver_id, order_id, "order picked up");
                Ok(order)
            }
            ClaimOutcome::DriverBusy => Err(Conflict::DriverBusy.into()),
            ClaimOutcome::Unavailable => {
                debug!(driver_id, order_id, "claim lost");
                Err(Conflict::AlreadyPicked.into())
            }
        }
    }

    /// The order this driver picked up most recently.
    pub async fn latest_order(&self, driver_id: i32) -> Result<Option<OrderRecord>, ServiceError> {
        Ok(self.store.latest_driver_order(driver_id).await?)
    }

    /// Marks the driver's order delivered. Repeating the call on a delivered
    /// order succeeds without changing it.
    pub async fn complete_order(
        &self,
        driver_id: i32,
        order_id: i32,
    ) -> Result<Order, ServiceError> {
        match self.store.complete_order(driver_id, order_id).await? {
            CompleteOutcome::Completed(order) => {
                info!(driver_id, order_id, "order delivered");
                Ok(order)
            }
            CompleteOutcome::AlreadyDelivered(order) => Ok(order),
            CompleteOutcome::NotAssigned => Err(ServiceError::not_found(format!(
                "Order {} is not assigned to you",
                order_id
            ))),
        }
    }
}
