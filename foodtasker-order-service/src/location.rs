use std::sync::Arc;

use tracing::debug;

use crate::error::ServiceError;
use crate::models::OrderStatus;
use crate::store::OrderStore;

#[derive(Clone)]
pub struct LocationReporter {
    store: Arc<dyn OrderStore>,
}

impl LocationReporter {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    /// Overwrites the driver's last known location. No history is kept.
    pub async fn update_location(&self, driver_id: i32, location: &str) -> Result<(), ServiceError> {
        if !self.store.update_driver_location(driver_id, location).await? {
            return Err(ServiceError::not_found(format!("Driver {} not found", driver_id)));
        }
        debug!(driver_id, "driver location updated");
        Ok(())
    }

    /// Where the driver carrying the customer's latest order currently is.
    /// `None` unless that order is on the way.
    pub async fn driver_location_for_customer(
        &self,
        customer_id: i32,
    ) -> Result<Option<String>, ServiceError> {
        let record = match self.store.latest_customer_order(customer_id).await? {
            Some(record) if record.order.status == OrderStatus::OnTheWay => record,
            _ => return Ok(None),
        };
        match record.order.driver_id {
            Some(driver_id) => Ok(self
                .store
                .find_driver(driver_id)
                .await?
                .map(|driver| driver.location)),
            None => Ok(None),
        }
    }
}
