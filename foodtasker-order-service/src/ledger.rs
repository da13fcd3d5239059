use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::error::{Conflict, ServiceError};
use crate::models::{max_amount, NewOrder, Order, OrderRecord, OrderStatus, PricedLine};
use crate::store::{InsertOutcome, OrderStore, ReadyOutcome};

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineItem {
    pub meal_id: i32,
    pub quantity: i32,
}

/// A non-empty list of line items with positive quantities.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineItems(Vec<LineItem>);

impl LineItems {
    pub fn new(items: Vec<LineItem>) -> Result<Self, ServiceError> {
        if items.is_empty() {
            return Err(ServiceError::validation("Order must contain at least one meal"));
        }
        if let Some(item) = items.iter().find(|item| item.quantity <= 0) {
            return Err(ServiceError::validation(format!(
                "Quantity of meal {} must be positive",
                item.meal_id
            )));
        }
        Ok(Self(items))
    }

    pub fn iter(&self) -> impl Iterator<Item = &LineItem> {
        self.0.iter()
    }

    fn meal_ids(&self) -> Vec<i32> {
        let mut ids = self.0.iter().map(|item| item.meal_id).collect::<Vec<_>>();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// Parses the `order_details` wire form: `[{"meal_id": 1, "quantity": 2}, ...]`.
impl FromStr for LineItems {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let items = serde_json::from_str::<Vec<LineItem>>(s)
            .map_err(|e| ServiceError::validation(format!("Invalid order details: {}", e)))?;
        Self::new(items)
    }
}

/// Owns orders and their details from creation until a driver takes over.
#[derive(Clone)]
pub struct OrderLedger {
    store: Arc<dyn OrderStore>,
    clock: Arc<dyn Clock>,
}

impl OrderLedger {
    pub fn new(store: Arc<dyn OrderStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Prices every line against the current menu and persists the order in
    /// COOKING state. Fails with [`Conflict::OutstandingOrder`] while the
    /// customer has any undelivered order, whatever the request contains.
    pub async fn create_order(
        &self,
        customer_id: i32,
        restaurant_id: i32,
        address: &str,
        items: &LineItems,
    ) -> Result<Order, ServiceError> {
        self.ensure_no_outstanding_order(customer_id).await?;
        self.place_order(customer_id, restaurant_id, address, items)
            .await
    }

    /// Same as [`OrderLedger::create_order`] with the line items still in
    /// their JSON wire form. The outstanding-order conflict wins over a
    /// malformed `order_details`.
    pub async fn create_order_from_wire(
        &self,
        customer_id: i32,
        restaurant_id: i32,
        address: &str,
        order_details: &str,
    ) -> Result<Order, ServiceError> {
        self.ensure_no_outstanding_order(customer_id).await?;
        let items = order_details.parse::<LineItems>()?;
        self.place_order(customer_id, restaurant_id, address, &items)
            .await
    }

    async fn ensure_no_outstanding_order(&self, customer_id: i32) -> Result<(), ServiceError> {
        if self.store.has_outstanding_order(customer_id).await? {
            warn!(customer_id, "rejected order: previous order still outstanding");
            return Err(Conflict::OutstandingOrder.into());
        }
        Ok(())
    }

    async fn place_order(
        &self,
        customer_id: i32,
        restaurant_id: i32,
        address: &str,
        items: &LineItems,
    ) -> Result<Order, ServiceError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(ServiceError::validation("Address is required"));
        }

        if self.store.find_restaurant(restaurant_id).await?.is_none() {
            return Err(ServiceError::not_found(format!(
                "Restaurant {} not found",
                restaurant_id
            )));
        }

        let meals = self
            .store
            .find_meals(&items.meal_ids())
            .await?
            .into_iter()
            .map(|meal| (meal.id, meal))
            .collect::<HashMap<_, _>>();

        let limit = max_amount();
        let mut lines = Vec::new();
        let mut total = BigDecimal::zero();
        for item in items.iter() {
            let meal = meals
                .get(&item.meal_id)
                .filter(|meal| meal.restaurant_id == restaurant_id)
                .ok_or_else(|| {
                    ServiceError::not_found(format!("Meal {} not found", item.meal_id))
                })?;
            let sub_total = &meal.price * BigDecimal::from(item.quantity);
            if sub_total > limit {
                return Err(ServiceError::validation(format!(
                    "Amount for meal {} is too large",
                    item.meal_id
                )));
            }
            total += &sub_total;
            lines.push(PricedLine {
                meal_id: meal.id,
                quantity: item.quantity,
                sub_total,
            });
        }

        if total > limit {
            return Err(ServiceError::validation("Order total is too large"));
        }

        let new_order = NewOrder {
            customer_id,
            restaurant_id,
            address: address.to_string(),
            total,
            status: OrderStatus::Cooking,
            created_at: self.clock.now(),
        };
        match self.store.insert_order(new_order, lines).await? {
            InsertOutcome::Inserted(order) => {
                info!(order_id = order.id, customer_id, restaurant_id, total = %order.total, "order created");
                Ok(order)
            }
            InsertOutcome::OutstandingOrder => {
                warn!(customer_id, "rejected order: lost race against a concurrent order");
                Err(Conflict::OutstandingOrder.into())
            }
        }
    }

    pub async fn latest_order(&self, customer_id: i32) -> Result<Option<OrderRecord>, ServiceError> {
        Ok(self.store.latest_customer_order(customer_id).await?)
    }

    /// Number of the restaurant's orders created strictly after `since`.
    pub async fn notify_count(
        &self,
        restaurant_id: i32,
        since: DateTime<Utc>,
    ) -> Result<i64, ServiceError> {
        Ok(self.store.count_orders_since(restaurant_id, since).await?)
    }

    pub async fn mark_order_ready(
        &self,
        restaurant_id: i32,
        order_id: i32,
    ) -> Result<Order, ServiceError> {
        match self.store.mark_ready(restaurant_id, order_id).await? {
            ReadyOutcome::Ready(order) => {
                info!(order_id, restaurant_id, "order ready for pickup");
                Ok(order)
            }
            ReadyOutcome::NotCooking => Err(Conflict::NotCooking.into()),
            ReadyOutcome::NotFound => Err(ServiceError::not_found(format!(
                "Order {} not found",
                order_id
            ))),
        }
    }
}
