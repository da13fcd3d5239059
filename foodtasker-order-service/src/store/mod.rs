use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::models::{
    Credential, Driver, Meal, NewOrder, Order, OrderRecord, PricedLine, Principal, Restaurant,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryOrderStore;
pub use postgres::PgOrderStore;

#[derive(Debug, PartialEq)]
pub enum InsertOutcome {
    Inserted(Order),
    OutstandingOrder,
}

#[derive(Debug, PartialEq)]
pub enum ReadyOutcome {
    Ready(Order),
    NotCooking,
    NotFound,
}

#[derive(Debug, PartialEq)]
pub enum ClaimOutcome {
    Claimed(Order),
    DriverBusy,
    Unavailable,
}

#[derive(Debug, PartialEq)]
pub enum CompleteOutcome {
    Completed(Order),
    AlreadyDelivered(Order),
    NotAssigned,
}

/// Durable state behind the order services.
///
/// Every state transition is a single atomic primitive here: implementations
/// must make the check and the write of `insert_order`, `mark_ready`,
/// `claim_order` and `complete_order` indivisible with respect to concurrent
/// callers.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn resolve_principal(
        &self,
        credential: &Credential,
    ) -> Result<Option<Principal>, StoreError>;

    async fn list_restaurants(&self) -> Result<Vec<Restaurant>, StoreError>;

    async fn find_restaurant(&self, restaurant_id: i32) -> Result<Option<Restaurant>, StoreError>;

    async fn list_meals(&self, restaurant_id: i32) -> Result<Vec<Meal>, StoreError>;

    async fn find_meals(&self, meal_ids: &[i32]) -> Result<Vec<Meal>, StoreError>;

    async fn has_outstanding_order(&self, customer_id: i32) -> Result<bool, StoreError>;

    /// Inserts the order and its lines unless the customer still has an
    /// undelivered order.
    async fn insert_order(
        &self,
        order: NewOrder,
        lines: Vec<PricedLine>,
    ) -> Result<InsertOutcome, StoreError>;

    async fn latest_customer_order(
        &self,
        customer_id: i32,
    ) -> Result<Option<OrderRecord>, StoreError>;

    async fn count_orders_since(
        &self,
        restaurant_id: i32,
        since: DateTime<Utc>,
    ) -> Result<i64, StoreError>;

    async fn mark_ready(&self, restaurant_id: i32, order_id: i32)
        -> Result<ReadyOutcome, StoreError>;

    async fn list_ready_orders(&self) -> Result<Vec<OrderRecord>, StoreError>;

    async fn has_active_delivery(&self, driver_id: i32) -> Result<bool, StoreError>;

    /// Assigns a READY, unassigned order to an idle driver.
    async fn claim_order(
        &self,
        driver_id: i32,
        order_id: i32,
        picked_at: DateTime<Utc>,
    ) -> Result<ClaimOutcome, StoreError>;

    async fn latest_driver_order(&self, driver_id: i32)
        -> Result<Option<OrderRecord>, StoreError>;

    async fn complete_order(
        &self,
        driver_id: i32,
        order_id: i32,
    ) -> Result<CompleteOutcome, StoreError>;

    /// Delivered orders of the driver created in `[from, until)`.
    async fn delivered_orders_between(
        &self,
        driver_id: i32,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Order>, StoreError>;

    async fn update_driver_location(
        &self,
        driver_id: i32,
        location: &str,
    ) -> Result<bool, StoreError>;

    async fn find_driver(&self, driver_id: i32) -> Result<Option<Driver>, StoreError>;
}
