use std::collections::BTreeMap;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{ClaimOutcome, CompleteOutcome, InsertOutcome, OrderStore, ReadyOutcome};
use crate::error::StoreError;
use crate::models::{
    Credential, Customer, Driver, Meal, NewOrder, Order, OrderDetail, OrderRecord, OrderStatus,
    PricedLine, Principal, Restaurant, Role,
};

#[derive(Default)]
struct Tables {
    restaurants: BTreeMap<i32, Restaurant>,
    meals: BTreeMap<i32, Meal>,
    customers: BTreeMap<i32, Customer>,
    drivers: BTreeMap<i32, Driver>,
    orders: BTreeMap<i32, Order>,
    order_details: BTreeMap<i32, OrderDetail>,
    sequence: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.sequence += 1;
        self.sequence
    }

    fn record(&self, order: &Order) -> Option<OrderRecord> {
        let details = self
            .order_details
            .values()
            .filter(|d| d.order_id == order.id)
            .map(|d| Some((d.clone(), self.meals.get(&d.meal_id)?.clone())))
            .collect::<Option<Vec<_>>>()?;
        Some(OrderRecord {
            order: order.clone(),
            customer: self.customers.get(&order.customer_id)?.clone(),
            restaurant: self.restaurants.get(&order.restaurant_id)?.clone(),
            driver: order
                .driver_id
                .and_then(|id| self.drivers.get(&id))
                .cloned(),
            details,
        })
    }

    fn has_active_delivery(&self, driver_id: i32) -> bool {
        self.orders
            .values()
            .any(|o| o.driver_id == Some(driver_id) && o.status.is_outstanding())
    }
}

/// Process-local store. One lock guards every table, so each trait method is
/// linearizable against the others.
#[derive(Default)]
pub struct MemoryOrderStore {
    tables: Mutex<Tables>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_restaurant(&self, account_id: Uuid, name: &str, address: &str) -> Restaurant {
        let mut tables = self.tables.lock().await;
        let restaurant = Restaurant {
            id: tables.next_id(),
            account_id,
            name: name.to_string(),
            phone: String::new(),
            address: address.to_string(),
        };
        tables.restaurants.insert(restaurant.id, restaurant.clone());
        restaurant
    }

    pub async fn add_meal(&self, restaurant_id: i32, name: &str, price: BigDecimal) -> Meal {
        let mut tables = self.tables.lock().await;
        let meal = Meal {
            id: tables.next_id(),
            restaurant_id,
            name: name.to_string(),
            short_description: String::new(),
            price,
        };
        tables.meals.insert(meal.id, meal.clone());
        meal
    }

    pub async fn add_customer(&self, account_id: Uuid, name: &str) -> Customer {
        let mut tables = self.tables.lock().await;
        let customer = Customer {
            id: tables.next_id(),
            account_id,
            name: name.to_string(),
            phone: String::new(),
            address: String::new(),
        };
        tables.customers.insert(customer.id, customer.clone());
        customer
    }

    pub async fn add_driver(&self, account_id: Uuid, name: &str) -> Driver {
        let mut tables = self.tables.lock().await;
        let driver = Driver {
            id: tables.next_id(),
            account_id,
            name: name.to_string(),
            phone: String::new(),
            location: String::new(),
        };
        tables.drivers.insert(driver.id, driver.clone());
        driver
    }

    pub async fn set_meal_price(&self, meal_id: i32, price: BigDecimal) -> bool {
        let mut tables = self.tables.lock().await;
        match tables.meals.get_mut(&meal_id) {
            Some(meal) => {
                meal.price = price;
                true
            }
            None => false,
        }
    }

    pub async fn order(&self, order_id: i32) -> Option<Order> {
        self.tables.lock().await.orders.get(&order_id).cloned()
    }

    pub async fn order_details(&self, order_id: i32) -> Vec<OrderDetail> {
        self.tables
            .lock()
            .await
            .order_details
            .values()
            .filter(|d| d.order_id == order_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn resolve_principal(
        &self,
        credential: &Credential,
    ) -> Result<Option<Principal>, StoreError> {
        let tables = self.tables.lock().await;
        let account_id = credential.account_id;
        Ok(match credential.role {
            Role::Customer => tables
                .customers
                .values()
                .find(|c| c.account_id == account_id)
                .map(|c| Principal::Customer(c.id)),
            Role::Restaurant => tables
                .restaurants
                .values()
                .find(|r| r.account_id == account_id)
                .map(|r| Principal::Restaurant(r.id)),
            Role::Driver => tables
                .drivers
                .values()
                .find(|d| d.account_id == account_id)
                .map(|d| Principal::Driver(d.id)),
        })
    }

    async fn list_restaurants(&self) -> Result<Vec<Restaurant>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.restaurants.values().rev().cloned().collect())
    }

    async fn find_restaurant(&self, restaurant_id: i32) -> Result<Option<Restaurant>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.restaurants.get(&restaurant_id).cloned())
    }

    async fn list_meals(&self, restaurant_id: i32) -> Result<Vec<Meal>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .meals
            .values()
            .rev()
            .filter(|m| m.restaurant_id == restaurant_id)
            .cloned()
            .collect())
    }

    async fn find_meals(&self, meal_ids: &[i32]) -> Result<Vec<Meal>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .meals
            .values()
            .filter(|m| meal_ids.contains(&m.id))
            .cloned()
            .collect())
    }

    async fn has_outstanding_order(&self, customer_id: i32) -> Result<bool, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .orders
            .values()
            .any(|o| o.customer_id == customer_id && o.status.is_outstanding()))
    }

    async fn insert_order(
        &self,
        order: NewOrder,
        lines: Vec<PricedLine>,
    ) -> Result<InsertOutcome, StoreError> {
        let mut tables = self.tables.lock().await;
        let outstanding = tables
            .orders
            .values()
            .any(|o| o.customer_id == order.customer_id && o.status.is_outstanding());
        if outstanding {
            return Ok(InsertOutcome::OutstandingOrder);
        }

        let created = Order {
            id: tables.next_id(),
            customer_id: order.customer_id,
            restaurant_id: order.restaurant_id,
            driver_id: None,
            address: order.address,
            total: order.total,
            status: order.status,
            created_at: order.created_at,
            picked_at: None,
        };
        for line in lines {
            let detail = OrderDetail {
                id: tables.next_id(),
                order_id: created.id,
                meal_id: line.meal_id,
                quantity: line.quantity,
                sub_total: line.sub_total,
            };
            tables.order_details.insert(detail.id, detail);
        }
        tables.orders.insert(created.id, created.clone());
        Ok(InsertOutcome::Inserted(created))
    }

    async fn latest_customer_order(
        &self,
        customer_id: i32,
    ) -> Result<Option<OrderRecord>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .orders
            .values()
            .rev()
            .find(|o| o.customer_id == customer_id)
            .and_then(|o| tables.record(o)))
    }

    async fn count_orders_since(
        &self,
        restaurant_id: i32,
        since: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .orders
            .values()
            .filter(|o| o.restaurant_id == restaurant_id && o.created_at > since)
            .count() as i64)
    }

    async fn mark_ready(
        &self,
        restaurant_id: i32,
        order_id: i32,
    ) -> Result<ReadyOutcome, StoreError> {
        let mut tables = self.tables.lock().await;
        let order = match tables.orders.get_mut(&order_id) {
            Some(order) if order.restaurant_id == restaurant_id => order,
            _ => return Ok(ReadyOutcome::NotFound),
        };
        if order.status != OrderStatus::Cooking {
            return Ok(ReadyOutcome::NotCooking);
        }
        order.status = OrderStatus::Ready;
        Ok(ReadyOutcome::Ready(order.clone()))
    }

    async fn list_ready_orders(&self) -> Result<Vec<OrderRecord>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .orders
            .values()
            .rev()
            .filter(|o| o.status == OrderStatus::Ready && o.driver_id.is_none())
            .filter_map(|o| tables.record(o))
            .collect())
    }

    async fn has_active_delivery(&self, driver_id: i32) -> Result<bool, StoreError> {
        Ok(self.tables.lock().await.has_active_delivery(driver_id))
    }

    async fn claim_order(
        &self,
        driver_id: i32,
        order_id: i32,
        picked_at: DateTime<Utc>,
    ) -> Result<ClaimOutcome, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.has_active_delivery(driver_id) {
            return Ok(ClaimOutcome::DriverBusy);
        }
        match tables.orders.get_mut(&order_id) {
            Some(order) if order.driver_id.is_none() && order.status == OrderStatus::Ready => {
                order.driver_id = Some(driver_id);
                order.status = OrderStatus::OnTheWay;
                order.picked_at = Some(picked_at);
                Ok(ClaimOutcome::Claimed(order.clone()))
            }
            _ => Ok(ClaimOutcome::Unavailable),
        }
    }

    async fn latest_driver_order(
        &self,
        driver_id: i32,
    ) -> Result<Option<OrderRecord>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .orders
            .values()
            .filter(|o| o.driver_id == Some(driver_id) && o.picked_at.is_some())
            .max_by_key(|o| (o.picked_at, o.id))
            .and_then(|o| tables.record(o)))
    }

    async fn complete_order(
        &self,
        driver_id: i32,
        order_id: i32,
    ) -> Result<CompleteOutcome, StoreError> {
        let mut tables = self.tables.lock().await;
        match tables.orders.get_mut(&order_id) {
            Some(order) if order.driver_id == Some(driver_id) => {
                if order.status == OrderStatus::Delivered {
                    return Ok(CompleteOutcome::AlreadyDelivered(order.clone()));
                }
                order.status = OrderStatus::Delivered;
                Ok(CompleteOutcome::Completed(order.clone()))
            }
            _ => Ok(CompleteOutcome::NotAssigned),
        }
    }

    async fn delivered_orders_between(
        &self,
        driver_id: i32,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Order>, StoreError> {
        let tables = self.tables.lock().await;
        let mut orders = tables
            .orders
            .values()
            .filter(|o| {
                o.driver_id == Some(driver_id)
                    && o.status == OrderStatus::Delivered
                    && o.created_at >= from
                    && o.created_at < until
            })
            .cloned()
            .collect::<Vec<_>>();
        orders.sort_by_key(|o| o.created_at);
        Ok(orders)
    }

    async fn update_driver_location(
        &self,
        driver_id: i32,
        location: &str,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        match tables.drivers.get_mut(&driver_id) {
            Some(driver) => {
                driver.location = location.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_driver(&self, driver_id: i32) -> Result<Option<Driver>, StoreError> {
        Ok(self.tables.lock().await.drivers.get(&driver_id).cloned())
    }
}
