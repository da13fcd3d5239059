use std::str::FromStr;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::{DateTime, FixedOffset, Utc};
use uuid::Uuid;

use crate::clock::{Clock, FixedClock};
use crate::dispatch::DispatchCoordinator;
use crate::ledger::{LineItem, LineItems, OrderLedger};
use crate::location::LocationReporter;
use crate::models::{Customer, Driver, Meal, Order, Restaurant};
use crate::revenue::RevenueAggregator;
use crate::store::MemoryOrderStore;

pub fn money(value: &str) -> BigDecimal {
    BigDecimal::from_str(value).unwrap()
}

/// Two restaurants, three customers and two drivers over an in-memory store.
pub struct Fixture {
    pub store: Arc<MemoryOrderStore>,
    pub clock: Arc<FixedClock>,
    pub restaurant: Restaurant,
    pub other_restaurant: Restaurant,
    pub burger: Meal,
    pub fries: Meal,
    pub foreign_meal: Meal,
    pub customer: Customer,
    pub other_customer: Customer,
    pub third_customer: Customer,
    pub driver: Driver,
    pub other_driver: Driver,
}

impl Fixture {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryOrderStore::new());
        let clock = Arc::new(FixedClock::new(
            "2024-05-08T12:00:00Z".parse::<DateTime<Utc>>().unwrap(),
        ));

        let restaurant = store
            .add_restaurant(Uuid::new_v4(), "Burger Barn", "1 Main St")
            .await;
        let other_restaurant = store
            .add_restaurant(Uuid::new_v4(), "Pho 24", "2 Main St")
            .await;
        let burger = store.add_meal(restaurant.id, "Burger", money("10.00")).await;
        let fries = store.add_meal(restaurant.id, "Fries", money("5.00")).await;
        let foreign_meal = store
            .add_meal(other_restaurant.id, "Beef pho", money("9.50"))
            .await;

        Self {
            customer: store.add_customer(Uuid::new_v4(), "Alice").await,
            other_customer: store.add_customer(Uuid::new_v4(), "Bob").await,
            third_customer: store.add_customer(Uuid::new_v4(), "Carol").await,
            driver: store.add_driver(Uuid::new_v4(), "Dave").await,
            other_driver: store.add_driver(Uuid::new_v4(), "Erin").await,
            store,
            clock,
            restaurant,
            other_restaurant,
            burger,
            fries,
            foreign_meal,
        }
    }

    pub fn ledger(&self) -> OrderLedger {
        OrderLedger::new(self.store.clone(), self.clock.clone())
    }

    pub fn dispatch(&self) -> DispatchCoordinator {
        DispatchCoordinator::new(self.store.clone(), self.clock.clone())
    }

    pub fn revenue(&self, offset_hours: i32) -> RevenueAggregator {
        let offset = FixedOffset::east_opt(offset_hours * 3600).unwrap();
        RevenueAggregator::new(self.store.clone(), self.clock.clone(), offset)
    }

    pub fn location(&self) -> LocationReporter {
        LocationReporter::new(self.store.clone())
    }

    pub async fn place_order(&self, lines: &[(i32, i32)]) -> Order {
        self.place_order_for(self.customer.id, lines).await
    }

    pub async fn place_order_for(&self, customer_id: i32, lines: &[(i32, i32)]) -> Order {
        let items = LineItems::new(
            lines
                .iter()
                .map(|&(meal_id, quantity)| LineItem { meal_id, quantity })
                .collect(),
        )
        .unwrap();
        self.ledger()
            .create_order(customer_id, self.restaurant.id, "12 Elm Street", &items)
            .await
            .unwrap()
    }

    pub async fn ready_order(&self, lines: &[(i32, i32)]) -> Order {
        self.ready_order_for(self.customer.id, lines).await
    }

    pub async fn ready_order_for(&self, customer_id: i32, lines: &[(i32, i32)]) -> Order {
        let order = self.place_order_for(customer_id, lines).await;
        self.ledger()
            .mark_order_ready(self.restaurant.id, order.id)
            .await
            .unwrap()
    }

    /// Takes a COOKING order all the way to DELIVERED.
    pub async fn deliver(&self, order_id: i32, driver_id: i32) {
        let dispatch = self.dispatch();
        self.ledger()
            .mark_order_ready(self.restaurant.id, order_id)
            .await
            .unwrap();
        dispatch.claim_order(driver_id, order_id).await.unwrap();
        dispatch.complete_order(driver_id, order_id).await.unwrap();
    }

    /// Places and delivers an order for the main customer with the clock set
    /// to `at`.
    pub async fn delivered_order_at(
        &self,
        at: &str,
        driver_id: i32,
        lines: &[(i32, i32)],
    ) -> Order {
        self.clock.set(at.parse::<DateTime<Utc>>().unwrap());
        let order = self.place_order(lines).await;
        self.deliver(order.id, driver_id).await;
        assert_eq!(order.created_at, self.clock.now());
        order
    }
}
