//! Runs against the database named by `DATABASE_URL`:
//! `cargo test -p foodtasker-order-service -- --ignored`.

use std::env;
use std::str::FromStr;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::insert_into;
use diesel::prelude::*;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use foodtasker_order_service::clock::FixedClock;
use foodtasker_order_service::error::{Conflict, ServiceError};
use foodtasker_order_service::models::{Credential, OrderStatus, Principal, Role};
use foodtasker_order_service::schema::{customers, drivers, meals, restaurants};
use foodtasker_order_service::store::postgres::run_migrations;
use foodtasker_order_service::store::{OrderStore, PgOrderStore};
use foodtasker_order_service::{LineItem, LineItems, OrderServices};
use uuid::Uuid;

struct Seed {
    restaurant_id: i32,
    burger_id: i32,
    fries_id: i32,
    customer_id: i32,
    customer_account: Uuid,
    driver_ids: [i32; 2],
}

fn money(value: &str) -> BigDecimal {
    BigDecimal::from_str(value).unwrap()
}

async fn setup(now: &str) -> (OrderServices, Arc<PgOrderStore>, Seed) {
    dotenvy::dotenv().ok();
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    run_migrations(&database_url).await.unwrap();

    let mut conn = AsyncPgConnection::establish(&database_url).await.unwrap();
    let restaurant_id = insert_into(restaurants::table)
        .values((
            restaurants::account_id.eq(Uuid::new_v4()),
            restaurants::name.eq("Burger Barn"),
            restaurants::phone.eq("010-0000-0000"),
            restaurants::address.eq("1 Main St"),
        ))
        .returning(restaurants::id)
        .get_result::<i32>(&mut conn)
        .await
        .unwrap();
    let mut meal_ids = vec![];
    for (name, price) in [("Burger", "10.00"), ("Fries", "5.00")] {
        let id = insert_into(meals::table)
            .values((
                meals::restaurant_id.eq(restaurant_id),
                meals::name.eq(name),
                meals::short_description.eq(""),
                meals::price.eq(money(price)),
            ))
            .returning(meals::id)
            .get_result::<i32>(&mut conn)
            .await
            .unwrap();
        meal_ids.push(id);
    }
    let customer_account = Uuid::new_v4();
    let customer_id = insert_into(customers::table)
        .values((
            customers::account_id.eq(customer_account),
            customers::name.eq("Alice"),
            customers::phone.eq(""),
            customers::address.eq("12 Elm Street"),
        ))
        .returning(customers::id)
        .get_result::<i32>(&mut conn)
        .await
        .unwrap();
    let mut driver_ids = [0; 2];
    for (slot, name) in driver_ids.iter_mut().zip(["Dave", "Erin"]) {
        *slot = insert_into(drivers::table)
            .values((
                drivers::account_id.eq(Uuid::new_v4()),
                drivers::name.eq(name),
                drivers::phone.eq(""),
                drivers::location.eq(""),
            ))
            .returning(drivers::id)
            .get_result::<i32>(&mut conn)
            .await
            .unwrap();
    }

    let store = Arc::new(PgOrderStore::connect(&database_url, 8).unwrap());
    let clock = Arc::new(FixedClock::new(now.parse::<DateTime<Utc>>().unwrap()));
    let services = OrderServices::new(store.clone(), clock, chrono::FixedOffset::east_opt(0).unwrap());
    let seed = Seed {
        restaurant_id,
        burger_id: meal_ids[0],
        fries_id: meal_ids[1],
        customer_id,
        customer_account,
        driver_ids,
    };
    (services, store, seed)
}

fn items(pairs: &[(i32, i32)]) -> LineItems {
    LineItems::new(
        pairs
            .iter()
            .map(|&(meal_id, quantity)| LineItem { meal_id, quantity })
            .collect(),
    )
    .unwrap()
}

#[tokio::test]
#[ignore]
async fn test_order_lifecycle() {
    let (services, store, seed) = setup("2024-05-08T12:00:00Z").await;

    let principal = store
        .resolve_principal(&Credential {
            account_id: seed.customer_account,
            role: Role::Customer,
        })
        .await
        .unwrap();
    assert_eq!(principal, Some(Principal::Customer(seed.customer_id)));

    let order = services
        .ledger
        .create_order(
            seed.customer_id,
            seed.restaurant_id,
            "12 Elm Street",
            &items(&[(seed.burger_id, 2), (seed.fries_id, 1)]),
        )
        .await
        .unwrap();
    assert_eq!(order.total, money("25.00"));

    let err = services
        .ledger
        .create_order(
            seed.customer_id,
            seed.restaurant_id,
            "12 Elm Street",
            &items(&[(seed.fries_id, 1)]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(Conflict::OutstandingOrder)));

    let latest = services
        .ledger
        .latest_order(seed.customer_id)
        .await
        .unwrap()
        .unwrap();
    let sub_totals = latest
        .details
        .iter()
        .map(|(detail, _)| detail.sub_total.clone())
        .collect::<Vec<_>>();
    assert_eq!(sub_totals, vec![money("20.00"), money("5.00")]);

    services
        .ledger
        .mark_order_ready(seed.restaurant_id, order.id)
        .await
        .unwrap();
    let [driver, _] = seed.driver_ids;
    services.dispatch.claim_order(driver, order.id).await.unwrap();
    let done = services
        .dispatch
        .complete_order(driver, order.id)
        .await
        .unwrap();
    assert_eq!(done.status, OrderStatus::Delivered);

    let revenue = services.revenue.current_week(driver).await.unwrap();
    assert_eq!(revenue.on(chrono::Weekday::Wed), &money("25.00"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_concurrent_claims_have_one_winner() {
    let (services, store, seed) = setup("2024-05-08T12:00:00Z").await;

    let order = services
        .ledger
        .create_order(
            seed.customer_id,
            seed.restaurant_id,
            "12 Elm Street",
            &items(&[(seed.burger_id, 1)]),
        )
        .await
        .unwrap();
    services
        .ledger
        .mark_order_ready(seed.restaurant_id, order.id)
        .await
        .unwrap();

    let order_id = order.id;
    let claims = seed.driver_ids.map(|driver_id| {
        let dispatch = services.dispatch.clone();
        tokio::spawn(async move { (driver_id, dispatch.claim_order(driver_id, order_id).await) })
    });

    let mut winners = vec![];
    for claim in claims {
        match claim.await.unwrap() {
            (driver_id, Ok(_)) => winners.push(driver_id),
            (_, Err(err)) => {
                assert!(matches!(err, ServiceError::Conflict(Conflict::AlreadyPicked)))
            }
        }
    }
    assert_eq!(winners.len(), 1);

    let record = store.latest_driver_order(winners[0]).await.unwrap().unwrap();
    assert_eq!(record.order.id, order.id);
    assert_eq!(record.order.status, OrderStatus::OnTheWay);
    assert_eq!(record.driver.map(|d| d.id), Some(winners[0]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_concurrent_orders_for_one_customer_have_one_winner() {
    let (services, store, seed) = setup("2024-05-08T12:00:00Z").await;

    let attempts = (0..8)
        .map(|_| {
            let ledger = services.ledger.clone();
            let customer_id = seed.customer_id;
            let restaurant_id = seed.restaurant_id;
            let burger_id = seed.burger_id;
            tokio::spawn(async move {
                ledger
                    .create_order(
                        customer_id,
                        restaurant_id,
                        "12 Elm Street",
                        &items(&[(burger_id, 1)]),
                    )
                    .await
            })
        })
        .collect::<Vec<_>>();

    let mut winners = vec![];
    for attempt in attempts {
        match attempt.await.unwrap() {
            Ok(order) => winners.push(order.id),
            Err(err) => assert!(matches!(
                err,
                ServiceError::Conflict(Conflict::OutstandingOrder)
            )),
        }
    }
    assert_eq!(winners.len(), 1);

    let record = store
        .latest_customer_order(seed.customer_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.order.id, winners[0]);
}

#[tokio::test]
#[ignore]
async fn test_oversized_order_is_rejected_before_storage() {
    let (services, store, seed) = setup("2024-05-08T12:00:00Z").await;

    let err = services
        .ledger
        .create_order(
            seed.customer_id,
            seed.restaurant_id,
            "12 Elm Street",
            &items(&[(seed.burger_id, 2_000_000_000)]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
    assert!(
        store
            .latest_customer_order(seed.customer_id)
            .await
            .unwrap()
            .is_none()
    );
}
