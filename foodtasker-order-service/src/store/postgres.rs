use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::exists;
use diesel::{insert_into, select, update};
use diesel::prelude::*;
use diesel_async::async_connection_wrapper::AsyncConnectionWrapper;
use diesel_async::pooled_connection::deadpool::{Object, Pool};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::{
    scoped_futures::ScopedFutureExt, AsyncConnection, AsyncPgConnection, RunQueryDsl,
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::info;

use super::{ClaimOutcome, CompleteOutcome, InsertOutcome, OrderStore, ReadyOutcome};
use crate::error::StoreError;
use crate::models::{
    Credential, Customer, Driver, Meal, NewOrder, NewOrderDetail, Order, OrderDetail,
    OrderRecord, OrderStatus, PricedLine, Principal, Restaurant, Role,
};
use crate::schema::{customers, drivers, meals, order_details, orders, restaurants};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

/// Runs the embedded migrations on a dedicated connection.
pub async fn run_migrations(database_url: &str) -> Result<usize, StoreError> {
    let conn = AsyncPgConnection::establish(database_url)
        .await
        .map_err(|e| StoreError::Pool(e.to_string()))?;
    let mut async_wrapper: AsyncConnectionWrapper<AsyncPgConnection> =
        AsyncConnectionWrapper::from(conn);
    let applied = tokio::task::spawn_blocking(move || {
        async_wrapper
            .run_pending_migrations(MIGRATIONS)
            .map(|versions| versions.len())
            .map_err(|e| StoreError::Migration(e.to_string()))
    })
    .await
    .map_err(|e| StoreError::Migration(e.to_string()))??;
    info!(applied, "migrations applied");
    Ok(applied)
}

pub struct PgOrderStore {
    pool: Pool<AsyncPgConnection>,
}

impl PgOrderStore {
    pub fn connect(database_url: &str, max_size: usize) -> Result<Self, StoreError> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = Pool::builder(manager)
            .max_size(max_size)
            .build()
            .map_err(|e| StoreError::Pool(e.to_string()))?;
        Ok(Self { pool })
    }

    async fn conn(&self) -> Result<Object<AsyncPgConnection>, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))
    }
}

async fn load_records(
    conn: &mut AsyncPgConnection,
    orders: Vec<Order>,
) -> Result<Vec<OrderRecord>, StoreError> {
    if orders.is_empty() {
        return Ok(vec![]);
    }

    let order_ids = orders.iter().map(|o| o.id).collect::<Vec<_>>();
    let customer_ids = orders.iter().map(|o| o.customer_id).collect::<Vec<_>>();
    let restaurant_ids = orders.iter().map(|o| o.restaurant_id).collect::<Vec<_>>();
    let driver_ids = orders.iter().filter_map(|o| o.driver_id).collect::<Vec<_>>();

    let customers = customers::table
        .filter(customers::id.eq_any(customer_ids))
        .select(Customer::as_select())
        .load::<Customer>(conn)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect::<HashMap<_, _>>();
    let restaurants = restaurants::table
        .filter(restaurants::id.eq_any(restaurant_ids))
        .select(Restaurant::as_select())
        .load::<Restaurant>(conn)
        .await?
        .into_iter()
        .map(|r| (r.id, r))
        .collect::<HashMap<_, _>>();
    let drivers = drivers::table
        .filter(drivers::id.eq_any(driver_ids))
        .select(Driver::as_select())
        .load::<Driver>(conn)
        .await?
        .into_iter()
        .map(|d| (d.id, d))
        .collect::<HashMap<_, _>>();

    let mut details: HashMap<i32, Vec<(OrderDetail, Meal)>> = HashMap::new();
    for (detail, meal) in order_details::table
        .inner_join(meals::table)
        .filter(order_details::order_id.eq_any(order_ids))
        .order_by(order_details::id.asc())
        .select((OrderDetail::as_select(), Meal::as_select()))
        .load::<(OrderDetail, Meal)>(conn)
        .await?
    {
        details.entry(detail.order_id).or_default().push((detail, meal));
    }

    orders
        .into_iter()
        .map(|order| -> Result<OrderRecord, StoreError> {
            Ok(OrderRecord {
                customer: customers
                    .get(&order.customer_id)
                    .cloned()
                    .ok_or(diesel::result::Error::NotFound)?,
                restaurant: restaurants
                    .get(&order.restaurant_id)
                    .cloned()
                    .ok_or(diesel::result::Error::NotFound)?,
                driver: order.driver_id.and_then(|id| drivers.get(&id).cloned()),
                details: details.remove(&order.id).unwrap_or_default(),
                order,
            })
        })
        .collect()
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn resolve_principal(
        &self,
        credential: &Credential,
    ) -> Result<Option<Principal>, StoreError> {
        let mut conn = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut conn;
        let account_id = credential.account_id;

        let principal = match credential.role {
            Role::Customer => customers::table
                .filter(customers::account_id.eq(account_id))
                .select(customers::id)
                .first::<i32>(conn)
                .await
                .optional()?
                .map(Principal::Customer),
            Role::Restaurant => restaurants::table
                .filter(restaurants::account_id.eq(account_id))
                .select(restaurants::id)
                .first::<i32>(conn)
                .await
                .optional()?
                .map(Principal::Restaurant),
            Role::Driver => drivers::table
                .filter(drivers::account_id.eq(account_id))
                .select(drivers::id)
                .first::<i32>(conn)
                .await
                .optional()?
                .map(Principal::Driver),
        };
        Ok(principal)
    }

    async fn list_restaurants(&self) -> Result<Vec<Restaurant>, StoreError> {
        let mut conn = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut conn;
        Ok(restaurants::table
            .select(Restaurant::as_select())
            .order_by(restaurants::id.desc())
            .load(conn)
            .await?)
    }

    async fn find_restaurant(&self, restaurant_id: i32) -> Result<Option<Restaurant>, StoreError> {
        let mut conn = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut conn;
        Ok(restaurants::table
            .find(restaurant_id)
            .select(Restaurant::as_select())
            .first(conn)
            .await
            .optional()?)
    }

    async fn list_meals(&self, restaurant_id: i32) -> Result<Vec<Meal>, StoreError> {
        let mut conn = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut conn;
        Ok(meals::table
            .filter(meals::restaurant_id.eq(restaurant_id))
            .select(Meal::as_select())
            .order_by(meals::id.desc())
            .load(conn)
            .await?)
    }

    async fn find_meals(&self, meal_ids: &[i32]) -> Result<Vec<Meal>, StoreError> {
        let mut conn = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut conn;
        Ok(meals::table
            .filter(meals::id.eq_any(meal_ids.to_vec()))
            .select(Meal::as_select())
            .load(conn)
            .await?)
    }

    async fn has_outstanding_order(&self, customer_id: i32) -> Result<bool, StoreError> {
        let mut conn = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut conn;
        Ok(select(exists(
            orders::table
                .filter(orders::customer_id.eq(customer_id))
                .filter(orders::status.ne(OrderStatus::Delivered)),
        ))
        .get_result::<bool>(conn)
        .await?)
    }

    async fn insert_order(
        &self,
        order: NewOrder,
        lines: Vec<PricedLine>,
    ) -> Result<InsertOutcome, StoreError> {
        let mut conn = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut conn;

        conn.transaction::<_, StoreError, _>(|conn| {
            async move {
                // Serialises concurrent order creation for one customer.
                customers::table
                    .find(order.customer_id)
                    .select(customers::id)
                    .for_update()
                    .first::<i32>(conn)
                    .await?;

                let outstanding = select(exists(
                    orders::table
                        .filter(orders::customer_id.eq(order.customer_id))
                        .filter(orders::status.ne(OrderStatus::Delivered)),
                ))
                .get_result::<bool>(conn)
                .await?;
                if outstanding {
                    return Ok(InsertOutcome::OutstandingOrder);
                }

                let created = insert_into(orders::table)
                    .values(&order)
                    .returning(Order::as_returning())
                    .get_result::<Order>(conn)
                    .await?;
                let details = lines
                    .into_iter()
                    .map(|line| NewOrderDetail {
                        order_id: created.id,
                        meal_id: line.meal_id,
                        quantity: line.quantity,
                        sub_total: line.sub_total,
                    })
                    .collect::<Vec<_>>();
                insert_into(order_details::table)
                    .values(&details)
                    .execute(conn)
                    .await?;

                Ok(InsertOutcome::Inserted(created))
            }
            .scope_boxed()
        })
        .await
    }

    async fn latest_customer_order(
        &self,
        customer_id: i32,
    ) -> Result<Option<OrderRecord>, StoreError> {
        let mut conn = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut conn;
        let order = orders::table
            .filter(orders::customer_id.eq(customer_id))
            .select(Order::as_select())
            .order_by(orders::id.desc())
            .first::<Order>(conn)
            .await
            .optional()?;
        match order {
            Some(order) => Ok(load_records(conn, vec![order]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn count_orders_since(
        &self,
        restaurant_id: i32,
        since: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let mut conn = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut conn;
        Ok(orders::table
            .filter(orders::restaurant_id.eq(restaurant_id))
            .filter(orders::created_at.gt(since))
            .count()
            .get_result::<i64>(conn)
            .await?)
    }

    async fn mark_ready(
        &self,
        restaurant_id: i32,
        order_id: i32,
    ) -> Result<ReadyOutcome, StoreError> {
        let mut conn = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut conn;

        conn.transaction::<_, StoreError, _>(|conn| {
            async move {
                let order = orders::table
                    .filter(orders::id.eq(order_id))
                    .filter(orders::restaurant_id.eq(restaurant_id))
                    .select(Order::as_select())
                    .for_update()
                    .first::<Order>(conn)
                    .await
                    .optional()?;
                let order = match order {
                    Some(order) => order,
                    None => return Ok(ReadyOutcome::NotFound),
                };
                if order.status != OrderStatus::Cooking {
                    return Ok(ReadyOutcome::NotCooking);
                }

                let order = update(orders::table.find(order.id))
                    .set(orders::status.eq(OrderStatus::Ready))
                    .returning(Order::as_returning())
                    .get_result::<Order>(conn)
                    .await?;
                Ok(ReadyOutcome::Ready(order))
            }
            .scope_boxed()
        })
        .await
    }

    async fn list_ready_orders(&self) -> Result<Vec<OrderRecord>, StoreError> {
        let mut conn = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut conn;
        let orders = orders::table
            .filter(orders::status.eq(OrderStatus::Ready))
            .filter(orders::driver_id.is_null())
            .select(Order::as_select())
            .order_by(orders::id.desc())
            .load::<Order>(conn)
            .await?;
        load_records(conn, orders).await
    }

    async fn has_active_delivery(&self, driver_id: i32) -> Result<bool, StoreError> {
        let mut conn = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut conn;
        Ok(select(exists(
            orders::table
                .filter(orders::driver_id.eq(driver_id))
                .filter(orders::status.ne(OrderStatus::Delivered)),
        ))
        .get_result::<bool>(conn)
        .await?)
    }

    async fn claim_order(
        &self,
        driver_id: i32,
        order_id: i32,
        picked_at: DateTime<Utc>,
    ) -> Result<ClaimOutcome, StoreError> {
        let mut conn = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut conn;

        conn.transaction::<_, StoreError, _>(|conn| {
            async move {
                // Serialises claims made by the same driver.
                drivers::table
                    .find(driver_id)
                    .select(drivers::id)
                    .for_update()
                    .first::<i32>(conn)
                    .await?;

                let busy = select(exists(
                    orders::table
                        .filter(orders::driver_id.eq(driver_id))
                        .filter(orders::status.ne(OrderStatus::Delivered)),
                ))
                .get_result::<bool>(conn)
                .await?;
                if busy {
                    return Ok(ClaimOutcome::DriverBusy);
                }

                // Compare-and-set: concurrent claimants re-check the predicate
                // once the winner commits and match no row.
                let claimed = update(
                    orders::table
                        .filter(orders::id.eq(order_id))
                        .filter(orders::driver_id.is_null())
                        .filter(orders::status.eq(OrderStatus::Ready)),
                )
                .set((
                    orders::driver_id.eq(Some(driver_id)),
                    orders::status.eq(OrderStatus::OnTheWay),
                    orders::picked_at.eq(Some(picked_at)),
                ))
                .returning(Order::as_returning())
                .get_result::<Order>(conn)
                .await
                .optional()?;

                Ok(match claimed {
                    Some(order) => ClaimOutcome::Claimed(order),
                    None => ClaimOutcome::Unavailable,
                })
            }
            .scope_boxed()
        })
        .await
    }

    async fn latest_driver_order(
        &self,
        driver_id: i32,
    ) -> Result<Option<OrderRecord>, StoreError> {
        let mut conn = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut conn;
        let order = orders::table
            .filter(orders::driver_id.eq(driver_id))
            .filter(orders::picked_at.is_not_null())
            .select(Order::as_select())
            .order_by((orders::picked_at.desc(), orders::id.desc()))
            .first::<Order>(conn)
            .await
            .optional()?;
        match order {
            Some(order) => Ok(load_records(conn, vec![order]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn complete_order(
        &self,
        driver_id: i32,
        order_id: i32,
    ) -> Result<CompleteOutcome, StoreError> {
        let mut conn = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut conn;

        conn.transaction::<_, StoreError, _>(|conn| {
            async move {
                let order = orders::table
                    .filter(orders::id.eq(order_id))
                    .filter(orders::driver_id.eq(driver_id))
                    .select(Order::as_select())
                    .for_update()
                    .first::<Order>(conn)
                    .await
                    .optional()?;
                let order = match order {
                    Some(order) => order,
                    None => return Ok(CompleteOutcome::NotAssigned),
                };
                if order.status == OrderStatus::Delivered {
                    return Ok(CompleteOutcome::AlreadyDelivered(order));
                }

                let order = update(orders::table.find(order.id))
                    .set(orders::status.eq(OrderStatus::Delivered))
                    .returning(Order::as_returning())
                    .get_result::<Order>(conn)
                    .await?;
                Ok(CompleteOutcome::Completed(order))
            }
            .scope_boxed()
        })
        .await
    }

    async fn delivered_orders_between(
        &self,
        driver_id: i32,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut conn;
        Ok(orders::table
            .filter(orders::driver_id.eq(driver_id))
            .filter(orders::status.eq(OrderStatus::Delivered))
            .filter(orders::created_at.ge(from))
            .filter(orders::created_at.lt(until))
            .select(Order::as_select())
            .order_by(orders::created_at.asc())
            .load(conn)
            .await?)
    }

    async fn update_driver_location(
        &self,
        driver_id: i32,
        location: &str,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut conn;
        let updated = update(drivers::table.find(driver_id))
            .set(drivers::location.eq(location))
            .execute(conn)
            .await?;
        Ok(updated == 1)
    }

    async fn find_driver(&self, driver_id: i32) -> Result<Option<Driver>, StoreError> {
        let mut conn = self.conn().await?;
        let conn: &mut AsyncPgConnection = &mut conn;
        Ok(drivers::table
            .find(driver_id)
            .select(Driver::as_select())
            .first(conn)
            .await
            .optional()?)
    }
}
