use std::fmt;
use std::io::Write;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::{
    deserialize::{self, FromSql, FromSqlRow},
    expression::AsExpression,
    pg::{Pg, PgValue},
    prelude::*,
    serialize::{self, IsNull, Output, ToSql},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{customers, drivers, meals, order_details, orders, restaurants};

#[derive(FromSqlRow, AsExpression, PartialEq, Eq, Hash, Copy, Clone, Debug)]
#[diesel(sql_type = crate::schema::sql_types::OrderStatus)]
pub enum OrderStatus {
    Cooking,
    Ready,
    OnTheWay,
    Delivered,
}

impl OrderStatus {
    /// Human readable label used in API payloads.
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Cooking => "Cooking",
            OrderStatus::Ready => "Ready",
            OrderStatus::OnTheWay => "On the way",
            OrderStatus::Delivered => "Delivered",
        }
    }

    /// Anything short of delivered still occupies the customer's and the
    /// driver's single order slot.
    pub fn is_outstanding(&self) -> bool {
        *self != OrderStatus::Delivered
    }
}

impl ToSql<crate::schema::sql_types::OrderStatus, Pg> for OrderStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        match *self {
            OrderStatus::Cooking => out.write_all(b"COOKING")?,
            OrderStatus::Ready => out.write_all(b"READY")?,
            OrderStatus::OnTheWay => out.write_all(b"ONTHEWAY")?,
            OrderStatus::Delivered => out.write_all(b"DELIVERED")?,
        }
        Ok(IsNull::No)
    }
}

impl FromSql<crate::schema::sql_types::OrderStatus, Pg> for OrderStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"COOKING" => Ok(OrderStatus::Cooking),
            b"READY" => Ok(OrderStatus::Ready),
            b"ONTHEWAY" => Ok(OrderStatus::OnTheWay),
            b"DELIVERED" => Ok(OrderStatus::Delivered),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Clone, Debug, PartialEq)]
#[diesel(table_name = restaurants)]
pub struct Restaurant {
    pub id: i32,
    pub account_id: Uuid,
    pub name: String,
    pub phone: String,
    pub address: String,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Clone, Debug, PartialEq)]
#[diesel(belongs_to(Restaurant))]
#[diesel(table_name = meals)]
pub struct Meal {
    pub id: i32,
    pub restaurant_id: i32,
    pub name: String,
    pub short_description: String,
    pub price: BigDecimal,
}

#[derive(Queryable, Selectable, Identifiable, Clone, Debug, PartialEq)]
#[diesel(table_name = customers)]
pub struct Customer {
    pub id: i32,
    pub account_id: Uuid,
    pub name: String,
    pub phone: String,
    pub address: String,
}

#[derive(Queryable, Selectable, Identifiable, Clone, Debug, PartialEq)]
#[diesel(table_name = drivers)]
pub struct Driver {
    pub id: i32,
    pub account_id: Uuid,
    pub name: String,
    pub phone: String,
    pub location: String,
}

#[derive(Queryable, Selectable, Identifiable, Clone, Debug, PartialEq)]
#[diesel(table_name = orders)]
pub struct Order {
    pub id: i32,
    pub customer_id: i32,
    pub restaurant_id: i32,
    pub driver_id: Option<i32>,
    pub address: String,
    pub total: BigDecimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub picked_at: Option<DateTime<Utc>>,
}

#[derive(Insertable, Clone, Debug, PartialEq)]
#[diesel(table_name = orders)]
pub struct NewOrder {
    pub customer_id: i32,
    pub restaurant_id: i32,
    pub address: String,
    pub total: BigDecimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Clone, Debug, PartialEq)]
#[diesel(belongs_to(Order))]
#[diesel(table_name = order_details)]
pub struct OrderDetail {
    pub id: i32,
    pub order_id: i32,
    pub meal_id: i32,
    pub quantity: i32,
    pub sub_total: BigDecimal,
}

#[derive(Insertable, Debug, PartialEq)]
#[diesel(table_name = order_details)]
pub struct NewOrderDetail {
    pub order_id: i32,
    pub meal_id: i32,
    pub quantity: i32,
    pub sub_total: BigDecimal,
}

/// A line item whose price has been snapshotted from the meal at ordering time.
#[derive(Clone, Debug, PartialEq)]
pub struct PricedLine {
    pub meal_id: i32,
    pub quantity: i32,
    pub sub_total: BigDecimal,
}

/// Largest amount a `NUMERIC(10, 2)` money column holds.
pub fn max_amount() -> BigDecimal {
    BigDecimal::new(9_999_999_999i64.into(), 2)
}

/// Renders an amount with exactly two fractional digits.
pub fn format_money(value: &BigDecimal) -> String {
    value.with_scale(2).to_plain_string()
}

/// An order together with everything needed to render it.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderRecord {
    pub order: Order,
    pub customer: Customer,
    pub restaurant: Restaurant,
    pub driver: Option<Driver>,
    pub details: Vec<(OrderDetail, Meal)>,
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Hash, Copy, Clone, Debug)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Restaurant,
    Driver,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Customer => "customer",
            Role::Restaurant => "restaurant",
            Role::Driver => "driver",
        })
    }
}

/// What a validated credential says about its bearer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Credential {
    pub account_id: Uuid,
    pub role: Role,
}

/// A credential resolved to the profile row it acts as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Principal {
    Customer(i32),
    Restaurant(i32),
    Driver(i32),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::money;

    #[test]
    fn test_format_money_keeps_two_digits() {
        assert_eq!(format_money(&money("0")), "0.00");
        assert_eq!(format_money(&BigDecimal::from(0)), "0.00");
        assert_eq!(format_money(&money("25")), "25.00");
        assert_eq!(format_money(&money("9.5")), "9.50");
        assert_eq!(format_money(&max_amount()), "99999999.99");
    }
}
