use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use foodtasker_order_service::WeeklyRevenue;
use foodtasker_order_service::models::{self, OrderRecord, format_money};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

fn money(value: &BigDecimal) -> String {
    format_money(value)
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    /// Always `success`
    pub status: String,
}

impl StatusResponse {
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// Always `failed`
    pub status: String,
    /// Human readable reason
    pub error: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AccessTokenQuery {
    /// Bearer credential
    pub access_token: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderForm {
    pub access_token: Option<String>,
    pub restaurant_id: i32,
    /// Delivery address
    #[serde(default)]
    pub address: String,
    /// JSON array, e.g. `[{"meal_id": 1, "quantity": 2}]`
    #[serde(default)]
    pub order_details: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderIdForm {
    pub access_token: Option<String>,
    pub order_id: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LocationForm {
    pub access_token: Option<String>,
    /// Free text, usually `"lat,lng"`
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RestaurantResponse {
    pub id: i32,
    pub name: String,
    pub phone: String,
    pub address: String,
}

impl From<models::Restaurant> for RestaurantResponse {
    fn from(restaurant: models::Restaurant) -> Self {
        Self {
            id: restaurant.id,
            name: restaurant.name,
            phone: restaurant.phone,
            address: restaurant.address,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListRestaurantsResponse {
    pub restaurants: Vec<RestaurantResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MealResponse {
    pub id: i32,
    pub name: String,
    pub short_description: String,
    /// Decimal string
    pub price: String,
}

impl From<models::Meal> for MealResponse {
    fn from(meal: models::Meal) -> Self {
        Self {
            id: meal.id,
            name: meal.name,
            short_description: meal.short_description,
            price: money(&meal.price),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListMealsResponse {
    pub meals: Vec<MealResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderCustomerResponse {
    pub id: i32,
    pub name: String,
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderDriverResponse {
    pub id: i32,
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderMealResponse {
    pub id: i32,
    pub name: String,
    pub price: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderDetailResponse {
    pub id: i32,
    pub meal: OrderMealResponse,
    pub quantity: i32,
    /// Meal price times quantity when the order was placed
    pub sub_total: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: i32,
    pub customer: OrderCustomerResponse,
    pub restaurant: RestaurantResponse,
    pub driver: Option<OrderDriverResponse>,
    pub order_details: Vec<OrderDetailResponse>,
    pub total: String,
    /// One of `Cooking`, `Ready`, `On the way`, `Delivered`
    pub status: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub picked_at: Option<DateTime<Utc>>,
}

impl From<OrderRecord> for OrderResponse {
    fn from(record: OrderRecord) -> Self {
        let OrderRecord {
            order,
            customer,
            restaurant,
            driver,
            details,
        } = record;
        Self {
            id: order.id,
            customer: OrderCustomerResponse {
                id: customer.id,
                name: customer.name,
                phone: customer.phone,
                address: customer.address,
            },
            restaurant: restaurant.into(),
            driver: driver.map(|driver| OrderDriverResponse {
                id: driver.id,
                name: driver.name,
                phone: driver.phone,
            }),
            order_details: details
                .into_iter()
                .map(|(detail, meal)| OrderDetailResponse {
                    id: detail.id,
                    meal: OrderMealResponse {
                        id: meal.id,
                        name: meal.name,
                        price: money(&meal.price),
                    },
                    quantity: detail.quantity,
                    sub_total: money(&detail.sub_total),
                })
                .collect(),
            total: money(&order.total),
            status: order.status.label().to_string(),
            address: order.address,
            created_at: order.created_at,
            picked_at: order.picked_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LatestOrderResponse {
    pub order: Option<OrderResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListOrdersResponse {
    pub orders: Vec<OrderResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NotificationResponse {
    /// Orders created after the given time
    pub notification: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DriverLocationResponse {
    /// `null` unless the latest order is on the way
    pub location: Option<String>,
}

/// Revenue per weekday of the current week, as decimal strings.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WeekRevenue {
    #[serde(rename = "Mon")]
    pub mon: String,
    #[serde(rename = "Tue")]
    pub tue: String,
    #[serde(rename = "Wed")]
    pub wed: String,
    #[serde(rename = "Thu")]
    pub thu: String,
    #[serde(rename = "Fri")]
    pub fri: String,
    #[serde(rename = "Sat")]
    pub sat: String,
    #[serde(rename = "Sun")]
    pub sun: String,
}

impl From<&WeeklyRevenue> for WeekRevenue {
    fn from(week: &WeeklyRevenue) -> Self {
        let [mon, tue, wed, thu, fri, sat, sun] = week.days().clone().map(|day| money(&day.total));
        Self {
            mon,
            tue,
            wed,
            thu,
            fri,
            sat,
            sun,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RevenueResponse {
    pub revenue: WeekRevenue,
}
