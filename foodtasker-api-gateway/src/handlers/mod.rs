pub mod customer;
pub mod driver;
pub mod restaurant;

pub use customer::router as customer_router;
pub use driver::router as driver_router;
pub use restaurant::router as restaurant_router;

use std::sync::Arc;

use foodtasker_order_service::OrderServices;
use foodtasker_order_service::error::ServiceError;
use foodtasker_order_service::models::{Principal, Role};
use utoipa::OpenApi;

use crate::error::ApiError;
use crate::identity::{AuthError, IdentityGate};

#[derive(Clone)]
pub struct AppState {
    pub services: OrderServices,
    pub identity: Arc<dyn IdentityGate>,
}

/// Validates the token and resolves it to the profile id of `role`.
async fn authorize(state: &AppState, token: Option<&str>, role: Role) -> Result<i32, ApiError> {
    let token = token
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingToken)?;
    let credential = state.identity.validate(token).await?;
    if credential.role != role {
        return Err(ApiError::Forbidden(role));
    }

    let principal = state
        .services
        .store
        .resolve_principal(&credential)
        .await
        .map_err(ServiceError::from)?
        .ok_or(AuthError::UnknownAccount)?;
    match principal {
        Principal::Customer(id) | Principal::Restaurant(id) | Principal::Driver(id) => Ok(id),
    }
}

async fn authorize_customer(state: &AppState, token: Option<&str>) -> Result<i32, ApiError> {
    authorize(state, token, Role::Customer).await
}

async fn authorize_restaurant(state: &AppState, token: Option<&str>) -> Result<i32, ApiError> {
    authorize(state, token, Role::Restaurant).await
}

async fn authorize_driver(state: &AppState, token: Option<&str>) -> Result<i32, ApiError> {
    authorize(state, token, Role::Driver).await
}

#[derive(OpenApi)]
#[openapi(
    paths(
        customer::list_restaurants,
        customer::list_meals,
        customer::add_order,
        customer::latest_order,
        customer::driver_location,
        restaurant::order_notification,
        restaurant::mark_order_ready,
        driver::ready_orders,
        driver::pick_order,
        driver::latest_order,
        driver::complete_order,
        driver::revenue,
        driver::update_location,
    ),
    components(
        schemas(
            crate::models::StatusResponse,
            crate::models::ApiErrorResponse,
            crate::models::CreateOrderForm,
            crate::models::OrderIdForm,
            crate::models::LocationForm,
            crate::models::RestaurantResponse,
            crate::models::ListRestaurantsResponse,
            crate::models::MealResponse,
            crate::models::ListMealsResponse,
            crate::models::OrderCustomerResponse,
            crate::models::OrderDriverResponse,
            crate::models::OrderMealResponse,
            crate::models::OrderDetailResponse,
            crate::models::OrderResponse,
            crate::models::LatestOrderResponse,
            crate::models::ListOrdersResponse,
            crate::models::NotificationResponse,
            crate::models::DriverLocationResponse,
            crate::models::WeekRevenue,
            crate::models::RevenueResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "customer", description = "Browsing menus and placing orders"),
        (name = "restaurant", description = "Restaurant dashboard endpoints"),
        (name = "driver", description = "Pickup, delivery and revenue endpoints")
    ),
    info(
        title = "FoodTasker API",
        description = "Food ordering backend for customers, restaurants and drivers",
        version = "1.0.0"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            use utoipa::openapi::security::*;
            components.add_security_scheme(
                "access_token",
                SecurityScheme::ApiKey(ApiKey::Query(ApiKeyValue::new("access_token"))),
            );
        }
    }
}
