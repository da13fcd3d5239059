use axum::{
    Form, Router,
    extract::{
        Path, Query, State,
        rejection::{FormRejection, PathRejection, QueryRejection},
    },
    response::Json,
    routing::{get, post},
};
use tracing::instrument;

use crate::error::ApiError;
use crate::models::*;

use super::{AppState, authorize_customer};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/customer/restaurants/", get(list_restaurants))
        .route("/api/customer/meals/{restaurant_id}/", get(list_meals))
        .route("/api/customer/order/add/", post(add_order))
        .route("/api/customer/order/latest/", get(latest_order))
        .route("/api/customer/driver/location/", get(driver_location))
}

#[utoipa::path(
    get,
    path = "/api/customer/restaurants/",
    responses(
        (status = 200, description = "All restaurants, newest first", body = ListRestaurantsResponse),
        (status = 503, description = "Service unavailable", body = ApiErrorResponse),
    ),
    tag = "customer"
)]
#[instrument(skip(state))]
pub async fn list_restaurants(
    State(state): State<AppState>,
) -> Result<Json<ListRestaurantsResponse>, ApiError> {
    let restaurants = state.services.catalog.list_restaurants().await?;
    Ok(Json(ListRestaurantsResponse {
        restaurants: restaurants.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/customer/meals/{restaurant_id}/",
    responses(
        (status = 200, description = "Meals of the restaurant, newest first", body = ListMealsResponse),
        (status = 400, description = "Malformed restaurant id", body = ApiErrorResponse),
        (status = 503, description = "Service unavailable", body = ApiErrorResponse),
    ),
    params(
        ("restaurant_id" = i32, Path, description = "Restaurant ID")
    ),
    tag = "customer"
)]
#[instrument(skip(state))]
pub async fn list_meals(
    State(state): State<AppState>,
    restaurant_id: Result<Path<i32>, PathRejection>,
) -> Result<Json<ListMealsResponse>, ApiError> {
    let Path(restaurant_id) = restaurant_id?;
    let meals = state.services.catalog.list_meals(restaurant_id).await?;
    Ok(Json(ListMealsResponse {
        meals: meals.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/customer/order/add/",
    request_body(content = CreateOrderForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Order placed", body = StatusResponse),
        (status = 400, description = "Invalid address or order details", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Not a customer", body = ApiErrorResponse),
        (status = 404, description = "Restaurant or meal not found", body = ApiErrorResponse),
        (status = 409, description = "Previous order not delivered yet", body = ApiErrorResponse),
        (status = 503, description = "Service unavailable", body = ApiErrorResponse),
    ),
    security(
        ("access_token" = [])
    ),
    tag = "customer"
)]
#[instrument(skip(state, form))]
pub async fn add_order(
    State(state): State<AppState>,
    form: Result<Form<CreateOrderForm>, FormRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Form(form) = form?;
    let customer_id = authorize_customer(&state, form.access_token.as_deref()).await?;

    state
        .services
        .ledger
        .create_order_from_wire(
            customer_id,
            form.restaurant_id,
            &form.address,
            &form.order_details,
        )
        .await?;

    Ok(Json(StatusResponse::success()))
}

#[utoipa::path(
    get,
    path = "/api/customer/order/latest/",
    responses(
        (status = 200, description = "Most recent order of the customer", body = LatestOrderResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Not a customer", body = ApiErrorResponse),
        (status = 503, description = "Service unavailable", body = ApiErrorResponse),
    ),
    params(AccessTokenQuery),
    security(
        ("access_token" = [])
    ),
    tag = "customer"
)]
#[instrument(skip(state, query))]
pub async fn latest_order(
    State(state): State<AppState>,
    query: Result<Query<AccessTokenQuery>, QueryRejection>,
) -> Result<Json<LatestOrderResponse>, ApiError> {
    let Query(query) = query?;
    let customer_id = authorize_customer(&state, query.access_token.as_deref()).await?;

    let order = state.services.ledger.latest_order(customer_id).await?;
    Ok(Json(LatestOrderResponse {
        order: order.map(Into::into),
    }))
}

#[utoipa::path(
    get,
    path = "/api/customer/driver/location/",
    responses(
        (status = 200, description = "Location of the driver carrying the latest order", body = DriverLocationResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Not a customer", body = ApiErrorResponse),
        (status = 503, description = "Service unavailable", body = ApiErrorResponse),
    ),
    params(AccessTokenQuery),
    security(
        ("access_token" = [])
    ),
    tag = "customer"
)]
#[instrument(skip(state, query))]
pub async fn driver_location(
    State(state): State<AppState>,
    query: Result<Query<AccessTokenQuery>, QueryRejection>,
) -> Result<Json<DriverLocationResponse>, ApiError> {
    let Query(query) = query?;
    let customer_id = authorize_customer(&state, query.access_token.as_deref()).await?;

    let location = state
        .services
        .location
        .driver_location_for_customer(customer_id)
        .await?;
    Ok(Json(DriverLocationResponse { location }))
}
