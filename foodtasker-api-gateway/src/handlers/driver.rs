use axum::{
    Form, Router,
    extract::{
        Query, State,
        rejection::{FormRejection, QueryRejection},
    },
    response::Json,
    routing::{get, post},
};
use tracing::instrument;

use crate::error::ApiError;
use crate::models::*;

use super::{AppState, authorize_driver};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/driver/orders/ready/", get(ready_orders))
        .route("/api/driver/order/pick/", post(pick_order))
        .route("/api/driver/order/latest/", get(latest_order))
        .route("/api/driver/order/complete/", post(complete_order))
        .route("/api/driver/revenue/", get(revenue))
        .route("/api/driver/location/update/", post(update_location))
}

#[utoipa::path(
    get,
    path = "/api/driver/orders/ready/",
    responses(
        (status = 200, description = "Unclaimed ready orders, newest first", body = ListOrdersResponse),
        (status = 503, description = "Service unavailable", body = ApiErrorResponse),
    ),
    tag = "driver"
)]
#[instrument(skip(state))]
pub async fn ready_orders(
    State(state): State<AppState>,
) -> Result<Json<ListOrdersResponse>, ApiError> {
    let orders = state.services.dispatch.list_ready_orders().await?;
    Ok(Json(ListOrdersResponse {
        orders: orders.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/driver/order/pick/",
    request_body(content = OrderIdForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Order picked up", body = StatusResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Not a driver", body = ApiErrorResponse),
        (status = 409, description = "Driver busy or order taken by another driver", body = ApiErrorResponse),
        (status = 503, description = "Service unavailable", body = ApiErrorResponse),
    ),
    security(
        ("access_token" = [])
    ),
    tag = "driver"
)]
#[instrument(skip(state, form))]
pub async fn pick_order(
    State(state): State<AppState>,
    form: Result<Form<OrderIdForm>, FormRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Form(form) = form?;
    let driver_id = authorize_driver(&state, form.access_token.as_deref()).await?;

    state
        .services
        .dispatch
        .claim_order(driver_id, form.order_id)
        .await?;

    Ok(Json(StatusResponse::success()))
}

#[utoipa::path(
    get,
    path = "/api/driver/order/latest/",
    responses(
        (status = 200, description = "Order most recently picked up by the driver", body = LatestOrderResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Not a driver", body = ApiErrorResponse),
        (status = 503, description = "Service unavailable", body = ApiErrorResponse),
    ),
    params(AccessTokenQuery),
    security(
        ("access_token" = [])
    ),
    tag = "driver"
)]
#[instrument(skip(state, query))]
pub async fn latest_order(
    State(state): State<AppState>,
    query: Result<Query<AccessTokenQuery>, QueryRejection>,
) -> Result<Json<LatestOrderResponse>, ApiError> {
    let Query(query) = query?;
    let driver_id = authorize_driver(&state, query.access_token.as_deref()).await?;

    let order = state.services.dispatch.latest_order(driver_id).await?;
    Ok(Json(LatestOrderResponse {
        order: order.map(Into::into),
    }))
}

#[utoipa::path(
    post,
    path = "/api/driver/order/complete/",
    request_body(content = OrderIdForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Order delivered", body = StatusResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Not a driver", body = ApiErrorResponse),
        (status = 404, description = "Order is not assigned to the driver", body = ApiErrorResponse),
        (status = 503, description = "Service unavailable", body = ApiErrorResponse),
    ),
    security(
        ("access_token" = [])
    ),
    tag = "driver"
)]
#[instrument(skip(state, form))]
pub async fn complete_order(
    State(state): State<AppState>,
    form: Result<Form<OrderIdForm>, FormRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Form(form) = form?;
    let driver_id = authorize_driver(&state, form.access_token.as_deref()).await?;

    state
        .services
        .dispatch
        .complete_order(driver_id, form.order_id)
        .await?;

    Ok(Json(StatusResponse::success()))
}

#[utoipa::path(
    get,
    path = "/api/driver/revenue/",
    responses(
        (status = 200, description = "Delivered revenue per day of the current week", body = RevenueResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Not a driver", body = ApiErrorResponse),
        (status = 503, description = "Service unavailable", body = ApiErrorResponse),
    ),
    params(AccessTokenQuery),
    security(
        ("access_token" = [])
    ),
    tag = "driver"
)]
#[instrument(skip(state, query))]
pub async fn revenue(
    State(state): State<AppState>,
    query: Result<Query<AccessTokenQuery>, QueryRejection>,
) -> Result<Json<RevenueResponse>, ApiError> {
    let Query(query) = query?;
    let driver_id = authorize_driver(&state, query.access_token.as_deref()).await?;

    let week = state.services.revenue.current_week(driver_id).await?;
    Ok(Json(RevenueResponse {
        revenue: (&week).into(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/driver/location/update/",
    request_body(content = LocationForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Location stored", body = StatusResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Not a driver", body = ApiErrorResponse),
        (status = 503, description = "Service unavailable", body = ApiErrorResponse),
    ),
    security(
        ("access_token" = [])
    ),
    tag = "driver"
)]
#[instrument(skip(state, form))]
pub async fn update_location(
    State(state): State<AppState>,
    form: Result<Form<LocationForm>, FormRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Form(form) = form?;
    let driver_id = authorize_driver(&state, form.access_token.as_deref()).await?;

    state
        .services
        .location
        .update_location(driver_id, &form.location)
        .await?;

    Ok(Json(StatusResponse::success()))
}
