use axum::{
    Form, Router,
    extract::{
        Path, Query, State,
        rejection::{FormRejection, PathRejection, QueryRejection},
    },
    response::Json,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::error::ApiError;
use crate::models::*;

use super::{AppState, authorize_restaurant};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/restaurant/order/notification/{last_request_time}/",
            get(order_notification),
        )
        .route("/api/restaurant/order/ready/", post(mark_order_ready))
}

#[utoipa::path(
    get,
    path = "/api/restaurant/order/notification/{last_request_time}/",
    responses(
        (status = 200, description = "Number of orders created after the given time", body = NotificationResponse),
        (status = 400, description = "Malformed timestamp", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Not a restaurant", body = ApiErrorResponse),
        (status = 503, description = "Service unavailable", body = ApiErrorResponse),
    ),
    params(
        ("last_request_time" = String, Path, description = "RFC 3339 timestamp"),
        AccessTokenQuery
    ),
    security(
        ("access_token" = [])
    ),
    tag = "restaurant"
)]
#[instrument(skip(state, query))]
pub async fn order_notification(
    State(state): State<AppState>,
    last_request_time: Result<Path<String>, PathRejection>,
    query: Result<Query<AccessTokenQuery>, QueryRejection>,
) -> Result<Json<NotificationResponse>, ApiError> {
    let Path(last_request_time) = last_request_time?;
    let Query(query) = query?;
    let restaurant_id = authorize_restaurant(&state, query.access_token.as_deref()).await?;

    let since = DateTime::parse_from_rfc3339(&last_request_time)
        .map_err(|e| ApiError::BadRequest(format!("Invalid timestamp: {}", e)))?
        .with_timezone(&Utc);
    let notification = state
        .services
        .ledger
        .notify_count(restaurant_id, since)
        .await?;

    Ok(Json(NotificationResponse { notification }))
}

#[utoipa::path(
    post,
    path = "/api/restaurant/order/ready/",
    request_body(content = OrderIdForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Order is ready for pickup", body = StatusResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 403, description = "Not a restaurant", body = ApiErrorResponse),
        (status = 404, description = "Order not found", body = ApiErrorResponse),
        (status = 409, description = "Order is not being cooked", body = ApiErrorResponse),
        (status = 503, description = "Service unavailable", body = ApiErrorResponse),
    ),
    security(
        ("access_token" = [])
    ),
    tag = "restaurant"
)]
#[instrument(skip(state, form))]
pub async fn mark_order_ready(
    State(state): State<AppState>,
    form: Result<Form<OrderIdForm>, FormRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Form(form) = form?;
    let restaurant_id = authorize_restaurant(&state, form.access_token.as_deref()).await?;

    state
        .services
        .ledger
        .mark_order_ready(restaurant_id, form.order_id)
        .await?;

    Ok(Json(StatusResponse::success()))
}
