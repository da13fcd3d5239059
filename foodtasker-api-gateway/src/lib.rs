use axum::{Router, response::Json, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod models;

pub use handlers::{ApiDoc, AppState};

use handlers::{customer_router, driver_router, restaurant_router};

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(customer_router())
        .merge(restaurant_router())
        .merge(driver_router())
        .route("/api-docs/openapi.json", get(openapi))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
