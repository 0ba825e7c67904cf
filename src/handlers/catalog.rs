use crate::{errors::ServiceError, handlers::common::success_response, AppState};
use axum::{
    extract::{Path, State},
    response::Response,
    routing::get,
    Router,
};

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/product/{id}", get(product_detail))
        .route("/products/popular", get(popular_products))
        .route("/products/limited", get(limited_products))
}

async fn product_detail(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ServiceError> {
    let product = state.services.catalog.get_product(id).await?;
    Ok(success_response(product))
}

async fn popular_products(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let products = state.services.catalog.popular_products().await?;
    Ok(success_response(products))
}

async fn limited_products(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let products = state.services.catalog.limited_products().await?;
    Ok(success_response(products))
}
